/*
 * rdrop federated maildrop
 * Copyright (C) 2022 viridIT SAS
 *
 * This program is free software: you can redistribute it and/or modify it under
 * the terms of the GNU General Public License as published by the Free Software
 * Foundation, either version 3 of the License, or any later version.
 *
 * This program is distributed in the hope that it will be useful, but WITHOUT
 * ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
 * FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License along with
 * this program. If not, see https://www.gnu.org/licenses/.
 *
*/
use tokio::io::AsyncWriteExt;

pub struct Sink<W: tokio::io::AsyncWrite + Unpin + Send> {
    pub inner: W,
}

impl<W: tokio::io::AsyncWrite + Unpin + Send> Sink<W> {
    pub const fn new(inner: W) -> Self {
        Self { inner }
    }

    pub async fn send_frame<T: serde::Serialize + Sync>(
        &mut self,
        frame: &T,
    ) -> Result<(), crate::Error> {
        let mut buffer = serde_json::to_vec(frame)?;
        tracing::trace!(">> {:?}", String::from_utf8_lossy(&buffer));
        buffer.push(b'\n');
        self.inner.write_all(&buffer).await?;
        self.inner.flush().await?;
        Ok(())
    }
}
