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
use rdrop_common::PublicKey;
use tokio::io::AsyncReadExt;

fn find(bytes: &[u8], search: u8) -> Option<usize> {
    bytes.iter().position(|byte| *byte == search)
}

/// Error while processing the TCP/IP stream.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The frame is longer than expected.
    #[error("frame is not supposed to be longer than {expected} bytes but got {got}")]
    BufferTooLong {
        /// Maximum size expected.
        expected: usize,
        /// Actual size.
        got: usize,
    },
    /// Other IO error.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// The frame is not valid JSON, or has an unknown `type`.
    #[error("ill-formed frame: {0}")]
    Frame(#[from] serde_json::Error),
    /// The frame is valid but not at this point of the connection.
    #[error("frame `{0}` was not expected at this point")]
    UnexpectedFrame(&'static str),
    /// The peer failed the server authentication.
    #[error("server `{0}` is not allowed to deliver")]
    Denied(PublicKey),
    /// The peer did not answer in time.
    #[error("no reply received in time")]
    Timeout,
}

pub struct Stream<R: tokio::io::AsyncRead + Unpin + Send> {
    pub(super) inner: R,
    buffer: bytes::BytesMut,
    additional_reserve: usize,
    line_length_max: usize,
}

impl<R: tokio::io::AsyncRead + Unpin + Send> Stream<R> {
    #[must_use]
    pub fn new(inner: R, line_length_max: usize) -> Self {
        Self {
            inner,
            buffer: bytes::BytesMut::with_capacity(256),
            additional_reserve: 1024,
            line_length_max,
        }
    }

    /// Next line, without its terminator.
    ///
    /// `Ok(None)` if the peer closed the connection between two frames.
    pub async fn read_line(&mut self) -> Result<Option<Vec<u8>>, Error> {
        loop {
            if let Some(pos) = find(&self.buffer, b'\n') {
                if pos > self.line_length_max {
                    return Err(Error::BufferTooLong {
                        expected: self.line_length_max,
                        got: pos,
                    });
                }
                let mut line = self.buffer.split_to(pos + 1);
                line.truncate(pos);
                if line.last() == Some(&b'\r') {
                    line.truncate(pos - 1);
                }
                return Ok(Some(Vec::<u8>::from(line)));
            }

            if self.buffer.len() > self.line_length_max {
                return Err(Error::BufferTooLong {
                    expected: self.line_length_max,
                    got: self.buffer.len(),
                });
            }

            self.buffer.reserve(self.additional_reserve);
            if self.inner.read_buf(&mut self.buffer).await? == 0 {
                if self.buffer.iter().all(u8::is_ascii_whitespace) {
                    return Ok(None);
                }
                return Err(std::io::Error::from(std::io::ErrorKind::UnexpectedEof).into());
            }
        }
    }

    /// Next frame, blank lines are skipped.
    pub async fn read_frame<T: serde::de::DeserializeOwned>(&mut self) -> Result<Option<T>, Error> {
        loop {
            let Some(line) = self.read_line().await? else {
                return Ok(None);
            };
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            tracing::trace!("<< {:?}", String::from_utf8_lossy(&line));
            return Ok(Some(serde_json::from_slice(&line)?));
        }
    }

    /// Frames until the peer closes the connection or sends an invalid one.
    pub fn as_frame_stream<'a, T: serde::de::DeserializeOwned + 'a>(
        &'a mut self,
    ) -> impl tokio_stream::Stream<Item = Result<T, Error>> + 'a {
        async_stream::stream! {
            loop {
                match self.read_frame::<T>().await {
                    Ok(Some(frame)) => yield Ok(frame),
                    Ok(None) => return,
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }
        }
    }
}
