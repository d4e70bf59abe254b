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
use crate::{
    sink::Sink,
    stream::{Error, Stream},
    Reply, Request,
};

/// The connecting side of a peer connection.
pub struct Client<W: tokio::io::AsyncWrite + Unpin + Send, R: tokio::io::AsyncRead + Unpin + Send> {
    sink: Sink<W>,
    stream: Stream<R>,
    reply_timeout: std::time::Duration,
}

impl Client<tokio::net::tcp::OwnedWriteHalf, tokio::net::tcp::OwnedReadHalf> {
    /// Create a new [`Client`] from a connected TCP/IP stream.
    #[must_use]
    pub fn new(
        tcp_stream: tokio::net::TcpStream,
        line_length_max: usize,
        reply_timeout: std::time::Duration,
    ) -> Self {
        let (read, write) = tcp_stream.into_split();
        Self::from_parts(read, write, line_length_max, reply_timeout)
    }
}

impl<W: tokio::io::AsyncWrite + Unpin + Send, R: tokio::io::AsyncRead + Unpin + Send> Client<W, R> {
    /// Create a new [`Client`] from any reader/writer pair.
    #[must_use]
    pub fn from_parts(
        read: R,
        write: W,
        line_length_max: usize,
        reply_timeout: std::time::Duration,
    ) -> Self {
        Self {
            sink: Sink::new(write),
            stream: Stream::new(read, line_length_max),
            reply_timeout,
        }
    }

    /// Send a frame and wait for its reply.
    ///
    /// # Errors
    ///
    /// * the frame could not be written
    /// * the peer closed the connection or did not answer in time
    /// * the reply is not a valid frame
    pub async fn send(&mut self, request: &Request) -> Result<Reply, Error> {
        self.sink.send_frame(request).await?;

        match tokio::time::timeout(self.reply_timeout, self.stream.read_frame::<Reply>()).await {
            Err(_elapsed) => Err(Error::Timeout),
            Ok(Ok(None)) => {
                Err(std::io::Error::from(std::io::ErrorKind::UnexpectedEof).into())
            }
            Ok(Ok(Some(reply))) => Ok(reply),
            Ok(Err(e)) => Err(e),
        }
    }
}
