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
    Reply, ReceiverHandler, Request,
};

/// The receiving side of a peer connection.
pub struct Receiver<
    T: ReceiverHandler + Send,
    W: tokio::io::AsyncWrite + Unpin + Send,
    R: tokio::io::AsyncRead + Unpin + Send,
> {
    pub(crate) handler: T,
    pub(crate) sink: Sink<W>,
    pub(crate) stream: Stream<R>,
}

impl<T: ReceiverHandler + Send>
    Receiver<T, tokio::net::tcp::OwnedWriteHalf, tokio::net::tcp::OwnedReadHalf>
{
    /// Create a new [`Receiver`] from a TCP/IP stream.
    #[inline]
    #[must_use]
    pub fn new(tcp_stream: tokio::net::TcpStream, handler: T, line_length_max: usize) -> Self {
        let (read, write) = tcp_stream.into_split();
        Self::from_parts(read, write, handler, line_length_max)
    }
}

impl<
        T: ReceiverHandler + Send,
        W: tokio::io::AsyncWrite + Unpin + Send,
        R: tokio::io::AsyncRead + Unpin + Send,
    > Receiver<T, W, R>
{
    /// Create a new [`Receiver`] from any reader/writer pair.
    #[inline]
    #[must_use]
    pub fn from_parts(read: R, write: W, handler: T, line_length_max: usize) -> Self {
        Self {
            handler,
            sink: Sink::new(write),
            stream: Stream::new(read, line_length_max),
        }
    }

    /// Handle the inner stream to produce a [`tokio_stream::Stream`], each item
    /// being a processed delivery.
    ///
    /// The stream ends when the peer closes the connection, and fails on the
    /// first frame breaking the protocol: a missing or repeated `hello`, an
    /// ill-formed or oversized frame. A denied `hello` is answered with `bad`
    /// before failing with [`Error::Denied`].
    #[inline]
    pub fn into_stream(mut self) -> impl tokio_stream::Stream<Item = Result<(), Error>> {
        async_stream::try_stream! {
            let (server_key, self_ident) = match self.stream.read_frame::<Request>().await? {
                None => return,
                Some(Request::Hello { server_key, self_ident }) => (server_key, self_ident),
                Some(otherwise) => Err(Error::UnexpectedFrame(otherwise.verb()))?,
            };

            if !self.handler.on_hello(server_key, self_ident).await {
                self.sink.send_frame(&Reply::Bad).await?;
                Err::<(), _>(Error::Denied(server_key))?;
            }
            self.sink.send_frame(&Reply::Ack).await?;

            while let Some(request) = self.stream.read_frame::<Request>().await? {
                let reply = match request {
                    Request::DeliverTransit { msg } => self.handler.on_deliver_transit(msg).await,
                    Request::DeliverServer { msg } => self.handler.on_deliver_server(msg).await,
                    Request::Hello { .. } => Err(Error::UnexpectedFrame("hello"))?,
                };
                self.sink.send_frame(&reply).await?;

                yield ();
            }
        }
    }
}
