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
use rdrop_protocol::ReceiverHandler;

/// A type implementing Write+Read to emulate sockets
#[derive(Debug)]
pub struct Mock<'a, T: AsRef<[u8]> + Unpin> {
    read_cursor: std::io::Cursor<T>,
    write_cursor: std::io::Cursor<&'a mut Vec<u8>>,
}

impl<'a, T: AsRef<[u8]> + Unpin> Mock<'a, T> {
    /// Create an new instance
    pub fn new(read: T, write: &'a mut Vec<u8>) -> Self {
        Self {
            read_cursor: std::io::Cursor::new(read),
            write_cursor: std::io::Cursor::new(write),
        }
    }
}

impl<T: AsRef<[u8]> + Unpin> tokio::io::AsyncRead for Mock<'_, T> {
    fn poll_read(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
        buf: &mut tokio::io::ReadBuf<'_>,
    ) -> std::task::Poll<std::result::Result<(), std::io::Error>> {
        std::pin::Pin::new(&mut self.read_cursor).poll_read(cx, buf)
    }
}

impl<T: AsRef<[u8]> + Unpin> tokio::io::AsyncWrite for Mock<'_, T> {
    fn poll_write(
        mut self: std::pin::Pin<&mut Self>,
        _: &mut std::task::Context<'_>,
        buf: &[u8],
    ) -> std::task::Poll<Result<usize, std::io::Error>> {
        std::task::Poll::Ready(std::io::Write::write(&mut self.write_cursor, buf))
    }

    fn poll_flush(
        mut self: std::pin::Pin<&mut Self>,
        _: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), std::io::Error>> {
        std::task::Poll::Ready(std::io::Write::flush(&mut self.write_cursor))
    }

    fn poll_shutdown(
        self: std::pin::Pin<&mut Self>,
        _: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), std::io::Error>> {
        std::task::Poll::Ready(Ok(()))
    }
}

/// Accept every server, acknowledge every delivery.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultHandler;

#[async_trait::async_trait]
impl ReceiverHandler for DefaultHandler {
    async fn on_hello(
        &mut self,
        _: rdrop_common::PublicKey,
        _: Option<rdrop_common::SelfIdent>,
    ) -> bool {
        true
    }

    async fn on_deliver_transit(&mut self, _: serde_json::Value) -> rdrop_protocol::Reply {
        rdrop_protocol::Reply::Ack
    }

    async fn on_deliver_server(&mut self, _: serde_json::Value) -> rdrop_protocol::Reply {
        rdrop_protocol::Reply::Ack
    }
}

/// run a connection and assert output produced by `rdrop` and `expected_output`
///
/// # Errors
///
/// * the first error of [`rdrop_protocol::Receiver::into_stream`]
///
/// # Panics
///
/// * the output differs
pub async fn test_receiver_inner<H>(
    handler: H,
    input: &[u8],
    expected_output: &[u8],
    line_length_max: usize,
) -> Result<(), rdrop_protocol::Error>
where
    H: ReceiverHandler + Send,
{
    let mut written_data = Vec::new();

    let result = {
        let (read, write) = tokio::io::split(Mock::new(input.to_vec(), &mut written_data));
        let stream =
            rdrop_protocol::Receiver::from_parts(read, write, handler, line_length_max)
                .into_stream();
        let mut stream = Box::pin(stream);

        let mut result = Ok(());
        while let Some(item) = tokio_stream::StreamExt::next(&mut stream).await {
            if let Err(error) = item {
                result = Err(error);
                break;
            }
        }
        result
    };

    pretty_assertions::assert_eq!(
        std::str::from_utf8(expected_output),
        std::str::from_utf8(&written_data),
    );

    result
}

/// Call `test_receiver_inner`
#[allow(clippy::module_name_repetitions)]
#[macro_export]
macro_rules! test_receiver {
    ($input:expr, $output:expr) => {
        $crate::test_receiver! {
            with_handler => $crate::receiver::DefaultHandler,
            $input,
            $output
        }
    };
    (with_handler => $handler:expr, $input:expr, $output:expr) => {
        $crate::test_receiver! {
            with_handler => $handler,
            with_line_length_max => $crate::config::local_test().server.delivery.line_length_max,
            $input,
            $output
        }
    };
    (with_line_length_max => $max:expr, $input:expr, $output:expr) => {
        $crate::test_receiver! {
            with_handler => $crate::receiver::DefaultHandler,
            with_line_length_max => $max,
            $input,
            $output
        }
    };
    (with_handler => $handler:expr, with_line_length_max => $max:expr, $input:expr, $output:expr) => {
        $crate::receiver::test_receiver_inner(
            $handler,
            $input.as_bytes(),
            $output.as_bytes(),
            $max,
        )
        .await
    };
}
