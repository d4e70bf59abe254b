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
use crate::{ReceiveDeliveryConnection, ServerContext};
use anyhow::Context;
use rdrop_config::Config;
use rdrop_delivery::ServerUrlCache;
use rdrop_protocol::{Receiver, Reply};

/// TCP/IP server
pub struct Server {
    config: std::sync::Arc<Config>,
    ctx: std::sync::Arc<ServerContext>,
    server_urls: std::sync::Arc<ServerUrlCache>,
}

/// Create a `TCPListener` ready to be listened to
///
/// # Errors
///
/// * failed to bind to the socket address
/// * failed to set the listener to non blocking
pub fn socket_bind_anyhow<A: std::net::ToSocketAddrs + std::fmt::Debug>(
    addr: A,
) -> anyhow::Result<std::net::TcpListener> {
    let socket = std::net::TcpListener::bind(&addr)
        .with_context(|| format!("Failed to bind socket on addr: '{addr:?}'"))?;

    socket
        .set_nonblocking(true)
        .with_context(|| format!("Failed to set non-blocking socket on addr: '{addr:?}'"))?;

    Ok(socket)
}

type ListenerStreamItem = std::io::Result<(tokio::net::TcpStream, std::net::SocketAddr)>;

fn listener_to_stream(
    listener: &tokio::net::TcpListener,
) -> impl tokio_stream::Stream<Item = ListenerStreamItem> + '_ {
    async_stream::try_stream! {
        loop {
            let client = listener.accept().await?;
            yield client;
        }
    }
}

impl Server {
    /// Create a server with the configuration provided.
    #[must_use]
    pub const fn new(
        config: std::sync::Arc<Config>,
        ctx: std::sync::Arc<ServerContext>,
        server_urls: std::sync::Arc<ServerUrlCache>,
    ) -> Self {
        Self {
            config,
            ctx,
            server_urls,
        }
    }

    #[tracing::instrument(name = "handle-client", skip_all, fields(client = %client_addr, server = %server_addr))]
    async fn handle_client(
        &self,
        client_counter: std::sync::Arc<std::sync::atomic::AtomicI64>,
        mut stream: tokio::net::TcpStream,
        client_addr: std::net::SocketAddr,
        server_addr: std::net::SocketAddr,
    ) {
        tracing::info!("Connection accepted.");

        if self.config.server.client_count_max != -1
            && client_counter.load(std::sync::atomic::Ordering::SeqCst)
                >= self.config.server.client_count_max
        {
            tracing::warn!(
                max = self.config.server.client_count_max,
                "Connection count max reached, rejecting connection.",
            );

            let mut refusal = serde_json::to_vec(&Reply::Bad).unwrap_or_default();
            refusal.push(b'\n');
            if let Err(error) = tokio::io::AsyncWriteExt::write_all(&mut stream, &refusal).await {
                tracing::error!(%error, "Refusal delivery failure.");
            }

            if let Err(error) = tokio::io::AsyncWriteExt::shutdown(&mut stream).await {
                tracing::error!(%error, "Closing connection failure.");
            }
            return;
        }

        client_counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);

        let session = Self::run_session(
            stream,
            ReceiveDeliveryConnection::new(self.ctx.clone(), self.server_urls.clone()),
            self.config.server.delivery.line_length_max,
        );
        let client_counter_copy = client_counter.clone();
        tokio::spawn(async move {
            if let Err(error) = session.await {
                tracing::error!(%error, "Run session failure.");
            }

            client_counter_copy.fetch_sub(1, std::sync::atomic::Ordering::SeqCst);
        });
    }

    /// Main loop of `rdrop`'s server
    ///
    /// # Errors
    ///
    /// * failed to convert sockets to `[tokio::net::TcpListener]`
    #[tracing::instrument(name = "serve", skip_all)]
    pub async fn listen_and_serve(self, sockets: Vec<std::net::TcpListener>) -> anyhow::Result<()> {
        let client_counter = std::sync::Arc::new(std::sync::atomic::AtomicI64::new(0));

        let listeners = sockets
            .into_iter()
            .map(tokio::net::TcpListener::from_std)
            .collect::<std::io::Result<Vec<tokio::net::TcpListener>>>()?;

        let mut map = tokio_stream::StreamMap::new();
        for listener in &listeners {
            map.insert(listener.local_addr()?, Box::pin(listener_to_stream(listener)));
        }

        tracing::info!(
            interfaces = ?map.keys().collect::<Vec<_>>(),
            "Listening for peers.",
        );

        while let Some((server_addr, client)) = tokio_stream::StreamExt::next(&mut map).await {
            let (stream, client_addr) = client?;

            self.handle_client(client_counter.clone(), stream, client_addr, server_addr)
                .await;
        }
        Ok(())
    }

    /// Serve one peer connection until it closes.
    ///
    /// # Errors
    ///
    /// * the peer broke the protocol, see [`rdrop_protocol::Error`]
    pub async fn run_session(
        stream: tokio::net::TcpStream,
        connection: ReceiveDeliveryConnection,
        line_length_max: usize,
    ) -> anyhow::Result<()> {
        let deliveries = Receiver::new(stream, connection, line_length_max).into_stream();
        tokio::pin!(deliveries);

        let mut count = 0_usize;
        let connection_result = loop {
            match tokio_stream::StreamExt::next(&mut deliveries).await {
                Some(Ok(())) => count += 1,
                Some(Err(error)) => break Err(error),
                None => break Ok(()),
            }
        };

        match &connection_result {
            Ok(()) => {
                tracing::info!(deliveries = count, "Connection closed cleanly.");
            }
            Err(error) => {
                tracing::warn!(deliveries = count, %error, "Connection closing failure.");
            }
        }
        connection_result.map_err(anyhow::Error::new)
    }
}
