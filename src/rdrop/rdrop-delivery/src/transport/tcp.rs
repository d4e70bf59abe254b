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
use super::{DeliveryError, Transport};
use rdrop_common::{PublicKey, SelfIdent};
use rdrop_config::Config;
use rdrop_protocol::{Client, DeliveryKind, Reply, Request};

/// One connection per delivery, over plain TCP.
///
/// Each connection starts with a `hello` announcing our boxing key and, if
/// set, our self-ident so the peer can refresh its url cache.
pub struct TcpTransport {
    own_key: PublicKey,
    self_ident: Option<SelfIdent>,
    connect_timeout: std::time::Duration,
    reply_timeout: std::time::Duration,
    line_length_max: usize,
}

impl TcpTransport {
    /// Create a transport using the `server.delivery` parameters.
    #[must_use]
    pub fn new(config: &Config, own_key: PublicKey, self_ident: Option<SelfIdent>) -> Self {
        Self {
            own_key,
            self_ident,
            connect_timeout: config.server.delivery.connect_timeout,
            reply_timeout: config.server.delivery.reply_timeout,
            line_length_max: config.server.delivery.line_length_max,
        }
    }

    async fn connect(&self, url: &url::Url) -> Result<tokio::net::TcpStream, DeliveryError> {
        let invalid = |reason| DeliveryError::InvalidUrl {
            url: url.clone(),
            reason,
        };
        let host = url.host_str().ok_or_else(|| invalid("missing host"))?;
        let port = url.port().ok_or_else(|| invalid("missing port"))?;

        tokio::time::timeout(
            self.connect_timeout,
            tokio::net::TcpStream::connect((host, port)),
        )
        .await
        .map_err(|_elapsed| DeliveryError::ConnectTimeout(url.clone()))?
        .map_err(|error| DeliveryError::Connect {
            url: url.clone(),
            error,
        })
    }
}

#[async_trait::async_trait]
impl Transport for TcpTransport {
    #[tracing::instrument(name = "tcp", skip_all, fields(server = %server_key, %url, %kind))]
    async fn deliver(
        &self,
        url: &url::Url,
        server_key: &PublicKey,
        kind: DeliveryKind,
        envelope: serde_json::Value,
    ) -> Result<(), DeliveryError> {
        let mut client = Client::new(
            self.connect(url).await?,
            self.line_length_max,
            self.reply_timeout,
        );

        let hello = Request::Hello {
            server_key: self.own_key,
            self_ident: self.self_ident.clone(),
        };
        if client.send(&hello).await? == Reply::Bad {
            return Err(DeliveryError::HelloDenied);
        }

        match client.send(&kind.into_request(envelope)).await? {
            Reply::Ack => {
                tracing::debug!("Envelope delivered.");
                Ok(())
            }
            Reply::Bad => Err(DeliveryError::Rejected),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::TcpTransport;
    use crate::{DeliveryError, DeliveryKind, Transport};
    use rdrop_common::{PublicKey, SelfIdent};
    use rdrop_protocol::{Receiver, ReceiverHandler, Reply};

    struct Peer {
        allowed: PublicKey,
        received: tokio::sync::mpsc::UnboundedSender<serde_json::Value>,
    }

    #[async_trait::async_trait]
    impl ReceiverHandler for Peer {
        async fn on_hello(&mut self, server_key: PublicKey, _: Option<SelfIdent>) -> bool {
            server_key == self.allowed
        }

        async fn on_deliver_transit(&mut self, msg: serde_json::Value) -> Reply {
            self.received.send(msg).unwrap();
            Reply::Ack
        }

        async fn on_deliver_server(&mut self, _: serde_json::Value) -> Reply {
            Reply::Bad
        }
    }

    async fn listen(
        allowed: PublicKey,
    ) -> (
        url::Url,
        tokio::sync::mpsc::UnboundedReceiver<serde_json::Value>,
    ) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("rdrop://{}", listener.local_addr().unwrap())
            .parse()
            .unwrap();
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();

        tokio::spawn(async move {
            use tokio_stream::StreamExt;
            let (stream, _) = listener.accept().await.unwrap();
            let receiver = Receiver::new(
                stream,
                Peer {
                    allowed,
                    received: tx,
                },
                1024,
            );
            let stream = receiver.into_stream();
            tokio::pin!(stream);
            while let Some(Ok(())) = stream.next().await {}
        });

        (url, rx)
    }

    fn transport(own_key: PublicKey) -> TcpTransport {
        TcpTransport::new(&rdrop_test::config::local_test(), own_key, None)
    }

    #[test_log::test(tokio::test)]
    async fn delivered() {
        let (url, mut received) = listen(PublicKey([1; 32])).await;

        transport(PublicKey([1; 32]))
            .deliver(
                &url,
                &PublicKey([2; 32]),
                DeliveryKind::Transit,
                serde_json::json!({ "nonce": "n" }),
            )
            .await
            .unwrap();

        assert_eq!(
            received.recv().await.unwrap(),
            serde_json::json!({ "nonce": "n" })
        );
    }

    #[test_log::test(tokio::test)]
    async fn rejected() {
        let (url, _received) = listen(PublicKey([1; 32])).await;

        let error = transport(PublicKey([1; 32]))
            .deliver(
                &url,
                &PublicKey([2; 32]),
                DeliveryKind::Server,
                serde_json::json!({}),
            )
            .await
            .unwrap_err();
        assert!(matches!(error, DeliveryError::Rejected));
    }

    #[test_log::test(tokio::test)]
    async fn hello_denied() {
        let (url, _received) = listen(PublicKey([1; 32])).await;

        let error = transport(PublicKey([3; 32]))
            .deliver(
                &url,
                &PublicKey([2; 32]),
                DeliveryKind::Transit,
                serde_json::json!({}),
            )
            .await
            .unwrap_err();
        assert!(matches!(error, DeliveryError::HelloDenied));
    }

    #[test_log::test(tokio::test)]
    async fn unreachable() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let url = format!("rdrop://127.0.0.1:{port}").parse().unwrap();

        let error = transport(PublicKey([1; 32]))
            .deliver(
                &url,
                &PublicKey([2; 32]),
                DeliveryKind::Transit,
                serde_json::json!({}),
            )
            .await
            .unwrap_err();
        assert!(matches!(error, DeliveryError::Connect { .. }));
    }

    #[tokio::test]
    async fn no_port() {
        let error = transport(PublicKey([1; 32]))
            .deliver(
                &"rdrop://127.0.0.1".parse().unwrap(),
                &PublicKey([2; 32]),
                DeliveryKind::Transit,
                serde_json::json!({}),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            error,
            DeliveryError::InvalidUrl {
                reason: "missing port",
                ..
            }
        ));
    }
}
