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
    keys::Peer,
    mock::{MemoryTable, MockAuth, MockStore, MockTransport},
};
use rdrop_common::PublicKey;
use rdrop_delivery::{DeliveryError, DeliveryKind, ServerUrlCache, Transport};
use rdrop_protocol::{ReceiverHandler, Reply};
use rdrop_server::{MailsenderLocalApi, ReceiveDeliveryConnection, ServerContext};

/// A server built on the in-memory collaborators.
pub struct TestServer {
    /// Keys and self-ident.
    pub peer: Peer,
    ///
    pub auth: std::sync::Arc<MockAuth>,
    ///
    pub store: std::sync::Arc<MockStore>,
    /// Backing table of [`Self::server_urls`].
    pub table: std::sync::Arc<MemoryTable>,
    /// Records every outbound delivery, and simulates the unreachable servers.
    pub transport: std::sync::Arc<MockTransport>,
    ///
    pub server_urls: std::sync::Arc<ServerUrlCache>,
    ///
    pub ctx: std::sync::Arc<ServerContext>,
}

impl std::fmt::Debug for TestServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestServer")
            .field("key", &self.key())
            .finish_non_exhaustive()
    }
}

impl TestServer {
    /// A server whose outbound deliveries go nowhere, see [`MockTransport`].
    #[must_use]
    pub fn new(url: &str) -> Self {
        Self::with_transport(Peer::new(url), |_, recorder| {
            recorder as std::sync::Arc<dyn Transport>
        })
    }

    fn with_transport(
        peer: Peer,
        transport: impl FnOnce(
            PublicKey,
            std::sync::Arc<MockTransport>,
        ) -> std::sync::Arc<dyn Transport>,
    ) -> Self {
        let auth = std::sync::Arc::new(MockAuth::default());
        let store = std::sync::Arc::new(MockStore::default());
        let table = std::sync::Arc::new(MemoryTable::default());
        let recorder = std::sync::Arc::new(MockTransport::default());
        let server_urls = std::sync::Arc::new(ServerUrlCache::new(table.clone()));

        let ctx = std::sync::Arc::new(ServerContext {
            keyring: std::sync::Arc::new(peer.keyring()),
            auth: auth.clone(),
            store: store.clone(),
            sender: std::sync::Arc::new(MailsenderLocalApi::new(
                server_urls.clone(),
                transport(peer.boxing_public_key(), recorder.clone()),
            )),
        });

        Self {
            peer,
            auth,
            store,
            table,
            transport: recorder,
            server_urls,
            ctx,
        }
    }

    ///
    #[must_use]
    pub fn key(&self) -> PublicKey {
        self.peer.boxing_public_key()
    }

    /// Cache the url of `other`, trust-on-first-use.
    pub async fn learn(&self, other: &Peer) {
        self.server_urls
            .set_server_url_using_self_ident(&other.self_ident)
            .await
            .unwrap();
    }

    /// The receiving end of a new connection to this server.
    #[must_use]
    pub fn connection(&self) -> ReceiveDeliveryConnection {
        ReceiveDeliveryConnection::new(self.ctx.clone(), self.server_urls.clone())
    }
}

#[derive(Clone)]
struct Node {
    key: PublicKey,
    ctx: std::sync::Arc<ServerContext>,
    server_urls: std::sync::Arc<ServerUrlCache>,
}

type Nodes = std::sync::Arc<std::sync::RwLock<std::collections::HashMap<url::Url, Node>>>;

/// Servers reaching each other by url, in the same process.
///
/// Each delivery opens a [`ReceiveDeliveryConnection`] on the recipient,
/// says `hello` with the sender's key, then hands over the envelope.
#[derive(Default)]
pub struct Federation {
    nodes: Nodes,
}

impl std::fmt::Debug for Federation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Federation").finish_non_exhaustive()
    }
}

impl Federation {
    /// A new server of the federation, reachable at `url`.
    #[must_use]
    pub fn server(&self, url: &str) -> TestServer {
        let nodes = self.nodes.clone();
        let server = TestServer::with_transport(Peer::new(url), |own_key, recorder| {
            std::sync::Arc::new(Loopback {
                own_key,
                recorder,
                nodes,
            }) as std::sync::Arc<dyn Transport>
        });

        self.nodes.write().unwrap().insert(
            url.parse().unwrap(),
            Node {
                key: server.key(),
                ctx: server.ctx.clone(),
                server_urls: server.server_urls.clone(),
            },
        );
        server
    }
}

struct Loopback {
    own_key: PublicKey,
    recorder: std::sync::Arc<MockTransport>,
    nodes: Nodes,
}

#[async_trait::async_trait]
impl Transport for Loopback {
    async fn deliver(
        &self,
        url: &url::Url,
        server_key: &PublicKey,
        kind: DeliveryKind,
        envelope: serde_json::Value,
    ) -> Result<(), DeliveryError> {
        self.recorder
            .deliver(url, server_key, kind, envelope.clone())
            .await?;

        let node = self.nodes.read().unwrap().get(url).cloned();
        let node = node.ok_or_else(|| DeliveryError::InvalidUrl {
            url: url.clone(),
            reason: "no server at this url",
        })?;
        if node.key != *server_key {
            return Err(DeliveryError::HelloDenied);
        }

        let mut connection = ReceiveDeliveryConnection::new(node.ctx, node.server_urls);
        if !connection.on_hello(self.own_key, None).await {
            return Err(DeliveryError::HelloDenied);
        }

        let reply = match kind {
            DeliveryKind::Transit => connection.on_deliver_transit(envelope).await,
            DeliveryKind::Server => connection.on_deliver_server(envelope).await,
        };
        match reply {
            Reply::Ack => Ok(()),
            Reply::Bad => Err(DeliveryError::Rejected),
        }
    }
}
