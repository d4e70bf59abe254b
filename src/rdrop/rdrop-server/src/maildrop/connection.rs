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
use crate::{person_enqueue_process_now, server_enqueue_process_now, ServerContext};
use rdrop_common::{parse_server_envelope, PublicKey, SelfIdent, TaskError};
use rdrop_delivery::ServerUrlCache;
use rdrop_protocol::Reply;

/// The receiving end of a peer connection.
///
/// Once the peer passed the `hello`, every delivery is processed right away
/// and answered with `ack` or `bad`. A bad delivery never closes the connection.
pub struct ReceiveDeliveryConnection {
    ctx: std::sync::Arc<ServerContext>,
    server_urls: std::sync::Arc<ServerUrlCache>,
    peer: Option<PublicKey>,
}

impl ReceiveDeliveryConnection {
    ///
    #[must_use]
    pub const fn new(
        ctx: std::sync::Arc<ServerContext>,
        server_urls: std::sync::Arc<ServerUrlCache>,
    ) -> Self {
        Self {
            ctx,
            server_urls,
            peer: None,
        }
    }

    /// The authenticated peer, if the `hello` succeeded.
    #[must_use]
    pub const fn peer(&self) -> Option<PublicKey> {
        self.peer
    }

    fn reply(result: Result<(), TaskError>, kind: &'static str) -> Reply {
        match result {
            Ok(()) => Reply::Ack,
            Err(error) => {
                tracing::warn!(event = "badMessage", kind, %error, "Delivery refused.");
                Reply::Bad
            }
        }
    }
}

#[async_trait::async_trait]
impl rdrop_protocol::ReceiverHandler for ReceiveDeliveryConnection {
    #[tracing::instrument(name = "hello", skip_all, fields(server = %server_key))]
    async fn on_hello(&mut self, server_key: PublicKey, self_ident: Option<SelfIdent>) -> bool {
        if let Err(error) = self.ctx.auth.server_check_server_auth(&server_key).await {
            tracing::warn!(%error, "Server refused.");
            return false;
        }

        if let Some(self_ident) = self_ident {
            if let Err(error) = self
                .server_urls
                .update_server_url_from_server(&server_key, &self_ident)
                .await
            {
                tracing::warn!(%error, "Announced self-ident ignored.");
            }
        }

        tracing::info!("Server accepted.");
        self.peer = Some(server_key);
        true
    }

    async fn on_deliver_transit(&mut self, msg: serde_json::Value) -> Reply {
        let Some(peer) = self.peer else {
            return Reply::Bad;
        };

        let result = match serde_json::from_value(msg) {
            Ok(outer) => person_enqueue_process_now(&self.ctx, outer, peer).await,
            Err(error) => Err(TaskError::MalformedPayload(error.to_string())),
        };
        Self::reply(result, "deliverTransit")
    }

    async fn on_deliver_server(&mut self, msg: serde_json::Value) -> Reply {
        let Some(peer) = self.peer else {
            return Reply::Bad;
        };

        let result = match parse_server_envelope(msg) {
            Ok(envelope) => server_enqueue_process_now(&self.ctx, envelope, peer).await,
            Err(error) => Err(error),
        };
        Self::reply(result, "deliverServer")
    }
}
