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
//! Outbound side of the maildrop.
//!
//! An envelope addressed to our own boxing key never leaves the process: it is
//! processed right away as if a peer had delivered it. Anything else is sent
//! to the url cached for the recipient server.

use crate::{person_enqueue_process_now, server_enqueue_process_now, ServerContext};
use rdrop_common::{OuterTransitEnvelope, PublicKey, ServerEnvelope, TaskError};
use rdrop_delivery::{CacheError, DeliveryKind, ServerUrlCache, Transport};

/// How an envelope left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum DeliveryOutcome {
    /// Addressed to us, processed in place.
    Local,
    /// Accepted by the recipient server.
    Delivered,
    /// The remote delivery failed, the failure is logged.
    Failed,
}

/// Send envelopes to other servers, or to ourselves.
#[async_trait::async_trait]
pub trait SenderApi: Send + Sync {
    /// Send a transit envelope on behalf of one of our users.
    ///
    /// # Errors
    ///
    /// * the recipient server is unknown, [`TaskError::UnknownServer`]
    /// * the envelope is for us and its processing failed
    async fn send_person_envelope_to_server(
        &self,
        ctx: &ServerContext,
        user_root_key: &PublicKey,
        envelope: OuterTransitEnvelope,
        server_key: &PublicKey,
    ) -> Result<DeliveryOutcome, TaskError>;

    /// Send a server envelope.
    ///
    /// # Errors
    ///
    /// * the recipient server is unknown, [`TaskError::UnknownServer`]
    /// * the envelope is for us and its processing failed
    async fn send_server_envelope_to_server(
        &self,
        ctx: &ServerContext,
        envelope: ServerEnvelope,
        server_key: &PublicKey,
    ) -> Result<DeliveryOutcome, TaskError>;
}

/// [`SenderApi`] with the local bypass, the [`ServerUrlCache`] and a [`Transport`].
///
/// A remote delivery is tried once, its failure is logged and never returned.
pub struct MailsenderLocalApi {
    server_urls: std::sync::Arc<ServerUrlCache>,
    transport: std::sync::Arc<dyn Transport>,
}

impl MailsenderLocalApi {
    ///
    #[must_use]
    pub fn new(
        server_urls: std::sync::Arc<ServerUrlCache>,
        transport: std::sync::Arc<dyn Transport>,
    ) -> Self {
        Self {
            server_urls,
            transport,
        }
    }

    async fn resolve(&self, server_key: &PublicKey) -> Result<url::Url, TaskError> {
        self.server_urls
            .get_server_url(server_key)
            .await
            .map_err(|error| match error {
                CacheError::UnknownServer(key) => TaskError::UnknownServer(key),
                otherwise => TaskError::Storage(otherwise.into()),
            })
    }

    async fn deliver(
        &self,
        server_key: &PublicKey,
        kind: DeliveryKind,
        envelope: serde_json::Value,
    ) -> Result<(), TaskError> {
        let url = self.resolve(server_key).await?;
        self.transport
            .deliver(&url, server_key, kind, envelope)
            .await
            .map_err(|error| TaskError::Delivery {
                server: *server_key,
                reason: error.to_string(),
            })
    }
}

fn to_value<T: serde::Serialize>(envelope: &T) -> Result<serde_json::Value, TaskError> {
    serde_json::to_value(envelope).map_err(|e| TaskError::MalformedPayload(e.to_string()))
}

#[async_trait::async_trait]
impl SenderApi for MailsenderLocalApi {
    #[tracing::instrument(name = "send-person", skip_all, fields(user = %user_root_key, server = %server_key))]
    async fn send_person_envelope_to_server(
        &self,
        ctx: &ServerContext,
        user_root_key: &PublicKey,
        envelope: OuterTransitEnvelope,
        server_key: &PublicKey,
    ) -> Result<DeliveryOutcome, TaskError> {
        let own_key = ctx.own_key();
        if *server_key == own_key {
            tracing::debug!("Local bypass.");
            person_enqueue_process_now(ctx, envelope, own_key).await?;
            return Ok(DeliveryOutcome::Local);
        }

        match self
            .deliver(server_key, DeliveryKind::Transit, to_value(&envelope)?)
            .await
        {
            Ok(()) => Ok(DeliveryOutcome::Delivered),
            Err(TaskError::Delivery { reason, .. }) => {
                tracing::error!(event = "deliveryFailure", %reason, "Delivery failure.");
                Ok(DeliveryOutcome::Failed)
            }
            Err(otherwise) => Err(otherwise),
        }
    }

    #[tracing::instrument(name = "send-server", skip_all, fields(server = %server_key))]
    async fn send_server_envelope_to_server(
        &self,
        ctx: &ServerContext,
        envelope: ServerEnvelope,
        server_key: &PublicKey,
    ) -> Result<DeliveryOutcome, TaskError> {
        let own_key = ctx.own_key();
        if *server_key == own_key {
            tracing::debug!("Local bypass.");
            server_enqueue_process_now(ctx, envelope, own_key).await?;
            return Ok(DeliveryOutcome::Local);
        }

        match self
            .deliver(server_key, DeliveryKind::Server, to_value(&envelope)?)
            .await
        {
            Ok(()) => Ok(DeliveryOutcome::Delivered),
            Err(TaskError::Delivery { reason, .. }) => {
                tracing::error!(event = "serverDeliveryFailure", %reason, "Delivery failure.");
                Ok(DeliveryOutcome::Failed)
            }
            Err(otherwise) => Err(otherwise),
        }
    }
}
