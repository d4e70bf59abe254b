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
use crate::{Nonce, PublicKey};

/// Outcome of a refused authorization check.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The check ran and refused.
    #[error("denied: {0}")]
    Denied(String),
    /// The check could not run.
    #[error("authorization backend failure: {0:#}")]
    Backend(anyhow::Error),
}

/// Authorization checks consulted by the delivery tasks.
#[async_trait::async_trait]
pub trait AuthApi: Send + Sync {
    /// May `sender_key`, relayed by `server_key`, message the local user `user`?
    async fn user_check_server_user(
        &self,
        user: &str,
        server_key: &PublicKey,
        sender_key: &PublicKey,
    ) -> Result<(), AuthError>;

    /// May the fan-out server `server_key` deliver traffic of `conv_id` to `user`?
    async fn user_check_server_conversation(
        &self,
        user: &str,
        server_key: &PublicKey,
        conv_id: &str,
    ) -> Result<(), AuthError>;

    /// Allow the conversation server to deliver conversation traffic to `user`.
    async fn user_authorize_server_for_conversation(
        &self,
        user: &str,
        server_key: &PublicKey,
        conversation_server_key: &PublicKey,
        sender_key: &PublicKey,
    ) -> Result<(), AuthError>;

    /// Is `sender_key` behind `server_key` a participant of `conv_id`?
    async fn conv_check_server_conversation(
        &self,
        conv_id: &str,
        server_key: &PublicKey,
        sender_key: &PublicKey,
    ) -> Result<(), AuthError>;

    /// Resolve a tell key to the root key of a local account.
    async fn server_check_user_account_by_tell_key(
        &self,
        tell_key: &PublicKey,
    ) -> Result<PublicKey, AuthError>;

    /// May the server `client_key` connect to us at all?
    async fn server_check_server_auth(&self, client_key: &PublicKey) -> Result<(), AuthError>;
}

/// A member of a conversation, and the server holding its maildrop.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    /// Name of the user.
    pub name: String,
    /// Boxing key of the user's maildrop server.
    pub server_key: PublicKey,
}

/// Durable storage behind the maildrop and the fan-out role.
#[async_trait::async_trait]
pub trait StoreApi: Send + Sync {
    /// Enqueue a message for local delivery to `user`.
    async fn message_for_user(
        &self,
        user: &str,
        payload: &str,
        nonce: &Nonce,
        sender_key: &PublicKey,
    ) -> anyhow::Result<()>;

    /// Record a message of the conversation `conv_id`.
    async fn conversation_add_message(
        &self,
        conv_id: &str,
        sender_key: &PublicKey,
        nonce: &Nonce,
        payload: &str,
    ) -> anyhow::Result<()>;

    /// Add a member to the conversation `conv_id`; adding an existing member is a no-op.
    async fn conversation_add_participant(
        &self,
        conv_id: &str,
        participant: Participant,
    ) -> anyhow::Result<()>;

    /// Current members of the conversation `conv_id`.
    async fn conversation_participants(&self, conv_id: &str) -> anyhow::Result<Vec<Participant>>;
}

/// Cells of a row, by cell name.
pub type Row = std::collections::BTreeMap<String, String>;

/// Row oriented key-value tables, last write wins per cell.
#[async_trait::async_trait]
pub trait KeyValueTable: Send + Sync {
    /// All the cells of a row, `None` if the row was never written.
    async fn get_row(&self, table: &str, row: &str) -> anyhow::Result<Option<Row>>;

    /// Write `cells` in the row, leaving the other cells untouched.
    async fn put_cells(&self, table: &str, row: &str, cells: Row) -> anyhow::Result<()>;

    /// A single cell of a row.
    async fn get_row_cell(
        &self,
        table: &str,
        row: &str,
        cell: &str,
    ) -> anyhow::Result<Option<String>> {
        Ok(self
            .get_row(table, row)
            .await?
            .and_then(|mut cells| cells.remove(cell)))
    }
}
