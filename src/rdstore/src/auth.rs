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
use rdrop_common::{AuthApi, AuthError, KeyValueTable, PublicKey, Row};

/// Tables holding the authorization decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::AsRefStr, strum::EnumIter)]
pub enum AuthTable {
    /// Row: server key. Cell `s:allowed`.
    #[strum(serialize = "auth:servers")]
    Servers,
    /// Row: local user. Cells `c:{server key}:{sender key}`.
    #[strum(serialize = "auth:userContacts")]
    UserContacts,
    /// Row: local user. Cells `v:{conversation server key}`.
    #[strum(serialize = "auth:userConvServers")]
    UserConvServers,
    /// Row: conversation id. Cells `p:{server key}:{sender key}`.
    #[strum(serialize = "auth:convParticipants")]
    ConvParticipants,
    /// Row: tell key. Cell `u:rootKey`.
    #[strum(serialize = "auth:tellKeys")]
    TellKeys,
}

const CELL_ALLOWED: &str = "s:allowed";
const CELL_ROOT_KEY: &str = "u:rootKey";

fn contact_cell(server_key: &PublicKey, sender_key: &PublicKey) -> String {
    format!("c:{server_key}:{sender_key}")
}

fn conv_server_cell(conversation_server_key: &PublicKey) -> String {
    format!("v:{conversation_server_key}")
}

fn participant_cell(server_key: &PublicKey, sender_key: &PublicKey) -> String {
    format!("p:{server_key}:{sender_key}")
}

fn single(cell: String, value: impl Into<String>) -> Row {
    Row::from([(cell, value.into())])
}

/// [`AuthApi`] answering from a [`KeyValueTable`], see [`AuthTable`] for the layout.
///
/// Everything not explicitly allowed is denied.
pub struct TableAuthDb {
    table: std::sync::Arc<dyn KeyValueTable>,
}

impl std::fmt::Debug for TableAuthDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableAuthDb").finish_non_exhaustive()
    }
}

impl TableAuthDb {
    ///
    #[must_use]
    pub fn new(table: std::sync::Arc<dyn KeyValueTable>) -> Self {
        Self { table }
    }

    async fn has_cell(&self, table: AuthTable, row: &str, cell: &str) -> Result<bool, AuthError> {
        self.table
            .get_row_cell(table.as_ref(), row, cell)
            .await
            .map(|value| value.is_some())
            .map_err(AuthError::Backend)
    }

    async fn put(&self, table: AuthTable, row: &str, cells: Row) -> anyhow::Result<()> {
        self.table.put_cells(table.as_ref(), row, cells).await
    }

    /// Accept connections from the server `server_key`.
    ///
    /// # Errors
    ///
    /// * the table cannot be written
    pub async fn allow_server(&self, server_key: &PublicKey) -> anyhow::Result<()> {
        self.put(
            AuthTable::Servers,
            &server_key.to_string(),
            single(CELL_ALLOWED.to_string(), "true"),
        )
        .await
    }

    /// Let `sender_key`, relayed by `server_key`, message `user`.
    ///
    /// # Errors
    ///
    /// * the table cannot be written
    pub async fn allow_user_contact(
        &self,
        user: &str,
        server_key: &PublicKey,
        sender_key: &PublicKey,
    ) -> anyhow::Result<()> {
        self.put(
            AuthTable::UserContacts,
            user,
            single(contact_cell(server_key, sender_key), "true"),
        )
        .await
    }

    /// Record `sender_key` behind `server_key` as a participant of `conv_id`.
    ///
    /// # Errors
    ///
    /// * the table cannot be written
    pub async fn authorize_conversation_participant(
        &self,
        conv_id: &str,
        server_key: &PublicKey,
        sender_key: &PublicKey,
    ) -> anyhow::Result<()> {
        self.put(
            AuthTable::ConvParticipants,
            conv_id,
            single(participant_cell(server_key, sender_key), "true"),
        )
        .await
    }

    /// Bind a tell key to the root key of a local account.
    ///
    /// # Errors
    ///
    /// * the table cannot be written
    pub async fn register_user(
        &self,
        tell_key: &PublicKey,
        root_key: &PublicKey,
    ) -> anyhow::Result<()> {
        self.put(
            AuthTable::TellKeys,
            &tell_key.to_string(),
            single(CELL_ROOT_KEY.to_string(), root_key.to_string()),
        )
        .await
    }
}

#[async_trait::async_trait]
impl AuthApi for TableAuthDb {
    async fn user_check_server_user(
        &self,
        user: &str,
        server_key: &PublicKey,
        sender_key: &PublicKey,
    ) -> Result<(), AuthError> {
        if self
            .has_cell(AuthTable::UserContacts, user, &contact_cell(server_key, sender_key))
            .await?
        {
            Ok(())
        } else {
            Err(AuthError::Denied(format!(
                "'{sender_key}' from '{server_key}' is not a contact of '{user}'"
            )))
        }
    }

    async fn user_check_server_conversation(
        &self,
        user: &str,
        server_key: &PublicKey,
        conv_id: &str,
    ) -> Result<(), AuthError> {
        if self
            .has_cell(AuthTable::UserConvServers, user, &conv_server_cell(server_key))
            .await?
        {
            Ok(())
        } else {
            Err(AuthError::Denied(format!(
                "'{server_key}' cannot deliver conversation '{conv_id}' to '{user}'"
            )))
        }
    }

    #[tracing::instrument(name = "authorize-conversation-server", skip_all, fields(user = %user, server = %conversation_server_key))]
    async fn user_authorize_server_for_conversation(
        &self,
        user: &str,
        server_key: &PublicKey,
        conversation_server_key: &PublicKey,
        sender_key: &PublicKey,
    ) -> Result<(), AuthError> {
        tracing::debug!(relay = %server_key, "Conversation server allowed.");
        self.put(
            AuthTable::UserConvServers,
            user,
            single(conv_server_cell(conversation_server_key), sender_key.to_string()),
        )
        .await
        .map_err(AuthError::Backend)
    }

    async fn conv_check_server_conversation(
        &self,
        conv_id: &str,
        server_key: &PublicKey,
        sender_key: &PublicKey,
    ) -> Result<(), AuthError> {
        if self
            .has_cell(
                AuthTable::ConvParticipants,
                conv_id,
                &participant_cell(server_key, sender_key),
            )
            .await?
        {
            Ok(())
        } else {
            Err(AuthError::Denied(format!(
                "'{sender_key}' from '{server_key}' is not a participant of '{conv_id}'"
            )))
        }
    }

    async fn server_check_user_account_by_tell_key(
        &self,
        tell_key: &PublicKey,
    ) -> Result<PublicKey, AuthError> {
        let root_key = self
            .table
            .get_row_cell(AuthTable::TellKeys.as_ref(), &tell_key.to_string(), CELL_ROOT_KEY)
            .await
            .map_err(AuthError::Backend)?
            .ok_or_else(|| AuthError::Denied(format!("no account for tell key '{tell_key}'")))?;

        root_key.parse::<PublicKey>().map_err(|e| {
            AuthError::Backend(anyhow::anyhow!(
                "corrupted root key for tell key '{tell_key}': {e}"
            ))
        })
    }

    async fn server_check_server_auth(&self, client_key: &PublicKey) -> Result<(), AuthError> {
        if self
            .has_cell(AuthTable::Servers, &client_key.to_string(), CELL_ALLOWED)
            .await?
        {
            Ok(())
        } else {
            Err(AuthError::Denied(format!("unknown server '{client_key}'")))
        }
    }
}
