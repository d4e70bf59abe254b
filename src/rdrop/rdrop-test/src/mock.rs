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
use rdrop_common::{
    AuthApi, AuthError, KeyValueTable, Nonce, Participant, PublicKey, Row, StoreApi,
};
use rdrop_delivery::{DeliveryError, DeliveryKind, Transport};

/// [`AuthApi`] allowing everything, unless told otherwise.
///
/// Each call is recorded by method name.
#[derive(Debug, Default)]
pub struct MockAuth {
    denied: std::sync::Mutex<std::collections::HashSet<&'static str>>,
    calls: std::sync::Mutex<Vec<&'static str>>,
    root_keys: std::sync::Mutex<std::collections::HashMap<PublicKey, PublicKey>>,
    conversation_servers: std::sync::Mutex<Vec<(String, PublicKey)>>,
}

impl MockAuth {
    /// Make the check `method` refuse from now on.
    pub fn deny(&self, method: &'static str) {
        self.denied.lock().unwrap().insert(method);
    }

    /// Names of the methods called, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    /// Bind a tell key to a root key.
    ///
    /// An unbound tell key is its own root key.
    pub fn register_user(&self, tell_key: PublicKey, root_key: PublicKey) {
        self.root_keys.lock().unwrap().insert(tell_key, root_key);
    }

    /// `(user, conversation server)` allowed by
    /// [`AuthApi::user_authorize_server_for_conversation`].
    #[must_use]
    pub fn conversation_servers(&self) -> Vec<(String, PublicKey)> {
        self.conversation_servers.lock().unwrap().clone()
    }

    fn check(&self, method: &'static str) -> Result<(), AuthError> {
        self.calls.lock().unwrap().push(method);
        if self.denied.lock().unwrap().contains(method) {
            Err(AuthError::Denied(format!("{method} denied")))
        } else {
            Ok(())
        }
    }
}

#[async_trait::async_trait]
impl AuthApi for MockAuth {
    async fn user_check_server_user(
        &self,
        _: &str,
        _: &PublicKey,
        _: &PublicKey,
    ) -> Result<(), AuthError> {
        self.check("user_check_server_user")
    }

    async fn user_check_server_conversation(
        &self,
        _: &str,
        _: &PublicKey,
        _: &str,
    ) -> Result<(), AuthError> {
        self.check("user_check_server_conversation")
    }

    async fn user_authorize_server_for_conversation(
        &self,
        user: &str,
        _: &PublicKey,
        conversation_server_key: &PublicKey,
        _: &PublicKey,
    ) -> Result<(), AuthError> {
        self.check("user_authorize_server_for_conversation")?;
        self.conversation_servers
            .lock()
            .unwrap()
            .push((user.to_string(), *conversation_server_key));
        Ok(())
    }

    async fn conv_check_server_conversation(
        &self,
        _: &str,
        _: &PublicKey,
        _: &PublicKey,
    ) -> Result<(), AuthError> {
        self.check("conv_check_server_conversation")
    }

    async fn server_check_user_account_by_tell_key(
        &self,
        tell_key: &PublicKey,
    ) -> Result<PublicKey, AuthError> {
        self.check("server_check_user_account_by_tell_key")?;
        Ok(self
            .root_keys
            .lock()
            .unwrap()
            .get(tell_key)
            .copied()
            .unwrap_or(*tell_key))
    }

    async fn server_check_server_auth(&self, _: &PublicKey) -> Result<(), AuthError> {
        self.check("server_check_server_auth")
    }
}

/// A message handed to [`StoreApi::message_for_user`] or
/// [`StoreApi::conversation_add_message`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMessage {
    /// User or conversation id.
    pub to: String,
    /// Opaque content.
    pub payload: String,
    ///
    pub nonce: Nonce,
    ///
    pub sender_key: PublicKey,
}

/// [`StoreApi`] in memory.
#[derive(Debug, Default)]
pub struct MockStore {
    failing: std::sync::atomic::AtomicBool,
    user_messages: std::sync::Mutex<Vec<StoredMessage>>,
    conversation_messages: std::sync::Mutex<Vec<StoredMessage>>,
    participants: std::sync::Mutex<std::collections::HashMap<String, Vec<Participant>>>,
}

impl MockStore {
    /// Make every operation fail from now on.
    pub fn fail(&self) {
        self.failing.store(true, std::sync::atomic::Ordering::SeqCst);
    }

    /// Messages delivered to local users, in order.
    #[must_use]
    pub fn user_messages(&self) -> Vec<StoredMessage> {
        self.user_messages.lock().unwrap().clone()
    }

    /// Messages recorded in conversations, in order.
    #[must_use]
    pub fn conversation_messages(&self) -> Vec<StoredMessage> {
        self.conversation_messages.lock().unwrap().clone()
    }

    /// Members of `conv_id`, without going through [`StoreApi`].
    #[must_use]
    pub fn participants(&self, conv_id: &str) -> Vec<Participant> {
        self.participants
            .lock()
            .unwrap()
            .get(conv_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Set the members of `conv_id`.
    pub fn set_participants(&self, conv_id: &str, participants: Vec<Participant>) {
        self.participants
            .lock()
            .unwrap()
            .insert(conv_id.to_string(), participants);
    }

    fn check(&self) -> anyhow::Result<()> {
        if self.failing.load(std::sync::atomic::Ordering::SeqCst) {
            anyhow::bail!("store is failing")
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl StoreApi for MockStore {
    async fn message_for_user(
        &self,
        user: &str,
        payload: &str,
        nonce: &Nonce,
        sender_key: &PublicKey,
    ) -> anyhow::Result<()> {
        self.check()?;
        self.user_messages.lock().unwrap().push(StoredMessage {
            to: user.to_string(),
            payload: payload.to_string(),
            nonce: *nonce,
            sender_key: *sender_key,
        });
        Ok(())
    }

    async fn conversation_add_message(
        &self,
        conv_id: &str,
        sender_key: &PublicKey,
        nonce: &Nonce,
        payload: &str,
    ) -> anyhow::Result<()> {
        self.check()?;
        self.conversation_messages.lock().unwrap().push(StoredMessage {
            to: conv_id.to_string(),
            payload: payload.to_string(),
            nonce: *nonce,
            sender_key: *sender_key,
        });
        Ok(())
    }

    async fn conversation_add_participant(
        &self,
        conv_id: &str,
        participant: Participant,
    ) -> anyhow::Result<()> {
        self.check()?;
        let mut participants = self.participants.lock().unwrap();
        let members = participants.entry(conv_id.to_string()).or_default();
        if !members.contains(&participant) {
            members.push(participant);
        }
        Ok(())
    }

    async fn conversation_participants(&self, conv_id: &str) -> anyhow::Result<Vec<Participant>> {
        self.check()?;
        Ok(self.participants(conv_id))
    }
}

/// [`KeyValueTable`] in memory, counting the writes.
#[derive(Debug, Default)]
pub struct MemoryTable {
    rows: std::sync::RwLock<std::collections::HashMap<(String, String), Row>>,
    writes: std::sync::atomic::AtomicUsize,
}

impl MemoryTable {
    /// Number of [`KeyValueTable::put_cells`] calls.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl KeyValueTable for MemoryTable {
    async fn get_row(&self, table: &str, row: &str) -> anyhow::Result<Option<Row>> {
        Ok(self
            .rows
            .read()
            .unwrap()
            .get(&(table.to_string(), row.to_string()))
            .cloned())
    }

    async fn put_cells(&self, table: &str, row: &str, cells: Row) -> anyhow::Result<()> {
        self.writes
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.rows
            .write()
            .unwrap()
            .entry((table.to_string(), row.to_string()))
            .or_default()
            .extend(cells);
        Ok(())
    }
}

/// An envelope handed to a [`Transport`].
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    /// Where it was sent.
    pub url: url::Url,
    /// Server expected at `url`.
    pub server_key: PublicKey,
    ///
    pub kind: DeliveryKind,
    ///
    pub envelope: serde_json::Value,
}

/// [`Transport`] recording the deliveries, failing for the servers told so.
#[derive(Debug, Default)]
pub struct MockTransport {
    deliveries: std::sync::Mutex<Vec<Delivery>>,
    unreachable: std::sync::Mutex<std::collections::HashSet<PublicKey>>,
}

impl MockTransport {
    /// The deliveries to `server_key` fail from now on.
    pub fn unreachable(&self, server_key: PublicKey) {
        self.unreachable.lock().unwrap().insert(server_key);
    }

    /// Every delivery attempted, failed ones included.
    #[must_use]
    pub fn deliveries(&self) -> Vec<Delivery> {
        self.deliveries.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Transport for MockTransport {
    async fn deliver(
        &self,
        url: &url::Url,
        server_key: &PublicKey,
        kind: DeliveryKind,
        envelope: serde_json::Value,
    ) -> Result<(), DeliveryError> {
        self.deliveries.lock().unwrap().push(Delivery {
            url: url.clone(),
            server_key: *server_key,
            kind,
            envelope,
        });

        if self.unreachable.lock().unwrap().contains(server_key) {
            Err(DeliveryError::ConnectTimeout(url.clone()))
        } else {
            Ok(())
        }
    }
}
