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
use crate::path;
use anyhow::Context;
use rdrop_common::{Nonce, Participant, PublicKey, StoreApi};

/// A message at rest, still boxed for its recipient.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredMessage {
    /// Key of the sender, as seen by the server that accepted the message.
    pub sender_key: PublicKey,
    /// Nonce of the box.
    pub nonce: Nonce,
    /// Boxed content.
    pub payload: String,
}

/// [`StoreApi`] writing to the spool, see the module documentation for the layout.
pub struct FsStore {
    dirpath: std::path::PathBuf,
    // serializes the read-modify-write of the participant lists
    participants: tokio::sync::Mutex<()>,
}

impl std::fmt::Debug for FsStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FsStore")
            .field("dirpath", &self.dirpath)
            .finish_non_exhaustive()
    }
}

impl FsStore {
    /// Store rooted at `dirpath`, created lazily on the first write.
    #[must_use]
    pub fn new(dirpath: std::path::PathBuf) -> Self {
        Self {
            dirpath,
            participants: tokio::sync::Mutex::new(()),
        }
    }

    fn user_path(&self, user: &str) -> std::path::PathBuf {
        self.dirpath.join("users").join(path::encode(user))
    }

    fn conversation_path(&self, conv_id: &str) -> std::path::PathBuf {
        self.dirpath.join("conversations").join(path::encode(conv_id))
    }

    /// The messages waiting for `user`, oldest first.
    ///
    /// # Errors
    ///
    /// * a message file cannot be read or deserialized
    pub async fn user_messages(&self, user: &str) -> anyhow::Result<Vec<StoredMessage>> {
        list_messages(&self.user_path(user)).await
    }

    /// The messages of the conversation `conv_id`, oldest first.
    ///
    /// # Errors
    ///
    /// * a message file cannot be read or deserialized
    pub async fn conversation_messages(
        &self,
        conv_id: &str,
    ) -> anyhow::Result<Vec<StoredMessage>> {
        list_messages(&self.conversation_path(conv_id).join("messages")).await
    }
}

/// `<nanoseconds since epoch>-<uuid>.json`, sorting in arrival order.
fn message_file_name() -> anyhow::Result<String> {
    let since_epoch = std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH)?;
    Ok(format!(
        "{:020}-{}.json",
        since_epoch.as_nanos(),
        uuid::Uuid::new_v4()
    ))
}

async fn write_message(dir: &std::path::Path, message: &StoredMessage) -> anyhow::Result<()> {
    let message_path = dir.join(message_file_name()?);
    path::write_json(&message_path, message).await?;

    tracing::debug!(to = ?dir, "Message written.");
    Ok(())
}

async fn list_messages(dir: &std::path::Path) -> anyhow::Result<Vec<StoredMessage>> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(vec![]),
        Err(e) => {
            return Err(anyhow::Error::new(e).context(format!("Error from read dir '{}'", dir.display())))
        }
    };

    let mut paths = vec![];
    while let Some(entry) = entries.next_entry().await? {
        let entry_path = entry.path();
        if entry_path.extension().and_then(std::ffi::OsStr::to_str) == Some("json") {
            paths.push(entry_path);
        }
    }
    paths.sort();

    let mut messages = Vec::with_capacity(paths.len());
    for message_path in paths {
        messages.push(
            path::read_json::<StoredMessage>(&message_path)
                .await?
                .with_context(|| format!("'{}' vanished", message_path.display()))?,
        );
    }
    Ok(messages)
}

#[async_trait::async_trait]
impl StoreApi for FsStore {
    #[tracing::instrument(name = "store-user-message", skip_all, fields(user = %user))]
    async fn message_for_user(
        &self,
        user: &str,
        payload: &str,
        nonce: &Nonce,
        sender_key: &PublicKey,
    ) -> anyhow::Result<()> {
        write_message(
            &self.user_path(user),
            &StoredMessage {
                sender_key: *sender_key,
                nonce: *nonce,
                payload: payload.to_string(),
            },
        )
        .await
    }

    #[tracing::instrument(name = "store-conversation-message", skip_all, fields(conversation = %conv_id))]
    async fn conversation_add_message(
        &self,
        conv_id: &str,
        sender_key: &PublicKey,
        nonce: &Nonce,
        payload: &str,
    ) -> anyhow::Result<()> {
        write_message(
            &self.conversation_path(conv_id).join("messages"),
            &StoredMessage {
                sender_key: *sender_key,
                nonce: *nonce,
                payload: payload.to_string(),
            },
        )
        .await
    }

    #[tracing::instrument(name = "store-participant", skip_all, fields(conversation = %conv_id, participant = %participant.name))]
    async fn conversation_add_participant(
        &self,
        conv_id: &str,
        participant: Participant,
    ) -> anyhow::Result<()> {
        let participants_path = self.conversation_path(conv_id).join("participants.json");

        let _guard = self.participants.lock().await;
        let mut participants = path::read_json::<Vec<Participant>>(&participants_path)
            .await?
            .unwrap_or_default();

        if participants.contains(&participant) {
            tracing::debug!("Already a participant.");
            return Ok(());
        }
        participants.push(participant);
        path::write_json(&participants_path, &participants).await
    }

    async fn conversation_participants(&self, conv_id: &str) -> anyhow::Result<Vec<Participant>> {
        Ok(
            path::read_json(&self.conversation_path(conv_id).join("participants.json"))
                .await?
                .unwrap_or_default(),
        )
    }
}
