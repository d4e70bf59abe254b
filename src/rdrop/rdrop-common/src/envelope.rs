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
use crate::{Keyring, Nonce, PublicKey, TaskError};

/// Envelope relayed by a user's maildrop, boxed by the user for this server.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OuterTransitEnvelope {
    /// Boxed [`InnerEnvelope`], in base64.
    pub inner_envelope: String,
    /// Nonce of the box.
    pub nonce: Nonce,
    /// Key of the user who sealed the box.
    pub sender_key: PublicKey,
}

/// Message from a user to a local user.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserEnvelope {
    /// Recipient.
    pub name: String,
    /// Opaque content, handed to the store as is.
    pub payload: String,
}

/// Invitation of a local user to a conversation hosted by `server_name`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinConvEnvelope {
    /// Invited user.
    pub name: String,
    /// Server hosting the conversation.
    pub server_name: PublicKey,
    /// Boxed `resend` payload, sent back to the inviter's server.
    pub payload: String,
}

/// Addition of a participant to a conversation hosted here.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvAddEnvelope {
    /// Conversation id.
    pub conv_id: String,
    /// Added user.
    pub name: String,
    /// Maildrop server of the added user.
    pub server_name: PublicKey,
    /// Opaque content fanned out to the participants.
    pub payload: String,
}

/// Message to a conversation hosted here.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvMsgEnvelope {
    /// Conversation id.
    pub conv_id: String,
    /// Opaque content fanned out to the participants.
    pub payload: String,
}

/// Content of an [`OuterTransitEnvelope`] once unboxed.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize, strum::IntoStaticStr)]
#[serde(tag = "type")]
pub enum InnerEnvelope {
    /// `user`
    #[serde(rename = "user")]
    #[strum(serialize = "user")]
    User(UserEnvelope),
    /// `joinconv`
    #[serde(rename = "joinconv")]
    #[strum(serialize = "joinconv")]
    JoinConv(JoinConvEnvelope),
    /// `convadd`
    #[serde(rename = "convadd")]
    #[strum(serialize = "convadd")]
    ConvAdd(ConvAddEnvelope),
    /// `convmsg`
    #[serde(rename = "convmsg")]
    #[strum(serialize = "convmsg")]
    ConvMsg(ConvMsgEnvelope),
}

/// Confirmation that a user joined a conversation, sent back to the inviter's server.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinedEnvelope {
    /// Tell key of the inviting user, who sealed `payload`.
    pub name: PublicKey,
    /// Nonce of `payload`.
    pub nonce: Nonce,
    /// Boxed [`ResendPayload`].
    pub payload: String,
}

/// Conversation traffic fanned out to one participant.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FannedMsgEnvelope {
    /// Recipient.
    pub name: String,
    /// Nonce of the original message.
    pub nonce: Nonce,
    /// Opaque content.
    pub payload: String,
    /// Conversation id.
    pub conv_id: String,
}

/// Message from a peer server.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize, strum::IntoStaticStr)]
#[serde(tag = "type")]
pub enum ServerEnvelope {
    /// `joined`
    #[serde(rename = "joined")]
    #[strum(serialize = "joined")]
    Joined(JoinedEnvelope),
    /// `fannedmsg`
    #[serde(rename = "fannedmsg")]
    #[strum(serialize = "fannedmsg")]
    FannedMsg(FannedMsgEnvelope),
}

/// Content of a [`JoinedEnvelope::payload`] once unboxed.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResendPayload {
    /// Boxed inner envelope to deliver to `server_name`.
    pub payload: String,
    /// Server hosting the conversation.
    pub server_name: PublicKey,
}

#[derive(serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum TaggedResend {
    Resend(ResendPayload),
}

impl ResendPayload {
    /// JSON form, tagged with `"type": "resend"`.
    ///
    /// # Errors
    ///
    /// * see [`serde_json::to_string`]
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&TaggedResend::Resend(self.clone()))
    }
}

/// Authenticate and decrypt the inner envelope with the sender key and nonce.
///
/// # Errors
///
/// * [`TaskError::Decrypt`] if the box does not open
pub fn unbox_outer_envelope(
    outer: &OuterTransitEnvelope,
    keyring: &dyn Keyring,
) -> Result<String, TaskError> {
    Ok(keyring.open_box_utf8(&outer.inner_envelope, &outer.nonce, &outer.sender_key)?)
}

/// Decode an unboxed inner envelope.
///
/// # Errors
///
/// * [`TaskError::MalformedPayload`] if the input is not JSON, or the `type`
///   is unknown, or a field is missing
pub fn parse_inner_envelope(decrypted: &str) -> Result<InnerEnvelope, TaskError> {
    serde_json::from_str(decrypted).map_err(|e| TaskError::MalformedPayload(e.to_string()))
}

/// Decode a server envelope.
///
/// # Errors
///
/// * [`TaskError::MalformedPayload`] if the `type` is unknown or a field is missing
pub fn parse_server_envelope(value: serde_json::Value) -> Result<ServerEnvelope, TaskError> {
    serde_json::from_value(value).map_err(|e| TaskError::MalformedPayload(e.to_string()))
}

/// Decode an unboxed `joined` payload.
///
/// # Errors
///
/// * [`TaskError::MalformedOrReplay`] if the `type` is not `resend`
/// * [`TaskError::MalformedPayload`] if the input is not a JSON object with a
///   string `type`, or a field is missing
pub fn parse_resend_payload(decrypted: &str) -> Result<ResendPayload, TaskError> {
    let value = serde_json::from_str::<serde_json::Value>(decrypted)
        .map_err(|e| TaskError::MalformedPayload(e.to_string()))?;

    match value.get("type").and_then(serde_json::Value::as_str) {
        Some("resend") => {}
        Some(other) => return Err(TaskError::MalformedOrReplay(other.to_string())),
        None => {
            return Err(TaskError::MalformedPayload(
                "missing string field `type`".to_string(),
            ))
        }
    }

    match serde_json::from_value::<TaggedResend>(value) {
        Ok(TaggedResend::Resend(resend)) => Ok(resend),
        Err(e) => Err(TaskError::MalformedPayload(e.to_string())),
    }
}
