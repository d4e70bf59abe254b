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
//! Inbound side of the maildrop.
//!
//! Every envelope accepted by a [`ReceiveDeliveryConnection`], or handed over
//! by the local sender, is turned into one [`DeliveryTask`] and run right away.

use crate::ServerContext;
use rdrop_common::{
    parse_inner_envelope, task::TaskFailure, unbox_outer_envelope, InnerEnvelope,
    OuterTransitEnvelope, PublicKey, ServerEnvelope, TaskError,
};

mod connection;

/// The delivery tasks.
pub mod tasks {
    mod conversation_join;
    mod conversation_joined;
    mod conversation_message;
    mod fanout_to_user_message;
    mod user_to_user_message;

    pub use conversation_join::ConversationJoin;
    pub use conversation_joined::ConversationJoined;
    pub use conversation_message::{ConversationMessage, ConversationPost, RecipientsReport};
    pub use fanout_to_user_message::FanoutToUserMessage;
    pub use user_to_user_message::UserToUserMessage;
}

pub use connection::ReceiveDeliveryConnection;

use tasks::{
    ConversationJoin, ConversationJoined, ConversationMessage, ConversationPost,
    FanoutToUserMessage, UserToUserMessage,
};

/// One delivery to process.
#[derive(Debug)]
pub enum DeliveryTask {
    /// see [`UserToUserMessage`]
    UserToUser(UserToUserMessage),
    /// see [`ConversationJoin`]
    ConversationJoin(ConversationJoin),
    /// see [`ConversationMessage`]
    ConversationMessage(ConversationMessage),
    /// see [`ConversationJoined`]
    ConversationJoined(ConversationJoined),
    /// see [`FanoutToUserMessage`]
    FanoutToUser(FanoutToUserMessage),
}

impl DeliveryTask {
    /// Task processing an opened transit envelope.
    #[must_use]
    pub fn from_inner(
        inner: InnerEnvelope,
        outer: OuterTransitEnvelope,
        other_server_key: PublicKey,
    ) -> Self {
        match inner {
            InnerEnvelope::User(inner) => Self::UserToUser(UserToUserMessage {
                inner,
                outer,
                other_server_key,
            }),
            InnerEnvelope::JoinConv(inner) => Self::ConversationJoin(ConversationJoin {
                inner,
                outer,
                other_server_key,
            }),
            InnerEnvelope::ConvAdd(inner) => Self::ConversationMessage(ConversationMessage {
                inner: ConversationPost::Add(inner),
                outer,
                other_server_key,
            }),
            InnerEnvelope::ConvMsg(inner) => Self::ConversationMessage(ConversationMessage {
                inner: ConversationPost::Message(inner),
                outer,
                other_server_key,
            }),
        }
    }

    /// Task processing a server envelope.
    #[must_use]
    pub fn from_server(envelope: ServerEnvelope, other_server_key: PublicKey) -> Self {
        match envelope {
            ServerEnvelope::Joined(msg) => Self::ConversationJoined(ConversationJoined {
                msg,
                other_server_key,
            }),
            ServerEnvelope::FannedMsg(envelope) => Self::FanoutToUser(FanoutToUserMessage {
                envelope,
                other_server_key,
            }),
        }
    }

    /// [`rdrop_common::task::Task::NAME`] of the inner task.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        use rdrop_common::task::Task;
        match self {
            Self::UserToUser(_) => UserToUserMessage::NAME,
            Self::ConversationJoin(_) => ConversationJoin::NAME,
            Self::ConversationMessage(_) => ConversationMessage::NAME,
            Self::ConversationJoined(_) => ConversationJoined::NAME,
            Self::FanoutToUser(_) => FanoutToUserMessage::NAME,
        }
    }

    /// Run all the steps of the task.
    ///
    /// # Errors
    ///
    /// * the first failing step
    pub async fn run(&self, ctx: &ServerContext) -> Result<(), TaskFailure> {
        use rdrop_common::task::run;
        match self {
            Self::UserToUser(task) => run(task, ctx).await.map(|_| ()),
            Self::ConversationJoin(task) => run(task, ctx).await.map(|_| ()),
            Self::ConversationMessage(task) => run(task, ctx).await.map(|_| ()),
            Self::ConversationJoined(task) => run(task, ctx).await.map(|_| ()),
            Self::FanoutToUser(task) => run(task, ctx).await.map(|_| ()),
        }
    }
}

/// Open a transit envelope sent by `other_server_key` and process it now.
///
/// # Errors
///
/// * the envelope cannot be opened, [`TaskError::Decrypt`]
/// * the inner envelope is not valid, [`TaskError::MalformedPayload`]
/// * the task failed, [`TaskError::Failed`]
#[tracing::instrument(name = "person-enqueue", skip_all, fields(server = %other_server_key))]
pub async fn person_enqueue_process_now(
    ctx: &ServerContext,
    outer: OuterTransitEnvelope,
    other_server_key: PublicKey,
) -> Result<(), TaskError> {
    let inner = parse_inner_envelope(&unbox_outer_envelope(&outer, ctx.keyring.as_ref())?)?;
    tracing::debug!(kind = <&'static str>::from(&inner), "Transit envelope opened.");

    Ok(DeliveryTask::from_inner(inner, outer, other_server_key)
        .run(ctx)
        .await?)
}

/// Process now a server envelope sent by `other_server_key`.
///
/// # Errors
///
/// * the task failed, [`TaskError::Failed`]
#[tracing::instrument(name = "server-enqueue", skip_all, fields(server = %other_server_key))]
pub async fn server_enqueue_process_now(
    ctx: &ServerContext,
    envelope: ServerEnvelope,
    other_server_key: PublicKey,
) -> Result<(), TaskError> {
    Ok(DeliveryTask::from_server(envelope, other_server_key)
        .run(ctx)
        .await?)
}
