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
use crate::{DeliveryOutcome, ServerContext};
use rdrop_common::{
    task::Task, ConvAddEnvelope, ConvMsgEnvelope, FannedMsgEnvelope, OuterTransitEnvelope,
    Participant, PublicKey, ServerEnvelope, TaskError,
};

/// What a participant posts to a conversation we host.
#[derive(Debug, Clone)]
pub enum ConversationPost {
    /// Add a participant, the payload announces them.
    Add(ConvAddEnvelope),
    /// A plain message.
    Message(ConvMsgEnvelope),
}

impl ConversationPost {
    /// Conversation id.
    #[must_use]
    pub fn conv_id(&self) -> &str {
        match self {
            Self::Add(add) => &add.conv_id,
            Self::Message(msg) => &msg.conv_id,
        }
    }

    /// Opaque payload, fanned out as is.
    #[must_use]
    pub fn payload(&self) -> &str {
        match self {
            Self::Add(add) => &add.payload,
            Self::Message(msg) => &msg.payload,
        }
    }
}

/// A message posted to a conversation hosted by this server.
///
/// Stored, then fanned out to every participant's server.
#[derive(Debug, Clone)]
pub struct ConversationMessage {
    /// The opened inner envelope.
    pub inner: ConversationPost,
    /// The transit envelope it came in.
    pub outer: OuterTransitEnvelope,
    /// Server which delivered the transit envelope.
    pub other_server_key: PublicKey,
}

/// Steps of [`ConversationMessage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumIter, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Step {
    /// The sender is a participant of the conversation.
    CheckAlreadyInOnConversation,
    /// Append the message, register the new participant of a `convadd`.
    Persist,
    /// Read the participants.
    GetRecipients,
    /// One `fannedmsg` per participant.
    SendToAllRecipients,
}

/// Result of the fan-out.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RecipientsReport {
    /// Handed to a server, or processed locally.
    pub delivered: usize,
    /// Not delivered, already logged.
    pub failed: usize,
}

/// Values produced by [`ConversationMessage`].
#[derive(Debug, Default)]
pub struct State {
    /// see [`Step::GetRecipients`]
    pub recipients: Option<Vec<Participant>>,
    /// see [`Step::SendToAllRecipients`]
    pub report: RecipientsReport,
}

impl ConversationMessage {
    async fn send_to(&self, ctx: &ServerContext, recipient: &Participant) -> bool {
        let fanned = ServerEnvelope::FannedMsg(FannedMsgEnvelope {
            name: recipient.name.clone(),
            nonce: self.outer.nonce,
            payload: self.inner.payload().to_string(),
            conv_id: self.inner.conv_id().to_string(),
        });

        match ctx
            .sender
            .send_server_envelope_to_server(ctx, fanned, &recipient.server_key)
            .await
        {
            Ok(DeliveryOutcome::Local | DeliveryOutcome::Delivered) => true,
            Ok(DeliveryOutcome::Failed) => false,
            Err(error) => {
                tracing::warn!(
                    user = %recipient.name,
                    server = %recipient.server_key,
                    %error,
                    "Fan-out to participant failed."
                );
                false
            }
        }
    }
}

#[async_trait::async_trait]
impl Task for ConversationMessage {
    const NAME: &'static str = "conversation_message";
    type Step = Step;
    type State = State;
    type Context = ServerContext;

    async fn step(
        &self,
        ctx: &ServerContext,
        step: Step,
        state: &mut State,
    ) -> Result<(), TaskError> {
        let conv_id = self.inner.conv_id();

        match step {
            Step::CheckAlreadyInOnConversation => ctx
                .auth
                .conv_check_server_conversation(
                    conv_id,
                    &self.other_server_key,
                    &self.outer.sender_key,
                )
                .await?,
            Step::Persist => {
                ctx.store
                    .conversation_add_message(
                        conv_id,
                        &self.outer.sender_key,
                        &self.outer.nonce,
                        self.inner.payload(),
                    )
                    .await
                    .map_err(TaskError::Storage)?;

                if let ConversationPost::Add(add) = &self.inner {
                    ctx.store
                        .conversation_add_participant(
                            conv_id,
                            Participant {
                                name: add.name.clone(),
                                server_key: add.server_name,
                            },
                        )
                        .await
                        .map_err(TaskError::Storage)?;
                }
            }
            Step::GetRecipients => {
                state.recipients = Some(
                    ctx.store
                        .conversation_participants(conv_id)
                        .await
                        .map_err(TaskError::Storage)?,
                );
            }
            Step::SendToAllRecipients => {
                let recipients = TaskError::produced(state.recipients.as_ref(), "recipients")?;

                let sent = futures_util::future::join_all(
                    recipients
                        .iter()
                        .map(|recipient| self.send_to(ctx, recipient)),
                )
                .await;

                let delivered = sent.iter().filter(|ok| **ok).count();
                state.report = RecipientsReport {
                    delivered,
                    failed: sent.len() - delivered,
                };
                tracing::debug!(
                    delivered = state.report.delivered,
                    failed = state.report.failed,
                    "Fan-out done."
                );
            }
        }
        Ok(())
    }
}
