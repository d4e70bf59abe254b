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
use crate::ServerContext;
use rdrop_common::{task::Task, FannedMsgEnvelope, PublicKey, TaskError};

/// A conversation message fanned out by a conversation server to one of our users.
#[derive(Debug, Clone)]
pub struct FanoutToUserMessage {
    /// The fanned out message.
    pub envelope: FannedMsgEnvelope,
    /// The conversation server.
    pub other_server_key: PublicKey,
}

/// Steps of [`FanoutToUserMessage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumIter, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Step {
    /// Our user accepts this server for the conversation.
    CheckAuthorizedConversation,
    /// Hand the message to the user's storage.
    BackEndHandOff,
}

#[async_trait::async_trait]
impl Task for FanoutToUserMessage {
    const NAME: &'static str = "fanout_to_user_message";
    type Step = Step;
    type State = ();
    type Context = ServerContext;

    async fn step(&self, ctx: &ServerContext, step: Step, _: &mut ()) -> Result<(), TaskError> {
        match step {
            Step::CheckAuthorizedConversation => Ok(ctx
                .auth
                .user_check_server_conversation(
                    &self.envelope.name,
                    &self.other_server_key,
                    &self.envelope.conv_id,
                )
                .await?),
            // the conversation server stands as the sender
            Step::BackEndHandOff => ctx
                .store
                .message_for_user(
                    &self.envelope.name,
                    &self.envelope.payload,
                    &self.envelope.nonce,
                    &self.other_server_key,
                )
                .await
                .map_err(TaskError::Storage),
        }
    }
}
