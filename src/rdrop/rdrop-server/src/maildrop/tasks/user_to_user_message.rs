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
use rdrop_common::{task::Task, OuterTransitEnvelope, PublicKey, TaskError, UserEnvelope};

/// A message from a user of a peer server to one of our users.
#[derive(Debug, Clone)]
pub struct UserToUserMessage {
    /// The opened inner envelope.
    pub inner: UserEnvelope,
    /// The transit envelope it came in.
    pub outer: OuterTransitEnvelope,
    /// Server which delivered the transit envelope.
    pub other_server_key: PublicKey,
}

/// Steps of [`UserToUserMessage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumIter, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Step {
    /// The sender is a contact of our user.
    CheckAuthorizedToTalkToUser,
    /// Hand the message to the user's storage.
    BackEndHandOff,
}

#[async_trait::async_trait]
impl Task for UserToUserMessage {
    const NAME: &'static str = "user_to_user_message";
    type Step = Step;
    type State = ();
    type Context = ServerContext;

    async fn step(&self, ctx: &ServerContext, step: Step, _: &mut ()) -> Result<(), TaskError> {
        match step {
            Step::CheckAuthorizedToTalkToUser => Ok(ctx
                .auth
                .user_check_server_user(
                    &self.inner.name,
                    &self.other_server_key,
                    &self.outer.sender_key,
                )
                .await?),
            Step::BackEndHandOff => ctx
                .store
                .message_for_user(
                    &self.inner.name,
                    &self.inner.payload,
                    &self.outer.nonce,
                    &self.outer.sender_key,
                )
                .await
                .map_err(TaskError::Storage),
        }
    }
}
