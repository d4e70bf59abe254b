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
    task::Task, JoinConvEnvelope, JoinedEnvelope, OuterTransitEnvelope, PublicKey,
    ServerEnvelope, TaskError,
};

/// A contact of our user invites them to a conversation hosted by `inner.server_name`.
///
/// Our user gets ready to receive the conversation traffic, then the
/// invitation goes back to the inviter's server as a `joined` envelope.
#[derive(Debug, Clone)]
pub struct ConversationJoin {
    /// The opened inner envelope.
    pub inner: JoinConvEnvelope,
    /// The transit envelope it came in.
    pub outer: OuterTransitEnvelope,
    /// Server which delivered the transit envelope.
    pub other_server_key: PublicKey,
}

/// Steps of [`ConversationJoin`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumIter, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Step {
    /// The inviter is a contact of our user.
    CheckAuthorization,
    /// Allow the conversation server to deliver to our user.
    AddAuth,
    /// Send the `joined` envelope to the inviter's server.
    ResendJoined,
}

/// Values produced by [`ConversationJoin`].
#[derive(Debug, Default)]
pub struct State {
    /// How the `joined` envelope left.
    pub resent: Option<DeliveryOutcome>,
}

#[async_trait::async_trait]
impl Task for ConversationJoin {
    const NAME: &'static str = "conversation_join";
    type Step = Step;
    type State = State;
    type Context = ServerContext;

    async fn step(
        &self,
        ctx: &ServerContext,
        step: Step,
        state: &mut State,
    ) -> Result<(), TaskError> {
        match step {
            Step::CheckAuthorization => ctx
                .auth
                .user_check_server_user(
                    &self.inner.name,
                    &self.other_server_key,
                    &self.outer.sender_key,
                )
                .await?,
            Step::AddAuth => ctx
                .auth
                .user_authorize_server_for_conversation(
                    &self.inner.name,
                    &self.inner.server_name,
                    &self.inner.server_name,
                    &self.outer.sender_key,
                )
                .await?,
            Step::ResendJoined => {
                let joined = ServerEnvelope::Joined(JoinedEnvelope {
                    name: self.outer.sender_key,
                    nonce: self.outer.nonce,
                    payload: self.inner.payload.clone(),
                });
                state.resent = Some(
                    ctx.sender
                        .send_server_envelope_to_server(ctx, joined, &self.other_server_key)
                        .await?,
                );
            }
        }
        Ok(())
    }
}
