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
    parse_resend_payload, task::Task, JoinedEnvelope, OuterTransitEnvelope, PublicKey,
    ResendPayload, TaskError,
};

/// The invitee's server confirmed a conversation join.
///
/// `msg.payload` is boxed by the inviting user (`msg.name`, one of our users)
/// for us, and wraps the transit envelope to forward to the conversation server.
#[derive(Debug, Clone)]
pub struct ConversationJoined {
    /// The `joined` server envelope.
    pub msg: JoinedEnvelope,
    /// The invitee's server.
    pub other_server_key: PublicKey,
}

/// Steps of [`ConversationJoined`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumIter, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Step {
    /// Open the payload, it must be a `resend`.
    OpenEnvelope,
    /// `msg.name` is the tell key of one of our users.
    CheckNamedUserIsOurUser,
    /// Forward the wrapped envelope to the conversation server.
    Resend,
}

/// Values produced by [`ConversationJoined`].
#[derive(Debug, Default)]
pub struct State {
    /// see [`Step::OpenEnvelope`]
    pub resend: Option<ResendPayload>,
    /// see [`Step::CheckNamedUserIsOurUser`]
    pub user_root_key: Option<PublicKey>,
    /// see [`Step::Resend`]
    pub resent: Option<DeliveryOutcome>,
}

#[async_trait::async_trait]
impl Task for ConversationJoined {
    const NAME: &'static str = "conversation_joined";
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
            Step::OpenEnvelope => {
                let opened =
                    ctx.keyring
                        .open_box_utf8(&self.msg.payload, &self.msg.nonce, &self.msg.name)?;
                state.resend = Some(parse_resend_payload(&opened)?);
            }
            Step::CheckNamedUserIsOurUser => {
                state.user_root_key = Some(
                    ctx.auth
                        .server_check_user_account_by_tell_key(&self.msg.name)
                        .await?,
                );
            }
            Step::Resend => {
                let resend = TaskError::produced(state.resend.as_ref(), "resend payload")?;
                let user_root_key = TaskError::produced(state.user_root_key, "user root key")?;

                let outer = OuterTransitEnvelope {
                    sender_key: self.msg.name,
                    nonce: self.msg.nonce,
                    inner_envelope: resend.payload.clone(),
                };
                state.resent = Some(
                    ctx.sender
                        .send_person_envelope_to_server(
                            ctx,
                            &user_root_key,
                            outer,
                            &resend.server_name,
                        )
                        .await?,
                );
            }
        }
        Ok(())
    }
}
