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
use crate::{task::TaskFailure, AuthError, BoxError, PublicKey};

/// Error produced while processing an envelope, or by a step of a task.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// The box could not be opened.
    #[error("cannot open envelope: {0}")]
    Decrypt(#[from] BoxError),
    /// The decoded record is not one of the known shapes.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
    /// A join confirmation carried something else than a `resend` payload.
    #[error("malformed or replayed payload of type `{0}`")]
    MalformedOrReplay(String),
    /// An authorization check refused.
    #[error("unauthorized: {0}")]
    Unauthorized(#[from] AuthError),
    /// The storage collaborator failed.
    #[error("storage failure: {0:#}")]
    Storage(anyhow::Error),
    /// The outbound delivery failed.
    #[error("delivery to `{server}` failed: {reason}")]
    Delivery {
        /// Recipient server.
        server: PublicKey,
        /// Cause of the failure.
        reason: String,
    },
    /// No url is known for this server.
    #[error("server `{0}` is unknown")]
    UnknownServer(PublicKey),
    /// A step read a value an earlier step should have produced.
    #[error("`{0}` read before being produced")]
    StepOrder(&'static str),
    /// A task run on our behalf (local delivery) failed.
    #[error(transparent)]
    Failed(Box<TaskFailure>),
}

impl From<TaskFailure> for TaskError {
    fn from(value: TaskFailure) -> Self {
        Self::Failed(Box::new(value))
    }
}

impl TaskError {
    /// Take the value produced by an earlier step.
    ///
    /// # Errors
    ///
    /// * [`TaskError::StepOrder`] if the value was never produced
    pub fn produced<T>(value: Option<T>, what: &'static str) -> Result<T, Self> {
        value.ok_or(Self::StepOrder(what))
    }
}
