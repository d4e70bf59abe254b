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

//! rdrop common definitions
//!
//! Keys, envelopes, the box keyring, server self-idents, the collaborator
//! interfaces consumed by the maildrop, and the step-by-step task engine.

#![doc(html_no_source)]
#![deny(missing_docs)]
#![forbid(unsafe_code)]
//
#![warn(rust_2018_idioms)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::cargo)]
//
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::multiple_crate_versions)]

mod types {
    pub mod key;
}

mod api;
mod envelope;
mod error;
mod keyring;
mod self_ident;

/// Sequential step execution with task-local state.
pub mod task;

pub use api::{AuthApi, AuthError, KeyValueTable, Participant, Row, StoreApi};
pub use envelope::{
    parse_inner_envelope, parse_resend_payload, parse_server_envelope, unbox_outer_envelope,
    ConvAddEnvelope, ConvMsgEnvelope, FannedMsgEnvelope, InnerEnvelope, JoinConvEnvelope,
    JoinedEnvelope, OuterTransitEnvelope, ResendPayload, ServerEnvelope, UserEnvelope,
};
pub use error::TaskError;
pub use keyring::{BoxError, BoxKeyring, Keyring};
pub use self_ident::{SelfIdent, SelfIdentError, ServerIdentity};
pub use types::key::{KeyError, Nonce, PublicKey};

/// Re-exported dependencies
pub mod re {
    pub use ed25519_dalek;
    pub use url;
}
