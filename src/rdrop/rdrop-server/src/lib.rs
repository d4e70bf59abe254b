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

//! rdrop maildrop server
//!
//! Receives deliveries from peer servers, runs the delivery tasks they
//! trigger, and routes the envelopes those tasks produce either back into
//! this server or to a peer.

#![doc(html_no_source)]
#![deny(missing_docs)]
#![deny(unsafe_code)]
//
#![warn(rust_2018_idioms)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::cargo)]
//
#![allow(clippy::multiple_crate_versions)]

mod context;
pub mod keys;
pub mod maildrop;
pub mod mailsender;
mod runtime;
mod server;

pub use context::ServerContext;
pub use maildrop::{
    person_enqueue_process_now, server_enqueue_process_now, DeliveryTask,
    ReceiveDeliveryConnection,
};
pub use mailsender::{DeliveryOutcome, MailsenderLocalApi, SenderApi};
pub use runtime::start_runtime;
pub use server::{socket_bind_anyhow, Server};
