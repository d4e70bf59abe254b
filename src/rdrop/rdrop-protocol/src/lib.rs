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

//! rdrop peer delivery protocol
//!
//! Newline delimited JSON frames over an authenticated connection. The
//! connecting server introduces itself with a `hello` frame, then sends any
//! number of `deliverTransit` and `deliverServer` frames, each answered by an
//! `ack` or a `bad` frame.

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
#![allow(clippy::multiple_crate_versions)]

mod client;
mod frame;
mod receiver;
mod receiver_handler;
mod sink;
mod stream;

pub use client::Client;
pub use frame::{DeliveryKind, Reply, Request};
pub use receiver::Receiver;
pub use receiver_handler::ReceiverHandler;
pub use stream::Error;
