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

//! rdrop delivery system
//!
//! Everything a server needs to reach a peer: the [`ServerUrlCache`] mapping
//! boxing keys to urls with a trust-on-first-use policy, and the
//! [`Transport`] opening the outbound connections.

#![doc(html_no_source)]
#![deny(missing_docs)]
#![forbid(unsafe_code)]
//
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::cargo)]
//
#![allow(clippy::multiple_crate_versions)]

mod server_url;

/// Outbound connections to peer servers.
pub mod transport {
    use rdrop_common::PublicKey;
    use rdrop_protocol::DeliveryKind;

    /// Failure of a single outbound delivery.
    #[derive(Debug, thiserror::Error)]
    pub enum DeliveryError {
        /// The url does not point to a reachable socket.
        #[error("invalid url '{url}': {reason}")]
        InvalidUrl {
            /// Url of the peer.
            url: url::Url,
            /// What is missing.
            reason: &'static str,
        },
        /// The connection could not be opened.
        #[error("cannot connect to '{url}': {error}")]
        Connect {
            /// Url of the peer.
            url: url::Url,
            /// Cause.
            error: std::io::Error,
        },
        /// The connection was not opened in time.
        #[error("timed out while connecting to '{0}'")]
        ConnectTimeout(url::Url),
        /// The peer broke the protocol, closed the connection or did not answer in time.
        #[error("{0}")]
        Protocol(#[from] rdrop_protocol::Error),
        /// The peer did not accept our `hello`.
        #[error("the peer refused our server key")]
        HelloDenied,
        /// The peer answered `bad` to the envelope.
        #[error("the peer refused the envelope")]
        Rejected,
    }

    /// Deliver an envelope to a peer server.
    #[async_trait::async_trait]
    pub trait Transport: Send + Sync {
        /// Open a connection to `url`, expected to be served by `server_key`,
        /// and deliver `envelope` as a `kind` delivery.
        async fn deliver(
            &self,
            url: &url::Url,
            server_key: &PublicKey,
            kind: DeliveryKind,
            envelope: serde_json::Value,
        ) -> Result<(), DeliveryError>;
    }

    mod tcp;

    pub use tcp::TcpTransport;
}

pub use rdrop_protocol::DeliveryKind;
pub use server_url::{
    CacheError, SelfIdentOutcome, ServerUrlCache, CELL_IDENT, CELL_URL, TBL_SERVER_URL,
};
pub use transport::{DeliveryError, TcpTransport, Transport};
