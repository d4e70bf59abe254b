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
use rdrop_common::{PublicKey, SelfIdent};

/// Frame sent by the connecting server.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize, strum::IntoStaticStr)]
#[serde(tag = "type")]
pub enum Request {
    /// First frame of a connection.
    #[serde(rename = "hello")]
    #[strum(serialize = "hello")]
    Hello {
        /// Boxing key of the connecting server.
        #[serde(rename = "serverKey")]
        server_key: PublicKey,
        /// Current self-ident of the connecting server.
        #[serde(rename = "selfIdent", default, skip_serializing_if = "Option::is_none")]
        self_ident: Option<SelfIdent>,
    },
    /// An outer transit envelope, from a user.
    #[serde(rename = "deliverTransit")]
    #[strum(serialize = "deliverTransit")]
    DeliverTransit {
        /// The envelope.
        msg: serde_json::Value,
    },
    /// A server envelope, from a peer server.
    #[serde(rename = "deliverServer")]
    #[strum(serialize = "deliverServer")]
    DeliverServer {
        /// The envelope.
        msg: serde_json::Value,
    },
}

impl Request {
    /// Value of the `type` field.
    #[must_use]
    pub fn verb(&self) -> &'static str {
        self.into()
    }
}

/// Frame sent by the receiving server, one per [`Request`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize, strum::Display)]
#[serde(tag = "type", rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Reply {
    /// Processed.
    Ack,
    /// Refused, the connection stays open.
    Bad,
}

/// The two kinds of deliveries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
pub enum DeliveryKind {
    /// see [`Request::DeliverTransit`]
    #[strum(serialize = "deliverTransit")]
    Transit,
    /// see [`Request::DeliverServer`]
    #[strum(serialize = "deliverServer")]
    Server,
}

impl DeliveryKind {
    /// Wrap an envelope in the matching [`Request`].
    #[must_use]
    pub fn into_request(self, msg: serde_json::Value) -> Request {
        match self {
            Self::Transit => Request::DeliverTransit { msg },
            Self::Server => Request::DeliverServer { msg },
        }
    }
}
