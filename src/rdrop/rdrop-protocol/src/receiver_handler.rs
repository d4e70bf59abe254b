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
use crate::Reply;
use rdrop_common::{PublicKey, SelfIdent};

/// Trait to implement to handle the frames in pair with the [`Receiver`](crate::Receiver).
#[async_trait::async_trait]
pub trait ReceiverHandler {
    /// Called with the first frame of the connection.
    ///
    /// Returning `false` closes the connection.
    async fn on_hello(&mut self, server_key: PublicKey, self_ident: Option<SelfIdent>) -> bool;

    /// Called after receiving a [`Request::DeliverTransit`](crate::Request::DeliverTransit).
    async fn on_deliver_transit(&mut self, msg: serde_json::Value) -> Reply;

    /// Called after receiving a [`Request::DeliverServer`](crate::Request::DeliverServer).
    async fn on_deliver_server(&mut self, msg: serde_json::Value) -> Reply;
}
