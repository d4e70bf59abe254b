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
use crate::SenderApi;
use rdrop_common::{AuthApi, Keyring, StoreApi};

/// Collaborators shared by every delivery task of the server.
pub struct ServerContext {
    /// Our boxing key pair.
    pub keyring: std::sync::Arc<dyn Keyring>,
    /// Authorization decisions.
    pub auth: std::sync::Arc<dyn AuthApi>,
    /// Hand-off to the user and conversation storage.
    pub store: std::sync::Arc<dyn StoreApi>,
    /// Outbound routing, see [`crate::MailsenderLocalApi`].
    pub sender: std::sync::Arc<dyn SenderApi>,
}

impl ServerContext {
    /// Our boxing public key, the key peers address us with.
    #[must_use]
    pub fn own_key(&self) -> rdrop_common::PublicKey {
        *self.keyring.boxing_public_key()
    }
}
