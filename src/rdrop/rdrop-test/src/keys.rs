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
use rdrop_common::{
    re::ed25519_dalek, BoxKeyring, InnerEnvelope, Keyring, Nonce, OuterTransitEnvelope,
    PublicKey, SelfIdent,
};

/// The keys of a server, and its self-ident.
#[derive(Debug)]
pub struct Peer {
    /// Boxing key pair.
    pub boxing: BoxKeyring,
    /// Root key signing the self-ident.
    pub signing: ed25519_dalek::SigningKey,
    /// Signed at the url given to [`Peer::new`].
    pub self_ident: SelfIdent,
}

impl Peer {
    /// Fresh keys, announcing `url`.
    #[must_use]
    pub fn new(url: &str) -> Self {
        let boxing = BoxKeyring::generate();
        let signing = ed25519_dalek::SigningKey::generate(&mut rand::rngs::OsRng);
        let self_ident =
            SelfIdent::sign(&signing, *boxing.boxing_public_key(), url.parse().unwrap()).unwrap();

        Self {
            boxing,
            signing,
            self_ident,
        }
    }

    ///
    #[must_use]
    pub fn boxing_public_key(&self) -> PublicKey {
        *self.boxing.boxing_public_key()
    }

    /// A self-ident of the same server, announcing another url.
    #[must_use]
    pub fn self_ident_at(&self, url: &str) -> SelfIdent {
        SelfIdent::sign(&self.signing, self.boxing_public_key(), url.parse().unwrap()).unwrap()
    }

    /// Copy of the boxing key pair.
    #[must_use]
    pub fn keyring(&self) -> BoxKeyring {
        BoxKeyring::from_secret_base64(&self.boxing.secret_base64()).unwrap()
    }
}

/// A user of the maildrop: boxes envelopes for servers.
#[derive(Debug)]
pub struct User {
    /// Name of the user on its maildrop server.
    pub name: String,
    /// Boxing key pair of the user, its public half is the tell key.
    pub keyring: BoxKeyring,
}

impl User {
    ///
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            keyring: BoxKeyring::generate(),
        }
    }

    /// Tell key of the user.
    #[must_use]
    pub fn key(&self) -> PublicKey {
        *self.keyring.boxing_public_key()
    }

    /// Box `plaintext` for `recipient`.
    #[must_use]
    pub fn seal(&self, plaintext: &str, nonce: &Nonce, recipient: &PublicKey) -> String {
        self.keyring.box_utf8(plaintext, nonce, recipient).unwrap()
    }

    /// Box `inner` for the server `server_key`.
    #[must_use]
    pub fn transit(&self, inner: &InnerEnvelope, server_key: &PublicKey) -> OuterTransitEnvelope {
        self.transit_raw(&serde_json::to_string(inner).unwrap(), server_key)
    }

    /// Box any text for the server `server_key`.
    #[must_use]
    pub fn transit_raw(&self, plaintext: &str, server_key: &PublicKey) -> OuterTransitEnvelope {
        let nonce = Nonce::random();
        OuterTransitEnvelope {
            inner_envelope: self.seal(plaintext, &nonce, server_key),
            nonce,
            sender_key: self.key(),
        }
    }
}
