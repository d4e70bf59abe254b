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
use crate::PublicKey;
use base64::Engine;
use ed25519_dalek::{Signer, Verifier};

/// Error while reading a [`SelfIdent`].
#[derive(Debug, thiserror::Error)]
pub enum SelfIdentError {
    /// The payload or the signature is not valid base64.
    #[error("invalid base64: {0}")]
    Encoding(#[from] base64::DecodeError),
    /// The payload is not a [`ServerIdentity`].
    #[error("invalid identity payload: {0}")]
    Format(#[from] serde_json::Error),
    /// The root key or the signature are not ed25519 material.
    #[error("invalid ed25519 material: {0}")]
    Material(String),
    /// The signature does not match the root key.
    #[error("signature verification failed")]
    Signature,
}

/// What a server claims about itself.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ServerIdentity {
    /// ed25519 key signing the self-ident.
    pub root_public_key: PublicKey,
    /// Key the server boxes with, and is addressed by.
    pub boxing_public_key: PublicKey,
    /// Where to reach the server.
    pub url: url::Url,
}

/// A [`ServerIdentity`] signed by the server's root key.
///
/// Two self-idents are equal if their encoded payloads and signatures are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SelfIdent {
    /// base64 of the JSON encoded [`ServerIdentity`].
    pub payload: String,
    /// base64 of the ed25519 signature of `payload`.
    pub signature: String,
}

impl SelfIdent {
    /// Produce the self-ident of a server.
    ///
    /// # Errors
    ///
    /// * the identity cannot be serialized
    pub fn sign(
        signing_key: &ed25519_dalek::SigningKey,
        boxing_public_key: PublicKey,
        url: url::Url,
    ) -> Result<Self, SelfIdentError> {
        let identity = ServerIdentity {
            root_public_key: PublicKey(signing_key.verifying_key().to_bytes()),
            boxing_public_key,
            url,
        };
        let payload =
            base64::engine::general_purpose::STANDARD.encode(serde_json::to_vec(&identity)?);
        let signature = base64::engine::general_purpose::STANDARD
            .encode(signing_key.sign(payload.as_bytes()).to_bytes());

        Ok(Self { payload, signature })
    }

    /// Read the identity without checking the signature.
    ///
    /// # Errors
    ///
    /// * the payload is not a base64 encoded [`ServerIdentity`]
    pub fn peek_unverified(&self) -> Result<ServerIdentity, SelfIdentError> {
        let bytes = base64::engine::general_purpose::STANDARD.decode(&self.payload)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Read the identity, checking it is signed by the root key it contains.
    ///
    /// # Errors
    ///
    /// * see [`SelfIdentError`]
    pub fn assert_get(&self) -> Result<ServerIdentity, SelfIdentError> {
        let identity = self.peek_unverified()?;

        let root = ed25519_dalek::VerifyingKey::from_bytes(identity.root_public_key.as_bytes())
            .map_err(|e| SelfIdentError::Material(e.to_string()))?;
        let signature = ed25519_dalek::Signature::from_slice(
            &base64::engine::general_purpose::STANDARD.decode(&self.signature)?,
        )
        .map_err(|e| SelfIdentError::Material(e.to_string()))?;

        root.verify(self.payload.as_bytes(), &signature)
            .map_err(|_| SelfIdentError::Signature)?;

        Ok(identity)
    }

    /// JSON form, stored in the server url cache.
    ///
    /// # Errors
    ///
    /// * see [`serde_json::to_string`]
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
