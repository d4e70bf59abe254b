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
use crate::{Nonce, PublicKey};
use base64::Engine;
use chacha20poly1305::aead::{Aead, KeyInit};

const BOX_CONTEXT: &[u8] = b"rdrop:box:v1";

/// Failure to seal or open a box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BoxError {
    /// The ciphertext is not valid base64.
    #[error("ciphertext is not valid base64")]
    Encoding,
    /// Wrong key, wrong nonce or tampered ciphertext.
    #[error("box authentication failed")]
    Authentication,
    /// The opened box does not contain utf-8 text.
    #[error("box content is not utf-8")]
    Utf8,
    /// The shared secret could not be expanded.
    #[error("key derivation failed")]
    Derive,
}

/// The box primitives of a server, bound to its boxing key pair.
pub trait Keyring: Send + Sync {
    /// Public half of the boxing key pair.
    fn boxing_public_key(&self) -> &PublicKey;

    /// Authenticate and decrypt `ciphertext` (base64) boxed by `sender_key` for us.
    ///
    /// # Errors
    ///
    /// * see [`BoxError`]
    fn open_box_utf8(
        &self,
        ciphertext: &str,
        nonce: &Nonce,
        sender_key: &PublicKey,
    ) -> Result<String, BoxError>;

    /// Seal `plaintext` for `recipient_key`, output in base64.
    ///
    /// # Errors
    ///
    /// * see [`BoxError`]
    fn box_utf8(
        &self,
        plaintext: &str,
        nonce: &Nonce,
        recipient_key: &PublicKey,
    ) -> Result<String, BoxError>;
}

/// [`Keyring`] using X25519, HKDF-SHA256 and XChaCha20-Poly1305.
pub struct BoxKeyring {
    secret: x25519_dalek::StaticSecret,
    public: PublicKey,
}

impl std::fmt::Debug for BoxKeyring {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoxKeyring")
            .field("public", &self.public)
            .finish_non_exhaustive()
    }
}

impl BoxKeyring {
    /// Generate a new key pair.
    #[must_use]
    pub fn generate() -> Self {
        Self::from_secret(x25519_dalek::StaticSecret::random_from_rng(
            rand::rngs::OsRng,
        ))
    }

    /// Load the key pair from the raw secret.
    #[must_use]
    pub fn from_secret_bytes(bytes: [u8; 32]) -> Self {
        Self::from_secret(x25519_dalek::StaticSecret::from(bytes))
    }

    /// Load the key pair from a base64 encoded secret, as written by [`Self::secret_base64`].
    ///
    /// # Errors
    ///
    /// * the input is not a base64 encoded 32 bytes secret
    pub fn from_secret_base64(input: &str) -> Result<Self, crate::KeyError> {
        input
            .trim()
            .parse::<PublicKey>()
            .map(|raw| Self::from_secret_bytes(raw.0))
    }

    /// Base64 encoding of the secret, to be stored on disk.
    #[must_use]
    pub fn secret_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(self.secret.to_bytes())
    }

    fn from_secret(secret: x25519_dalek::StaticSecret) -> Self {
        let public = PublicKey(x25519_dalek::PublicKey::from(&secret).to_bytes());
        Self { secret, public }
    }

    fn cipher(&self, other: &PublicKey) -> Result<chacha20poly1305::XChaCha20Poly1305, BoxError> {
        let shared = self
            .secret
            .diffie_hellman(&x25519_dalek::PublicKey::from(other.0));

        let mut key = [0_u8; 32];
        hkdf::Hkdf::<sha2::Sha256>::new(None, shared.as_bytes())
            .expand(BOX_CONTEXT, &mut key)
            .map_err(|_| BoxError::Derive)?;

        Ok(chacha20poly1305::XChaCha20Poly1305::new(
            chacha20poly1305::Key::from_slice(&key),
        ))
    }
}

impl Keyring for BoxKeyring {
    fn boxing_public_key(&self) -> &PublicKey {
        &self.public
    }

    fn open_box_utf8(
        &self,
        ciphertext: &str,
        nonce: &Nonce,
        sender_key: &PublicKey,
    ) -> Result<String, BoxError> {
        let ciphertext = base64::engine::general_purpose::STANDARD
            .decode(ciphertext)
            .map_err(|_| BoxError::Encoding)?;

        let plaintext = self
            .cipher(sender_key)?
            .decrypt(
                chacha20poly1305::XNonce::from_slice(&nonce.0),
                ciphertext.as_slice(),
            )
            .map_err(|_| BoxError::Authentication)?;

        String::from_utf8(plaintext).map_err(|_| BoxError::Utf8)
    }

    fn box_utf8(
        &self,
        plaintext: &str,
        nonce: &Nonce,
        recipient_key: &PublicKey,
    ) -> Result<String, BoxError> {
        let ciphertext = self
            .cipher(recipient_key)?
            .encrypt(
                chacha20poly1305::XNonce::from_slice(&nonce.0),
                plaintext.as_bytes(),
            )
            .map_err(|_| BoxError::Authentication)?;

        Ok(base64::engine::general_purpose::STANDARD.encode(ciphertext))
    }
}
