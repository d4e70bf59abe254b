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
//! Secrets of the server, stored base64 encoded in the files named by `server.keys`.

use anyhow::Context;
use base64::Engine;
use rdrop_common::{re::ed25519_dalek, BoxKeyring, Keyring, SelfIdent};
use rdrop_config::Config;

/// Read the boxing key pair.
///
/// # Errors
///
/// * the file cannot be read
/// * the file does not contain a base64 encoded 32 bytes secret
pub fn read_boxing_key(path: &std::path::Path) -> anyhow::Result<BoxKeyring> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot read boxing key at '{}'", path.display()))?;

    BoxKeyring::from_secret_base64(&content)
        .with_context(|| format!("Invalid boxing key at '{}'", path.display()))
}

/// Read the signing key of the self-ident.
///
/// # Errors
///
/// * the file cannot be read
/// * the file does not contain a base64 encoded 32 bytes secret
pub fn read_signing_key(path: &std::path::Path) -> anyhow::Result<ed25519_dalek::SigningKey> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot read signing key at '{}'", path.display()))?;

    let bytes = base64::engine::general_purpose::STANDARD
        .decode(content.trim())
        .with_context(|| format!("Invalid signing key at '{}'", path.display()))?;
    let secret = <[u8; 32]>::try_from(bytes.as_slice()).map_err(|_| {
        anyhow::anyhow!(
            "Invalid signing key at '{}': expected 32 bytes, got {}",
            path.display(),
            bytes.len()
        )
    })?;

    Ok(ed25519_dalek::SigningKey::from_bytes(&secret))
}

fn write_new(path: &std::path::Path, content: &str) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::DirBuilder::new()
            .recursive(true)
            .create(parent)
            .with_context(|| format!("Cannot create '{}'", parent.display()))?;
    }

    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .with_context(|| format!("Cannot create key file '{}'", path.display()))?;
    std::io::Write::write_all(&mut file, content.as_bytes())?;
    std::io::Write::write_all(&mut file, b"\n")?;
    Ok(())
}

/// Write fresh secrets at the paths of `server.keys`, existing files are never overwritten.
///
/// # Errors
///
/// * one of the files already exists
/// * the files cannot be written
pub fn generate(config: &Config) -> anyhow::Result<()> {
    let boxing = BoxKeyring::generate();
    let signing = ed25519_dalek::SigningKey::generate(&mut rand::rngs::OsRng);

    write_new(&config.server.keys.boxing, &boxing.secret_base64())?;
    write_new(
        &config.server.keys.signing,
        &base64::engine::general_purpose::STANDARD.encode(signing.to_bytes()),
    )?;

    tracing::info!(key = %boxing.boxing_public_key(), "Server keys generated.");
    Ok(())
}

/// Read both secrets and sign the self-ident advertising `server.url`.
///
/// # Errors
///
/// * see [`read_boxing_key`] and [`read_signing_key`]
pub fn load(config: &Config) -> anyhow::Result<(BoxKeyring, SelfIdent)> {
    let keyring = read_boxing_key(&config.server.keys.boxing)?;
    let signing = read_signing_key(&config.server.keys.signing)?;

    let self_ident = SelfIdent::sign(
        &signing,
        *keyring.boxing_public_key(),
        config.server.url.clone(),
    )
    .context("Cannot sign the self-ident")?;

    Ok((keyring, self_ident))
}

#[cfg(test)]
mod tests {
    use rdrop_common::Keyring;

    fn config(dir: &std::path::Path) -> rdrop_config::Config {
        let mut config = rdrop_test::config::local_test();
        config.server.keys.boxing = dir.join("keys/boxing.key");
        config.server.keys.signing = dir.join("keys/signing.key");
        config
    }

    #[test]
    fn generate_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());

        super::generate(&config).unwrap();
        let (keyring, self_ident) = super::load(&config).unwrap();

        let identity = self_ident.assert_get().unwrap();
        assert_eq!(identity.boxing_public_key, *keyring.boxing_public_key());
        assert_eq!(identity.url, config.server.url);
    }

    #[test]
    fn never_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());

        super::generate(&config).unwrap();
        let before = std::fs::read_to_string(&config.server.keys.boxing).unwrap();

        assert!(super::generate(&config).is_err());
        assert_eq!(
            std::fs::read_to_string(&config.server.keys.boxing).unwrap(),
            before
        );
    }

    #[test]
    fn truncated_signing_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("signing.key");
        std::fs::write(&path, "AAAA\n").unwrap();

        assert!(super::read_signing_key(&path).is_err());
    }
}
