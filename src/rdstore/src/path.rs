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
use anyhow::Context;
use base64::Engine;
use sha2::Digest;

/// Longest encoded name kept as is, leaves room for the extensions
/// within the 255 bytes file name limit.
const ENCODED_NAME_MAX: usize = 200;

/// File name standing for `name`.
///
/// Names too long for a file name are replaced by their sha256, under a
/// `sha256.` prefix which cannot collide with an encoded name.
pub fn encode(name: &str) -> String {
    let encoded = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(name);
    if encoded.len() <= ENCODED_NAME_MAX {
        return encoded;
    }

    format!(
        "sha256.{}",
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(sha2::Sha256::digest(name))
    )
}

/// Read a JSON file, `None` if it does not exist.
pub async fn read_json<T: serde::de::DeserializeOwned>(
    path: &std::path::Path,
) -> anyhow::Result<Option<T>> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => serde_json::from_str(&content)
            .with_context(|| format!("Cannot deserialize '{}'", path.display()))
            .map(Some),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(anyhow::Error::new(e).context(format!("Cannot read '{}'", path.display()))),
    }
}

/// Write a JSON file through a temporary file, so readers never see a partial content.
pub async fn write_json<T: serde::Serialize + Sync>(
    path: &std::path::Path,
    value: &T,
) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Cannot create folder: `{}`", parent.display()))?;
    }

    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, serde_json::to_vec_pretty(value)?)
        .await
        .with_context(|| format!("Cannot write '{}'", tmp.display()))?;
    tokio::fs::rename(&tmp, path)
        .await
        .with_context(|| format!("Cannot rename '{}'", tmp.display()))?;

    Ok(())
}
