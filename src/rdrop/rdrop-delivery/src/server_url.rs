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
use rdrop_common::{KeyValueTable, PublicKey, Row, SelfIdent, SelfIdentError, ServerIdentity};

/// Table mapping a server boxing key (base64) to its url.
pub const TBL_SERVER_URL: &str = "sender:serverUrl";
/// Cell holding the url of the server.
pub const CELL_URL: &str = "u:url";
/// Cell holding the JSON self-ident the url was read from.
pub const CELL_IDENT: &str = "u:ident";

/// Error produced by the [`ServerUrlCache`].
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// No url is known for this server.
    #[error("no url known for server '{0}'")]
    UnknownServer(PublicKey),
    /// The self-ident cannot be read or is not correctly signed.
    #[error("invalid self-ident: {0}")]
    SelfIdent(#[from] SelfIdentError),
    /// A server sent the self-ident of another server.
    #[error("server '{peer}' sent the self-ident of '{announced}'")]
    NotSelf {
        /// The authenticated peer.
        peer: PublicKey,
        /// The boxing key of the self-ident.
        announced: PublicKey,
    },
    /// The self-ident is signed by another root key than the cached one.
    #[error("server '{server}' announced a self-ident signed by another root key '{root}'")]
    RootKeyMismatch {
        /// Row key.
        server: PublicKey,
        /// Root key of the rejected self-ident.
        root: PublicKey,
    },
    /// The stored row cannot be read back.
    #[error("corrupted url record for server '{server}': {reason}")]
    Corrupted {
        /// Row key.
        server: PublicKey,
        /// What is wrong.
        reason: String,
    },
    /// The backing table failed.
    #[error("{0:#}")]
    Table(anyhow::Error),
}

/// Outcome of [`ServerUrlCache::set_server_url_using_self_ident`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum SelfIdentOutcome {
    /// First contact, the url is now cached.
    Stored,
    /// The same self-ident was already cached.
    Unchanged,
    /// Another self-ident is cached for this key, it is kept.
    Mismatch,
}

/// Server boxing key to url, trust-on-first-use.
///
/// The first verified self-ident seen for a key is kept. Only the server
/// itself can rotate its url, see [`ServerUrlCache::update_server_url_from_server`].
pub struct ServerUrlCache {
    table: std::sync::Arc<dyn KeyValueTable>,
}

impl ServerUrlCache {
    ///
    #[must_use]
    pub fn new(table: std::sync::Arc<dyn KeyValueTable>) -> Self {
        Self { table }
    }

    async fn store(
        &self,
        identity: &ServerIdentity,
        self_ident: &SelfIdent,
    ) -> Result<(), CacheError> {
        let ident = self_ident
            .to_json()
            .map_err(|e| CacheError::SelfIdent(e.into()))?;
        self.table
            .put_cells(
                TBL_SERVER_URL,
                &identity.boxing_public_key.to_string(),
                Row::from([
                    (CELL_URL.to_string(), identity.url.to_string()),
                    (CELL_IDENT.to_string(), ident),
                ]),
            )
            .await
            .map_err(CacheError::Table)
    }

    /// Cache the url of a server from a self-ident relayed by anyone.
    ///
    /// The key is read without verification to look up the row. A self-ident
    /// is verified and stored only if no url is cached for its key yet. If
    /// another self-ident is cached, nothing is written.
    ///
    /// # Errors
    ///
    /// * the self-ident cannot be read
    /// * the self-ident is stored for the first time but is not correctly signed
    /// * the table failed
    #[tracing::instrument(name = "set-server-url", skip_all, fields(server))]
    pub async fn set_server_url_using_self_ident(
        &self,
        self_ident: &SelfIdent,
    ) -> Result<SelfIdentOutcome, CacheError> {
        let server = self_ident.peek_unverified()?.boxing_public_key;
        tracing::Span::current().record("server", tracing::field::display(&server));

        let cached = self
            .table
            .get_row(TBL_SERVER_URL, &server.to_string())
            .await
            .map_err(CacheError::Table)?
            .and_then(|mut row| Some((row.remove(CELL_URL)?, row.remove(CELL_IDENT)?)));

        let Some((_, cached_ident)) = cached else {
            let identity = self_ident.assert_get()?;
            self.store(&identity, self_ident).await?;
            tracing::info!(url = %identity.url, "Server url stored.");
            return Ok(SelfIdentOutcome::Stored);
        };

        if serde_json::from_str::<SelfIdent>(&cached_ident).map_or(false, |i| i == *self_ident) {
            return Ok(SelfIdentOutcome::Unchanged);
        }

        tracing::warn!(
            event = "selfIdentMismatch",
            "A different self-ident is already cached for this server, keeping it."
        );
        Ok(SelfIdentOutcome::Mismatch)
    }

    /// Replace the url of `peer` with the one it announced itself.
    ///
    /// A rotation must be signed by the root key of the cached self-ident.
    ///
    /// # Errors
    ///
    /// * the self-ident is not correctly signed
    /// * the self-ident is not the one of `peer`
    /// * [`CacheError::RootKeyMismatch`] if another root key signed the cached one
    /// * the table failed
    #[tracing::instrument(name = "update-server-url", skip_all, fields(server = %peer))]
    pub async fn update_server_url_from_server(
        &self,
        peer: &PublicKey,
        self_ident: &SelfIdent,
    ) -> Result<(), CacheError> {
        let identity = self_ident.assert_get()?;
        if identity.boxing_public_key != *peer {
            return Err(CacheError::NotSelf {
                peer: *peer,
                announced: identity.boxing_public_key,
            });
        }

        let cached_ident = self
            .table
            .get_row_cell(TBL_SERVER_URL, &peer.to_string(), CELL_IDENT)
            .await
            .map_err(CacheError::Table)?;
        if let Some(cached_ident) = cached_ident {
            let cached_root = serde_json::from_str::<SelfIdent>(&cached_ident)
                .map_err(SelfIdentError::from)
                .and_then(|i| i.peek_unverified())
                .map_err(|e| CacheError::Corrupted {
                    server: *peer,
                    reason: e.to_string(),
                })?
                .root_public_key;

            if cached_root != identity.root_public_key {
                tracing::warn!(
                    event = "selfIdentMismatch",
                    root = %identity.root_public_key,
                    "Rotation signed by another root key, keeping the cached url."
                );
                return Err(CacheError::RootKeyMismatch {
                    server: *peer,
                    root: identity.root_public_key,
                });
            }
        }

        self.store(&identity, self_ident).await?;
        tracing::debug!(url = %identity.url, "Server url updated.");
        Ok(())
    }

    /// Url of a server.
    ///
    /// # Errors
    ///
    /// * [`CacheError::UnknownServer`] if none is cached
    /// * the cached url is not valid
    /// * the table failed
    pub async fn get_server_url(&self, server: &PublicKey) -> Result<url::Url, CacheError> {
        let url = self
            .table
            .get_row_cell(TBL_SERVER_URL, &server.to_string(), CELL_URL)
            .await
            .map_err(CacheError::Table)?
            .ok_or(CacheError::UnknownServer(*server))?;

        url.parse().map_err(|e: url::ParseError| CacheError::Corrupted {
            server: *server,
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{CacheError, SelfIdentOutcome, ServerUrlCache, CELL_IDENT, CELL_URL, TBL_SERVER_URL};
    use rdrop_common::{re::ed25519_dalek, KeyValueTable, SelfIdent};
    use rdrop_test::{keys::Peer, mock::MemoryTable};

    fn cache() -> (std::sync::Arc<MemoryTable>, ServerUrlCache) {
        let table = std::sync::Arc::new(MemoryTable::default());
        (table.clone(), ServerUrlCache::new(table))
    }

    #[derive(Clone, Default)]
    struct Logs(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for Logs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl Logs {
        /// Record the events of the current thread until the guard is dropped.
        fn capture() -> (Self, tracing::subscriber::DefaultGuard) {
            let logs = Self::default();
            let writer = logs.clone();
            let guard = tracing::subscriber::set_default(
                tracing_subscriber::fmt()
                    .with_max_level(tracing::Level::TRACE)
                    .with_writer(move || writer.clone())
                    .finish(),
            );
            (logs, guard)
        }

        fn contains(&self, needle: &str) -> bool {
            String::from_utf8_lossy(&self.0.lock().unwrap()).contains(needle)
        }
    }

    #[test_log::test(tokio::test)]
    async fn first_contact() {
        let (table, cache) = cache();
        let peer = Peer::new("rdrop://peer.example.org:7400");

        assert_eq!(
            cache
                .set_server_url_using_self_ident(&peer.self_ident)
                .await
                .unwrap(),
            SelfIdentOutcome::Stored
        );

        assert_eq!(
            cache.get_server_url(&peer.boxing_public_key()).await.unwrap(),
            "rdrop://peer.example.org:7400".parse().unwrap()
        );
        let row = table
            .get_row(TBL_SERVER_URL, &peer.boxing_public_key().to_string())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row[CELL_URL], "rdrop://peer.example.org:7400");
        assert_eq!(row[CELL_IDENT], peer.self_ident.to_json().unwrap());
    }

    #[test_log::test(tokio::test)]
    async fn idempotent() {
        let (table, cache) = cache();
        let peer = Peer::new("rdrop://peer.example.org:7400");

        cache
            .set_server_url_using_self_ident(&peer.self_ident)
            .await
            .unwrap();
        let writes = table.write_count();

        let (logs, _guard) = Logs::capture();
        assert_eq!(
            cache
                .set_server_url_using_self_ident(&peer.self_ident)
                .await
                .unwrap(),
            SelfIdentOutcome::Unchanged
        );
        assert_eq!(table.write_count(), writes);
        assert!(!logs.contains("selfIdentMismatch"));
    }

    #[test_log::test(tokio::test)]
    async fn mismatch_keeps_first() {
        let (table, cache) = cache();
        let peer = Peer::new("rdrop://peer.example.org:7400");
        let moved = peer.self_ident_at("rdrop://elsewhere.example.org:7400");

        cache
            .set_server_url_using_self_ident(&peer.self_ident)
            .await
            .unwrap();
        let writes = table.write_count();

        let (logs, _guard) = Logs::capture();
        assert_eq!(
            cache.set_server_url_using_self_ident(&moved).await.unwrap(),
            SelfIdentOutcome::Mismatch
        );
        assert_eq!(table.write_count(), writes);
        assert!(logs.contains("selfIdentMismatch"));
        assert_eq!(
            cache.get_server_url(&peer.boxing_public_key()).await.unwrap(),
            "rdrop://peer.example.org:7400".parse().unwrap()
        );
    }

    #[test_log::test(tokio::test)]
    async fn forged_first_contact() {
        let (table, cache) = cache();
        let peer = Peer::new("rdrop://peer.example.org:7400");
        let forged = SelfIdent {
            payload: peer.self_ident.payload.clone(),
            signature: Peer::new("rdrop://evil.example.org:7400").self_ident.signature,
        };

        assert!(matches!(
            cache.set_server_url_using_self_ident(&forged).await,
            Err(CacheError::SelfIdent(_))
        ));
        assert_eq!(table.write_count(), 0);
    }

    #[test_log::test(tokio::test)]
    async fn unknown() {
        let (_, cache) = cache();
        let peer = Peer::new("rdrop://peer.example.org:7400");

        assert!(matches!(
            cache.get_server_url(&peer.boxing_public_key()).await,
            Err(CacheError::UnknownServer(key)) if key == peer.boxing_public_key()
        ));
    }

    #[test_log::test(tokio::test)]
    async fn rotation_by_the_server() {
        let (_, cache) = cache();
        let peer = Peer::new("rdrop://peer.example.org:7400");
        let moved = peer.self_ident_at("rdrop://elsewhere.example.org:7400");

        cache
            .set_server_url_using_self_ident(&peer.self_ident)
            .await
            .unwrap();
        cache
            .update_server_url_from_server(&peer.boxing_public_key(), &moved)
            .await
            .unwrap();

        assert_eq!(
            cache.get_server_url(&peer.boxing_public_key()).await.unwrap(),
            "rdrop://elsewhere.example.org:7400".parse().unwrap()
        );
        assert_eq!(
            cache.set_server_url_using_self_ident(&moved).await.unwrap(),
            SelfIdentOutcome::Unchanged
        );
    }

    #[test_log::test(tokio::test)]
    async fn rotation_with_another_root_key() {
        let (table, cache) = cache();
        let peer = Peer::new("rdrop://peer.example.org:7400");
        let attacker_root = ed25519_dalek::SigningKey::generate(&mut rand::rngs::OsRng);
        let hijack = SelfIdent::sign(
            &attacker_root,
            peer.boxing_public_key(),
            "rdrop://evil.example.org:7400".parse().unwrap(),
        )
        .unwrap();

        cache
            .set_server_url_using_self_ident(&peer.self_ident)
            .await
            .unwrap();
        let writes = table.write_count();

        let (logs, _guard) = Logs::capture();
        assert!(matches!(
            cache
                .update_server_url_from_server(&peer.boxing_public_key(), &hijack)
                .await,
            Err(CacheError::RootKeyMismatch { server, .. }) if server == peer.boxing_public_key()
        ));
        assert!(logs.contains("selfIdentMismatch"));
        assert_eq!(table.write_count(), writes);
        assert_eq!(
            cache.get_server_url(&peer.boxing_public_key()).await.unwrap(),
            "rdrop://peer.example.org:7400".parse().unwrap()
        );
    }

    #[test_log::test(tokio::test)]
    async fn rotation_by_another_server() {
        let (_, cache) = cache();
        let (peer, other) = (
            Peer::new("rdrop://peer.example.org:7400"),
            Peer::new("rdrop://other.example.org:7400"),
        );

        assert!(matches!(
            cache
                .update_server_url_from_server(&other.boxing_public_key(), &peer.self_ident)
                .await,
            Err(CacheError::NotSelf { .. })
        ));
    }
}
