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
use crate::{keys, MailsenderLocalApi, Server, ServerContext};
use rdrop_common::{Keyring, SelfIdent};
use rdrop_config::Config;
use rdrop_delivery::{SelfIdentOutcome, ServerUrlCache, TcpTransport};

fn init_runtime<F>(
    sender: tokio::sync::mpsc::Sender<()>,
    name: impl Into<String>,
    worker_thread_count: usize,
    future: F,
    timeout: Option<std::time::Duration>,
) -> anyhow::Result<std::thread::JoinHandle<anyhow::Result<()>>>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let name = name.into();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(worker_thread_count)
        .enable_all()
        .thread_name(format!("{name}-child"))
        .build()?;

    std::thread::Builder::new()
        .name(format!("{name}-main"))
        .spawn(move || {
            let name_rt = name.clone();
            runtime.block_on(async move {
                tracing::info!(name = name_rt, "Runtime started successfully.");

                match timeout {
                    Some(duration) => {
                        let _elapsed = tokio::time::timeout(duration, future).await;
                    }
                    None => future.await,
                }
            });

            sender.blocking_send(())?;
            Ok(())
        })
        .map_err(anyhow::Error::new)
}

/// Seed the cache with the configured peers, trust-on-first-use,
/// and accept their connections.
async fn seed_peers(
    server_urls: &ServerUrlCache,
    auth: &rdstore::TableAuthDb,
    peers: &[SelfIdent],
) {
    for peer in peers {
        let server = match server_urls.set_server_url_using_self_ident(peer).await {
            Ok(outcome @ (SelfIdentOutcome::Stored | SelfIdentOutcome::Unchanged)) => {
                tracing::debug!(%outcome, "Peer seeded.");
                peer.assert_get().map(|identity| identity.boxing_public_key)
            }
            Ok(SelfIdentOutcome::Mismatch) => {
                tracing::warn!("Peer self-ident differs from the cached one, not authorized.");
                continue;
            }
            Err(error) => {
                tracing::warn!(%error, "Peer seeding failure.");
                continue;
            }
        };

        match server {
            Ok(server) => {
                if let Err(error) = auth.allow_server(&server).await {
                    tracing::warn!(%error, "Peer authorization failure.");
                }
            }
            Err(error) => tracing::warn!(%error, "Peer seeding failure."),
        }
    }
}

/// Start the `rdrop` server's runtime
///
/// # Errors
///
/// * the server keys cannot be read
/// * the runtime cannot be built
/// * the signal handler cannot be registered
#[allow(clippy::module_name_repetitions)]
pub fn start_runtime(
    config: Config,
    sockets: Vec<std::net::TcpListener>,
    timeout: Option<std::time::Duration>,
) -> anyhow::Result<()> {
    let config = std::sync::Arc::new(config);

    let mut error_handler = tokio::sync::mpsc::channel::<()>(3);

    let (keyring, self_ident) = keys::load(&config)?;
    let own_key = *keyring.boxing_public_key();
    tracing::info!(key = %own_key, url = %config.server.url, "Server identity loaded.");

    let table = std::sync::Arc::new(rdstore::FsTable::new(
        config.server.storage.dirpath.join("tables"),
    ));
    let server_urls = std::sync::Arc::new(ServerUrlCache::new(table.clone()));
    let auth = std::sync::Arc::new(rdstore::TableAuthDb::new(table));

    let ctx = std::sync::Arc::new(ServerContext {
        keyring: std::sync::Arc::new(keyring),
        auth: auth.clone(),
        store: std::sync::Arc::new(rdstore::FsStore::new(
            config.server.storage.dirpath.join("store"),
        )),
        sender: std::sync::Arc::new(MailsenderLocalApi::new(
            server_urls.clone(),
            std::sync::Arc::new(TcpTransport::new(&config, own_key, Some(self_ident))),
        )),
    });

    let _tasks_receiver = init_runtime(
        error_handler.0.clone(),
        "receiver",
        config.server.system.thread_pool.receiver,
        async move {
            seed_peers(&server_urls, &auth, &config.server.peers).await;

            let server = Server::new(config.clone(), ctx, server_urls);
            if let Err(error) = server.listen_and_serve(sockets).await {
                tracing::error!(%error, "Receiver failure.");
            }
        },
        timeout,
    )?;

    let error_handler_sig = error_handler.0.clone();
    let mut signals = signal_hook::iterator::Signals::new([
        // Send by `systemctl stop` (and then sending `SIGKILL`)
        signal_hook::consts::SIGTERM,
        // Ctrl+C on a terminal
        signal_hook::consts::SIGINT,
    ])?;
    let _signal_handler = std::thread::spawn(move || {
        for sig in signals.forever() {
            tracing::warn!(signal = sig, "Stopping rdrop server.");
            if error_handler_sig.blocking_send(()).is_err() {
                break;
            }
        }
    });

    error_handler.1.blocking_recv();

    Ok(())
}
