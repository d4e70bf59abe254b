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
use crate::Config;

impl Config {
    /// Reject incoherent values.
    ///
    /// # Errors
    ///
    /// * the worker thread count is 0
    /// * the client count max is below -1
    /// * the server url is not an `rdrop://host:port` url
    /// * a frame cannot hold anything
    /// * a peer self-ident is not correctly signed
    pub(crate) fn ensure(config: Self) -> anyhow::Result<Self> {
        anyhow::ensure!(
            config.server.system.thread_pool.receiver != 0,
            "Worker threads cannot be set to 0"
        );

        anyhow::ensure!(
            config.server.client_count_max >= -1,
            "`client_count_max` must be -1 (unlimited) or a positive number"
        );

        anyhow::ensure!(
            config.server.url.scheme() == "rdrop"
                && config.server.url.host_str().is_some()
                && config.server.url.port().is_some(),
            "Server url must look like `rdrop://host:port`, got '{}'",
            config.server.url
        );

        anyhow::ensure!(
            config.server.delivery.line_length_max >= 1024,
            "`line_length_max` must be at least 1024 bytes"
        );

        for peer in &config.server.peers {
            let identity = peer
                .assert_get()
                .map_err(|e| anyhow::anyhow!("Invalid peer self-ident: {e}"))?;
            tracing::debug!(server = %identity.boxing_public_key, url = %identity.url, "Peer loaded.");
        }

        Ok(config)
    }
}
