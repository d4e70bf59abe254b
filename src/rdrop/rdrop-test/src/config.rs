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
use rdrop_config::Config;

/// Get a config for local test
#[must_use]
pub fn local_test() -> Config {
    let mut config = Config::default();

    config.server.name = "testserver.example.org".to_string();
    config.server.url = "rdrop://127.0.0.1:7400".parse().unwrap();
    config.server.client_count_max = -1;
    config.server.system.thread_pool.receiver = 2;
    config.server.keys.boxing = "./tmp/keys/boxing.key".into();
    config.server.keys.signing = "./tmp/keys/signing.key".into();
    config.server.logs.filepath = "./tmp/logs".into();
    config.server.storage.dirpath = "./tmp/spool".into();
    config.server.delivery.connect_timeout = std::time::Duration::from_secs(1);
    config.server.delivery.reply_timeout = std::time::Duration::from_secs(2);

    config
}
