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

use crate::{
    config::field::{
        FieldServer, FieldServerDelivery, FieldServerInterfaces, FieldServerKeys,
        FieldServerLogs, FieldServerStorage, FieldServerSystem, FieldServerSystemThreadPool,
    },
    Config,
};

impl Default for Config {
    fn default() -> Self {
        Self::ensure(Self {
            version_requirement: semver::VersionReq::parse(">=0.4.0, <1.0.0")
                .expect("hardcoded value is valid"),
            server: FieldServer::default(),
        })
        .expect("default values are coherent")
    }
}

impl Default for FieldServer {
    fn default() -> Self {
        Self {
            name: Self::hostname(),
            url: Self::default_url(),
            client_count_max: Self::default_client_count_max(),
            system: FieldServerSystem::default(),
            interfaces: FieldServerInterfaces::default(),
            keys: FieldServerKeys::default(),
            logs: FieldServerLogs::default(),
            delivery: FieldServerDelivery::default(),
            storage: FieldServerStorage::default(),
            peers: vec![],
        }
    }
}

impl FieldServer {
    pub(crate) fn hostname() -> String {
        hostname::get()
            .ok()
            .and_then(|name| name.into_string().ok())
            .unwrap_or_else(|| "localhost".to_string())
    }

    pub(crate) fn default_url() -> url::Url {
        "rdrop://127.0.0.1:7400".parse().expect("hardcoded value is valid")
    }

    pub(crate) const fn default_client_count_max() -> i64 {
        16
    }
}

impl Default for FieldServerSystem {
    fn default() -> Self {
        Self {
            thread_pool: FieldServerSystemThreadPool::default(),
        }
    }
}

impl Default for FieldServerSystemThreadPool {
    fn default() -> Self {
        Self {
            receiver: Self::default_receiver(),
        }
    }
}

impl FieldServerSystemThreadPool {
    pub(crate) const fn default_receiver() -> usize {
        6
    }
}

impl Default for FieldServerInterfaces {
    fn default() -> Self {
        Self::ipv4_localhost()
    }
}

impl FieldServerInterfaces {
    pub(crate) fn ipv4_localhost() -> Self {
        Self {
            addr: vec!["127.0.0.1:7400".parse().expect("valid")],
        }
    }
}

impl Default for FieldServerKeys {
    fn default() -> Self {
        Self {
            boxing: Self::default_boxing(),
            signing: Self::default_signing(),
        }
    }
}

impl FieldServerKeys {
    pub(crate) fn default_boxing() -> std::path::PathBuf {
        "/etc/rdrop/keys/boxing.key".into()
    }

    pub(crate) fn default_signing() -> std::path::PathBuf {
        "/etc/rdrop/keys/signing.key".into()
    }
}

impl Default for FieldServerLogs {
    fn default() -> Self {
        Self {
            filepath: Self::default_filepath(),
            level: Self::default_level(),
        }
    }
}

impl FieldServerLogs {
    pub(crate) fn default_filepath() -> std::path::PathBuf {
        "/var/log/rdrop/".into()
    }

    pub(crate) fn default_level() -> Vec<tracing_subscriber::filter::Directive> {
        vec!["warn".parse().expect("hardcoded value is valid")]
    }
}

impl Default for FieldServerDelivery {
    fn default() -> Self {
        Self {
            connect_timeout: Self::default_connect_timeout(),
            reply_timeout: Self::default_reply_timeout(),
            line_length_max: Self::default_line_length_max(),
        }
    }
}

impl FieldServerDelivery {
    pub(crate) const fn default_connect_timeout() -> std::time::Duration {
        std::time::Duration::from_secs(10)
    }

    pub(crate) const fn default_reply_timeout() -> std::time::Duration {
        std::time::Duration::from_secs(30)
    }

    pub(crate) const fn default_line_length_max() -> usize {
        64 * 1024
    }
}

impl Default for FieldServerStorage {
    fn default() -> Self {
        Self {
            dirpath: Self::default_dirpath(),
        }
    }
}

impl FieldServerStorage {
    pub(crate) fn default_dirpath() -> std::path::PathBuf {
        "/var/spool/rdrop".into()
    }
}
