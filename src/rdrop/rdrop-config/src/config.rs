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

/// This structure contains all the field to configure the server at the startup.
///
/// This structure will be loaded from a configuration file `-c, --config`
/// argument of the program. See [`crate::Config::from_toml`].
///
/// All field are optional and defaulted if missing.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// rdrop's version requirement to parse this configuration file.
    pub version_requirement: semver::VersionReq,
    /// see [`field::FieldServer`]
    #[serde(default)]
    pub server: field::FieldServer,
}

/// The inner field of the rdrop's configuration.
#[allow(clippy::module_name_repetitions)]
pub mod field {
    use rdrop_common::SelfIdent;

    /// This structure contains all the field to configure the server at the startup.
    #[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
    #[serde(deny_unknown_fields)]
    pub struct FieldServer {
        /// Name of the server, used in logs.
        #[serde(default = "FieldServer::hostname")]
        pub name: String,
        /// Url advertised in the self-ident of this server.
        #[serde(default = "FieldServer::default_url")]
        pub url: url::Url,
        /// Maximum number of peer connections served at the same time.
        ///
        /// The peer will be rejected if the server is full.
        ///
        /// If this value is `-1`, then the server will accept any number of peers.
        #[serde(default = "FieldServer::default_client_count_max")]
        pub client_count_max: i64,
        /// see [`FieldServerSystem`]
        #[serde(default)]
        pub system: FieldServerSystem,
        /// see [`FieldServerInterfaces`]
        #[serde(default)]
        pub interfaces: FieldServerInterfaces,
        /// see [`FieldServerKeys`]
        #[serde(default)]
        pub keys: FieldServerKeys,
        /// see [`FieldServerLogs`]
        #[serde(default)]
        pub logs: FieldServerLogs,
        /// see [`FieldServerDelivery`]
        #[serde(default)]
        pub delivery: FieldServerDelivery,
        /// see [`FieldServerStorage`]
        #[serde(default)]
        pub storage: FieldServerStorage,
        /// Self-idents of known peers, seeded in the server url cache at
        /// startup with the trust-on-first-use policy.
        #[serde(default)]
        pub peers: Vec<SelfIdent>,
    }

    /// The field related to the thread allocation.
    #[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
    #[serde(deny_unknown_fields)]
    pub struct FieldServerSystem {
        /// see [`FieldServerSystemThreadPool`]
        #[serde(default)]
        pub thread_pool: FieldServerSystemThreadPool,
    }

    /// The field related to the thread allocation.
    #[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
    #[serde(deny_unknown_fields)]
    pub struct FieldServerSystemThreadPool {
        /// Number of thread used by the pool `receiver`.
        ///
        /// This pool receive the peer connections, runs the delivery tasks
        /// and the outbound deliveries they trigger.
        #[serde(default = "FieldServerSystemThreadPool::default_receiver")]
        pub receiver: usize,
    }

    /// Address served by rdrop. Either ipv4 or ipv6.
    #[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
    #[serde(deny_unknown_fields)]
    pub struct FieldServerInterfaces {
        /// List of address accepting peer deliveries.
        #[serde(default)]
        #[serde(deserialize_with = "crate::parser::socket_addr::deserialize")]
        pub addr: Vec<std::net::SocketAddr>,
    }

    /// Location of the server's secrets.
    ///
    /// Each file contains a base64 encoded 32 bytes secret.
    #[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
    #[serde(deny_unknown_fields)]
    pub struct FieldServerKeys {
        /// X25519 secret of the boxing key pair.
        #[serde(default = "FieldServerKeys::default_boxing")]
        pub boxing: std::path::PathBuf,
        /// ed25519 secret signing the self-ident.
        #[serde(default = "FieldServerKeys::default_signing")]
        pub signing: std::path::PathBuf,
    }

    /// The field related to the logs.
    #[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
    #[serde(deny_unknown_fields)]
    pub struct FieldServerLogs {
        /// Directory of the server's log.
        ///
        /// A daily rolling file will be created at `{filepath}/rdrop.{YYYY-MM-DD}`.
        #[serde(default = "FieldServerLogs::default_filepath")]
        pub filepath: std::path::PathBuf,
        /// Customize the log level of the different part of the program.
        ///
        /// See <https://docs.rs/tracing-subscriber/0.3.15/tracing_subscriber/filter/struct.EnvFilter.html>
        #[serde(
            default = "FieldServerLogs::default_level",
            serialize_with = "crate::parser::tracing_directive::serialize",
            deserialize_with = "crate::parser::tracing_directive::deserialize"
        )]
        pub level: Vec<tracing_subscriber::filter::Directive>,
    }

    /// Outbound deliveries to peer servers.
    #[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
    #[serde(deny_unknown_fields)]
    pub struct FieldServerDelivery {
        /// Time allowed to open the connection to the peer.
        #[serde(with = "humantime_serde")]
        #[serde(default = "FieldServerDelivery::default_connect_timeout")]
        pub connect_timeout: std::time::Duration,
        /// Time allowed to the peer to answer each frame.
        #[serde(with = "humantime_serde")]
        #[serde(default = "FieldServerDelivery::default_reply_timeout")]
        pub reply_timeout: std::time::Duration,
        /// Maximum size in bytes of a frame, in both directions.
        #[serde(default = "FieldServerDelivery::default_line_length_max")]
        pub line_length_max: usize,
    }

    /// Where the maildrop stores the messages, conversations and tables.
    #[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
    #[serde(deny_unknown_fields)]
    pub struct FieldServerStorage {
        /// Root of the spool.
        #[serde(default = "FieldServerStorage::default_dirpath")]
        pub dirpath: std::path::PathBuf,
    }
}
