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
use rdrop_common::{PublicKey, SelfIdent};

#[test]
fn minimal() {
    pretty_assertions::assert_eq!(
        Config::from_toml(r#"version_requirement = ">=0.4.0""#).unwrap(),
        Config {
            version_requirement: ">=0.4.0".parse().unwrap(),
            ..Config::default()
        }
    );
}

#[test]
fn full() {
    let config = Config::from_toml(
        r#"
version_requirement = ">=0.4.0, <1.0.0"

[server]
name = "drop.example.org"
url = "rdrop://drop.example.org:7400"
client_count_max = -1

[server.system.thread_pool]
receiver = 2

[server.interfaces]
addr = ["0.0.0.0:7400", "[::]:7400"]

[server.keys]
boxing = "/tmp/boxing.key"
signing = "/tmp/signing.key"

[server.logs]
filepath = "/tmp/logs"
level = ["warn", "rdrop_server=debug"]

[server.delivery]
connect_timeout = "2s"
reply_timeout = "1m"
line_length_max = 4096

[server.storage]
dirpath = "/tmp/spool"
"#,
    )
    .unwrap();

    assert_eq!(config.server.name, "drop.example.org");
    assert_eq!(config.server.client_count_max, -1);
    assert_eq!(config.server.system.thread_pool.receiver, 2);
    assert_eq!(config.server.interfaces.addr.len(), 2);
    assert_eq!(
        config.server.delivery.connect_timeout,
        std::time::Duration::from_secs(2)
    );
    assert_eq!(
        config.server.delivery.reply_timeout,
        std::time::Duration::from_secs(60)
    );
    assert_eq!(
        config.server.storage.dirpath,
        std::path::PathBuf::from("/tmp/spool")
    );
    assert_eq!(config.server.logs.level.len(), 2);
}

#[rstest::rstest]
#[case::version(r#"version_requirement = "<0.1.0""#)]
#[case::unknown_field(
    r#"
version_requirement = ">=0.4.0"
[server]
domain = "example.org"
"#
)]
#[case::no_port(
    r#"
version_requirement = ">=0.4.0"
[server]
url = "rdrop://example.org"
"#
)]
#[case::wrong_scheme(
    r#"
version_requirement = ">=0.4.0"
[server]
url = "https://example.org:7400"
"#
)]
#[case::no_thread(
    r#"
version_requirement = ">=0.4.0"
[server.system.thread_pool]
receiver = 0
"#
)]
fn rejected(#[case] input: &str) {
    assert!(Config::from_toml(input).is_err());
}

#[test]
fn peers() {
    let signing = rdrop_common::re::ed25519_dalek::SigningKey::from_bytes(&[7; 32]);
    let ident = SelfIdent::sign(
        &signing,
        PublicKey([1; 32]),
        "rdrop://peer.example.org:7400".parse().unwrap(),
    )
    .unwrap();

    let input = format!(
        r#"
version_requirement = ">=0.4.0"

[[server.peers]]
payload = "{}"
signature = "{}"
"#,
        ident.payload, ident.signature
    );
    assert_eq!(Config::from_toml(&input).unwrap().server.peers, vec![ident.clone()]);

    let forged = input.replace(&ident.signature, &"A".repeat(ident.signature.len()));
    assert!(Config::from_toml(&forged).is_err());
}

#[test]
fn serialize_then_parse() {
    let config = Config::default();
    let json = serde_json::to_string(&config).unwrap();
    assert_eq!(serde_json::from_str::<Config>(&json).unwrap(), config);
}
