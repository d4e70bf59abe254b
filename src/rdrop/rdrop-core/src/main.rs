//! rdrop federated maildrop
//!
//! The `rdrop` binary: loads the configuration, initializes the logs, then
//! either runs one of the commands or serves the peer deliveries until
//! `SIGINT`/`SIGTERM`.

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

#![doc(html_no_source)]
#![deny(missing_docs)]
#![forbid(unsafe_code)]
//
#![warn(rust_2018_idioms)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::cargo)]
//
#![allow(clippy::multiple_crate_versions)]

mod args;
mod tracing_subscriber;

use anyhow::Context;
pub use args::{Args, Commands};
use rdrop_config::Config;

/// Lines of the JSON form of `loaded` differing from the default configuration,
/// prefixed by `-` (default) or `+` (loaded).
fn config_diff(loaded: &Config) -> anyhow::Result<Vec<String>> {
    let default = serde_json::to_string_pretty(&Config::default())?;
    let loaded = serde_json::to_string_pretty(loaded)?;

    Ok(diff::lines(&default, &loaded)
        .into_iter()
        .filter_map(|line| match line {
            diff::Result::Left(l) => Some(format!("-{l}")),
            diff::Result::Right(r) => Some(format!("+{r}")),
            diff::Result::Both(..) => None,
        })
        .collect())
}

fn load_config(path: Option<&str>) -> anyhow::Result<Config> {
    path.map_or_else(
        || Ok(Config::default()),
        |path| {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Cannot read file '{path}'"))?;
            Config::from_toml(&content).context("Cannot parse the configuration")
        },
    )
}

fn try_main() -> anyhow::Result<()> {
    let args = <Args as clap::Parser>::parse();
    let config = load_config(args.config.as_deref())?;

    match args.command {
        Some(Commands::ConfigShow) => {
            println!("Loaded configuration: {}", serde_json::to_string_pretty(&config)?);
            return Ok(());
        }
        Some(Commands::ConfigDiff) => {
            for line in config_diff(&config)? {
                println!("{line}");
            }
            return Ok(());
        }
        Some(Commands::Keygen) => {
            rdrop_server::keys::generate(&config)?;
            println!(
                "Keys written to '{}' and '{}'",
                config.server.keys.boxing.display(),
                config.server.keys.signing.display()
            );
            return Ok(());
        }
        Some(Commands::SelfIdent) => {
            let (_, self_ident) = rdrop_server::keys::load(&config)?;
            println!("{}", self_ident.to_json()?);
            return Ok(());
        }
        None => {}
    }

    tracing_subscriber::initialize(&args, &config)?;
    tracing::info!(
        name = %config.server.name,
        commit = env!("GIT_HASH").trim(),
        "Starting rdrop."
    );

    let sockets = config
        .server
        .interfaces
        .addr
        .iter()
        .map(rdrop_server::socket_bind_anyhow)
        .collect::<anyhow::Result<Vec<_>>>()?;

    rdrop_server::start_runtime(config, sockets, args.timeout.map(|t| t.0))
}

fn main() {
    if let Err(err) = try_main() {
        eprintln!("ERROR: {err}");
        tracing::error!("ERROR: {err}");
        err.chain().skip(1).for_each(|cause| {
            eprintln!("because: {cause}");
            tracing::error!("because: {cause}");
        });
        std::process::exit(1);
    }
}
