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

/// Duration given on the command line, in the `humantime` format (`10s`, `1h 30m`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeout(pub std::time::Duration);

impl std::str::FromStr for Timeout {
    type Err = humantime::DurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        humantime::parse_duration(s).map(Timeout)
    }
}

///
#[derive(Debug, PartialEq, Eq, clap::Parser)]
#[clap(about, version, author)]
pub struct Args {
    /// Path of the rdrop configuration file (toml format)
    #[clap(short, long, action)]
    pub config: Option<String>,

    /// Also print the logs to stdout
    #[clap(long, action)]
    pub stdout: bool,

    /// Stop the server after the given duration (mostly for testing)
    #[clap(short, long, value_parser)]
    pub timeout: Option<Timeout>,

    ///
    #[clap(subcommand)]
    pub command: Option<Commands>,
}

///
#[derive(Debug, PartialEq, Eq, clap::Subcommand)]
pub enum Commands {
    /// Print the loaded configuration in JSON
    ConfigShow,
    /// Show the difference between the loaded configuration and the default one
    ConfigDiff,
    /// Write fresh server secrets at the paths of `server.keys`
    Keygen,
    /// Print the signed self-ident of this server
    SelfIdent,
}
