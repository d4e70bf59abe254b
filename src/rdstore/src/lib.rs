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

//! rdstore: the rdrop's spool
//!
//! Filesystem backends of the collaborators consumed by the maildrop:
//! a [`StoreApi`](rdrop_common::StoreApi), a
//! [`KeyValueTable`](rdrop_common::KeyValueTable) and an
//! [`AuthApi`](rdrop_common::AuthApi) reading its decisions from the tables.

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
#![allow(clippy::module_name_repetitions)]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod implementation {
    /// Messages and conversations written in the `/var/spool/rdrop/store`
    /// directory (path configurable).
    ///
    /// ```shell
    /// $> tree -L 3 /var/spool/rdrop/store
    /// /var/spool/rdrop/store
    /// ├── conversations
    /// │   └── <conversation id>
    /// │       ├── messages
    /// │       └── participants.json
    /// └── users
    ///     └── <user>
    ///         └── <timestamp>-<uuid>.json
    /// ```
    ///
    /// Names are base64 url-safe encoded to stay valid file names.
    pub mod fs_store;
    /// One directory per table, one JSON file per row.
    pub mod fs_table;
    #[cfg(feature = "testing")]
    #[cfg_attr(docsrs, doc(cfg(feature = "testing")))]
    pub mod temp;
}

mod auth;
mod path;

pub use auth::{AuthTable, TableAuthDb};
pub use implementation::fs_store::{FsStore, StoredMessage};
pub use implementation::fs_table::FsTable;

#[cfg(feature = "testing")]
#[cfg_attr(docsrs, doc(cfg(feature = "testing")))]
pub use implementation::temp::TempSpool;
