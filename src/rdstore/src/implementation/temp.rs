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
use crate::{FsStore, FsTable, TableAuthDb};

/// A spool in a temporary directory, removed on drop.
pub struct TempSpool {
    /// Root of the spool.
    pub tempdir: tempfile::TempDir,
    table: std::sync::Arc<FsTable>,
    store: std::sync::Arc<FsStore>,
}

impl std::fmt::Debug for TempSpool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TempSpool")
            .field("tempdir", &self.tempdir.path())
            .finish_non_exhaustive()
    }
}

impl TempSpool {
    /// Create the temporary directory.
    ///
    /// # Errors
    ///
    /// * the directory cannot be created
    pub fn new() -> anyhow::Result<Self> {
        let tempdir = tempfile::Builder::new().rand_bytes(20).tempdir()?;
        Ok(Self {
            table: std::sync::Arc::new(FsTable::new(tempdir.path().join("tables"))),
            store: std::sync::Arc::new(FsStore::new(tempdir.path().join("store"))),
            tempdir,
        })
    }

    ///
    #[must_use]
    pub fn table(&self) -> std::sync::Arc<FsTable> {
        self.table.clone()
    }

    ///
    #[must_use]
    pub fn store(&self) -> std::sync::Arc<FsStore> {
        self.store.clone()
    }

    /// Authorizations read from [`Self::table`].
    #[must_use]
    pub fn auth(&self) -> TableAuthDb {
        TableAuthDb::new(self.table.clone())
    }
}
