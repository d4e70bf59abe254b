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
use crate::path;
use rdrop_common::{KeyValueTable, Row};

/// [`KeyValueTable`] stored in `{dirpath}/{table}/{row}.json`.
pub struct FsTable {
    dirpath: std::path::PathBuf,
    // serializes the read-merge-write of `put_cells`
    write: tokio::sync::Mutex<()>,
}

impl std::fmt::Debug for FsTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FsTable")
            .field("dirpath", &self.dirpath)
            .finish_non_exhaustive()
    }
}

impl FsTable {
    /// Tables rooted at `dirpath`, created lazily on the first write.
    #[must_use]
    pub fn new(dirpath: std::path::PathBuf) -> Self {
        Self {
            dirpath,
            write: tokio::sync::Mutex::new(()),
        }
    }

    fn row_path(&self, table: &str, row: &str) -> std::path::PathBuf {
        self.dirpath
            .join(path::encode(table))
            .join(format!("{}.json", path::encode(row)))
    }
}

#[async_trait::async_trait]
impl KeyValueTable for FsTable {
    async fn get_row(&self, table: &str, row: &str) -> anyhow::Result<Option<Row>> {
        path::read_json(&self.row_path(table, row)).await
    }

    #[tracing::instrument(name = "put-cells", skip(self, cells), fields(cells = cells.len()))]
    async fn put_cells(&self, table: &str, row: &str, cells: Row) -> anyhow::Result<()> {
        let row_path = self.row_path(table, row);

        let _guard = self.write.lock().await;
        let mut current = path::read_json::<Row>(&row_path).await?.unwrap_or_default();
        current.extend(cells);
        path::write_json(&row_path, &current).await?;

        tracing::trace!("Row written.");
        Ok(())
    }
}
