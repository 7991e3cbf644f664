// Copyright 2025 Crrow
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::path::Path;

use redb::{Database, Durability, ReadableTable, TableDefinition};
use snafu::ResultExt;
use tracing::{debug, info};

use crate::{
    DurableStore, KeyValue, Result, StoreConfig, SyncMode,
    error::{CommitSnafu, CreateDirSnafu, OpenSnafu, StorageSnafu, TableSnafu, TransactionSnafu},
};

const ENTRIES: TableDefinition<&str, &[u8]> = TableDefinition::new("entries");

/// [`DurableStore`] backed by a single redb file.
///
/// Each `put`/`delete` is its own write transaction. redb serializes writers
/// internally, so concurrent persistence tasks queue up on the file lock
/// rather than on anything the pool's hot path touches.
pub struct RedbStore {
    db:         Database,
    durability: Durability,
}

impl RedbStore {
    /// Open (or create) the store described by `config`.
    pub fn open(config: &StoreConfig) -> Result<Self> {
        let path = config.path.as_path();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).context(CreateDirSnafu {
                path: parent.display().to_string(),
            })?;
        }

        let db = Database::create(path).context(OpenSnafu {
            path: path.display().to_string(),
        })?;
        info!(path = %path.display(), sync_mode = ?config.sync_mode, "Opened durable store");
        Self::with_database(db, config.sync_mode)
    }

    /// Open a store at `path` with default settings.
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::open(&StoreConfig::builder().path(path.as_ref()).build())
    }

    /// A store that lives only as long as the process. Used by tests and
    /// dry runs.
    pub fn in_memory() -> Result<Self> {
        let db = redb::Builder::new()
            .create_with_backend(redb::backends::InMemoryBackend::new())
            .context(OpenSnafu { path: ":memory:" })?;
        Self::with_database(db, SyncMode::Immediate)
    }

    fn with_database(db: Database, sync_mode: SyncMode) -> Result<Self> {
        // Read transactions fail on a table that was never created.
        let txn = db.begin_write().context(TransactionSnafu)?;
        txn.open_table(ENTRIES).context(TableSnafu)?;
        txn.commit().context(CommitSnafu)?;

        let durability = match sync_mode {
            SyncMode::Immediate => Durability::Immediate,
            SyncMode::Eventual => Durability::Eventual,
        };
        Ok(Self { db, durability })
    }
}

impl DurableStore for RedbStore {
    fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        let mut txn = self.db.begin_write().context(TransactionSnafu)?;
        txn.set_durability(self.durability);
        {
            let mut table = txn.open_table(ENTRIES).context(TableSnafu)?;
            table.insert(key, value).context(StorageSnafu { key })?;
        }
        txn.commit().context(CommitSnafu)
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let txn = self.db.begin_read().context(TransactionSnafu)?;
        let table = txn.open_table(ENTRIES).context(TableSnafu)?;
        let value = table.get(key).context(StorageSnafu { key })?;
        Ok(value.map(|guard| guard.value().to_vec()))
    }

    fn scan_prefix(&self, prefix: &str) -> Result<Vec<KeyValue>> {
        let txn = self.db.begin_read().context(TransactionSnafu)?;
        let table = txn.open_table(ENTRIES).context(TableSnafu)?;

        let mut entries = Vec::new();
        for entry in table
            .range::<&str>(prefix..)
            .context(StorageSnafu { key: prefix })?
        {
            let (key_guard, value_guard) = entry.context(StorageSnafu { key: prefix })?;
            let key = key_guard.value();
            if !key.starts_with(prefix) {
                break;
            }
            entries.push((key.to_owned(), value_guard.value().to_vec()));
        }

        debug!(prefix, entries = entries.len(), "Prefix scan complete");
        Ok(entries)
    }

    fn delete(&self, key: &str) -> Result<()> {
        let mut txn = self.db.begin_write().context(TransactionSnafu)?;
        txn.set_durability(self.durability);
        {
            let mut table = txn.open_table(ENTRIES).context(TableSnafu)?;
            table.remove(key).context(StorageSnafu { key })?;
        }
        txn.commit().context(CommitSnafu)
    }

    fn flush(&self) -> Result<()> {
        // An empty immediate commit makes every earlier eventual commit
        // durable.
        let mut txn = self.db.begin_write().context(TransactionSnafu)?;
        txn.set_durability(Durability::Immediate);
        txn.commit().context(CommitSnafu)
    }
}
