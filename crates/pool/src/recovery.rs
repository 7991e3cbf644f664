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

//! Rebuilds the in-memory pool from the durable store at startup.

use std::collections::BTreeSet;

use addrpool_common_storage_kv::DurableStore;
use serde::Serialize;
use snafu::{OptionExt, ResultExt, ensure};
use tracing::{debug, info};

use crate::{
    error::{
        CheckpointSnafu, CompactSnafu, DecodeRecordSnafu, IdMismatchSnafu, MalformedKeySnafu,
        MalformedMetaSnafu, ReadSnafu, Result, ScanSnafu,
    },
    keys,
    record::{AddressId, AddressRecord},
};

/// What recovery found, or would find, in a store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecoveryReport {
    /// Records pushed back into the queue.
    pub restored:          usize,
    /// `address:` records skipped because they carry a tombstone.
    pub skipped_consumed:  usize,
    /// Tombstones present in the store.
    pub tombstones:        usize,
    /// Tombstones removed together with their records.
    pub compacted:         usize,
    /// First id the restored allocator hands out.
    pub next_id:           u64,
    /// `meta:pool_size` as of the last checkpoint.
    pub checkpointed_size: Option<u64>,
}

pub(crate) struct Recovered {
    pub(crate) records:  Vec<AddressRecord>,
    pub(crate) report:   RecoveryReport,
    /// Id mark stored before serving; ids below it may be handed out.
    pub(crate) reserved: u64,
}

/// Read-only pass over the store. Performs no writes.
pub fn inspect(store: &dyn DurableStore) -> Result<RecoveryReport> {
    scan(store).map(|(recovered, _)| recovered.report)
}

/// Full recovery: scan, reserve the first block of ids, then compact
/// consumed records. Every failure is fatal to startup.
pub(crate) fn recover(store: &dyn DurableStore, id_block: u64) -> Result<Recovered> {
    let (mut recovered, tombstones) = scan(store)?;

    let reserved = recovered.report.next_id.saturating_add(id_block.max(1));
    store
        .put(keys::NEXT_ID_KEY, &keys::encode_u64(reserved))
        .context(CheckpointSnafu {
            key: keys::NEXT_ID_KEY,
        })?;
    recovered.reserved = reserved;

    for id in &tombstones {
        store
            .delete(&keys::address_key(*id))
            .context(CompactSnafu { id: id.get() })?;
        store
            .delete(&keys::consumed_key(*id))
            .context(CompactSnafu { id: id.get() })?;
    }
    recovered.report.compacted = tombstones.len();

    let report = &recovered.report;
    info!(
        restored = report.restored,
        skipped_consumed = report.skipped_consumed,
        compacted = report.compacted,
        next_id = report.next_id,
        reserved,
        checkpointed_size = ?report.checkpointed_size,
        "Recovered address pool"
    );
    Ok(recovered)
}

fn scan(store: &dyn DurableStore) -> Result<(Recovered, BTreeSet<AddressId>)> {
    let tombstones = store
        .scan_prefix(keys::CONSUMED_PREFIX)
        .context(ScanSnafu {
            prefix: keys::CONSUMED_PREFIX,
        })?
        .into_iter()
        .map(|(key, _)| {
            keys::parse_id(&key, keys::CONSUMED_PREFIX).context(MalformedKeySnafu { key })
        })
        .collect::<Result<BTreeSet<_>>>()?;

    let entries = store
        .scan_prefix(keys::ADDRESS_PREFIX)
        .context(ScanSnafu {
            prefix: keys::ADDRESS_PREFIX,
        })?;

    let mut highest = tombstones.last().copied();
    let mut records = Vec::with_capacity(entries.len());
    let mut skipped_consumed = 0;
    for (key, value) in entries {
        let id = keys::parse_id(&key, keys::ADDRESS_PREFIX)
            .context(MalformedKeySnafu { key: key.clone() })?;
        highest = highest.max(Some(id));
        if tombstones.contains(&id) {
            skipped_consumed += 1;
            continue;
        }
        let record = AddressRecord::decode(&value).context(DecodeRecordSnafu { key: key.clone() })?;
        ensure!(
            record.id == id,
            IdMismatchSnafu {
                key,
                found: record.id.get(),
            }
        );
        records.push(record);
    }
    // Keys come back in ascending order; sort anyway so the queue order does
    // not depend on the backend.
    records.sort_unstable_by_key(|r| r.id);

    let checkpointed_next = read_meta(store, keys::NEXT_ID_KEY)?;
    let checkpointed_size = read_meta(store, keys::POOL_SIZE_KEY)?;
    let next_id = checkpointed_next
        .unwrap_or(0)
        .max(highest.map_or(0, |id| id.get().saturating_add(1)));

    debug!(
        records = records.len(),
        tombstones = tombstones.len(),
        ?checkpointed_next,
        "Scanned durable store"
    );

    let report = RecoveryReport {
        restored: records.len(),
        skipped_consumed,
        tombstones: tombstones.len(),
        compacted: 0,
        next_id,
        checkpointed_size,
    };
    Ok((
        Recovered {
            records,
            report,
            reserved: next_id,
        },
        tombstones,
    ))
}

fn read_meta(store: &dyn DurableStore, key: &'static str) -> Result<Option<u64>> {
    let Some(bytes) = store.get(key).context(ReadSnafu { key })? else {
        return Ok(None);
    };
    keys::decode_u64(&bytes)
        .map(Some)
        .context(MalformedMetaSnafu {
            key,
            len: bytes.len(),
        })
}
