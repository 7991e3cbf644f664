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

use std::sync::Arc;

use addrpool_common_storage_kv::{self as kv, DurableStore};
use backon::BlockingRetryable;
use chrono::Utc;
use snafu::ResultExt;
use tracing::{debug, error, warn};

use crate::{
    config::RetryPolicy,
    error::{CheckpointSnafu, Result},
    horizon::DurabilityHorizon,
    ids::IdAllocator,
    keys,
    record::{AddressId, AddressRecord},
    spawner::TaskSpawner,
};

/// Moves pool mutations to the durable store without blocking the pool.
pub(crate) struct PersistenceBridge {
    store:   Arc<dyn DurableStore>,
    spawner: Arc<dyn TaskSpawner>,
    retry:   RetryPolicy,
    horizon: Arc<DurabilityHorizon>,
}

impl PersistenceBridge {
    pub(crate) fn new(
        store: Arc<dyn DurableStore>,
        spawner: Arc<dyn TaskSpawner>,
        retry: RetryPolicy,
    ) -> Self {
        PersistenceBridge {
            store,
            spawner,
            retry,
            horizon: Arc::new(DurabilityHorizon::default()),
        }
    }

    pub(crate) fn horizon(&self) -> &DurabilityHorizon { &self.horizon }

    pub(crate) fn store(&self) -> &Arc<dyn DurableStore> { &self.store }

    /// Schedule the write of `record` under its `address:` key.
    pub(crate) fn persist(&self, record: AddressRecord) {
        let store = self.store.clone();
        let horizon = self.horizon.clone();
        let retry = self.retry;
        self.horizon.record_scheduled();
        self.spawner.spawn(Box::new(move || {
            let id = record.id;
            let value = match record.encode() {
                Ok(value) => value,
                Err(e) => {
                    error!(%id, error = %e, "Failed to encode address record, dropping write");
                    horizon.record_dropped();
                    return;
                }
            };
            let key = keys::address_key(id);
            if write_with_retry(retry, "persist", &key, || store.put(&key, &value)) {
                horizon.record_persisted();
            } else {
                horizon.record_dropped();
            }
        }));
    }

    /// Schedule the tombstone for a consumed record: write `consumed:{id}`,
    /// then delete `address:{id}`.
    pub(crate) fn tombstone(&self, id: AddressId) {
        let store = self.store.clone();
        let horizon = self.horizon.clone();
        let retry = self.retry;
        self.horizon.record_scheduled();
        self.spawner.spawn(Box::new(move || {
            let consumed = keys::consumed_key(id);
            if !write_with_retry(retry, "tombstone", &consumed, || store.put(&consumed, &[])) {
                horizon.record_dropped();
                return;
            }
            // The tombstone alone already hides the record from recovery.
            let address = keys::address_key(id);
            if !write_with_retry(retry, "delete", &address, || store.delete(&address)) {
                debug!(%id, "Consumed record left for compaction");
            }
            horizon.record_persisted();
        }));
    }

    /// Schedule raising the id reservation to `target`.
    pub(crate) fn reserve_ids(&self, ids: Arc<IdAllocator>, target: u64) {
        let store = self.store.clone();
        let retry = self.retry;
        self.spawner.spawn(Box::new(move || {
            if reserve(&ids, store.as_ref(), retry, target).is_none() {
                warn!(requested = target, "Background id reservation failed");
            }
        }));
    }

    /// Raise the id reservation to `target` before returning. Used when
    /// allocation has overtaken the background refill.
    pub(crate) fn reserve_ids_now(&self, ids: &IdAllocator, target: u64) {
        match reserve(ids, self.store.as_ref(), self.retry, target) {
            Some(mark) => debug!(mark, "Id reservation raised inline"),
            None => error!(
                requested = target,
                reserved = ids.reserved(),
                "Could not reserve ids; ids above the stored mark may be reissued after a crash"
            ),
        }
    }

    /// Write the pool size and the id reservation. Blocks on the store.
    /// Returns the id mark that was written.
    pub(crate) fn checkpoint(&self, pool_size: usize, ids: &IdAllocator) -> Result<u64> {
        self.store
            .put(keys::POOL_SIZE_KEY, &keys::encode_u64(pool_size as u64))
            .context(CheckpointSnafu {
                key: keys::POOL_SIZE_KEY,
            })?;
        let mark = ids
            .rewrite(|mark| self.store.put(keys::NEXT_ID_KEY, &keys::encode_u64(mark)))
            .context(CheckpointSnafu {
                key: keys::NEXT_ID_KEY,
            })?;
        self.horizon.record_checkpoint(Utc::now());
        debug!(pool_size, next_id = ids.peek(), mark, "Checkpoint written");
        Ok(mark)
    }
}

fn reserve(
    ids: &IdAllocator,
    store: &dyn DurableStore,
    retry: RetryPolicy,
    target: u64,
) -> Option<u64> {
    ids.extend_to(target, |mark| {
        let value = keys::encode_u64(mark);
        if write_with_retry(retry, "reserve", keys::NEXT_ID_KEY, || {
            store.put(keys::NEXT_ID_KEY, &value)
        }) {
            Ok(())
        } else {
            Err(())
        }
    })
    .ok()
}

/// Run `op` under `policy`, retrying transient store failures. Returns
/// whether it eventually succeeded; failures are logged here.
fn write_with_retry<F>(policy: RetryPolicy, what: &'static str, key: &str, mut op: F) -> bool
where
    F: FnMut() -> kv::Result<()>,
{
    let mut attempts = 0_usize;
    let result = (|| {
        attempts += 1;
        op()
    })
    .retry(policy.backoff())
    .sleep(std::thread::sleep)
    .when(kv::Error::is_transient)
    .notify(|e, delay| {
        warn!(key, op = what, error = %e, ?delay, "Transient store failure, retrying");
    })
    .call();

    match result {
        Ok(()) => {
            if attempts > 1 {
                debug!(key, op = what, attempts, "Store write succeeded after retry");
            }
            true
        }
        Err(e) if e.is_transient() => {
            warn!(key, op = what, attempts, error = %e, "Giving up on store write after retries");
            false
        }
        Err(e) => {
            warn!(key, op = what, error = %e, "Permanent store failure, dropping write");
            false
        }
    }
}
