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

use addrpool_common_storage_kv::DurableStore;
use crossbeam::queue::SegQueue;
use serde::Serialize;
use tracing::{info, trace};

use crate::{
    bridge::PersistenceBridge,
    config::PoolConfig,
    counter::PoolCounter,
    error::Result,
    horizon::DurabilitySnapshot,
    ids::{IdAllocator, Reservation},
    record::{Address, AddressId, AddressRecord},
    recovery::{self, RecoveryReport},
    spawner::TaskSpawner,
};

/// Operational view of a pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolStatus {
    pub pool_size:  usize,
    pub next_id:    u64,
    pub soft_limit: usize,
    pub saturated:  bool,
    pub durability: DurabilitySnapshot,
}

/// Handle to an address pool. Cloning is cheap and every clone sees the same
/// pool.
///
/// Producers call [`store_address`](Self::store_address) and consumers call
/// [`get_next_address`](Self::get_next_address); neither waits on the other
/// or on the durable store.
#[derive(Clone)]
pub struct AddressPool {
    inner: Arc<Inner>,
}

struct Inner {
    queue:    SegQueue<AddressRecord>,
    counter:  PoolCounter,
    ids:      Arc<IdAllocator>,
    bridge:   PersistenceBridge,
    config:   PoolConfig,
    recovery: RecoveryReport,
}

impl AddressPool {
    /// Recover the pool from `store` and start serving from it.
    ///
    /// Fails if anything in the store cannot be read or decoded; a pool
    /// with unknown contents is never handed out.
    pub fn open(
        store: Arc<dyn DurableStore>,
        spawner: Arc<dyn TaskSpawner>,
        config: PoolConfig,
    ) -> Result<Self> {
        let recovered = recovery::recover(store.as_ref(), config.id_block_size)?;

        let queue = SegQueue::new();
        for record in recovered.records {
            queue.push(record);
        }
        let counter = PoolCounter::new(queue.len());

        Ok(AddressPool {
            inner: Arc::new(Inner {
                queue,
                counter,
                ids: Arc::new(IdAllocator::new(
                    recovered.report.next_id,
                    recovered.reserved,
                    config.id_block_size,
                )),
                bridge: PersistenceBridge::new(store, spawner, config.retry),
                config,
                recovery: recovered.report,
            }),
        })
    }

    /// Enqueue a new address and schedule its durable write.
    ///
    /// Only waits on the store when ids run past the stored reservation
    /// before the background refill has landed, which takes half an id
    /// block of allocations against a stalled store.
    pub fn store_address(&self, address: Address) -> AddressId {
        let (raw, reservation) = self.inner.ids.allocate();
        match reservation {
            Reservation::Covered => {}
            Reservation::Refill(target) => {
                self.inner.bridge.reserve_ids(self.inner.ids.clone(), target);
            }
            Reservation::Required(target) => {
                self.inner.bridge.reserve_ids_now(&self.inner.ids, target);
            }
        }
        let id = AddressId::new(raw);
        let record = AddressRecord::new(id, address);

        // Count before pushing so a concurrent pop never decrements first.
        self.inner.counter.increment();
        self.inner.queue.push(record.clone());
        self.inner.bridge.persist(record);

        trace!(%id, "Address stored");
        id
    }

    /// Take the oldest available address, or `None` when the pool is empty.
    pub fn get_next_address(&self) -> Option<AddressRecord> {
        let record = self.inner.queue.pop()?;
        self.inner.counter.decrement();
        if self.inner.config.tombstone_on_pop {
            self.inner.bridge.tombstone(record.id);
        }
        trace!(id = %record.id, "Address served");
        Some(record)
    }

    pub fn count_addresses(&self) -> usize { self.inner.counter.read() }

    /// Whether generation should hold off for now.
    pub fn is_saturated(&self) -> bool {
        let limit = self.inner.config.soft_limit;
        limit != 0 && self.count_addresses() >= limit
    }

    pub fn durability(&self) -> DurabilitySnapshot { self.inner.bridge.horizon().snapshot() }

    pub fn status(&self) -> PoolStatus {
        PoolStatus {
            pool_size:  self.count_addresses(),
            next_id:    self.inner.ids.peek(),
            soft_limit: self.inner.config.soft_limit,
            saturated:  self.is_saturated(),
            durability: self.durability(),
        }
    }

    /// Write the pool size and id reservation to the store. Blocks on disk
    /// I/O, so async callers should run it on the blocking pool.
    pub fn checkpoint(&self) -> Result<()> {
        self.inner
            .bridge
            .checkpoint(self.count_addresses(), &self.inner.ids)
            .map(|_| ())
    }

    /// Remove every queued address. Each one is tombstoned like a normal pop.
    /// Returns how many were removed.
    pub fn drain(&self) -> usize {
        let mut drained = 0;
        while self.get_next_address().is_some() {
            drained += 1;
        }
        info!(drained, "Address pool drained");
        drained
    }

    pub fn recovery_report(&self) -> &RecoveryReport { &self.inner.recovery }

    pub fn config(&self) -> &PoolConfig { &self.inner.config }

    /// Flush the underlying store.
    pub fn flush_store(&self) -> addrpool_common_storage_kv::Result<()> {
        self.inner.bridge.store().flush()
    }
}

impl std::fmt::Debug for AddressPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AddressPool")
            .field("pool_size", &self.count_addresses())
            .field("next_id", &self.inner.ids.peek())
            .finish_non_exhaustive()
    }
}
