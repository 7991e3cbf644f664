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

mod common;

use std::{
    collections::HashSet,
    sync::{Arc, OnceLock},
    thread,
    time::{Duration, Instant},
};

use addrpool_common_storage_kv::DurableStore as _;
use addrpool_pool::{
    Address, AddressId, AddressPool, DeferredSpawner, InlineSpawner, PoolConfig, keys,
};
use common::{FlakyStore, MapStore, open_pool};
use parking_lot::Mutex;

fn address(n: usize) -> Address { Address::new(format!("{n:064x}"), format!("secret-{n}")) }

#[test]
fn concurrent_push_and_pop_never_lose_or_duplicate() {
    const PRODUCERS: usize = 8;
    const PER_PRODUCER: usize = 500;
    const CONSUMERS: usize = 4;
    const PER_CONSUMER: usize = 700;
    const N: usize = PRODUCERS * PER_PRODUCER;
    const M: usize = CONSUMERS * PER_CONSUMER;

    let pool = open_pool(Arc::new(MapStore::default()), Arc::new(DeferredSpawner::new()));

    thread::scope(|s| {
        for p in 0..PRODUCERS {
            let pool = pool.clone();
            s.spawn(move || {
                for i in 0..PER_PRODUCER {
                    pool.store_address(address(p * PER_PRODUCER + i));
                }
            });
        }
    });

    let popped: Vec<_> = thread::scope(|s| {
        let handles: Vec<_> = (0..CONSUMERS)
            .map(|_| {
                let pool = pool.clone();
                s.spawn(move || {
                    let mut taken = Vec::with_capacity(PER_CONSUMER);
                    while taken.len() < PER_CONSUMER {
                        if let Some(record) = pool.get_next_address() {
                            taken.push(record.id);
                        }
                    }
                    taken
                })
            })
            .collect();
        handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect()
    });

    let distinct: HashSet<AddressId> = popped.iter().copied().collect();
    assert_eq!(popped.len(), M);
    assert_eq!(distinct.len(), M);
    assert_eq!(pool.count_addresses(), N - M);
}

#[test]
fn interleaved_push_and_pop_keep_counter_consistent() {
    let pool = open_pool(Arc::new(MapStore::default()), Arc::new(DeferredSpawner::new()));

    let consumed: usize = thread::scope(|s| {
        for p in 0..4 {
            let pool = pool.clone();
            s.spawn(move || {
                for i in 0..1000 {
                    pool.store_address(address(p * 1000 + i));
                }
            });
        }
        let consumers: Vec<_> = (0..4)
            .map(|_| {
                let pool = pool.clone();
                s.spawn(move || {
                    let mut taken = 0;
                    for _ in 0..2000 {
                        if pool.get_next_address().is_some() {
                            taken += 1;
                        }
                    }
                    taken
                })
            })
            .collect();
        consumers.into_iter().map(|h| h.join().unwrap()).sum()
    });

    assert_eq!(pool.count_addresses(), 4000 - consumed);
}

#[test]
fn count_cost_does_not_depend_on_pool_size() {
    fn time_counts(pool: &AddressPool) -> Duration {
        let start = Instant::now();
        for _ in 0..100_000 {
            std::hint::black_box(pool.count_addresses());
        }
        start.elapsed()
    }

    let small = open_pool(Arc::new(MapStore::default()), Arc::new(DeferredSpawner::new()));
    let large = open_pool(Arc::new(MapStore::default()), Arc::new(DeferredSpawner::new()));
    for i in 0..10 {
        small.store_address(address(i));
    }
    for i in 0..10_000 {
        large.store_address(address(i));
    }
    assert_eq!(small.count_addresses(), 10);
    assert_eq!(large.count_addresses(), 10_000);

    // Warm up, then compare. A scan would make the large pool ~1000x slower.
    time_counts(&small);
    time_counts(&large);
    let small_time = time_counts(&small);
    let large_time = time_counts(&large);
    assert!(
        large_time < small_time * 20 + Duration::from_millis(10),
        "small: {small_time:?}, large: {large_time:?}"
    );
}

#[test]
fn empty_pool_returns_none() {
    let pool = open_pool(Arc::new(MapStore::default()), Arc::new(InlineSpawner));
    assert!(pool.get_next_address().is_none());
    assert_eq!(pool.count_addresses(), 0);
}

#[test]
fn two_producers_three_records() {
    let pool = open_pool(Arc::new(MapStore::default()), Arc::new(InlineSpawner));

    thread::scope(|s| {
        let first = pool.clone();
        s.spawn(move || {
            first.store_address(Address::new("A", "a"));
            first.store_address(Address::new("C", "c"));
        });
        let second = pool.clone();
        s.spawn(move || {
            second.store_address(Address::new("B", "b"));
        });
    });
    assert_eq!(pool.count_addresses(), 3);

    let mut seen = HashSet::new();
    for expected in [2, 1, 0] {
        let record = pool.get_next_address().unwrap();
        seen.insert(record.payload.address);
        assert_eq!(pool.count_addresses(), expected);
    }
    assert!(pool.get_next_address().is_none());
    assert_eq!(pool.count_addresses(), 0);
    let expected: HashSet<String> = ["A", "B", "C"].into_iter().map(String::from).collect();
    assert_eq!(seen, expected);
}

#[test]
fn same_producer_order_is_fifo() {
    let pool = open_pool(Arc::new(MapStore::default()), Arc::new(InlineSpawner));
    let ids: Vec<_> = (0..5).map(|i| pool.store_address(address(i))).collect();
    let popped: Vec<_> = std::iter::from_fn(|| pool.get_next_address())
        .map(|r| r.id)
        .collect();
    assert_eq!(popped, ids);
}

#[test]
fn transient_failures_are_retried_while_record_stays_servable() {
    let inner = Arc::new(MapStore::default());
    let store = Arc::new(FlakyStore::new(inner.clone(), keys::ADDRESS_PREFIX, 2));
    let spawner = Arc::new(DeferredSpawner::new());
    let pool = open_pool(store.clone(), spawner.clone());

    let id = pool.store_address(Address::new("A", "a"));
    assert_eq!(pool.count_addresses(), 1);
    assert_eq!(pool.durability().pending(), 1);

    assert!(spawner.run_next());
    assert_eq!(store.attempts(), 3);
    assert!(inner.keys().contains(&keys::address_key(id)));

    let durability = pool.durability();
    assert_eq!(durability.persisted, 1);
    assert_eq!(durability.dropped, 0);
    assert!(durability.is_caught_up());

    assert_eq!(pool.count_addresses(), 1);
    assert_eq!(pool.get_next_address().unwrap().id, id);
}

#[test]
fn record_can_be_served_between_retry_attempts() {
    let inner = Arc::new(MapStore::default());
    let slot: Arc<OnceLock<AddressPool>> = Arc::new(OnceLock::new());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let store = {
        let slot = slot.clone();
        let seen = seen.clone();
        Arc::new(
            FlakyStore::new(inner.clone(), keys::ADDRESS_PREFIX, 2).on_failure(move |attempt| {
                let Some(pool) = slot.get() else { return };
                let mut seen = seen.lock();
                seen.push(pool.count_addresses());
                // Serve the record while its write is still being retried.
                if attempt == 2 {
                    seen.push(pool.get_next_address().map_or(usize::MAX, |r| r.id.get() as usize));
                }
            }),
        )
    };
    let spawner = Arc::new(DeferredSpawner::new());
    let pool = open_pool(store.clone(), spawner.clone());
    assert!(slot.set(pool.clone()).is_ok());

    let id = pool.store_address(Address::new("A", "a"));
    assert!(spawner.run_next());

    assert_eq!(store.attempts(), 3);
    assert_eq!(*seen.lock(), vec![1, 1, id.get() as usize]);
    assert_eq!(pool.count_addresses(), 0);
    assert!(inner.keys().contains(&keys::address_key(id)));

    // The tombstone queued by the pop still lands after the late write.
    assert!(spawner.run_next());
    let stored = inner.keys();
    assert!(stored.contains(&keys::consumed_key(id)));
    assert!(!stored.contains(&keys::address_key(id)));
    assert_eq!(pool.durability().persisted, 2);
}

#[test]
fn permanent_failure_is_not_retried() {
    let inner = Arc::new(MapStore::default());
    let store = Arc::new(FlakyStore::new(inner.clone(), keys::ADDRESS_PREFIX, 1).permanent());
    let pool = open_pool(store.clone(), Arc::new(InlineSpawner));

    let id = pool.store_address(Address::new("A", "a"));
    assert_eq!(store.attempts(), 1);

    let durability = pool.durability();
    assert_eq!(durability.dropped, 1);
    assert_eq!(durability.persisted, 0);
    assert!(!inner.keys().contains(&keys::address_key(id)));
    assert_eq!(pool.get_next_address().unwrap().id, id);
}

#[test]
fn exhausted_retries_drop_the_write_but_not_the_record() {
    let inner = Arc::new(MapStore::default());
    let store = Arc::new(FlakyStore::new(inner.clone(), keys::ADDRESS_PREFIX, 100));
    let pool = open_pool(store.clone(), Arc::new(InlineSpawner));

    let id = pool.store_address(Address::new("A", "a"));
    assert_eq!(store.attempts(), 5);
    assert_eq!(pool.durability().dropped, 1);
    assert!(!inner.keys().contains(&keys::address_key(id)));
    assert_eq!(pool.get_next_address().unwrap().id, id);
}

#[test]
fn pop_writes_tombstone_and_removes_record() {
    let store = Arc::new(MapStore::default());
    let pool = open_pool(store.clone(), Arc::new(InlineSpawner));

    let id = pool.store_address(Address::new("A", "a"));
    pool.get_next_address().unwrap();

    let stored = store.keys();
    assert!(stored.contains(&keys::consumed_key(id)));
    assert!(!stored.contains(&keys::address_key(id)));
    assert_eq!(pool.durability().persisted, 2);
}

#[test]
fn drain_empties_the_pool() {
    let store = Arc::new(MapStore::default());
    let pool = open_pool(store.clone(), Arc::new(InlineSpawner));
    for i in 0..10 {
        pool.store_address(address(i));
    }

    assert_eq!(pool.drain(), 10);
    assert_eq!(pool.count_addresses(), 0);
    assert!(pool.get_next_address().is_none());
    assert!(
        store
            .keys()
            .iter()
            .all(|k| !k.starts_with(keys::ADDRESS_PREFIX))
    );
}

#[test]
fn soft_limit_marks_pool_saturated() {
    let config = PoolConfig::builder().soft_limit(3).build();
    let pool = AddressPool::open(
        Arc::new(MapStore::default()),
        Arc::new(InlineSpawner),
        config,
    )
    .unwrap();
    for i in 0..3 {
        assert!(!pool.is_saturated());
        pool.store_address(address(i));
    }
    assert!(pool.is_saturated());
    assert!(pool.status().saturated);

    pool.get_next_address();
    assert!(!pool.is_saturated());
}

#[test]
fn checkpoint_writes_meta_keys() {
    let store = Arc::new(MapStore::default());
    let pool = open_pool(store.clone(), Arc::new(InlineSpawner));
    for i in 0..4 {
        pool.store_address(address(i));
    }
    pool.get_next_address();

    assert!(pool.durability().last_checkpoint.is_none());
    pool.checkpoint().unwrap();

    let status = pool.status();
    assert_eq!(status.pool_size, 3);
    assert_eq!(status.next_id, 4);
    assert!(status.durability.last_checkpoint.is_some());

    let size = store.get(keys::POOL_SIZE_KEY).unwrap().unwrap();
    let next = store.get(keys::NEXT_ID_KEY).unwrap().unwrap();
    assert_eq!(keys::decode_u64(&size), Some(3));
    // The stored id mark covers the whole reserved block, not just the
    // ids handed out so far.
    assert_eq!(
        keys::decode_u64(&next),
        Some(PoolConfig::default().id_block_size)
    );
}
