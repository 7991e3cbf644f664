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
    sync::Arc,
    time::{Duration, Instant},
};

use addrpool_common_storage_kv::DurableStore as _;
use addrpool_common_worker::{Manager, WorkerConfig};
use addrpool_pool::{
    Address, AddressPool, CheckpointWorker, GenerationConfig, GenerationWorker, PersistenceConfig,
    PoolConfig, RetryPolicy, TokioSpawner, keys,
};
use common::MapStore;

fn generation_config() -> GenerationConfig {
    GenerationConfig::builder()
        .batch_size(8)
        .tick_interval(Duration::from_millis(10))
        .build()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn empty_pool_pop_is_immediate_while_workers_run() {
    let spawner = Arc::new(TokioSpawner::new(
        tokio::runtime::Handle::current(),
        &PersistenceConfig::default(),
    ));
    let pool = AddressPool::open(
        Arc::new(MapStore::default()),
        spawner.clone(),
        PoolConfig::default(),
    )
    .unwrap();

    let mut manager = Manager::new(WorkerConfig::default());
    // Generators that never succeed keep the pool empty while staying busy.
    let starved = Arc::new(|| {
        std::thread::sleep(Duration::from_millis(1));
        None::<Address>
    });
    for index in 0..2 {
        manager.register(GenerationWorker::new(
            index,
            pool.clone(),
            starved.clone(),
            &generation_config(),
        ));
    }
    manager.register(CheckpointWorker::new(pool.clone()));
    tokio::time::sleep(Duration::from_millis(30)).await;

    for _ in 0..100 {
        let start = Instant::now();
        assert!(pool.get_next_address().is_none());
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    manager.shutdown().await;
    assert!(spawner.drain(Duration::from_secs(5)).await);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn generation_stops_at_soft_limit() {
    let spawner = Arc::new(TokioSpawner::new(
        tokio::runtime::Handle::current(),
        &PersistenceConfig::default(),
    ));
    let store = Arc::new(MapStore::default());
    let pool = AddressPool::open(
        store.clone(),
        spawner.clone(),
        PoolConfig::builder()
            .soft_limit(20)
            .retry(RetryPolicy::immediate(3))
            .build(),
    )
    .unwrap();

    let mut manager = Manager::new(WorkerConfig::default());
    let generator = Arc::new(|| Some(Address::new("beef", "secret")));
    manager.register(GenerationWorker::new(
        0,
        pool.clone(),
        generator,
        &generation_config(),
    ));

    let deadline = Instant::now() + Duration::from_secs(5);
    while !pool.is_saturated() && Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    tokio::time::sleep(Duration::from_millis(100)).await;
    manager.shutdown().await;

    // One batch may overshoot the limit, never more.
    let size = pool.count_addresses();
    assert!((20..20 + 8).contains(&size), "pool size {size}");

    assert!(spawner.drain(Duration::from_secs(5)).await);
    assert!(pool.durability().is_caught_up());
    let persisted = store.scan_prefix(keys::ADDRESS_PREFIX).unwrap();
    assert_eq!(persisted.len(), size);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn checkpoint_worker_writes_on_shutdown() {
    let store = Arc::new(MapStore::default());
    let pool = AddressPool::open(
        store.clone(),
        Arc::new(addrpool_pool::InlineSpawner),
        PoolConfig::builder()
            .checkpoint_interval(Duration::from_secs(3600))
            .build(),
    )
    .unwrap();

    let mut manager = Manager::new(WorkerConfig::default());
    manager.register(CheckpointWorker::new(pool.clone()));
    tokio::time::sleep(Duration::from_millis(50)).await;

    for i in 0..3 {
        pool.store_address(Address::new(format!("{i}"), "s"));
    }
    manager.shutdown().await;

    let size = store.get(keys::POOL_SIZE_KEY).unwrap().unwrap();
    assert_eq!(keys::decode_u64(&size), Some(3));
    assert!(pool.durability().last_checkpoint.is_some());

    // Checkpoint writes block, and run on the file I/O runtime's threads.
    let writer = store.writer_of(keys::POOL_SIZE_KEY).unwrap();
    assert!(writer.starts_with("rt-file-io-"), "written on {writer}");
}
