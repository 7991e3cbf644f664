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

use std::time::{Duration, Instant};

use addrpool_app::{AppConfig, inspect};
use addrpool_common_storage_kv::StoreConfig;
use addrpool_pool::{GenerationConfig, PersistenceConfig, PoolConfig};
use addrpool_server::http::RestServerConfig;
use tempfile::TempDir;

fn config(dir: &TempDir) -> AppConfig {
    AppConfig::builder()
        .store(
            StoreConfig::builder()
                .path(dir.path().join("pool.redb"))
                .build(),
        )
        .pool(PoolConfig::builder().soft_limit(40).build())
        .generation(
            GenerationConfig::builder()
                .workers(2)
                .batch_size(10)
                .tick_interval(Duration::from_millis(10))
                .build(),
        )
        .persistence(PersistenceConfig::builder().max_in_flight(8).build())
        .http(RestServerConfig::builder().bind_address("127.0.0.1:0").build())
        .worker_shutdown_timeout(Duration::from_secs(5))
        .enable_graceful_shutdown(false)
        .build()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn pool_survives_restart() {
    let dir = TempDir::new().unwrap();

    let app = config(&dir).open();
    let mut handle = app.start().await.unwrap();
    assert!(handle.is_running());

    let deadline = Instant::now() + Duration::from_secs(10);
    while !handle.pool().is_saturated() && Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(handle.pool().is_saturated());
    let served = handle.pool().get_next_address().unwrap();

    handle.shutdown();
    handle.wait_for_shutdown().await;
    assert!(!handle.is_running());
    let final_size = handle.pool().count_addresses();
    assert!(handle.pool().durability().is_caught_up());
    // Release the last pool handle, and with it the store file.
    drop(handle);

    let report = inspect(&config(&dir).store).unwrap();
    assert_eq!(report.restored, final_size);
    assert_eq!(report.checkpointed_size, Some(final_size as u64));
    assert!(report.next_id > served.id.get());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn corrupted_store_prevents_startup() {
    use addrpool_common_storage_kv::{DurableStore, RedbStore};

    let dir = TempDir::new().unwrap();
    let config = config(&dir);
    {
        let store = RedbStore::open(&config.store).unwrap();
        store
            .put("address:00000000000000000000", b"garbage")
            .unwrap();
    }

    assert!(config.open().start().await.is_err());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn failed_server_start_stops_workers_with_final_checkpoint() {
    let dir = TempDir::new().unwrap();
    let occupied = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let mut config = config(&dir);
    config.http.bind_address = occupied.local_addr().unwrap().to_string();

    assert!(config.clone().open().start().await.is_err());

    // Generators were stopped before the checkpointer, and pending writes
    // drained, so the stored size matches what a restart restores.
    let report = inspect(&config.store).unwrap();
    assert_eq!(report.checkpointed_size, Some(report.restored as u64));
}
