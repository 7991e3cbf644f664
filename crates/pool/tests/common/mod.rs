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

#![allow(dead_code)]

use std::{
    collections::BTreeMap,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use addrpool_common_storage_kv::{
    DurableStore, KeyValue, RedbStore, Result, error::UnavailableSnafu,
};
use addrpool_pool::{AddressPool, PoolConfig, RetryPolicy, TaskSpawner};
use parking_lot::Mutex;

type FailureHook = Box<dyn Fn(usize) + Send + Sync>;

/// Wraps a store and fails the first `failures` writes whose key starts with
/// `prefix`. Failures are transient unless [`permanent`](Self::permanent) is
/// set; reads fail too after [`failing_reads`](Self::failing_reads).
pub struct FlakyStore {
    inner:      Arc<dyn DurableStore>,
    prefix:     &'static str,
    remaining:  AtomicUsize,
    attempts:   AtomicUsize,
    transient:  bool,
    fail_reads: bool,
    on_failure: Option<FailureHook>,
}

impl FlakyStore {
    pub fn new(inner: Arc<dyn DurableStore>, prefix: &'static str, failures: usize) -> Self {
        FlakyStore {
            inner,
            prefix,
            remaining: AtomicUsize::new(failures),
            attempts: AtomicUsize::new(0),
            transient: true,
            fail_reads: false,
            on_failure: None,
        }
    }

    pub fn permanent(mut self) -> Self {
        self.transient = false;
        self
    }

    pub fn failing_reads(mut self) -> Self {
        self.fail_reads = true;
        self
    }

    /// Called with the attempt number each time a failure is injected.
    pub fn on_failure(mut self, hook: impl Fn(usize) + Send + Sync + 'static) -> Self {
        self.on_failure = Some(Box::new(hook));
        self
    }

    /// Operations attempted under the prefix, failed ones included.
    pub fn attempts(&self) -> usize { self.attempts.load(Ordering::SeqCst) }

    fn maybe_fail(&self, key: &str) -> Result<()> {
        if !key.starts_with(self.prefix) {
            return Ok(());
        }
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        let failed = self
            .remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            if let Some(hook) = &self.on_failure {
                hook(attempt);
            }
            return UnavailableSnafu {
                reason:    "injected failure",
                transient: self.transient,
            }
            .fail();
        }
        Ok(())
    }

    fn maybe_fail_read(&self, key: &str) -> Result<()> {
        if self.fail_reads {
            self.maybe_fail(key)
        } else {
            Ok(())
        }
    }
}

impl DurableStore for FlakyStore {
    fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        self.maybe_fail(key)?;
        self.inner.put(key, value)
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.maybe_fail_read(key)?;
        self.inner.get(key)
    }

    fn scan_prefix(&self, prefix: &str) -> Result<Vec<KeyValue>> {
        self.maybe_fail_read(prefix)?;
        self.inner.scan_prefix(prefix)
    }

    fn delete(&self, key: &str) -> Result<()> { self.inner.delete(key) }

    fn flush(&self) -> Result<()> { self.inner.flush() }
}

/// Plain map-backed store for tests that only care about pool behaviour.
/// Remembers which thread last wrote each key.
#[derive(Default)]
pub struct MapStore {
    entries: Mutex<BTreeMap<String, Vec<u8>>>,
    writers: Mutex<BTreeMap<String, String>>,
}

impl MapStore {
    pub fn keys(&self) -> Vec<String> { self.entries.lock().keys().cloned().collect() }

    pub fn writer_of(&self, key: &str) -> Option<String> { self.writers.lock().get(key).cloned() }
}

impl DurableStore for MapStore {
    fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        self.entries.lock().insert(key.to_string(), value.to_vec());
        let thread = std::thread::current().name().unwrap_or_default().to_string();
        self.writers.lock().insert(key.to_string(), thread);
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> { Ok(self.entries.lock().get(key).cloned()) }

    fn scan_prefix(&self, prefix: &str) -> Result<Vec<KeyValue>> {
        Ok(self
            .entries
            .lock()
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.entries.lock().remove(key);
        Ok(())
    }

    fn flush(&self) -> Result<()> { Ok(()) }
}

pub fn test_config() -> PoolConfig {
    PoolConfig::builder()
        .retry(RetryPolicy::immediate(5))
        .build()
}

pub fn open_pool(store: Arc<dyn DurableStore>, spawner: Arc<dyn TaskSpawner>) -> AddressPool {
    AddressPool::open(store, spawner, test_config()).unwrap()
}

pub fn open_redb(path: &std::path::Path) -> Arc<RedbStore> { Arc::new(RedbStore::open_path(path).unwrap()) }
