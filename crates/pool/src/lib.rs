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

//! The address pool: a lock-free queue of ready addresses backed by an
//! eventually consistent durable store.
//!
//! Producers push through [`AddressPool::store_address`], consumers pop
//! through [`AddressPool::get_next_address`]. Both touch only the queue and
//! an atomic counter. Every push and pop also schedules a store write on a
//! [`TaskSpawner`], so durability lags the in-memory state by whatever is
//! still in flight ([`AddressPool::durability`]).
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use addrpool_common_storage_kv::RedbStore;
//! use addrpool_pool::{Address, AddressPool, InlineSpawner, PoolConfig};
//!
//! let store = Arc::new(RedbStore::in_memory()?);
//! let pool = AddressPool::open(store, Arc::new(InlineSpawner), PoolConfig::default())?;
//!
//! pool.store_address(Address::new("beef", "secret"));
//! assert_eq!(pool.count_addresses(), 1);
//! let record = pool.get_next_address().unwrap();
//! assert_eq!(record.payload.address, "beef");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod bridge;
mod config;
mod counter;
mod error;
mod generator;
mod horizon;
mod ids;
pub mod keys;
mod pool;
mod record;
pub mod recovery;
mod spawner;
mod workers;

pub use config::{GenerationConfig, PersistenceConfig, PoolConfig, RetryPolicy};
pub use counter::PoolCounter;
pub use error::{Error, Result};
pub use generator::{AddressGenerator, RandomAddressGenerator};
pub use horizon::{DurabilityHorizon, DurabilitySnapshot};
pub use pool::{AddressPool, PoolStatus};
pub use record::{Address, AddressId, AddressRecord};
pub use recovery::RecoveryReport;
pub use spawner::{DeferredSpawner, InlineSpawner, Job, TaskSpawner, TokioSpawner};
pub use workers::{CheckpointWorker, GenerationWorker};
