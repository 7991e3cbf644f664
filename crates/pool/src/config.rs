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

use std::time::Duration;

use backon::ExponentialBuilder;
use serde::{Deserialize, Serialize};
use smart_default::SmartDefault;

/// Bounded retry for store writes that fail transiently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SmartDefault, bon::Builder)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    #[default = 5]
    #[builder(default = 5)]
    pub max_attempts: usize,

    #[default(Duration::from_millis(50))]
    #[builder(default = Duration::from_millis(50))]
    #[serde(with = "humantime_serde")]
    pub initial_backoff: Duration,

    #[default(Duration::from_secs(2))]
    #[builder(default = Duration::from_secs(2))]
    #[serde(with = "humantime_serde")]
    pub max_backoff: Duration,
}

impl RetryPolicy {
    /// Retry without sleeping between attempts.
    pub fn immediate(max_attempts: usize) -> Self {
        RetryPolicy {
            max_attempts,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    pub(crate) fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.initial_backoff)
            .with_max_delay(self.max_backoff.max(self.initial_backoff))
            .with_max_times(self.max_attempts.saturating_sub(1))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, SmartDefault, bon::Builder)]
#[serde(default)]
pub struct PoolConfig {
    /// How often the pool size and id allocator are written to the store.
    #[default(Duration::from_secs(10))]
    #[builder(default = Duration::from_secs(10))]
    #[serde(with = "humantime_serde")]
    pub checkpoint_interval: Duration,

    /// Generation pauses while the pool holds at least this many records.
    /// Zero disables throttling.
    #[default = 100_000]
    #[builder(default = 100_000)]
    pub soft_limit: usize,

    /// Write a `consumed:` tombstone for every popped record so it is not
    /// served again after a restart.
    #[default = true]
    #[builder(default = true)]
    pub tombstone_on_pop: bool,

    /// Ids reserved per durable write of `meta:next_id`. A restart skips
    /// whatever part of the last block was never handed out.
    #[default = 1024]
    #[builder(default = 1024)]
    pub id_block_size: u64,

    #[builder(default)]
    pub retry: RetryPolicy,
}

/// Bounds for the production persistence spawner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, SmartDefault, bon::Builder)]
#[serde(default)]
pub struct PersistenceConfig {
    /// Store writes allowed to run at the same time.
    #[default = 64]
    #[builder(default = 64)]
    pub max_in_flight: usize,

    /// How long shutdown waits for queued writes before giving up on them.
    #[default(Duration::from_secs(5))]
    #[builder(default = Duration::from_secs(5))]
    #[serde(with = "humantime_serde")]
    pub drain_timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, SmartDefault, bon::Builder)]
#[serde(default)]
pub struct GenerationConfig {
    #[default = 2]
    #[builder(default = 2)]
    pub workers: usize,

    /// Addresses attempted per tick and worker.
    #[default = 32]
    #[builder(default = 32)]
    pub batch_size: usize,

    #[default(Duration::from_millis(100))]
    #[builder(default = Duration::from_millis(100))]
    #[serde(with = "humantime_serde")]
    pub tick_interval: Duration,

    /// Lowercase hex suffix every generated address must end with.
    #[builder(into, default)]
    pub suffix: String,

    /// Candidates drawn per address before giving up.
    #[default = 1_000_000]
    #[builder(default = 1_000_000)]
    pub max_attempts: u64,
}
