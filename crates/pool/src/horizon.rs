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

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;

const NEVER: i64 = i64::MIN;

/// Tracks how far the durable store lags behind the in-memory pool.
///
/// A write counts as scheduled when its job is handed to the spawner and as
/// persisted or dropped when the job finishes.
#[derive(Debug)]
pub struct DurabilityHorizon {
    scheduled:          AtomicU64,
    persisted:          AtomicU64,
    dropped:            AtomicU64,
    last_checkpoint_ms: AtomicI64,
}

impl Default for DurabilityHorizon {
    fn default() -> Self {
        DurabilityHorizon {
            scheduled:          AtomicU64::new(0),
            persisted:          AtomicU64::new(0),
            dropped:            AtomicU64::new(0),
            last_checkpoint_ms: AtomicI64::new(NEVER),
        }
    }
}

impl DurabilityHorizon {
    pub fn record_scheduled(&self) { self.scheduled.fetch_add(1, Ordering::AcqRel); }

    pub fn record_persisted(&self) { self.persisted.fetch_add(1, Ordering::AcqRel); }

    pub fn record_dropped(&self) { self.dropped.fetch_add(1, Ordering::AcqRel); }

    pub fn record_checkpoint(&self, at: DateTime<Utc>) {
        self.last_checkpoint_ms
            .store(at.timestamp_millis(), Ordering::Release);
    }

    pub fn snapshot(&self) -> DurabilitySnapshot {
        // Completions first so `scheduled` is never behind them.
        let persisted = self.persisted.load(Ordering::Acquire);
        let dropped = self.dropped.load(Ordering::Acquire);
        let scheduled = self.scheduled.load(Ordering::Acquire);
        let last_checkpoint = match self.last_checkpoint_ms.load(Ordering::Acquire) {
            NEVER => None,
            ms => DateTime::from_timestamp_millis(ms),
        };
        DurabilitySnapshot {
            scheduled,
            persisted,
            dropped,
            last_checkpoint,
        }
    }
}

/// Point-in-time view of [`DurabilityHorizon`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DurabilitySnapshot {
    pub scheduled:       u64,
    pub persisted:       u64,
    pub dropped:         u64,
    pub last_checkpoint: Option<DateTime<Utc>>,
}

impl DurabilitySnapshot {
    /// Writes scheduled but not yet finished.
    pub const fn pending(&self) -> u64 {
        self.scheduled
            .saturating_sub(self.persisted)
            .saturating_sub(self.dropped)
    }

    /// Every scheduled write has finished, whether it succeeded or not.
    pub const fn is_caught_up(&self) -> bool { self.pending() == 0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_counts_unfinished_writes() {
        let horizon = DurabilityHorizon::default();
        for _ in 0..3 {
            horizon.record_scheduled();
        }
        horizon.record_persisted();
        horizon.record_dropped();

        let snapshot = horizon.snapshot();
        assert_eq!(snapshot.pending(), 1);
        assert!(!snapshot.is_caught_up());
        assert_eq!(snapshot.last_checkpoint, None);

        horizon.record_persisted();
        assert!(horizon.snapshot().is_caught_up());
    }

    #[test]
    fn remembers_last_checkpoint() {
        let horizon = DurabilityHorizon::default();
        let now = Utc::now();
        horizon.record_checkpoint(now);
        let seen = horizon.snapshot().last_checkpoint.unwrap();
        assert_eq!(seen.timestamp_millis(), now.timestamp_millis());
    }
}
