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

//! Executors for fire-and-forget persistence jobs.

use std::{collections::VecDeque, sync::Arc, time::Duration};

use parking_lot::Mutex;
use tokio::{runtime::Handle, sync::Semaphore};
use tokio_util::task::TaskTracker;
use tracing::{debug, warn};

use crate::config::PersistenceConfig;

/// A blocking unit of persistence work.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Runs persistence jobs somewhere off the caller's path.
///
/// `spawn` must return without waiting for the job.
pub trait TaskSpawner: Send + Sync + 'static {
    fn spawn(&self, job: Job);
}

/// Production spawner: jobs run on a runtime's blocking pool, at most
/// `max_in_flight` at a time, and are tracked so shutdown can wait for them.
#[derive(Debug, Clone)]
pub struct TokioSpawner {
    handle:  Handle,
    permits: Arc<Semaphore>,
    tracker: TaskTracker,
}

impl TokioSpawner {
    pub fn new(handle: Handle, config: &PersistenceConfig) -> Self {
        TokioSpawner {
            handle,
            permits: Arc::new(Semaphore::new(config.max_in_flight.max(1))),
            tracker: TaskTracker::new(),
        }
    }

    /// Jobs spawned and not yet finished, including those waiting for a
    /// permit.
    pub fn in_flight(&self) -> usize { self.tracker.len() }

    /// Wait until every spawned job has finished or `timeout` elapses.
    /// Returns `true` when nothing is left running.
    pub async fn drain(&self, timeout: Duration) -> bool {
        self.tracker.close();
        let remaining = self.tracker.len();
        debug!(remaining, "Draining persistence jobs");
        let drained = tokio::time::timeout(timeout, self.tracker.wait())
            .await
            .is_ok();
        if !drained {
            warn!(
                remaining = self.tracker.len(),
                ?timeout,
                "Persistence jobs still running after drain timeout"
            );
        }
        drained
    }
}

impl TaskSpawner for TokioSpawner {
    fn spawn(&self, job: Job) {
        let permits = self.permits.clone();
        self.tracker.spawn_on(
            async move {
                let Ok(_permit) = permits.acquire_owned().await else {
                    return;
                };
                if let Err(e) = tokio::task::spawn_blocking(job).await {
                    warn!(error = %e, "Persistence job panicked");
                }
            },
            &self.handle,
        );
    }
}

/// Runs every job on the calling thread before `spawn` returns.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineSpawner;

impl TaskSpawner for InlineSpawner {
    fn spawn(&self, job: Job) { job(); }
}

/// Holds jobs until the owner decides to run or discard them.
///
/// Discarding queued jobs reproduces a crash that interrupts in-flight
/// writes.
#[derive(Default)]
pub struct DeferredSpawner {
    jobs: Mutex<VecDeque<Job>>,
}

impl DeferredSpawner {
    pub fn new() -> Self { Self::default() }

    pub fn pending(&self) -> usize { self.jobs.lock().len() }

    /// Run the oldest queued job. Returns `false` if none was queued.
    pub fn run_next(&self) -> bool {
        let Some(job) = self.jobs.lock().pop_front() else {
            return false;
        };
        job();
        true
    }

    /// Run the most recently queued job first.
    pub fn run_latest(&self) -> bool {
        let Some(job) = self.jobs.lock().pop_back() else {
            return false;
        };
        job();
        true
    }

    /// Run queued jobs until none are left, including jobs queued by the
    /// jobs themselves. Returns how many ran.
    pub fn run_all(&self) -> usize {
        let mut ran = 0;
        while self.run_next() {
            ran += 1;
        }
        ran
    }

    /// Drop every queued job without running it.
    pub fn discard_all(&self) -> usize {
        let mut jobs = self.jobs.lock();
        let discarded = jobs.len();
        jobs.clear();
        discarded
    }
}

impl TaskSpawner for DeferredSpawner {
    fn spawn(&self, job: Job) { self.jobs.lock().push_back(job); }
}

impl std::fmt::Debug for DeferredSpawner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeferredSpawner")
            .field("pending", &self.pending())
            .finish()
    }
}
