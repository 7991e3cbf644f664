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

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use tokio::sync::Notify;

use crate::metrics::{Event, record_event};

/// Handle to control a running worker.
#[derive(Clone)]
pub struct WorkerHandle {
    name:   String,
    notify: Arc<Notify>,
    paused: Arc<AtomicBool>,
}

impl WorkerHandle {
    pub(crate) fn new(name: String, notify: Arc<Notify>, paused: Arc<AtomicBool>) -> Self {
        WorkerHandle {
            name,
            notify,
            paused,
        }
    }

    pub fn name(&self) -> &str { &self.name }

    /// Wake a `Notify` or `IntervalOrNotify` worker.
    pub fn notify(&self) { self.notify.notify_one(); }

    /// Pause the worker. Triggers keep firing but `work()` is skipped.
    pub fn pause(&self) {
        self.paused.store(true, Ordering::Release);
        record_event(&self.name, Event::Paused);
    }

    /// Resume a paused worker.
    pub fn resume(&self) {
        self.paused.store(false, Ordering::Release);
        record_event(&self.name, Event::Resumed);
    }

    /// Check if the worker is currently paused.
    pub fn is_paused(&self) -> bool { self.paused.load(Ordering::Acquire) }
}
