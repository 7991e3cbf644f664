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

use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam::utils::CachePadded;

/// Number of records currently in the queue.
///
/// Updated once per push and pop, so reading it never touches the queue.
#[derive(Debug, Default)]
pub struct PoolCounter {
    value: CachePadded<AtomicUsize>,
}

impl PoolCounter {
    pub fn new(initial: usize) -> Self {
        PoolCounter {
            value: CachePadded::new(AtomicUsize::new(initial)),
        }
    }

    pub fn increment(&self) { self.value.fetch_add(1, Ordering::AcqRel); }

    /// Saturates at zero.
    pub fn decrement(&self) {
        let _ = self
            .value
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |v| v.checked_sub(1));
    }

    pub fn read(&self) -> usize { self.value.load(Ordering::Acquire) }
}
