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

//! Identifier allocation backed by a durable reservation.
//!
//! Ids come from an in-memory counter, but only below a high-water mark
//! that has already been written to `meta:next_id`. Recovery resumes at that
//! mark, so an id handed out before a crash is never handed out again, even
//! when none of its writes reached the store.
//!
//! The mark is raised a block at a time. Once half of the current block is
//! used a refill is scheduled in the background; allocation only waits on
//! the store when it overtakes a refill that has not landed yet.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

/// What the caller of [`IdAllocator::allocate`] still has to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Reservation {
    /// The id is already covered by a durable mark.
    Covered,
    /// Covered, and the mark should be raised to the given value in the
    /// background.
    Refill(u64),
    /// Not covered yet: the mark must reach the given value before the id is
    /// handed out.
    Required(u64),
}

pub(crate) struct IdAllocator {
    next:      AtomicU64,
    /// Every id below this is covered by the stored mark.
    reserved:  AtomicU64,
    /// Highest refill scheduled so far; one refill per block.
    requested: AtomicU64,
    block:     u64,
    /// Serializes mark writes so the stored value never moves down.
    writes:    Mutex<()>,
}

impl IdAllocator {
    pub(crate) fn new(next: u64, reserved: u64, block: u64) -> Self {
        IdAllocator {
            next:      AtomicU64::new(next),
            reserved:  AtomicU64::new(reserved),
            requested: AtomicU64::new(reserved),
            block:     block.max(1),
            writes:    Mutex::new(()),
        }
    }

    /// The next id that will be handed out.
    pub(crate) fn peek(&self) -> u64 { self.next.load(Ordering::Acquire) }

    pub(crate) fn reserved(&self) -> u64 { self.reserved.load(Ordering::Acquire) }

    pub(crate) fn allocate(&self) -> (u64, Reservation) {
        let id = self.next.fetch_add(1, Ordering::AcqRel);
        let reserved = self.reserved.load(Ordering::Acquire);
        if id >= reserved {
            return (id, Reservation::Required(id.saturating_add(self.block)));
        }
        if reserved - id <= self.block / 2 {
            let target = reserved.saturating_add(self.block);
            if self.requested.fetch_max(target, Ordering::AcqRel) < target {
                return (id, Reservation::Refill(target));
            }
        }
        (id, Reservation::Covered)
    }

    /// Store a mark of `target` through `write` unless a mark at least that
    /// high is already stored. Returns the mark in effect afterwards.
    pub(crate) fn extend_to<E>(
        &self,
        target: u64,
        write: impl FnOnce(u64) -> Result<(), E>,
    ) -> Result<u64, E> {
        let _guard = self.writes.lock();
        let current = self.reserved.load(Ordering::Acquire);
        if target <= current {
            return Ok(current);
        }
        write(target)?;
        self.reserved.store(target, Ordering::Release);
        Ok(target)
    }

    /// Store the current mark again, raised to cover every id handed out so
    /// far.
    pub(crate) fn rewrite<E>(&self, write: impl FnOnce(u64) -> Result<(), E>) -> Result<u64, E> {
        let _guard = self.writes.lock();
        let mark = self
            .reserved
            .load(Ordering::Acquire)
            .max(self.next.load(Ordering::Acquire));
        write(mark)?;
        self.reserved.store(mark, Ordering::Release);
        Ok(mark)
    }
}
