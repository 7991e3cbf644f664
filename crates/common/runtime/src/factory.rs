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

use snafu::ResultExt;
use tokio::runtime::{Builder as TokioBuilder, Runtime};

use crate::{
    error::{BuildSnafu, Result},
    options::{RuntimeOptions, cpu_threads},
};

impl RuntimeOptions {
    /// Build a multi-thread runtime whose threads are named
    /// `{thread_name}-{n}`.
    ///
    /// `max_blocking_threads` caps the blocking pool. Durable store writes
    /// are issued through `spawn_blocking`, so on the file I/O runtime this
    /// bounds how many transactions can contend for the store at once.
    pub fn create(&self) -> Result<Runtime> {
        let mut builder = TokioBuilder::new_multi_thread();
        builder.worker_threads(self.worker_threads.unwrap_or_else(cpu_threads));

        if let Some(max_blocking) = self.max_blocking_threads {
            builder.max_blocking_threads(max_blocking.max(1));
        }
        if self.enable_io {
            builder.enable_io();
        }
        if self.enable_time {
            builder.enable_time();
        }

        let counter = AtomicUsize::new(0);
        let thread_name = self.thread_name.clone();
        builder.thread_name_fn(move || {
            let idx = counter.fetch_add(1, Ordering::Relaxed);
            format!("{thread_name}-{idx}")
        });

        builder.build().context(BuildSnafu {
            name: self.thread_name.clone(),
        })
    }
}
