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

use std::sync::Arc;

use once_cell::sync::OnceCell;
use tokio::{runtime::Runtime, task::JoinHandle};

use crate::{
    error::{AlreadyInitializedSnafu, Result},
    options::{GlobalRuntimeOptions, RuntimeOptions},
};

#[derive(Debug)]
struct GlobalRuntimes {
    file_io:    Arc<Runtime>,
    background: Arc<Runtime>,
}

static GLOBAL_RUNTIMES: OnceCell<GlobalRuntimes> = OnceCell::new();

fn build_global_runtimes(options: &GlobalRuntimeOptions) -> Result<GlobalRuntimes> {
    let file_io = RuntimeOptions::builder()
        .thread_name("rt-file-io".to_string())
        .worker_threads(options.file_io_threads)
        .max_blocking_threads(options.file_io_blocking_threads)
        .enable_io(true)
        .enable_time(true)
        .build()
        .create()?;
    let background = RuntimeOptions::builder()
        .thread_name("rt-bg".to_string())
        .worker_threads(options.background_threads)
        .enable_io(true)
        .enable_time(true)
        .build()
        .create()?;

    Ok(GlobalRuntimes {
        file_io:    Arc::new(file_io),
        background: Arc::new(background),
    })
}

fn global_runtimes() -> &'static GlobalRuntimes {
    GLOBAL_RUNTIMES.get_or_init(|| {
        build_global_runtimes(&GlobalRuntimeOptions::default())
            .expect("Failed to create global runtimes")
    })
}

/// Initialize the global runtimes with explicit thread counts.
///
/// Must run before the first use of any accessor below, otherwise the
/// defaults have already been installed and this returns an error.
pub fn init_global_runtimes(options: &GlobalRuntimeOptions) -> Result<()> {
    let runtimes = build_global_runtimes(options)?;
    if GLOBAL_RUNTIMES.set(runtimes).is_err() {
        return AlreadyInitializedSnafu.fail();
    }
    Ok(())
}

#[must_use]
pub fn file_io_runtime() -> Arc<Runtime> { Arc::clone(&global_runtimes().file_io) }

#[must_use]
pub fn background_runtime() -> Arc<Runtime> { Arc::clone(&global_runtimes().background) }

/// Run blocking store work on the file I/O runtime's bounded blocking pool.
pub fn spawn_blocking_file_io<F, R>(job: F) -> JoinHandle<R>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    file_io_runtime().handle().spawn_blocking(job)
}
