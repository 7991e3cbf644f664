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

//! Named tokio runtimes for addrpool.
//!
//! Two process-wide runtimes are created lazily: one for file I/O (durable
//! store writes) and one for background work (generation, checkpoints).
//! Callers that need isolation build their own with [`RuntimeOptions`].

mod error;
mod factory;
mod global;
mod options;

pub use error::{Error, Result};
pub use global::{
    background_runtime, file_io_runtime, init_global_runtimes, spawn_blocking_file_io,
};
pub use options::{GlobalRuntimeOptions, RuntimeOptions};
pub use tokio::{runtime::Runtime, task::JoinHandle};
