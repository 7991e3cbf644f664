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

//! Worker abstraction for background task scheduling.
//!
//! The address pool runs everything that is not on the request path as a
//! worker: generation loops, the periodic counter checkpoint and its final
//! flush on shutdown.
//!
//! - [`Worker`]: single-shot `work()` plus `on_start`/`on_shutdown` hooks
//! - [`Trigger`]: when `work()` runs (Once, Notify, Interval,
//!   IntervalOrNotify)
//! - [`Manager`]: spawns workers, cancels them together, bounds shutdown time
//! - [`WorkerHandle`]: pause, resume and notify a running worker
//! - [`WorkError`]: transient errors keep the schedule, fatal errors stop the
//!   worker
//!
//! ```rust,no_run
//! use std::time::Duration;
//!
//! use addrpool_common_worker::{
//!     Manager, Trigger, WorkResult, Worker, WorkerConfig, WorkerContext,
//! };
//!
//! struct Heartbeat;
//!
//! #[async_trait::async_trait]
//! impl Worker for Heartbeat {
//!     fn name(&self) -> String { "heartbeat".to_string() }
//!
//!     fn trigger(&self) -> Trigger { Trigger::Interval(Duration::from_secs(5)) }
//!
//!     async fn work(&mut self, _ctx: &WorkerContext) -> WorkResult {
//!         tracing::info!("still alive");
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut manager = Manager::new(WorkerConfig::default());
//!     let handle = manager.register(Heartbeat);
//!     handle.pause();
//!     handle.resume();
//!     manager.shutdown().await;
//! }
//! ```

mod config;
mod context;
mod driver;
mod err;
mod handle;
mod manager;
pub mod metrics;
mod trigger;
mod worker;

pub use config::WorkerConfig;
pub use context::WorkerContext;
pub use err::{ErrorSeverity, WorkError, WorkResult};
pub use handle::WorkerHandle;
pub use manager::{Manager, ShutdownReport};
pub use trigger::Trigger;
pub use worker::Worker;
