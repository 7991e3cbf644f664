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

use crate::{context::WorkerContext, err::WorkResult, trigger::Trigger};

/// Core worker trait for background tasks.
///
/// Implementors only define single-shot execution logic in `work()`.
/// The [`Manager`](crate::Manager) handles looping, triggering, pausing and
/// lifecycle.
#[async_trait::async_trait]
pub trait Worker: Send + 'static {
    /// Worker name for logging and metric labels.
    fn name(&self) -> String;

    /// Execution trigger strategy.
    fn trigger(&self) -> Trigger;

    /// Called once before the first `work()`. An error stops the worker
    /// before it ever runs.
    async fn on_start(&mut self, _ctx: &WorkerContext) -> WorkResult { Ok(()) }

    /// Single execution unit, called each time the trigger fires.
    ///
    /// Transient errors are logged and the schedule continues; fatal errors
    /// stop the worker.
    async fn work(&mut self, ctx: &WorkerContext) -> WorkResult;

    /// Called once after the last `work()`, including after a fatal error
    /// or cancellation. Not called if the worker is aborted on shutdown
    /// timeout.
    async fn on_shutdown(&mut self, _ctx: &WorkerContext) -> WorkResult { Ok(()) }
}
