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

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::{Duration, Instant},
};

use addrpool_common_runtime::Runtime;
use tokio::{sync::Notify, task::JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::{
    config::WorkerConfig,
    context::WorkerContext,
    driver::TriggerDriver,
    err::WorkResult,
    handle::WorkerHandle,
    metrics::{
        Event, Outcome, WORKER_ACTIVE, WORKER_EXECUTION_DURATION_SECONDS, record_event,
        record_execution,
    },
    worker::Worker,
};

/// Outcome of [`Manager::shutdown`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Workers that returned on their own before the deadline.
    pub stopped: usize,
    /// Workers aborted because the shutdown timeout elapsed.
    pub aborted: usize,
}

/// Manages lifecycle of multiple background workers.
pub struct Manager {
    cancel_token:     CancellationToken,
    runtime:          Option<Arc<Runtime>>,
    shutdown_timeout: Duration,
    joins:            JoinSet<WorkResult>,
}

impl Manager {
    pub fn new(config: WorkerConfig) -> Self {
        Manager {
            cancel_token:     CancellationToken::new(),
            runtime:          config.runtime(),
            shutdown_timeout: config.shutdown_timeout(),
            joins:            JoinSet::new(),
        }
    }

    /// Number of workers that have not finished yet.
    pub fn len(&self) -> usize { self.joins.len() }

    pub fn is_empty(&self) -> bool { self.joins.is_empty() }

    /// Register a new worker and return its handle.
    ///
    /// The worker starts immediately in a background task.
    pub fn register<W>(&mut self, mut worker: W) -> WorkerHandle
    where
        W: Worker,
    {
        let name = worker.name();
        let trigger = worker.trigger();
        let notify = Arc::new(Notify::new());
        let paused = Arc::new(AtomicBool::new(false));
        let ctx = WorkerContext::new(
            name.clone(),
            self.cancel_token.child_token(),
            notify.clone(),
        );

        let task_paused = paused.clone();
        let task_name = name.clone();
        let task = async move {
            let name = task_name.as_str();
            info!(worker = name, trigger = ?trigger, "Worker starting");
            record_event(name, Event::Started);
            WORKER_ACTIVE.with_label_values(&[name]).set(1);

            let result = match worker.on_start(&ctx).await {
                Ok(()) => {
                    Self::run_loop(&mut worker, &ctx, &task_paused, TriggerDriver::new(trigger))
                        .await
                }
                Err(e) => {
                    error!(worker = name, error = %e, "Worker failed during on_start");
                    Err(e)
                }
            };

            // on_shutdown runs even after a fatal error.
            if let Err(e) = worker.on_shutdown(&ctx).await {
                error!(worker = name, error = %e, "Worker failed during on_shutdown");
            }

            match &result {
                Ok(()) => {
                    info!(worker = name, "Worker stopped gracefully");
                    record_event(name, Event::Stopped);
                }
                Err(e) => {
                    error!(worker = name, error = %e, "Worker stopped by fatal error");
                    record_event(name, Event::Failed);
                }
            }
            WORKER_ACTIVE.with_label_values(&[name]).set(0);
            result
        };

        let runtime = self
            .runtime
            .clone()
            .unwrap_or_else(addrpool_common_runtime::background_runtime);
        self.joins.spawn_on(task, runtime.handle());

        WorkerHandle::new(name, notify, paused)
    }

    async fn run_loop<W>(
        worker: &mut W,
        ctx: &WorkerContext,
        paused: &AtomicBool,
        mut driver: TriggerDriver,
    ) -> WorkResult
    where
        W: Worker,
    {
        let name = ctx.name();
        while driver.wait_next(ctx).await {
            if paused.load(Ordering::Acquire) {
                continue;
            }

            let start = Instant::now();
            match worker.work(ctx).await {
                Ok(()) => {
                    record_execution(name, Outcome::Ok);
                    WORKER_EXECUTION_DURATION_SECONDS
                        .with_label_values(&[name])
                        .observe(start.elapsed().as_secs_f64());
                }
                Err(e) if e.is_transient() => {
                    warn!(worker = name, error = %e, "Worker execution failed, will retry");
                    record_execution(name, Outcome::Transient);
                }
                Err(e) => {
                    record_execution(name, Outcome::Fatal);
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    /// Gracefully shutdown all workers.
    ///
    /// Cancels all workers and waits for them to finish within the configured
    /// timeout. Workers not responding in time are aborted.
    pub async fn shutdown(mut self) -> ShutdownReport {
        info!(workers = self.joins.len(), "Shutting down worker manager");
        self.cancel_token.cancel();

        let deadline = tokio::time::Instant::now() + self.shutdown_timeout;
        let mut report = ShutdownReport::default();

        loop {
            tokio::select! {
                result = self.joins.join_next() => {
                    match result {
                        Some(Ok(_)) => report.stopped += 1,
                        Some(Err(e)) if e.is_cancelled() => report.aborted += 1,
                        Some(Err(e)) => {
                            report.stopped += 1;
                            error!(error = %e, "Worker panicked");
                        }
                        None => break,
                    }
                }
                () = tokio::time::sleep_until(deadline) => {
                    error!(
                        timeout = ?self.shutdown_timeout,
                        remaining = self.joins.len(),
                        "Shutdown timeout reached, aborting remaining workers"
                    );
                    self.joins.abort_all();
                    while let Some(result) = self.joins.join_next().await {
                        match result {
                            Err(e) if e.is_cancelled() => report.aborted += 1,
                            _ => report.stopped += 1,
                        }
                    }
                    break;
                }
            }
        }

        info!(
            stopped = report.stopped,
            aborted = report.aborted,
            "Worker manager shut down"
        );
        report
    }
}
