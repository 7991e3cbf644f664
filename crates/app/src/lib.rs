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

//! Wires the pool, its workers and the HTTP server into one process.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use addrpool_common_runtime::spawn_blocking_file_io;
use addrpool_common_storage_kv::{DurableStore, RedbStore, StoreConfig};
use addrpool_common_telemetry::{self as telemetry, LoggingOptions, WorkerGuard};
use addrpool_common_worker::{Manager, WorkerConfig};
use addrpool_pool::{
    AddressPool, CheckpointWorker, GenerationConfig, GenerationWorker, PersistenceConfig,
    PoolConfig, RandomAddressGenerator, RecoveryReport, TokioSpawner, recovery,
};
use addrpool_server::{
    ServiceHandler,
    http::{RestServerConfig, start_rest_server},
    routes::pool_routes,
};
use bon::Builder;
use serde::{Deserialize, Serialize};
use smart_default::SmartDefault;
use snafu::{ResultExt, Whatever};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

pub const APP_NAME: &str = "addrpool";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, SmartDefault, Builder)]
#[serde(default)]
pub struct AppConfig {
    #[builder(default)]
    pub store:       StoreConfig,
    #[builder(default)]
    pub pool:        PoolConfig,
    #[builder(default)]
    pub generation:  GenerationConfig,
    #[builder(default)]
    pub persistence: PersistenceConfig,
    #[builder(default)]
    pub http:        RestServerConfig,
    #[builder(default)]
    pub logging:     LoggingOptions,

    /// How long workers get to stop before they are aborted.
    #[default(Duration::from_secs(30))]
    #[builder(default = Duration::from_secs(30))]
    #[serde(with = "humantime_serde")]
    pub worker_shutdown_timeout: Duration,

    /// Also stop on Ctrl+C and SIGTERM, not only on [`AppHandle::shutdown`].
    #[default = true]
    #[builder(default = true)]
    pub enable_graceful_shutdown: bool,
}

impl AppConfig {
    #[must_use]
    pub fn open(self) -> App {
        App {
            config:             self,
            running:            Arc::new(AtomicBool::new(false)),
            cancellation_token: CancellationToken::new(),
        }
    }
}

pub struct App {
    pub config:         AppConfig,
    running:            Arc<AtomicBool>,
    cancellation_token: CancellationToken,
}

/// Control over a started [`App`].
pub struct AppHandle {
    shutdown_tx:        Option<oneshot::Sender<()>>,
    running:            Arc<AtomicBool>,
    cancellation_token: CancellationToken,
    pool:               AddressPool,
    local_addr:         std::net::SocketAddr,
}

impl AppHandle {
    /// Ask the app to stop. Returns immediately; see
    /// [`wait_for_shutdown`](Self::wait_for_shutdown).
    pub fn shutdown(&mut self) {
        info!("Initiating graceful shutdown");
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool { self.running.load(Ordering::SeqCst) }

    /// Resolves once teardown has finished: server stopped, final
    /// checkpoint written, persistence drained and the store flushed.
    pub async fn wait_for_shutdown(&self) { self.cancellation_token.cancelled().await; }

    pub const fn pool(&self) -> &AddressPool { &self.pool }

    pub const fn local_addr(&self) -> std::net::SocketAddr { self.local_addr }
}

/// Everything torn down when the app stops, in stop order.
struct Running {
    http:      ServiceHandler,
    resources: Resources,
}

impl Running {
    async fn stop(self) {
        info!("Stopping HTTP server");
        self.http.shutdown();
        self.http.wait_for_stop().await;
        self.resources.stop().await;
    }
}

/// The pool's workers and persistence, torn down after the HTTP server or on
/// a failed start.
struct Resources {
    generators:    Manager,
    checkpointer:  Manager,
    spawner:       Arc<TokioSpawner>,
    store:         Arc<RedbStore>,
    drain_timeout: Duration,
}

impl Resources {
    async fn stop(self) {
        // Generation stops first so the final checkpoint sees the final pool.
        info!("Stopping workers");
        for workers in [self.generators, self.checkpointer] {
            let report = workers.shutdown().await;
            if report.aborted > 0 {
                warn!(aborted = report.aborted, "Some workers did not stop in time");
            }
        }

        if !self.spawner.drain(self.drain_timeout).await {
            warn!(
                remaining = self.spawner.in_flight(),
                "Shutting down with persistence writes in flight"
            );
        }

        let store = self.store;
        match spawn_blocking_file_io(move || store.flush()).await {
            Ok(Ok(())) => info!("Store flushed"),
            Ok(Err(e)) => error!(error = %e, "Failed to flush store"),
            Err(e) => error!(error = %e, "Store flush task panicked"),
        }
    }
}

impl App {
    /// Start logging. Keep the guards alive for as long as logs matter.
    #[must_use]
    pub fn init_logging(&self) -> Vec<WorkerGuard> {
        let guards = telemetry::init_global_logging(APP_NAME, &self.config.logging);
        telemetry::set_panic_hook();
        guards
    }

    /// Recover the pool and start workers and the HTTP server. Fails without
    /// serving anything if the store cannot be recovered.
    pub async fn start(&self) -> Result<AppHandle, Whatever> {
        info!("Starting addrpool");

        let store_config = self.config.store.clone();
        let store = Arc::new(
            spawn_blocking_file_io(move || RedbStore::open(&store_config))
                .await
                .whatever_context("Store open task failed")?
                .whatever_context("Failed to open durable store")?,
        );

        // Store writes go to the file I/O runtime, away from request handling.
        let spawner = Arc::new(TokioSpawner::new(
            addrpool_common_runtime::file_io_runtime().handle().clone(),
            &self.config.persistence,
        ));
        let pool = {
            let store = store.clone();
            let spawner = spawner.clone();
            let config = self.config.pool.clone();
            spawn_blocking_file_io(move || AddressPool::open(store, spawner, config))
                .await
                .whatever_context("Recovery task failed")?
                .whatever_context("Failed to recover address pool")?
        };

        let generator = Arc::new(
            RandomAddressGenerator::from_config(&self.config.generation)
                .whatever_context("Invalid generation config")?,
        );
        let worker_config = WorkerConfig::builder()
            .shutdown_timeout(self.config.worker_shutdown_timeout)
            .build();
        let mut generators = Manager::new(worker_config.clone());
        for index in 0..self.config.generation.workers {
            generators.register(GenerationWorker::new(
                index,
                pool.clone(),
                generator.clone(),
                &self.config.generation,
            ));
        }
        let mut checkpointer = Manager::new(worker_config);
        checkpointer.register(CheckpointWorker::new(pool.clone()));

        let resources = Resources {
            generators,
            checkpointer,
            spawner,
            store,
            drain_timeout: self.config.persistence.drain_timeout,
        };

        let mut http =
            match start_rest_server(self.config.http.clone(), vec![pool_routes(pool.clone())]).await
            {
                Ok(http) => http,
                Err(e) => {
                    error!(error = %e, "REST server failed to start, stopping workers");
                    resources.stop().await;
                    return Err(e).whatever_context("Failed to start REST server");
                }
            };
        http.wait_for_start().await;
        let local_addr = http.local_addr();

        self.running.store(true, Ordering::SeqCst);
        info!(
            %local_addr,
            pool_size = pool.count_addresses(),
            generation_workers = self.config.generation.workers,
            "addrpool started"
        );

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let running = Running { http, resources };
        let running_flag = Arc::clone(&self.running);
        let cancellation_token = self.cancellation_token.clone();
        let enable_graceful_shutdown = self.config.enable_graceful_shutdown;
        tokio::spawn(async move {
            if enable_graceful_shutdown {
                shutdown_signal(shutdown_rx).await;
            } else {
                let _ = shutdown_rx.await;
            }
            running_flag.store(false, Ordering::SeqCst);
            running.stop().await;
            info!("addrpool shutdown complete");
            cancellation_token.cancel();
        });

        Ok(AppHandle {
            shutdown_tx: Some(shutdown_tx),
            running: Arc::clone(&self.running),
            cancellation_token: self.cancellation_token.clone(),
            pool,
            local_addr,
        })
    }

    /// Run until a shutdown signal arrives and teardown completes.
    pub async fn run(self) -> Result<(), Whatever> {
        let handle = self.start().await?;
        handle.wait_for_shutdown().await;
        Ok(())
    }
}

/// Report what recovery would restore from the configured store, without
/// modifying it.
pub fn inspect(config: &StoreConfig) -> Result<RecoveryReport, Whatever> {
    let store = RedbStore::open(config).whatever_context("Failed to open durable store")?;
    recovery::inspect(&store).whatever_context("Failed to read durable store")
}

async fn shutdown_signal(shutdown_rx: oneshot::Receiver<()>) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { info!("Received Ctrl+C signal"); },
        () = terminate => { info!("Received terminate signal"); },
        _ = shutdown_rx => { info!("Received shutdown signal"); },
    }
}
