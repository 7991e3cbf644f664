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

//! Background workers that keep the pool filled and checkpointed.

use std::{sync::Arc, time::Duration};

use addrpool_common_runtime::spawn_blocking_file_io;
use addrpool_common_worker::{Trigger, WorkError, WorkResult, Worker, WorkerContext};
use tracing::{debug, info};

use crate::{config::GenerationConfig, generator::AddressGenerator, pool::AddressPool};

/// Fills the pool in batches until it reaches its soft limit.
pub struct GenerationWorker {
    index:      usize,
    pool:       AddressPool,
    generator:  Arc<dyn AddressGenerator>,
    batch_size: usize,
    interval:   Duration,
}

impl GenerationWorker {
    pub fn new(
        index: usize,
        pool: AddressPool,
        generator: Arc<dyn AddressGenerator>,
        config: &GenerationConfig,
    ) -> Self {
        GenerationWorker {
            index,
            pool,
            generator,
            batch_size: config.batch_size.max(1),
            interval: config.tick_interval,
        }
    }
}

#[async_trait::async_trait]
impl Worker for GenerationWorker {
    fn name(&self) -> String { format!("address-generator-{}", self.index) }

    fn trigger(&self) -> Trigger { Trigger::Interval(self.interval) }

    async fn work(&mut self, ctx: &WorkerContext) -> WorkResult {
        if self.pool.is_saturated() {
            debug!(
                worker = ctx.name(),
                pool_size = self.pool.count_addresses(),
                "Pool saturated, skipping batch"
            );
            return Ok(());
        }

        let generator = self.generator.clone();
        let pool = self.pool.clone();
        let batch_size = self.batch_size;
        // Pushes stay on the blocking thread: one may wait on the store when
        // the id reservation runs dry.
        let produced = tokio::task::spawn_blocking(move || {
            let mut produced = 0_usize;
            for address in (0..batch_size).filter_map(|_| generator.generate()) {
                pool.store_address(address);
                produced += 1;
            }
            produced
        })
        .await
        .map_err(|e| WorkError::fatal_with_source("address generation panicked", e))?;

        debug!(worker = ctx.name(), produced, "Generation batch done");
        Ok(())
    }
}

/// Periodically writes the pool size and id allocator to the store, and
/// once more on shutdown.
pub struct CheckpointWorker {
    pool:     AddressPool,
    interval: Duration,
}

impl CheckpointWorker {
    pub fn new(pool: AddressPool) -> Self {
        let interval = pool.config().checkpoint_interval;
        CheckpointWorker { pool, interval }
    }

    async fn checkpoint(&self) -> WorkResult {
        let pool = self.pool.clone();
        match spawn_blocking_file_io(move || pool.checkpoint()).await {
            Ok(Ok(())) => Ok(()),
            // The next tick tries again; a missed checkpoint only makes the
            // recovered counters older.
            Ok(Err(e)) => Err(WorkError::transient_with_source("checkpoint failed", e)),
            Err(e) => Err(WorkError::fatal_with_source("checkpoint task panicked", e)),
        }
    }
}

#[async_trait::async_trait]
impl Worker for CheckpointWorker {
    fn name(&self) -> String { "pool-checkpoint".to_string() }

    fn trigger(&self) -> Trigger { Trigger::Interval(self.interval) }

    async fn work(&mut self, _ctx: &WorkerContext) -> WorkResult { self.checkpoint().await }

    async fn on_shutdown(&mut self, _ctx: &WorkerContext) -> WorkResult {
        self.checkpoint().await?;
        info!(
            pool_size = self.pool.count_addresses(),
            "Final checkpoint written"
        );
        Ok(())
    }
}
