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

//! Prometheus series for the worker runtime. All series carry the worker
//! name; registration failures only happen on duplicate names, which is a
//! programming error.

use std::sync::LazyLock;

use prometheus::{
    HistogramVec, IntCounterVec, IntGaugeVec, register_histogram_vec, register_int_counter_vec,
    register_int_gauge_vec,
};

pub const WORKER_LABEL: &str = "worker";
pub const EVENT_LABEL: &str = "event";
pub const OUTCOME_LABEL: &str = "outcome";

/// Lifecycle transitions, see [`Event`].
pub static WORKER_EVENTS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "addrpool_worker_events_total",
        "Worker lifecycle transitions",
        &[WORKER_LABEL, EVENT_LABEL]
    )
    .unwrap()
});

/// One increment per `work()` call, labelled with its [`Outcome`].
pub static WORKER_EXECUTIONS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "addrpool_worker_executions_total",
        "Worker executions by outcome",
        &[WORKER_LABEL, OUTCOME_LABEL]
    )
    .unwrap()
});

pub static WORKER_ACTIVE: LazyLock<IntGaugeVec> = LazyLock::new(|| {
    register_int_gauge_vec!(
        "addrpool_worker_active",
        "1 while the worker task is running",
        &[WORKER_LABEL]
    )
    .unwrap()
});

// Generation batches are sub-millisecond to a few seconds under store
// retries; checkpoints are a couple of store writes.
pub static WORKER_EXECUTION_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    register_histogram_vec!(
        "addrpool_worker_execution_duration_seconds",
        "Duration of successful worker executions",
        &[WORKER_LABEL],
        vec![0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]
    )
    .unwrap()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Event {
    Started,
    Stopped,
    Failed,
    Paused,
    Resumed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Outcome {
    Ok,
    Transient,
    Fatal,
}

pub(crate) fn record_event(worker: &str, event: Event) {
    let event: &'static str = event.into();
    WORKER_EVENTS.with_label_values(&[worker, event]).inc();
}

pub(crate) fn record_execution(worker: &str, outcome: Outcome) {
    let outcome: &'static str = outcome.into();
    WORKER_EXECUTIONS.with_label_values(&[worker, outcome]).inc();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_snake_case() {
        let event: &'static str = Event::Resumed.into();
        let outcome: &'static str = Outcome::Transient.into();
        assert_eq!(event, "resumed");
        assert_eq!(outcome, "transient");
    }

    #[test]
    fn events_are_counted_per_worker() {
        record_event("metrics-test", Event::Paused);
        record_event("metrics-test", Event::Paused);
        assert_eq!(
            WORKER_EVENTS
                .with_label_values(&["metrics-test", "paused"])
                .get(),
            2
        );
    }
}
