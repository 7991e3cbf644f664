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

//! HTTP surface of addrpool.

pub mod error;
pub mod http;
pub mod routes;

use std::net::SocketAddr;

use snafu::Snafu;
use tokio::{sync::oneshot::Receiver, task::JoinHandle};
use tokio_util::sync::CancellationToken;

#[derive(Snafu, Debug)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(transparent)]
    Network { source: NetworkError },
}

#[derive(Snafu, Debug)]
#[snafu(visibility(pub))]
pub enum NetworkError {
    #[snafu(display("Failed to bind {addr}"))]
    Bind {
        addr:   SocketAddr,
        #[snafu(source)]
        source: std::io::Error,
    },

    #[snafu(display("Failed to parse address {addr}"))]
    ParseAddress {
        addr:   String,
        #[snafu(source)]
        source: std::net::AddrParseError,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Handle to a running HTTP server.
///
/// Call [`shutdown`](Self::shutdown) to start a graceful stop and
/// [`wait_for_stop`](Self::wait_for_stop) to wait until in-flight requests
/// have finished.
pub struct ServiceHandler {
    join_handle:        JoinHandle<()>,
    cancellation_token: CancellationToken,
    started_rx:         Option<Receiver<()>>,
    local_addr:         SocketAddr,
}

impl ServiceHandler {
    /// Wait until the server accepts connections. Returns immediately on
    /// every call after the first.
    pub async fn wait_for_start(&mut self) {
        if let Some(started_rx) = self.started_rx.take() {
            // A dropped sender means the task already ended; nothing to wait for.
            let _ = started_rx.await;
        }
    }

    pub async fn wait_for_stop(self) {
        if let Err(e) = self.join_handle.await {
            tracing::error!(error = %e, "REST server task panicked");
        }
    }

    pub fn shutdown(&self) { self.cancellation_token.cancel(); }

    pub fn is_finished(&self) -> bool { self.join_handle.is_finished() }

    /// Address actually bound, useful when configured with port 0.
    pub const fn local_addr(&self) -> SocketAddr { self.local_addr }
}
