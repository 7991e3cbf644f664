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

//! Pool endpoints under `/api/v1`.

use addrpool_common_runtime::spawn_blocking_file_io;
use addrpool_pool::{AddressId, AddressPool, AddressRecord, DurabilitySnapshot, PoolStatus};
use axum::{
    Json, Router,
    extract::State,
    routing::{delete, get, post},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ApiError, ApiResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddressResponse {
    pub id:         AddressId,
    pub address:    String,
    pub secret:     String,
    pub created_at: DateTime<Utc>,
}

impl From<AddressRecord> for AddressResponse {
    fn from(record: AddressRecord) -> Self {
        AddressResponse {
            id:         record.id,
            address:    record.payload.address,
            secret:     record.payload.secret,
            created_at: record.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrainResponse {
    pub drained: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckpointResponse {
    pub pool_size:  usize,
    pub durability: DurabilitySnapshot,
}

/// Route handler adding the pool endpoints, for
/// [`start_rest_server`](crate::http::start_rest_server).
pub fn pool_routes(pool: AddressPool) -> impl Fn(Router) -> Router + Send + Sync + 'static {
    move |router: Router| router.merge(pool_router(pool.clone()))
}

pub fn pool_router(pool: AddressPool) -> Router {
    Router::new()
        .route("/api/v1/address", get(next_address))
        .route("/api/v1/addresses", delete(drain_addresses))
        .route("/api/v1/status", get(pool_status))
        .route("/api/v1/checkpoint", post(checkpoint))
        .with_state(pool)
}

async fn next_address(State(pool): State<AddressPool>) -> ApiResult<Json<AddressResponse>> {
    let record = pool.get_next_address().ok_or_else(|| ApiError::NotFound {
        resource: "address".to_string(),
    })?;
    debug!(id = %record.id, "Serving address");
    Ok(Json(record.into()))
}

async fn pool_status(State(pool): State<AddressPool>) -> Json<PoolStatus> { Json(pool.status()) }

async fn drain_addresses(State(pool): State<AddressPool>) -> Json<DrainResponse> {
    let drained = pool.drain();
    info!(drained, "Pool drained through API");
    Json(DrainResponse { drained })
}

async fn checkpoint(State(pool): State<AddressPool>) -> ApiResult<Json<CheckpointResponse>> {
    let handle = pool.clone();
    match spawn_blocking_file_io(move || handle.checkpoint()).await {
        Ok(Ok(())) => Ok(Json(CheckpointResponse {
            pool_size:  pool.count_addresses(),
            durability: pool.durability(),
        })),
        Ok(Err(e)) if e.is_transient() => Err(ApiError::Unavailable {
            reason: e.to_string(),
        }),
        Ok(Err(e)) => Err(ApiError::Internal {
            reason: e.to_string(),
        }),
        Err(e) => Err(ApiError::Internal {
            reason: e.to_string(),
        }),
    }
}
