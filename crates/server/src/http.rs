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

use axum::{
    Router, extract::DefaultBodyLimit, http::StatusCode, response::IntoResponse, routing::get,
};
use serde::{Deserialize, Serialize};
use smart_default::SmartDefault;
use snafu::ResultExt;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::{BindSnafu, ParseAddressSnafu, Result, ServiceHandler};

/// 1 MiB. Every route is bodyless or tiny.
pub const DEFAULT_MAX_HTTP_BODY_SIZE: usize = 1024 * 1024;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, SmartDefault, bon::Builder)]
#[serde(default)]
pub struct RestServerConfig {
    #[default = "127.0.0.1:3000"]
    #[builder(into, default = "127.0.0.1:3000".to_string())]
    pub bind_address:  String,
    /// Maximum HTTP request body size in bytes.
    #[default(DEFAULT_MAX_HTTP_BODY_SIZE)]
    #[builder(default = DEFAULT_MAX_HTTP_BODY_SIZE)]
    pub max_body_size: usize,
    #[default = true]
    #[builder(default = true)]
    pub enable_cors:   bool,
}

/// Base router: `/health`, tracing, body limit and optional CORS. Route
/// handlers are applied on top, in order.
pub fn build_router<F>(config: &RestServerConfig, route_handlers: &[F]) -> Router
where
    F: Fn(Router) -> Router,
{
    let mut router = Router::new().route("/health", get(health_check));

    for handler in route_handlers {
        router = handler(router);
    }

    router = router
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(config.max_body_size));

    if config.enable_cors {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        router = router.layer(cors);
    }
    router
}

/// Bind the configured address and serve in a background task.
///
/// ```rust,no_run
/// use axum::{Router, routing::get};
/// use addrpool_server::http::{RestServerConfig, start_rest_server};
///
/// fn hello_routes(router: Router) -> Router {
///     router.route("/api/v1/hello", get(|| async { "hello" }))
/// }
///
/// # async fn run() -> addrpool_server::Result<()> {
/// let mut handle = start_rest_server(RestServerConfig::default(), vec![hello_routes]).await?;
/// handle.wait_for_start().await;
/// handle.shutdown();
/// handle.wait_for_stop().await;
/// # Ok(())
/// # }
/// ```
pub async fn start_rest_server<F>(
    config: RestServerConfig,
    route_handlers: Vec<F>,
) -> Result<ServiceHandler>
where
    F: Fn(Router) -> Router + Send + Sync + 'static,
{
    let bind_addr = config
        .bind_address
        .parse::<std::net::SocketAddr>()
        .context(ParseAddressSnafu {
            addr: config.bind_address.clone(),
        })?;
    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .context(BindSnafu { addr: bind_addr })?;
    let local_addr = listener
        .local_addr()
        .context(BindSnafu { addr: bind_addr })?;

    info!(count = route_handlers.len(), "Registering REST route handlers");
    let router = build_router(&config, &route_handlers);

    let cancellation_token = CancellationToken::new();
    let (started_tx, started_rx) = oneshot::channel::<()>();
    let token = cancellation_token.clone();
    let join_handle = tokio::spawn(async move {
        let result = axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                info!(%local_addr, "REST server started");
                let _ = started_tx.send(());
                token.cancelled().await;
                info!(%local_addr, "REST server received shutdown signal");
            })
            .await;

        match result {
            Ok(()) => info!(%local_addr, "REST server stopped"),
            Err(e) => warn!(%local_addr, error = %e, "REST server stopped with error"),
        }
    });

    Ok(ServiceHandler {
        join_handle,
        cancellation_token,
        started_rx: Some(started_rx),
        local_addr,
    })
}

async fn health_check() -> impl IntoResponse { (StatusCode::OK, "OK") }

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tower::ServiceExt;

    use super::*;

    fn hello_routes(router: Router) -> Router {
        router.route("/api/v1/hello", get(|| async { "hello" }))
    }

    async fn raw_get(addr: std::net::SocketAddr, path: &str) -> String {
        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        let request = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        response
    }

    #[tokio::test]
    async fn serves_until_shutdown() {
        let config = RestServerConfig::builder()
            .bind_address("127.0.0.1:0")
            .build();
        let mut handle = start_rest_server(config, vec![hello_routes]).await.unwrap();
        handle.wait_for_start().await;

        let response = raw_get(handle.local_addr(), "/health").await;
        assert!(response.starts_with("HTTP/1.1 200"), "{response}");
        let response = raw_get(handle.local_addr(), "/api/v1/hello").await;
        assert!(response.ends_with("hello"), "{response}");

        handle.shutdown();
        handle.wait_for_stop().await;
    }

    #[tokio::test]
    async fn rejects_unparsable_address() {
        let config = RestServerConfig::builder().bind_address("nope").build();
        let handlers: Vec<fn(Router) -> Router> = vec![];
        assert!(start_rest_server(config, handlers).await.is_err());
    }

    #[tokio::test]
    async fn health_without_cors() {
        let config = RestServerConfig::builder().enable_cors(false).build();
        let handlers: Vec<fn(Router) -> Router> = vec![];
        let response = build_router(&config, &handlers)
            .oneshot(
                axum::http::Request::get("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(
            !response
                .headers()
                .contains_key("access-control-allow-origin")
        );
    }
}
