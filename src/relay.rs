//! Search relay
//!
//! Server-to-server pass-through to the block explorer, so the widget never
//! talks to the explorer directly:
//! - `GET /api/search?q=...` (and the older `/api/btg-search` path)
//! - upstream status, content type and body are relayed unchanged
//! - everything else is served from the public directory

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderValue, Method, StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::globals::get_http_client;

/// Content type reported when the upstream sends none
const FALLBACK_CONTENT_TYPE: &str = "text/plain";

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Missing query parameter `q`")]
    MissingQuery,

    #[error("Failed to fetch from upstream explorer")]
    Upstream(#[from] reqwest::Error),
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            RelayError::MissingQuery => {
                (StatusCode::BAD_REQUEST, json!({ "error": self.to_string() }))
            }
            RelayError::Upstream(e) => (
                StatusCode::BAD_GATEWAY,
                json!({ "error": self.to_string(), "details": e.to_string() }),
            ),
        };

        (status, Json(body)).into_response()
    }
}

#[derive(Clone)]
pub struct RelayState {
    upstream_base: String,
    client: reqwest::Client,
}

impl RelayState {
    pub fn new(upstream_base: impl Into<String>) -> Self {
        Self {
            upstream_base: upstream_base.into(),
            client: get_http_client().clone(),
        }
    }

    /// Upstream search address for a query
    pub fn target_url(&self, query: &str) -> String {
        format!(
            "{}/search?q={}",
            self.upstream_base.trim_end_matches('/'),
            urlencoding::encode(query)
        )
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    q: Option<String>,
}

pub async fn search_handler(
    State(state): State<RelayState>,
    Query(params): Query<SearchParams>,
) -> Result<Response, RelayError> {
    let query = params.q.as_deref().map(str::trim).unwrap_or_default();
    if query.is_empty() {
        return Err(RelayError::MissingQuery);
    }

    let target = state.target_url(query);
    info!("Relaying search {query:?} to {target}");

    let response = state.client.get(&target).send().await.map_err(|e| {
        error!("Upstream request to {target} failed: {e}");
        RelayError::from(e)
    })?;

    let status = response.status();
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static(FALLBACK_CONTENT_TYPE));

    let body = response.bytes().await.map_err(|e| {
        error!("Reading upstream body from {target} failed: {e}");
        RelayError::from(e)
    })?;

    if !status.is_success() {
        warn!("Upstream answered {status} for {query:?}");
    }

    Ok((status, [(CONTENT_TYPE, content_type)], body).into_response())
}

/// Search routes only
pub fn router(state: RelayState) -> Router {
    Router::new()
        .route("/api/search", get(search_handler))
        .route("/api/btg-search", get(search_handler))
        .with_state(state)
}

/// Search routes plus static files and CORS
pub fn app(state: RelayState, public_dir: &Path) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    router(state)
        .fallback_service(ServeDir::new(public_dir))
        .layer(cors)
}

/// Run the relay until Ctrl+C or SIGTERM
pub async fn serve(config: &Config) -> Result<()> {
    let state = RelayState::new(config.upstream_base.clone());
    let app = app(state, &config.public_dir);

    let address = format!("0.0.0.0:{}", config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {address}"))?;
    info!(
        "Proxy endpoint: GET /api/search?q=... (targets: {})",
        config.upstream_base
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Relay server failed")?;

    info!("Server shutting down...");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                warn!("Failed to install Ctrl+C handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                warn!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
