//! HTTP server for the ingestion API.
//!
//! # API Endpoints
//!
//! | Method | Path        | Description                                 |
//! |--------|-------------|---------------------------------------------|
//! | GET    | `/health`   | Health check                                |
//! | POST   | `/process`  | Upload a record file (`file`, opt. `flag`)  |
//! | GET    | `/api/logs` | SSE stream of the access log                |
//!
//! The access check runs before the upload is read: denied clients never get
//! their file parsed.

use axum::{
    extract::{ConnectInfo, DefaultBodyLimit, Multipart, Query, State},
    http::{header, HeaderMap, Method},
    middleware,
    response::{sse::Event, Json, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde::Deserialize;
use serde_json::Value;
use std::{convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;

use super::logs::{access_log, LOG_BROADCASTER};
use super::types::{health_body, ApiError, OutcomeFile};
use crate::access::{client_ip_from_headers, AccessDecision, AccessDecisionCache};
use crate::config::Config;
use crate::error::ServerResult;
use crate::pipeline::{process_bytes, ProcessOptions};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub access: Arc<AccessDecisionCache>,
}

/// Query string of `POST /process`.
#[derive(Debug, Default, Deserialize)]
pub struct ProcessParams {
    pub flag: Option<String>,
}

/// Build the application router.
pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE, header::CONTENT_DISPOSITION]);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/process", post(process_upload))
        .route("/api/logs", get(sse_logs))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(middleware::from_fn_with_state(state.clone(), access_log))
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server
pub async fn start_server(config: Config) -> ServerResult<()> {
    let access = Arc::new(config.access_cache()?);
    spawn_cache_purge(access.clone());

    let app = router(AppState { access }, config.max_upload_bytes);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!(%addr, "ingestgate server listening");
    tracing::info!(
        blocked_countries = ?config.blocked_countries,
        blocked_isps = ?config.blocked_isps,
        cache_ttl_secs = config.cache_ttl_secs,
        "access policy loaded"
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;

    Ok(())
}

/// Periodically evict expired decisions so the cache only holds recent clients.
fn spawn_cache_purge(access: Arc<AccessDecisionCache>) {
    let period = access.ttl();
    if period.is_zero() {
        return;
    }

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let purged = access.purge_expired().await;
            if purged > 0 {
                tracing::debug!(purged, "evicted expired access decisions");
            }
        }
    });
}

/// Health check endpoint
async fn health() -> Json<Value> {
    Json(health_body())
}

/// SSE endpoint for the access log
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(entry) => {
            let json = serde_json::to_string(&entry).ok()?;
            Some(Ok(Event::default().data(json)))
        }
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Upload endpoint: access check, then parse and optionally validate.
async fn process_upload(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Query(params): Query<ProcessParams>,
    mut multipart: Multipart,
) -> Result<OutcomeFile, ApiError> {
    let client_ip = client_ip_from_headers(&headers, peer.ip()).map_err(|e| {
        tracing::error!(error = %e, "cannot derive client address");
        ApiError::Internal(e.to_string())
    })?;

    if let AccessDecision::Deny(reason) = state.access.decide(client_ip).await {
        tracing::warn!(%client_ip, %reason, "upload refused");
        return Err(ApiError::Forbidden(reason.to_string()));
    }

    let mut file_data: Option<Vec<u8>> = None;
    let mut file_name: Option<String> = None;
    let mut flag = params.flag;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Multipart error: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "file" => {
                file_name = field.file_name().map(|s| s.to_string());
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Read error: {}", e)))?;
                file_data = Some(bytes.to_vec());
            }
            "flag" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Read error: {}", e)))?;
                flag = Some(text);
            }
            _ => {}
        }
    }

    let validate = parse_flag(flag.as_deref())
        .ok_or_else(|| ApiError::BadRequest("Invalid value for flag".to_string()))?;

    let bytes = match file_data {
        Some(bytes) if !bytes.is_empty() => bytes,
        _ => return Err(ApiError::BadRequest("The file cannot be empty".to_string())),
    };

    tracing::info!(
        file = file_name.as_deref().unwrap_or("unknown"),
        size = bytes.len(),
        validate,
        "processing input file"
    );

    let options = ProcessOptions { validate };
    let result = tokio::task::spawn_blocking(move || process_bytes(&bytes, options))
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "error processing file");
            ApiError::Internal(e.to_string())
        })?;

    if !result.is_clean() {
        tracing::warn!(errors = result.errors.len(), "file processed with errors");
        return Err(ApiError::Rejected(result.errors));
    }

    Ok(OutcomeFile(result.outcome()))
}

/// Interpret the validation flag. Absent means `false`; unknown spellings are `None`.
pub fn parse_flag(value: Option<&str>) -> Option<bool> {
    let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Some(false);
    };

    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
