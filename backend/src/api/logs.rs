//! Request access log.
//!
//! Every request handled by the server produces an [`AccessLogEntry`]. Entries
//! are written to the `tracing` output and broadcast to Server-Sent Events
//! subscribers of `GET /api/logs`. Country and ISP come from the access
//! decision cache; an address that was never classified logs without them.

use std::net::SocketAddr;
use std::time::Instant;

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use super::server::AppState;
use crate::access::client_ip_from_headers;

/// One handled request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessLogEntry {
    pub id: Uuid,
    pub method: String,
    pub request_uri: String,
    pub request_timestamp: DateTime<Utc>,
    /// Normalized client address, when it could be derived.
    pub ip_address: Option<String>,
    pub country_code: Option<String>,
    pub isp: Option<String>,
    pub status: u16,
    pub duration_ms: u64,
}

/// Global access log broadcaster
pub static LOG_BROADCASTER: Lazy<LogBroadcaster> = Lazy::new(LogBroadcaster::new);

/// Broadcasts access log entries to all connected SSE clients
pub struct LogBroadcaster {
    sender: broadcast::Sender<AccessLogEntry>,
}

impl LogBroadcaster {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(100);
        Self { sender }
    }

    /// Record an entry and send it to all subscribers
    pub fn log(&self, entry: AccessLogEntry) {
        tracing::info!(
            method = %entry.method,
            uri = %entry.request_uri,
            ip = entry.ip_address.as_deref().unwrap_or("-"),
            country = entry.country_code.as_deref().unwrap_or("-"),
            isp = entry.isp.as_deref().unwrap_or("-"),
            status = entry.status,
            duration_ms = entry.duration_ms,
            "request handled"
        );

        // No receivers is fine
        let _ = self.sender.send(entry);
    }

    /// Get a receiver for SSE streaming
    pub fn subscribe(&self) -> broadcast::Receiver<AccessLogEntry> {
        self.sender.subscribe()
    }
}

impl Default for LogBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

/// Middleware timing each request and logging it on completion.
pub async fn access_log(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let started = Instant::now();
    let request_timestamp = Utc::now();
    let method = request.method().to_string();
    let request_uri = request.uri().path().to_string();

    let client_ip = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .and_then(|ConnectInfo(peer)| client_ip_from_headers(request.headers(), peer.ip()).ok());

    let response = next.run(request).await;

    let origin = match client_ip {
        Some(ip) => state.access.classification(ip).await,
        None => None,
    };
    let (country_code, isp) = match origin {
        Some(origin) => (origin.region_code, origin.operator_name),
        None => (None, None),
    };

    LOG_BROADCASTER.log(AccessLogEntry {
        id: Uuid::new_v4(),
        method,
        request_uri,
        request_timestamp,
        ip_address: client_ip.map(|ip| ip.to_string()),
        country_code,
        isp,
        status: response.status().as_u16(),
        duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
    });

    response
}
