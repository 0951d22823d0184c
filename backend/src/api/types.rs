//! Response types for the HTTP API.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde_json::{json, Value};

use crate::models::{FieldError, OutcomeEntry};

/// File name offered for the outcome download.
pub const OUTCOME_FILE_NAME: &str = "OutcomeFile.json";

/// Failure responses of the upload endpoint.
#[derive(Debug)]
pub enum ApiError {
    /// 400 with a plain-text message.
    BadRequest(String),
    /// 403 with the deny reason.
    Forbidden(String),
    /// 400 with the line errors as JSON.
    Rejected(Vec<FieldError>),
    /// 500 with a plain-text message.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg).into_response(),
            ApiError::Rejected(errors) => (StatusCode::BAD_REQUEST, Json(errors)).into_response(),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg).into_response(),
        }
    }
}

/// Downloadable outcome file for a clean upload.
pub struct OutcomeFile(pub Vec<OutcomeEntry>);

impl IntoResponse for OutcomeFile {
    fn into_response(self) -> Response {
        let body = match serde_json::to_vec_pretty(&self.0) {
            Ok(body) => body,
            Err(e) => return ApiError::Internal(e.to_string()).into_response(),
        };

        let disposition = format!("attachment; filename={}", OUTCOME_FILE_NAME);
        let mut response = (StatusCode::OK, body).into_response();
        let headers = response.headers_mut();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Ok(value) = HeaderValue::from_str(&disposition) {
            headers.insert(header::CONTENT_DISPOSITION, value);
        }
        response
    }
}

/// Health payload.
pub fn health_body() -> Value {
    json!({
        "status": "ok",
        "service": "ingestgate",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "process": "POST /process",
            "logs": "GET /api/logs (SSE)"
        }
    })
}
