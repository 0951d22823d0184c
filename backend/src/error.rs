//! Error types for the ingestion service.
//!
//! - [`ParseError`] - Fatal input read failures
//! - [`AddressError`] - Client address resolution failures
//! - [`ClassifierError`] - Network origin lookup failures
//! - [`ConfigError`] - Environment configuration errors
//! - [`ServerError`] - Top-level errors surfaced by the binary
//!
//! Malformed lines and constraint violations are not errors at this level:
//! they are reported as [`crate::models::FieldError`] data.

use std::time::Duration;

use thiserror::Error;

// =============================================================================
// Parsing Errors
// =============================================================================

/// Fatal errors while reading an uploaded file.
///
/// No partial result is produced when one of these is returned.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The input stream could not be read.
    #[error("Failed to read input: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Address Errors
// =============================================================================

/// Errors while deriving the canonical client address.
#[derive(Debug, Error)]
pub enum AddressError {
    /// The selected candidate is not an IP address.
    #[error("Cannot resolve client address '{0}'")]
    Unresolvable(String),
}

// =============================================================================
// Classifier Errors
// =============================================================================

/// Errors from the network origin classifier.
///
/// Every variant is treated as "no signal" by the access cache.
#[derive(Debug, Error)]
pub enum ClassifierError {
    /// Transport-level failure.
    #[error("Lookup request failed: {0}")]
    RequestFailed(String),

    /// The lookup service answered with a non-success status.
    #[error("Lookup service returned HTTP {0}")]
    Status(u16),

    /// The response body could not be understood.
    #[error("Invalid lookup response: {0}")]
    InvalidResponse(String),

    /// The lookup did not finish in time.
    #[error("Lookup timed out after {0:?}")]
    Timeout(Duration),
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Errors while reading configuration from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A variable holds a value of the wrong shape.
    #[error("Invalid value for {name}: '{value}'")]
    InvalidValue { name: String, value: String },
}

// =============================================================================
// Server Errors (top-level)
// =============================================================================

/// Top-level errors for the binary and the HTTP server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Input parsing error.
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Address resolution error.
    #[error("Address error: {0}")]
    Address(#[from] AddressError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Classifier construction error.
    #[error("Classifier error: {0}")]
    Classifier(#[from] ClassifierError),

    /// Socket or file IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for classifier operations.
pub type ClassifierResult<T> = Result<T, ClassifierError>;

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;
