//! # Ingestgate - Record file ingestion behind an origin gate
//!
//! Ingestgate accepts pipe-delimited record files, reports every malformed or
//! invalid line with its line number, and returns the records that passed.
//! Uploads are only processed for clients whose network origin is allowed.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   Upload    │────▶│   Parser    │────▶│  Validator  │────▶│    Merge    │
//! │  (UTF-8)    │     │ (per line)  │     │ (optional)  │     │ valid+errors│
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//!
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   Request   │────▶│  Client IP  │────▶│  Decision   │────▶│    Gate     │
//! │  (headers)  │     │ (normalize) │     │ cache (TTL) │     │ allow/deny  │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ingestgate::{process_bytes, ProcessOptions};
//!
//! let result = process_bytes(b"x|y", ProcessOptions { validate: true });
//! assert_eq!(result.errors[0].message, "Incorrect number of fields, expected 7");
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Error types
//! - [`models`] - Record, line outcome and field error
//! - [`parser`] - Line-oriented parsing
//! - [`validation`] - Field constraints
//! - [`pipeline`] - Parse / validate / merge
//! - [`access`] - Client address, policy, classifier and decision cache
//! - [`config`] - Environment configuration
//! - [`api`] - HTTP API server

// Core modules
pub mod error;
pub mod models;

// Parsing
pub mod parser;

// Validation
pub mod validation;

// Pipeline
pub mod pipeline;

// Access control
pub mod access;

// Configuration
pub mod config;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{AddressError, ClassifierError, ConfigError, ParseError, ServerError};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{FieldError, LineOutcome, OutcomeEntry, ParsedLine, Record};

// =============================================================================
// Re-exports - Parsing & Validation
// =============================================================================

pub use parser::{parse_bytes, parse_reader, parse_str};
pub use validation::{is_valid, validate_record};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use pipeline::{process, process_bytes, process_file, PipelineResult, ProcessOptions};

// =============================================================================
// Re-exports - Access control
// =============================================================================

pub use access::{
    normalize_client_ip, AccessDecision, AccessDecisionCache, AccessGate, Classification,
    Classifier, DecisionState, DenyReason, IpApiClassifier,
};

pub use config::Config;

// Server
pub mod server {
    pub use crate::api::server::start_server;
}
