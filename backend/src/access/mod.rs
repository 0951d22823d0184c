//! Origin-based access control for the ingestion endpoint.
//!
//! ```text
//! request ──▶ address ──▶ cache ──(miss)──▶ classifier ──▶ gate ──▶ allow / deny
//!                           │                                          │
//!                           └──────────────(hit, within TTL)───────────┘
//! ```
//!
//! - [`address`] - Canonical client address from proxy headers and peer address
//! - [`gate`] - Blocked regions / operators policy
//! - [`classifier`] - Address to operator/region lookup
//! - [`cache`] - Time-bounded memo of decisions

pub mod address;
pub mod cache;
pub mod classifier;
pub mod gate;

pub use address::{client_ip_from_headers, normalize_client_ip};
pub use cache::{AccessDecisionCache, DecisionState, DEFAULT_TTL};
pub use classifier::{Classifier, IpApiClassifier};
pub use gate::{AccessDecision, AccessGate, Classification, DenyReason};
