//! Access policy applied to a network origin classification.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Network origin of a client address, as reported by a classifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    /// Network operator (ISP) name.
    pub operator_name: Option<String>,
    /// ISO country code.
    pub region_code: Option<String>,
}

/// Why a client was turned away.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum DenyReason {
    Region(String),
    Operator(String),
}

impl std::fmt::Display for DenyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DenyReason::Region(code) => write!(f, "Access denied from country: {}", code),
            DenyReason::Operator(name) => write!(f, "Access denied from ISP: {}", name),
        }
    }
}

/// Outcome of an access check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessDecision {
    Allow,
    Deny(DenyReason),
}

impl AccessDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, AccessDecision::Allow)
    }
}

/// Blocked regions and operators.
///
/// Region codes match exactly. Operator entries match as case-insensitive
/// substrings of the operator name.
#[derive(Debug, Clone, Default)]
pub struct AccessGate {
    blocked_regions: HashSet<String>,
    /// Stored lowercased.
    blocked_operators: Vec<String>,
}

impl AccessGate {
    pub fn new<R, O>(blocked_regions: R, blocked_operators: O) -> Self
    where
        R: IntoIterator,
        R::Item: Into<String>,
        O: IntoIterator,
        O::Item: Into<String>,
    {
        Self {
            blocked_regions: blocked_regions.into_iter().map(Into::into).collect(),
            blocked_operators: blocked_operators
                .into_iter()
                .map(|o| o.into().to_lowercase())
                .filter(|o| !o.is_empty())
                .collect(),
        }
    }

    /// Apply the policy to a classification.
    pub fn evaluate(&self, classification: &Classification) -> AccessDecision {
        let region = classification.region_code.as_deref().filter(|r| !r.is_empty());
        if let Some(region) = region {
            if self.blocked_regions.contains(region) {
                return AccessDecision::Deny(DenyReason::Region(region.to_string()));
            }
        }

        let operator = classification.operator_name.as_deref().filter(|o| !o.is_empty());
        if let Some(operator) = operator {
            let lowered = operator.to_lowercase();
            if self.blocked_operators.iter().any(|blocked| lowered.contains(blocked.as_str())) {
                return AccessDecision::Deny(DenyReason::Operator(operator.to_string()));
            }
        }

        AccessDecision::Allow
    }
}
