//! Service configuration from the environment.
//!
//! A `.env` file in the working directory is loaded first when present.
//!
//! | Variable                             | Default                   |
//! |--------------------------------------|---------------------------|
//! | `INGESTGATE_PORT`                    | `3000`                    |
//! | `INGESTGATE_BLOCKED_COUNTRIES`       | `CN,ES,US`                |
//! | `INGESTGATE_BLOCKED_ISPS`            | `Amazon,Microsoft,Google` |
//! | `INGESTGATE_CLASSIFIER_URL`          | `http://ip-api.com/json/` |
//! | `INGESTGATE_CLASSIFIER_TIMEOUT_SECS` | `5`                       |
//! | `INGESTGATE_CACHE_TTL_SECS`          | `3600`                    |
//! | `INGESTGATE_MAX_UPLOAD_BYTES`        | `10485760`                |

use serde::Serialize;
use std::env;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::access::classifier::DEFAULT_BASE_URL;
use crate::access::{AccessDecisionCache, AccessGate, IpApiClassifier};
use crate::error::{ClassifierResult, ConfigError, ConfigResult};

const PORT: &str = "INGESTGATE_PORT";
const BLOCKED_COUNTRIES: &str = "INGESTGATE_BLOCKED_COUNTRIES";
const BLOCKED_ISPS: &str = "INGESTGATE_BLOCKED_ISPS";
const CLASSIFIER_URL: &str = "INGESTGATE_CLASSIFIER_URL";
const CLASSIFIER_TIMEOUT_SECS: &str = "INGESTGATE_CLASSIFIER_TIMEOUT_SECS";
const CACHE_TTL_SECS: &str = "INGESTGATE_CACHE_TTL_SECS";
const MAX_UPLOAD_BYTES: &str = "INGESTGATE_MAX_UPLOAD_BYTES";

/// Effective service configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub port: u16,
    /// Region codes denied outright.
    pub blocked_countries: Vec<String>,
    /// Operator name fragments denied (case-insensitive).
    pub blocked_isps: Vec<String>,
    pub classifier_url: String,
    pub classifier_timeout_secs: u64,
    pub cache_ttl_secs: u64,
    pub max_upload_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            blocked_countries: split_list("CN,ES,US"),
            blocked_isps: split_list("Amazon,Microsoft,Google"),
            classifier_url: DEFAULT_BASE_URL.to_string(),
            classifier_timeout_secs: 5,
            cache_ttl_secs: 60 * 60,
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

impl Config {
    /// Load from the process environment (and `.env`, if any).
    pub fn from_env() -> ConfigResult<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load using an arbitrary variable lookup. Unset variables keep defaults.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Ok(Self {
            port: parse_var(&lookup, PORT)?.unwrap_or(defaults.port),
            blocked_countries: lookup(BLOCKED_COUNTRIES)
                .map(|v| split_list(&v))
                .unwrap_or(defaults.blocked_countries),
            blocked_isps: lookup(BLOCKED_ISPS)
                .map(|v| split_list(&v))
                .unwrap_or(defaults.blocked_isps),
            classifier_url: lookup(CLASSIFIER_URL)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.classifier_url),
            classifier_timeout_secs: parse_var(&lookup, CLASSIFIER_TIMEOUT_SECS)?
                .unwrap_or(defaults.classifier_timeout_secs),
            cache_ttl_secs: parse_var(&lookup, CACHE_TTL_SECS)?.unwrap_or(defaults.cache_ttl_secs),
            max_upload_bytes: parse_var(&lookup, MAX_UPLOAD_BYTES)?
                .unwrap_or(defaults.max_upload_bytes),
        })
    }

    pub fn classifier_timeout(&self) -> Duration {
        Duration::from_secs(self.classifier_timeout_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Access policy built from the blocked lists.
    pub fn gate(&self) -> AccessGate {
        AccessGate::new(self.blocked_countries.clone(), self.blocked_isps.clone())
    }

    /// Decision cache over the HTTP classifier.
    pub fn access_cache(&self) -> ClassifierResult<AccessDecisionCache> {
        let classifier =
            IpApiClassifier::new(self.classifier_url.clone(), self.classifier_timeout())?;
        Ok(AccessDecisionCache::new(Arc::new(classifier), self.gate())
            .with_ttl(self.cache_ttl())
            .with_lookup_timeout(self.classifier_timeout()))
    }
}

fn parse_var<T, F>(lookup: &F, name: &str) -> ConfigResult<Option<T>>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                name: name.to_string(),
                value: raw,
            }),
    }
}

/// Split a comma-separated list, trimming entries and dropping empty ones.
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
