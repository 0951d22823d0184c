//! Network origin classification.
//!
//! [`Classifier`] is the boundary the access cache consumes. [`IpApiClassifier`]
//! implements it against the ip-api.com JSON endpoint.

use async_trait::async_trait;
use serde::Deserialize;
use std::net::IpAddr;
use std::time::Duration;

use super::gate::Classification;
use crate::error::{ClassifierError, ClassifierResult};

/// Default lookup endpoint.
pub const DEFAULT_BASE_URL: &str = "http://ip-api.com/json/";

/// Field mask selecting `countryCode` (2) and `isp` (512).
const FIELD_MASK: u32 = 514;

/// Default timeout for a single lookup.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Maps a client address to its network operator and region.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, addr: IpAddr) -> ClassifierResult<Classification>;
}

/// ip-api.com response body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IpApiResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    country_code: Option<String>,
    #[serde(default)]
    isp: Option<String>,
}

/// HTTP classifier backed by ip-api.com.
#[derive(Clone)]
pub struct IpApiClassifier {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl IpApiClassifier {
    /// Create a classifier for `base_url` with a per-request timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> ClassifierResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClassifierError::RequestFailed(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            timeout,
        })
    }

    fn lookup_url(&self, addr: IpAddr) -> String {
        format!("{}{}?fields={}", self.base_url, addr, FIELD_MASK)
    }

    async fn lookup(&self, addr: IpAddr) -> ClassifierResult<Classification> {
        let url = self.lookup_url(addr);
        tracing::debug!(%addr, %url, "classifying client address");

        let response = self.client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                ClassifierError::Timeout(self.timeout)
            } else {
                ClassifierError::RequestFailed(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClassifierError::Status(status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ClassifierError::RequestFailed(e.to_string()))?;

        parse_response(&body)
    }
}

#[async_trait]
impl Classifier for IpApiClassifier {
    async fn classify(&self, addr: IpAddr) -> ClassifierResult<Classification> {
        let result = self.lookup(addr).await;
        if let Err(ref e) = result {
            tracing::warn!(%addr, error = %e, "origin lookup failed");
        }
        result
    }
}

fn parse_response(body: &str) -> ClassifierResult<Classification> {
    let response: IpApiResponse =
        serde_json::from_str(body).map_err(|e| ClassifierError::InvalidResponse(e.to_string()))?;

    if response.status.as_deref() == Some("fail") {
        let reason = response.message.unwrap_or_else(|| "lookup failed".to_string());
        return Err(ClassifierError::InvalidResponse(reason));
    }

    Ok(Classification {
        operator_name: response.isp,
        region_code: response.country_code,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_response() {
        let c = parse_response(r#"{"countryCode":"US","isp":"Google LLC"}"#).unwrap();
        assert_eq!(c.region_code.as_deref(), Some("US"));
        assert_eq!(c.operator_name.as_deref(), Some("Google LLC"));
    }

    #[test]
    fn test_parse_partial_response() {
        let c = parse_response(r#"{"countryCode":"FR"}"#).unwrap();
        assert_eq!(c.region_code.as_deref(), Some("FR"));
        assert!(c.operator_name.is_none());
    }

    #[test]
    fn test_parse_fail_status() {
        let err = parse_response(r#"{"status":"fail","message":"private range"}"#).unwrap_err();
        assert!(err.to_string().contains("private range"));
    }

    #[test]
    fn test_parse_malformed_body() {
        assert!(matches!(
            parse_response("<html>rate limited</html>"),
            Err(ClassifierError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_lookup_url() {
        let classifier = IpApiClassifier::new("http://lookup.test/json/", DEFAULT_TIMEOUT).unwrap();
        let addr: IpAddr = "203.0.113.7".parse().unwrap();
        assert_eq!(
            classifier.lookup_url(addr),
            "http://lookup.test/json/203.0.113.7?fields=514"
        );
    }
}
