//! Time-bounded memo of access decisions per client address.
//!
//! Classification is a network round trip, so the outcome for each address is
//! kept for a time-to-live (one hour by default). Within that window a repeat
//! visitor gets the stored decision, denials included, without touching the
//! classifier. Past it, the entry counts as unknown and the next call
//! classifies again and overwrites it.
//!
//! An unavailable classifier means "no signal": the address is allowed and
//! that allowance is cached like any other decision.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::{timeout, Instant};

use super::classifier::{Classifier, DEFAULT_TIMEOUT};
use super::gate::{AccessDecision, AccessGate, Classification, DenyReason};

/// Default time-to-live of a cached decision.
pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);

/// What the cache currently knows about an address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecisionState {
    /// Never classified, or the stored decision has expired.
    Unknown,
    Allowed,
    Denied(DenyReason),
}

impl From<AccessDecision> for DecisionState {
    fn from(decision: AccessDecision) -> Self {
        match decision {
            AccessDecision::Allow => DecisionState::Allowed,
            AccessDecision::Deny(reason) => DecisionState::Denied(reason),
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    state: DecisionState,
    /// `None` when the classifier failed or timed out.
    classification: Option<Classification>,
    written_at: Instant,
}

/// Caches [`AccessGate`] decisions over an injected [`Classifier`].
///
/// Concurrent misses for the same address may each classify; the last write
/// wins.
pub struct AccessDecisionCache {
    classifier: Arc<dyn Classifier>,
    gate: AccessGate,
    ttl: Duration,
    lookup_timeout: Duration,
    entries: RwLock<HashMap<IpAddr, CacheEntry>>,
}

impl AccessDecisionCache {
    pub fn new(classifier: Arc<dyn Classifier>, gate: AccessGate) -> Self {
        Self {
            classifier,
            gate,
            ttl: DEFAULT_TTL,
            lookup_timeout: DEFAULT_TIMEOUT,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Set the time-to-live of cached decisions.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Bound a single classifier call.
    pub fn with_lookup_timeout(mut self, lookup_timeout: Duration) -> Self {
        self.lookup_timeout = lookup_timeout;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Current knowledge about `addr`, without classifying.
    pub async fn state(&self, addr: IpAddr) -> DecisionState {
        let entries = self.entries.read().await;
        match entries.get(&addr) {
            Some(entry) if !self.is_expired(entry) => entry.state.clone(),
            _ => DecisionState::Unknown,
        }
    }

    /// Origin recorded alongside the live decision for `addr`, if any.
    pub async fn classification(&self, addr: IpAddr) -> Option<Classification> {
        let entries = self.entries.read().await;
        entries
            .get(&addr)
            .filter(|entry| !self.is_expired(entry))
            .and_then(|entry| entry.classification.clone())
    }

    /// Allow or deny `addr`, classifying it only on a miss.
    pub async fn decide(&self, addr: IpAddr) -> AccessDecision {
        match self.state(addr).await {
            DecisionState::Allowed => return AccessDecision::Allow,
            DecisionState::Denied(reason) => return AccessDecision::Deny(reason),
            DecisionState::Unknown => {}
        }

        let lookup = timeout(self.lookup_timeout, self.classifier.classify(addr)).await;
        let classification = match lookup {
            Ok(Ok(classification)) => Some(classification),
            Ok(Err(_)) | Err(_) => None,
        };
        let decision = classification
            .as_ref()
            .map_or(AccessDecision::Allow, |c| self.gate.evaluate(c));

        let entry = CacheEntry {
            state: decision.clone().into(),
            classification,
            written_at: Instant::now(),
        };
        self.entries.write().await.insert(addr, entry);

        decision
    }

    /// Drop expired entries. Returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !self.is_expired(entry));
        before - entries.len()
    }

    /// Number of stored entries, expired ones included.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    fn is_expired(&self, entry: &CacheEntry) -> bool {
        entry.written_at.elapsed() >= self.ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ClassifierError, ClassifierResult};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    enum Reply {
        Origin(&'static str, &'static str),
        Fail,
        Hang,
    }

    struct FakeClassifier {
        reply: Reply,
        calls: AtomicUsize,
    }

    impl FakeClassifier {
        fn new(reply: Reply) -> Arc<Self> {
            Arc::new(Self { reply, calls: AtomicUsize::new(0) })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Classifier for FakeClassifier {
        async fn classify(&self, _addr: IpAddr) -> ClassifierResult<Classification> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.reply {
                Reply::Origin(isp, country) => Ok(Classification {
                    operator_name: Some(isp.to_string()),
                    region_code: Some(country.to_string()),
                }),
                Reply::Fail => Err(ClassifierError::Status(503)),
                Reply::Hang => std::future::pending().await,
            }
        }
    }

    fn gate() -> AccessGate {
        AccessGate::new(["CN", "ES", "US"], ["Amazon", "Microsoft", "Google"])
    }

    fn addr() -> IpAddr {
        "203.0.113.7".parse().unwrap()
    }

    #[tokio::test]
    async fn test_blocked_region_denied() {
        let classifier = FakeClassifier::new(Reply::Origin("Comcast", "US"));
        let cache = AccessDecisionCache::new(classifier.clone(), gate());

        let decision = cache.decide(addr()).await;
        assert_eq!(decision, AccessDecision::Deny(DenyReason::Region("US".into())));
        assert_eq!(
            cache.state(addr()).await,
            DecisionState::Denied(DenyReason::Region("US".into()))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_classification_kept_with_decision() {
        let classifier = FakeClassifier::new(Reply::Origin("Orange", "FR"));
        let cache = AccessDecisionCache::new(classifier.clone(), gate());

        assert_eq!(cache.classification(addr()).await, None);
        cache.decide(addr()).await;

        let origin = cache.classification(addr()).await.unwrap();
        assert_eq!(origin.operator_name.as_deref(), Some("Orange"));
        assert_eq!(origin.region_code.as_deref(), Some("FR"));
        assert_eq!(classifier.calls(), 1);

        tokio::time::advance(DEFAULT_TTL).await;
        assert_eq!(cache.classification(addr()).await, None);
    }

    #[tokio::test]
    async fn test_failed_lookup_has_no_classification() {
        let cache = AccessDecisionCache::new(FakeClassifier::new(Reply::Fail), gate());

        assert!(cache.decide(addr()).await.is_allowed());
        assert_eq!(cache.classification(addr()).await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cached_deny_within_ttl() {
        let classifier = FakeClassifier::new(Reply::Origin("Amazon.com", "FR"));
        let cache = AccessDecisionCache::new(classifier.clone(), gate());

        let first = cache.decide(addr()).await;
        tokio::time::advance(Duration::from_secs(59 * 60)).await;
        let second = cache.decide(addr()).await;

        assert!(!first.is_allowed());
        assert_eq!(first, second);
        assert_eq!(classifier.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entry_reclassified() {
        let classifier = FakeClassifier::new(Reply::Origin("Comcast", "US"));
        let cache = AccessDecisionCache::new(classifier.clone(), gate());

        cache.decide(addr()).await;
        tokio::time::advance(DEFAULT_TTL).await;

        assert_eq!(cache.state(addr()).await, DecisionState::Unknown);
        cache.decide(addr()).await;
        assert_eq!(classifier.calls(), 2);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_allowed_decision_cached() {
        let classifier = FakeClassifier::new(Reply::Origin("Orange", "FR"));
        let cache = AccessDecisionCache::new(classifier.clone(), gate());

        assert!(cache.decide(addr()).await.is_allowed());
        assert!(cache.decide(addr()).await.is_allowed());
        assert_eq!(classifier.calls(), 1);
        assert_eq!(cache.state(addr()).await, DecisionState::Allowed);
    }

    #[tokio::test]
    async fn test_classifier_failure_allows_and_caches() {
        let classifier = FakeClassifier::new(Reply::Fail);
        let cache = AccessDecisionCache::new(classifier.clone(), gate());

        assert!(cache.decide(addr()).await.is_allowed());
        assert!(cache.decide(addr()).await.is_allowed());
        assert_eq!(classifier.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_classifier_timeout_allows() {
        let classifier = FakeClassifier::new(Reply::Hang);
        let cache = AccessDecisionCache::new(classifier.clone(), gate())
            .with_lookup_timeout(Duration::from_millis(50));

        assert!(cache.decide(addr()).await.is_allowed());
        assert_eq!(cache.state(addr()).await, DecisionState::Allowed);
    }

    #[tokio::test]
    async fn test_unknown_before_first_decision() {
        let cache = AccessDecisionCache::new(FakeClassifier::new(Reply::Fail), gate());
        assert_eq!(cache.state(addr()).await, DecisionState::Unknown);
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_addresses_cached_independently() {
        let classifier = FakeClassifier::new(Reply::Origin("Comcast", "US"));
        let cache = AccessDecisionCache::new(classifier.clone(), gate());

        cache.decide(addr()).await;
        cache.decide("198.51.100.2".parse().unwrap()).await;
        assert_eq!(classifier.calls(), 2);
        assert_eq!(cache.len().await, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired() {
        let classifier = FakeClassifier::new(Reply::Origin("Orange", "FR"));
        let cache =
            AccessDecisionCache::new(classifier, gate()).with_ttl(Duration::from_secs(10));

        cache.decide(addr()).await;
        tokio::time::advance(Duration::from_secs(5)).await;
        cache.decide("198.51.100.2".parse().unwrap()).await;
        tokio::time::advance(Duration::from_secs(6)).await;

        assert_eq!(cache.purge_expired().await, 1);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_decisions_consistent() {
        let classifier = FakeClassifier::new(Reply::Origin("Google LLC", "FR"));
        let cache = Arc::new(AccessDecisionCache::new(classifier.clone(), gate()));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.decide(addr()).await })
            })
            .collect();

        for handle in handles {
            let decision = handle.await.unwrap();
            assert_eq!(decision, AccessDecision::Deny(DenyReason::Operator("Google LLC".into())));
        }

        assert!(classifier.calls() >= 1);
        assert_eq!(cache.len().await, 1);
        assert_eq!(
            cache.state(addr()).await,
            DecisionState::Denied(DenyReason::Operator("Google LLC".into()))
        );
    }
}
