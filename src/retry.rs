//! Retry policy for certificate fetches.
//!
//! Transient failures are retried up to `max_retries` times. The delay before
//! retry `k` (1-indexed) is `unit * base^k`, optionally capped. Decoding
//! failures and invalid domain names are never retried; handshake failures
//! follow `HandshakePolicy`.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use tokio_retry::RetryIf;

use crate::config::{Config, HandshakePolicy, RETRY_BACKOFF_UNIT};
use crate::error_handling::FailureClass;
use crate::tls::{CertificateFetcher, FetchFailure, FetchOutcome};

/// Ceiling for a single delay when no cap is configured; keeps timer deadlines representable.
const MAX_SINGLE_DELAY: Duration = Duration::from_secs(24 * 60 * 60);

/// How often and how patiently a fetch is retried.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    base: f64,
    unit: Duration,
    max_delay: Option<Duration>,
    handshake: HandshakePolicy,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base: f64, handshake: HandshakePolicy) -> Self {
        Self {
            max_retries,
            base,
            unit: RETRY_BACKOFF_UNIT,
            max_delay: None,
            handshake,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.max_retries,
            config.backoff_base,
            config.handshake_failures,
        )
        .with_max_delay(
            config
                .max_backoff_secs
                .and_then(|secs| Duration::try_from_secs_f64(secs).ok()),
        )
    }

    /// Replaces the time unit the exponent is multiplied with.
    pub fn with_unit(mut self, unit: Duration) -> Self {
        self.unit = unit;
        self
    }

    pub fn with_max_delay(mut self, max_delay: Option<Duration>) -> Self {
        self.max_delay = max_delay;
        self
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// The delays slept before each retry, in order. Yields `max_retries` items.
    pub fn delays(&self) -> impl Iterator<Item = Duration> + Send + 'static {
        let (base, unit, max_delay) = (self.base, self.unit, self.max_delay);
        (1..=self.max_retries).map(move |k| {
            let secs = unit.as_secs_f64() * base.powi(k.min(i32::MAX as u32) as i32);
            let delay = Duration::try_from_secs_f64(secs)
                .unwrap_or(MAX_SINGLE_DELAY)
                .min(MAX_SINGLE_DELAY);
            match max_delay {
                Some(cap) => delay.min(cap),
                None => delay,
            }
        })
    }

    /// Whether another attempt may follow `failure`.
    pub fn should_retry(&self, failure: &FetchFailure) -> bool {
        match failure {
            FetchFailure::Parse(_) => false,
            FetchFailure::Transient(e) => match e.class() {
                FailureClass::Handshake => self.handshake == HandshakePolicy::Retry,
                FailureClass::TransientNetwork | FailureClass::Unexpected => true,
                FailureClass::InvalidInput => false,
            },
        }
    }
}

/// Final outcome of a retried fetch.
#[derive(Debug)]
pub struct RetriedFetch {
    pub outcome: FetchOutcome,
    /// Number of fetch calls made, the first one included.
    pub attempts: u32,
}

/// Fetches `domain`, retrying per `policy`.
///
/// `on_failure` sees every failed attempt with its 1-indexed attempt number,
/// before the decision to retry is made.
pub async fn fetch_with_retry<F>(
    fetcher: &dyn CertificateFetcher,
    domain: &str,
    policy: &RetryPolicy,
    mut on_failure: F,
) -> RetriedFetch
where
    F: FnMut(u32, &FetchFailure) + Send,
{
    let attempt_count = AtomicU32::new(0);

    let outcome = RetryIf::start(
        policy.delays(),
        || {
            attempt_count.fetch_add(1, Ordering::SeqCst);
            fetcher.fetch(domain)
        },
        |failure: &FetchFailure| {
            on_failure(attempt_count.load(Ordering::SeqCst), failure);
            policy.should_retry(failure)
        },
    )
    .await;

    RetriedFetch {
        outcome,
        attempts: attempt_count.load(Ordering::SeqCst),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error_handling::FetchError;
    use crate::tls::PemCertificate;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Instant;

    fn refused(domain: &str) -> FetchFailure {
        FetchFailure::Transient(FetchError::Connect {
            domain: domain.to_string(),
            port: 443,
            source: std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused"),
        })
    }

    fn handshake(domain: &str) -> FetchFailure {
        FetchFailure::Transient(FetchError::HandshakeTimeout {
            domain: domain.to_string(),
            secs: 3,
        })
    }

    /// Plays back a script of outcomes and records when each call happened.
    struct ScriptedFetcher {
        script: Mutex<Vec<FetchOutcome>>,
        calls: Mutex<Vec<Instant>>,
    }

    impl ScriptedFetcher {
        fn new(mut script: Vec<FetchOutcome>) -> Self {
            script.reverse();
            Self {
                script: Mutex::new(script),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<Instant> {
            self.calls.lock().expect("lock").clone()
        }
    }

    #[async_trait]
    impl CertificateFetcher for ScriptedFetcher {
        async fn fetch(&self, domain: &str) -> FetchOutcome {
            self.calls.lock().expect("lock").push(Instant::now());
            self.script
                .lock()
                .expect("lock")
                .pop()
                .unwrap_or_else(|| Err(refused(domain)))
        }
    }

    #[test]
    fn test_delays_follow_the_exponent() {
        let policy = RetryPolicy::new(3, 1.2, HandshakePolicy::Retry);
        let delays: Vec<Duration> = policy.delays().collect();
        assert_eq!(delays.len(), 3);
        for (delay, expected) in delays.iter().zip([1.2, 1.44, 1.728]) {
            assert!(
                (delay.as_secs_f64() - expected).abs() < 1e-6,
                "{delay:?} != {expected}s"
            );
        }
    }

    #[test]
    fn test_delays_strictly_increase() {
        let policy = RetryPolicy::new(8, 1.2, HandshakePolicy::Retry);
        let delays: Vec<Duration> = policy.delays().collect();
        for pair in delays.windows(2) {
            assert!(pair[1] > pair[0], "{:?} should exceed {:?}", pair[1], pair[0]);
        }
    }

    #[test]
    fn test_delays_respect_cap() {
        let policy = RetryPolicy::new(10, 2.0, HandshakePolicy::Retry)
            .with_max_delay(Some(Duration::from_secs(5)));
        assert!(policy.delays().all(|d| d <= Duration::from_secs(5)));
        assert_eq!(policy.delays().last(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_huge_exponent_saturates_instead_of_panicking() {
        let policy = RetryPolicy::new(5000, 10.0, HandshakePolicy::Retry);
        assert_eq!(policy.delays().last(), Some(MAX_SINGLE_DELAY));
    }

    #[test]
    fn test_zero_retries_yields_no_delays() {
        let policy = RetryPolicy::new(0, 1.2, HandshakePolicy::Retry);
        assert_eq!(policy.delays().count(), 0);
    }

    #[test]
    fn test_should_retry_by_class() {
        let retrying = RetryPolicy::new(2, 1.2, HandshakePolicy::Retry);
        let strict = RetryPolicy::new(2, 1.2, HandshakePolicy::Permanent);

        assert!(retrying.should_retry(&refused("a.example")));
        assert!(strict.should_retry(&refused("a.example")));

        assert!(retrying.should_retry(&handshake("a.example")));
        assert!(!strict.should_retry(&handshake("a.example")));

        let invalid = FetchFailure::Transient(FetchError::InvalidDomain {
            domain: "rank,domain".into(),
            reason: "invalid dns name".into(),
        });
        assert!(!retrying.should_retry(&invalid));
        assert!(!strict.should_retry(&invalid));

        let parse = FetchFailure::Parse("bad DER".into());
        assert!(!retrying.should_retry(&parse));
        assert!(!strict.should_retry(&parse));
    }

    #[test]
    fn test_from_config() {
        let config = Config {
            max_retries: 4,
            backoff_base: 1.5,
            max_backoff_secs: Some(2.0),
            handshake_failures: HandshakePolicy::Permanent,
            ..Default::default()
        };
        let policy = RetryPolicy::from_config(&config);
        assert_eq!(policy.max_retries(), 4);
        assert!(policy.delays().all(|d| d <= Duration::from_secs(2)));
        assert!(!policy.should_retry(&handshake("a.example")));
    }

    #[tokio::test]
    async fn test_always_failing_domain_uses_whole_budget() {
        let fetcher = ScriptedFetcher::new(vec![]);
        let policy =
            RetryPolicy::new(2, 2.0, HandshakePolicy::Retry).with_unit(Duration::from_millis(20));
        let mut seen = Vec::new();

        let retried = fetch_with_retry(&fetcher, "down.example", &policy, |attempt, _| {
            seen.push(attempt)
        })
        .await;

        assert!(retried.outcome.is_err());
        assert_eq!(retried.attempts, 3);
        assert_eq!(seen, vec![1, 2, 3]);

        let calls = fetcher.calls();
        assert_eq!(calls.len(), 3);
        let expected: Vec<Duration> = policy.delays().collect();
        for (i, pair) in calls.windows(2).enumerate() {
            let gap = pair[1] - pair[0];
            assert!(gap >= expected[i], "gap {gap:?} shorter than {:?}", expected[i]);
        }
    }

    #[tokio::test]
    async fn test_success_after_transient_failure() {
        let fetcher = ScriptedFetcher::new(vec![
            Err(refused("flaky.example")),
            Ok(PemCertificate::new("pem")),
        ]);
        let policy =
            RetryPolicy::new(2, 1.2, HandshakePolicy::Retry).with_unit(Duration::from_millis(1));

        let retried = fetch_with_retry(&fetcher, "flaky.example", &policy, |_, _| {}).await;
        assert_eq!(retried.outcome.expect("certificate").as_str(), "pem");
        assert_eq!(retried.attempts, 2);
    }

    #[tokio::test]
    async fn test_parse_failure_stops_immediately() {
        let fetcher = ScriptedFetcher::new(vec![Err(FetchFailure::Parse("bad DER".into()))]);
        let policy =
            RetryPolicy::new(5, 1.2, HandshakePolicy::Retry).with_unit(Duration::from_millis(1));

        let retried = fetch_with_retry(&fetcher, "weird.example", &policy, |_, _| {}).await;
        assert!(matches!(retried.outcome, Err(FetchFailure::Parse(_))));
        assert_eq!(retried.attempts, 1);
    }

    #[tokio::test]
    async fn test_invalid_domain_is_attempted_once() {
        let fetcher = ScriptedFetcher::new(vec![Err(FetchFailure::Transient(
            FetchError::InvalidDomain {
                domain: "rank,domain".into(),
                reason: "invalid dns name".into(),
            },
        ))]);
        let policy =
            RetryPolicy::new(2, 1.2, HandshakePolicy::Retry).with_unit(Duration::from_millis(1));

        let retried = fetch_with_retry(&fetcher, "rank,domain", &policy, |_, _| {}).await;
        assert!(retried.outcome.is_err());
        assert_eq!(retried.attempts, 1);
    }

    #[tokio::test]
    async fn test_permanent_handshake_policy_stops_after_first_attempt() {
        let fetcher = ScriptedFetcher::new(vec![Err(handshake("tls.example"))]);
        let policy = RetryPolicy::new(5, 1.2, HandshakePolicy::Permanent)
            .with_unit(Duration::from_millis(1));

        let retried = fetch_with_retry(&fetcher, "tls.example", &policy, |_, _| {}).await;
        assert!(retried.outcome.is_err());
        assert_eq!(retried.attempts, 1);
    }
}
