//! Metrics hooks for realm events.
//!
//! Backends (Prometheus, `StatsD`, ...) implement [`RealmMetrics`]; the realm
//! defaults to [`NoOpMetrics`].

use std::time::Duration;

/// Events the realm reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RealmEvent {
    /// A request produced a verified identity.
    Authenticated,

    /// A request was rejected.
    Rejected,

    /// Identity served from the JWT cache.
    CacheHit,

    /// A JWK set load succeeded.
    KeySetRefreshed,

    /// A JWK set load failed; the previous set, if any, stays in use.
    KeySetRefreshFailed,
}

impl RealmEvent {
    #[must_use]
    pub fn metric_name(&self) -> &'static str {
        match self {
            RealmEvent::Authenticated => "jwt_realm.authn.ok",
            RealmEvent::Rejected => "jwt_realm.authn.rejected",
            RealmEvent::CacheHit => "jwt_realm.cache.hit",
            RealmEvent::KeySetRefreshed => "jwt_realm.jwkset.refresh.ok",
            RealmEvent::KeySetRefreshFailed => "jwt_realm.jwkset.refresh.fail",
        }
    }
}

/// Labels attached to a recorded event.
#[derive(Default, Debug, Clone)]
pub struct RealmMetricLabels {
    pub issuer: Option<String>,

    /// Key set source (`hmac`, a file path or a URL).
    pub source: Option<String>,

    /// Signature algorithm of the token.
    pub algorithm: Option<String>,

    /// [`crate::RealmError::kind`] for rejections.
    pub error_kind: Option<&'static str>,
}

impl RealmMetricLabels {
    #[must_use]
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    #[must_use]
    pub fn with_algorithm(mut self, algorithm: impl Into<String>) -> Self {
        self.algorithm = Some(algorithm.into());
        self
    }

    #[must_use]
    pub fn with_error_kind(mut self, kind: &'static str) -> Self {
        self.error_kind = Some(kind);
        self
    }
}

/// Trait for metrics backends
pub trait RealmMetrics: Send + Sync {
    fn record_event(&self, event: RealmEvent, labels: &RealmMetricLabels);

    /// Time spent in one `authenticate` call.
    fn record_duration(&self, duration: Duration, labels: &RealmMetricLabels);
}

/// No-op metrics implementation (default)
#[derive(Debug, Clone, Copy)]
pub struct NoOpMetrics;

impl RealmMetrics for NoOpMetrics {
    fn record_event(&self, _event: RealmEvent, _labels: &RealmMetricLabels) {}

    fn record_duration(&self, _duration: Duration, _labels: &RealmMetricLabels) {}
}

/// Logging-based metrics implementation (for debugging)
#[derive(Debug, Clone, Copy)]
pub struct LoggingMetrics;

impl RealmMetrics for LoggingMetrics {
    fn record_event(&self, event: RealmEvent, labels: &RealmMetricLabels) {
        tracing::debug!(
            metric = event.metric_name(),
            issuer = ?labels.issuer,
            source = ?labels.source,
            algorithm = ?labels.algorithm,
            error_kind = ?labels.error_kind,
            "Realm event recorded"
        );
    }

    fn record_duration(&self, duration: Duration, labels: &RealmMetricLabels) {
        tracing::debug!(
            metric = "jwt_realm.authn.duration_us",
            duration_us = u64::try_from(duration.as_micros()).unwrap_or(u64::MAX),
            issuer = ?labels.issuer,
            "Authentication duration recorded"
        );
    }
}
