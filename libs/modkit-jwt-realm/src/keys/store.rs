use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;

use super::remote::JwksClient;
use super::refresh::RefreshState;
use super::source::{KeyLoadError, KeySource};
use crate::algorithm::{KeyFamily, SignatureAlgorithm};
use crate::config::{HmacKeySource, PublicKeySource, RealmConfig, RefreshSettings};
use crate::config_error::ConfigError;
use crate::errors::RealmError;
use crate::jwk::{JsonWebKey, JwkSet};
use crate::metrics::{RealmEvent, RealmMetricLabels, RealmMetrics};

/// Upper bound on remembered unknown key ids.
const MAX_TRACKED_KIDS: usize = 256;

/// Longest pause between checks of the refresh schedule.
const MAX_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Immutable, versioned snapshot of verification keys.
#[derive(Debug)]
pub struct KeySet {
    version: u64,
    source: String,
    loaded_at: Instant,
    keys: JwkSet,
}

impl KeySet {
    fn new(version: u64, source: String, keys: JwkSet) -> Self {
        Self {
            version,
            source,
            loaded_at: Instant::now(),
            keys,
        }
    }

    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    #[must_use]
    pub fn loaded_at(&self) -> Instant {
        self.loaded_at
    }

    #[must_use]
    pub fn keys(&self) -> &JwkSet {
        &self.keys
    }

    /// Keys that may verify a token signed with `alg`.
    ///
    /// With a `kid`, keys carrying a different kid are excluded; keys without
    /// a kid stay eligible.
    #[must_use]
    pub fn candidates(&self, alg: SignatureAlgorithm, kid: Option<&str>) -> Vec<Arc<JsonWebKey>> {
        self.keys
            .keys()
            .iter()
            .filter(|key| key.is_compatible_with(alg))
            .filter(|key| match (kid, key.kid()) {
                (Some(wanted), Some(have)) => wanted == have,
                _ => true,
            })
            .cloned()
            .collect()
    }
}

struct RefreshableKeySet {
    source: KeySource,
    label: String,
    current: ArcSwapOption<KeySet>,
    state: RwLock<RefreshState>,
    refresh_lock: Mutex<()>,
    versions: AtomicU64,
}

/// Verification keys for one realm.
///
/// HMAC keys are fixed for the lifetime of the store. Public keys come from a
/// file or URL, are swapped atomically on refresh, and the last good set is
/// kept when a refresh fails.
pub struct KeyStore {
    hmac: Option<Arc<KeySet>>,
    public: Option<RefreshableKeySet>,
    refresh: RefreshSettings,
    issuer: String,
    metrics: Arc<dyn RealmMetrics>,
}

impl KeyStore {
    /// Build the store and perform the initial loads.
    ///
    /// A local file that cannot be loaded is fatal. A remote endpoint that
    /// cannot be reached is logged; it is retried on the next authentication.
    ///
    /// # Errors
    /// Returns [`ConfigError`] when inline or local key material is unusable
    /// or the HTTP client cannot be set up.
    pub async fn from_config(
        config: &RealmConfig,
        metrics: Arc<dyn RealmMetrics>,
    ) -> Result<Self, ConfigError> {
        let sources = config.key_sources();

        let hmac = match &sources.hmac {
            Some(HmacKeySource::Secret(secret)) => Some(JwkSet::new(vec![
                JsonWebKey::from_secret(None, secret.as_bytes()),
            ])),
            Some(HmacKeySource::JwkSet(json)) => Some(
                JwkSet::parse(json.expose())
                    .map_err(|e| ConfigError::invalid("hmac_jwkset", e.to_string()))?,
            ),
            None => None,
        }
        .map(|keys| Arc::new(KeySet::new(1, "hmac".to_owned(), keys)));

        let public = match &sources.public {
            Some(PublicKeySource::File(path)) => Some(KeySource::File(path.clone())),
            Some(PublicKeySource::Url(url)) => Some(KeySource::Remote(JwksClient::new(
                url.clone(),
                config.http(),
                config.ssl(),
            )?)),
            None => None,
        }
        .map(|source| RefreshableKeySet {
            label: source.label(),
            source,
            current: ArcSwapOption::empty(),
            state: RwLock::new(RefreshState::default()),
            refresh_lock: Mutex::new(()),
            versions: AtomicU64::new(0),
        });

        let store = Self {
            hmac,
            public,
            refresh: config.refresh().clone(),
            issuer: config.issuer().to_owned(),
            metrics,
        };

        if let Some(public) = &store.public
            && let Err(e) = store.perform_refresh(public).await
        {
            if !public.source.is_remote() {
                return Err(ConfigError::invalid("pkc_jwkset_path", e.to_string()));
            }
            tracing::warn!(
                source = %public.label,
                error = %e,
                "Initial JWK set fetch failed; retrying on demand"
            );
        }

        Ok(store)
    }

    /// Candidate keys for `alg`, refreshing the public set when it was never
    /// loaded or does not know `kid`.
    ///
    /// # Errors
    /// Returns [`RealmError::KeyUnavailable`] when no key matches.
    pub async fn candidates(
        &self,
        alg: SignatureAlgorithm,
        kid: Option<&str>,
    ) -> Result<Vec<Arc<JsonWebKey>>, RealmError> {
        let set = if alg.family() == KeyFamily::Hmac {
            self.hmac
                .clone()
                .ok_or_else(|| RealmError::KeyUnavailable("no HMAC key configured".to_owned()))?
        } else {
            let public = self.public.as_ref().ok_or_else(|| {
                RealmError::KeyUnavailable("no public key source configured".to_owned())
            })?;
            self.public_set_for(public, kid).await.ok_or_else(|| {
                RealmError::KeyUnavailable(format!("no key set loaded from {}", public.label))
            })?
        };

        let candidates = set.candidates(alg, kid);
        if candidates.is_empty() {
            return Err(RealmError::KeyUnavailable(match kid {
                Some(kid) => format!("no {alg} key with kid '{kid}' in {}", set.source()),
                None => format!("no {alg} key in {}", set.source()),
            }));
        }
        Ok(candidates)
    }

    async fn public_set_for(
        &self,
        public: &RefreshableKeySet,
        kid: Option<&str>,
    ) -> Option<Arc<KeySet>> {
        let current = public.current.load_full();
        let stale = match (&current, kid) {
            (None, _) => true,
            (Some(set), Some(kid)) => !set.keys().contains_kid(kid),
            (Some(_), None) => false,
        };
        if !stale {
            return current;
        }

        self.on_demand_refresh(public, kid, current.as_ref().map(|s| s.version()))
            .await;
        public.current.load_full()
    }

    async fn on_demand_refresh(
        &self,
        public: &RefreshableKeySet,
        kid: Option<&str>,
        seen_version: Option<u64>,
    ) {
        if self.throttled(public, kid).await {
            return;
        }

        let _guard = public.refresh_lock.lock().await;

        // Another request may have refreshed while this one waited.
        let version = public.current.load().as_ref().map(|s| s.version());
        if version != seen_version || self.throttled(public, kid).await {
            return;
        }

        tracing::info!(
            source = %public.label,
            kid = ?kid,
            "Performing on-demand JWK set refresh"
        );
        let result = self.perform_refresh(public).await;

        let mut state = public.state.write().await;
        state.last_on_demand_refresh = Some(Instant::now());
        let Some(kid) = kid else {
            return;
        };
        let found = result
            .as_ref()
            .is_ok_and(|set| set.keys().contains_kid(kid));
        if found {
            state.failed_kids.remove(kid);
        } else {
            if state.failed_kids.len() >= MAX_TRACKED_KIDS {
                state.failed_kids.clear();
            }
            state.failed_kids.insert(kid.to_owned());
            tracing::warn!(
                source = %public.label,
                kid = kid,
                "Kid still not found after on-demand JWK set refresh"
            );
        }
    }

    async fn throttled(&self, public: &RefreshableKeySet, kid: Option<&str>) -> bool {
        let state = public.state.read().await;
        let Some(remaining) =
            state.cooldown_remaining(Instant::now(), self.refresh.on_demand_cooldown)
        else {
            return false;
        };
        tracing::debug!(
            source = %public.label,
            kid = ?kid,
            remaining_ms = u64::try_from(remaining.as_millis()).unwrap_or(u64::MAX),
            "On-demand JWK set refresh throttled (cooldown active)"
        );
        if kid.is_some_and(|kid| state.failed_kids.contains(kid)) {
            tracing::warn!(
                kid = ?kid,
                "Unknown kid repeatedly requested despite recent refresh attempts"
            );
        }
        true
    }

    async fn perform_refresh(
        &self,
        public: &RefreshableKeySet,
    ) -> Result<Arc<KeySet>, KeyLoadError> {
        let labels = RealmMetricLabels::default()
            .with_issuer(self.issuer.clone())
            .with_source(public.label.clone());

        match public.source.load().await {
            Ok(keys) => {
                let version = public.versions.fetch_add(1, Ordering::Relaxed) + 1;
                let count = keys.len();
                let set = Arc::new(KeySet::new(version, public.label.clone(), keys));
                public.current.store(Some(Arc::clone(&set)));
                public.state.write().await.record_success(Instant::now());
                self.metrics.record_event(RealmEvent::KeySetRefreshed, &labels);
                tracing::info!(
                    source = %public.label,
                    version,
                    keys = count,
                    "JWK set loaded"
                );
                Ok(set)
            }
            Err(e) => {
                public
                    .state
                    .write()
                    .await
                    .record_failure(Instant::now(), e.to_string());
                self.metrics
                    .record_event(RealmEvent::KeySetRefreshFailed, &labels);
                tracing::warn!(
                    source = %public.label,
                    error = %e,
                    serving_stale = public.current.load().is_some(),
                    "JWK set refresh failed"
                );
                Err(e)
            }
        }
    }

    /// Refresh the public key set if the interval (or backoff) has elapsed.
    ///
    /// # Errors
    /// Returns the load error; the previous key set stays in use.
    pub async fn refresh_if_due(&self) -> Result<(), KeyLoadError> {
        let Some(public) = &self.public else {
            return Ok(());
        };
        if !self.is_due(public).await {
            return Ok(());
        }
        let _guard = public.refresh_lock.lock().await;
        if !self.is_due(public).await {
            return Ok(());
        }
        self.perform_refresh(public).await.map(|_| ())
    }

    /// Refresh the public key set now, ignoring the schedule.
    ///
    /// # Errors
    /// Returns the load error; the previous key set stays in use.
    pub async fn refresh_now(&self) -> Result<(), KeyLoadError> {
        let Some(public) = &self.public else {
            return Ok(());
        };
        let _guard = public.refresh_lock.lock().await;
        self.perform_refresh(public).await.map(|_| ())
    }

    async fn is_due(&self, public: &RefreshableKeySet) -> bool {
        public.state.read().await.is_due(
            Instant::now(),
            self.refresh.interval,
            self.refresh.max_backoff,
        )
    }

    /// How often the background task checks the schedule.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        self.refresh.interval.min(MAX_POLL_INTERVAL)
    }

    /// Current public key set, possibly stale.
    #[must_use]
    pub fn public_key_set(&self) -> Option<Arc<KeySet>> {
        self.public.as_ref().and_then(|p| p.current.load_full())
    }

    /// Error of the most recent failed public key set load, if the last
    /// attempt failed.
    pub async fn last_refresh_error(&self) -> Option<String> {
        match &self.public {
            Some(public) => public.state.read().await.last_error.clone(),
            None => None,
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::config::JwtRealmSettings;
    use crate::metrics::NoOpMetrics;
    use serde_json::json;

    fn hmac_config(extra: serde_json::Value) -> RealmConfig {
        let mut value = json!({
            "allowed_issuer": "https://iss1",
            "allowed_signature_algorithms": ["HS256", "HS512"],
            "allowed_audiences": ["aud1"],
        });
        for (k, v) in extra.as_object().unwrap() {
            value[k] = v.clone();
        }
        let settings: JwtRealmSettings = serde_json::from_value(value).unwrap();
        RealmConfig::from_settings(settings).unwrap()
    }

    #[tokio::test]
    async fn test_inline_secret_becomes_single_key() {
        let config = hmac_config(json!({"hmac_key": "s3cr3t-key-value"}));
        let store = KeyStore::from_config(&config, Arc::new(NoOpMetrics))
            .await
            .unwrap();

        let keys = store
            .candidates(SignatureAlgorithm::HS256, None)
            .await
            .unwrap();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].kid(), None);

        // A kid in the token does not exclude an anonymous key.
        assert_eq!(
            store
                .candidates(SignatureAlgorithm::HS512, Some("any"))
                .await
                .unwrap()
                .len(),
            1
        );

        assert!(matches!(
            store.candidates(SignatureAlgorithm::RS256, None).await,
            Err(RealmError::KeyUnavailable(_))
        ));
        assert!(store.public_key_set().is_none());
    }

    #[tokio::test]
    async fn test_kid_filters_jwk_set() {
        let jwkset = json!({"keys": [
            {"kty": "oct", "kid": "a", "k": "c2VjcmV0LWE"},
            {"kty": "oct", "kid": "b", "alg": "HS512", "k": "c2VjcmV0LWI"}
        ]})
        .to_string();
        let config = hmac_config(json!({"hmac_jwkset": jwkset}));
        let store = KeyStore::from_config(&config, Arc::new(NoOpMetrics))
            .await
            .unwrap();

        let a = store
            .candidates(SignatureAlgorithm::HS256, Some("a"))
            .await
            .unwrap();
        assert_eq!(a.len(), 1);
        assert_eq!(a[0].kid(), Some("a"));

        // 'b' is pinned to HS512.
        assert!(matches!(
            store.candidates(SignatureAlgorithm::HS256, Some("b")).await,
            Err(RealmError::KeyUnavailable(_))
        ));
        assert_eq!(
            store
                .candidates(SignatureAlgorithm::HS512, None)
                .await
                .unwrap()
                .len(),
            2
        );
    }
}
