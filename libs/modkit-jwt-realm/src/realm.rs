//! The realm: one configured issuer, its keys, and the authentication flow.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use arc_swap::ArcSwap;
use time::OffsetDateTime;
use tokio_util::sync::CancellationToken;

use crate::cache::JwtCache;
use crate::config::{ClientAuthentication, RealmConfig};
use crate::config_error::ConfigError;
use crate::errors::{AuthenticationFailed, RealmError};
use crate::identity::VerifiedIdentity;
use crate::keys::{KeyStore, KeyStoreProvider};
use crate::mapping::{IdentityMapper, RoleResolver};
use crate::metrics::{NoOpMetrics, RealmEvent, RealmMetricLabels, RealmMetrics};
use crate::request::{AuthenticationRequest, ClientCredential};
use crate::token;
use crate::validation::validate_claims;
use crate::verifier;

/// Source of the current time for claim checks.
pub trait Clock: Send + Sync {
    fn now(&self) -> OffsetDateTime;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// Progress of a single authentication attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthenticationState {
    Unauthenticated,
    ParseToken,
    VerifySignature,
    ValidateClaims,
    MapIdentity,
    Authenticated,
    /// Carries [`RealmError::kind`].
    Rejected(&'static str),
}

impl AuthenticationState {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::ParseToken => "parse_token",
            Self::VerifySignature => "verify_signature",
            Self::ValidateClaims => "validate_claims",
            Self::MapIdentity => "map_identity",
            Self::Authenticated => "authenticated",
            Self::Rejected(_) => "rejected",
        }
    }

    fn enter(self) {
        match self {
            Self::Rejected(reason) => {
                tracing::debug!(state = self.name(), reason, "Authentication rejected");
            }
            _ => tracing::trace!(state = self.name(), "Authentication state"),
        }
    }
}

/// Everything derived from one configuration. Replaced as a whole on reload.
struct RealmState {
    config: Arc<RealmConfig>,
    keys: Arc<KeyStore>,
    mapper: IdentityMapper,
    cache: JwtCache,
}

impl RealmState {
    async fn build(
        config: RealmConfig,
        role_resolver: Option<Arc<dyn RoleResolver>>,
        metrics: Arc<dyn RealmMetrics>,
    ) -> Result<Self, ConfigError> {
        let mapper = IdentityMapper::from_config(&config, role_resolver)?;
        let keys = KeyStore::from_config(&config, metrics).await?;
        let cache = JwtCache::new(config.cache());
        Ok(Self {
            config: Arc::new(config),
            keys: Arc::new(keys),
            mapper,
            cache,
        })
    }
}

/// Builder for [`JwtRealm`].
pub struct JwtRealmBuilder {
    config: RealmConfig,
    role_resolver: Option<Arc<dyn RoleResolver>>,
    metrics: Option<Arc<dyn RealmMetrics>>,
    clock: Option<Arc<dyn Clock>>,
}

impl JwtRealmBuilder {
    /// Resolver used when `authorization_realms` is configured.
    #[must_use]
    pub fn role_resolver(mut self, resolver: Arc<dyn RoleResolver>) -> Self {
        self.role_resolver = Some(resolver);
        self
    }

    #[must_use]
    pub fn metrics(mut self, metrics: Arc<dyn RealmMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Load key material and assemble the realm.
    ///
    /// # Errors
    /// Returns [`ConfigError`] when key material cannot be loaded or a role
    /// resolver is required but missing.
    pub async fn build(self) -> Result<JwtRealm, ConfigError> {
        let metrics: Arc<dyn RealmMetrics> = self.metrics.unwrap_or_else(|| Arc::new(NoOpMetrics));
        let clock: Arc<dyn Clock> = self.clock.unwrap_or_else(|| Arc::new(SystemClock));

        let state =
            RealmState::build(self.config, self.role_resolver.clone(), Arc::clone(&metrics))
                .await?;
        log_loaded(&state.config, "JWT realm initialized");

        Ok(JwtRealm {
            state: ArcSwap::from_pointee(state),
            role_resolver: self.role_resolver,
            metrics,
            clock,
        })
    }
}

/// Authenticates bearer JWTs issued by one trusted issuer.
///
/// ```ignore
/// let realm = JwtRealm::builder(config).build().await?;
/// let request = AuthenticationRequest::from_headers(&headers, realm.config().header())
///     .ok_or(Unauthorized)?;
/// let identity = realm.authenticate(&request).await?;
/// ```
pub struct JwtRealm {
    state: ArcSwap<RealmState>,
    role_resolver: Option<Arc<dyn RoleResolver>>,
    metrics: Arc<dyn RealmMetrics>,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for JwtRealm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtRealm")
            .field("issuer", &self.state.load().config.issuer())
            .finish_non_exhaustive()
    }
}

impl JwtRealm {
    #[must_use]
    pub fn builder(config: RealmConfig) -> JwtRealmBuilder {
        JwtRealmBuilder {
            config,
            role_resolver: None,
            metrics: None,
            clock: None,
        }
    }

    /// The configuration currently in effect.
    #[must_use]
    pub fn config(&self) -> Arc<RealmConfig> {
        Arc::clone(&self.state.load().config)
    }

    /// Authenticate a request.
    ///
    /// # Errors
    /// Returns [`AuthenticationFailed`] for any rejection. The reason is
    /// available through [`AuthenticationFailed::reason`] only.
    pub async fn authenticate(
        &self,
        request: &AuthenticationRequest,
    ) -> Result<VerifiedIdentity, AuthenticationFailed> {
        let started = Instant::now();
        let state = self.state.load_full();
        let mut labels = RealmMetricLabels::default().with_issuer(state.config.issuer());

        let result = self.attempt(&state, request, &mut labels).await;
        self.finish(result, labels, started)
    }

    /// Like [`JwtRealm::authenticate`], abandoned when `cancellation` fires.
    ///
    /// # Errors
    /// Returns [`AuthenticationFailed`] with [`RealmError::Cancelled`] when
    /// cancelled, otherwise as [`JwtRealm::authenticate`].
    pub async fn authenticate_with_cancellation(
        &self,
        request: &AuthenticationRequest,
        cancellation: &CancellationToken,
    ) -> Result<VerifiedIdentity, AuthenticationFailed> {
        let started = Instant::now();
        let state = self.state.load_full();
        let mut labels = RealmMetricLabels::default().with_issuer(state.config.issuer());

        let result = tokio::select! {
            biased;
            () = cancellation.cancelled() => Err(RealmError::Cancelled),
            result = self.attempt(&state, request, &mut labels) => result,
        };
        self.finish(result, labels, started)
    }

    /// Replace the configuration.
    ///
    /// The new key material is loaded before the swap. On error the current
    /// configuration stays in effect. In-flight authentications finish with
    /// the configuration they started with.
    ///
    /// # Errors
    /// Returns [`ConfigError`] when the new configuration cannot be loaded.
    pub async fn reload(&self, config: RealmConfig) -> Result<(), ConfigError> {
        let state = RealmState::build(
            config,
            self.role_resolver.clone(),
            Arc::clone(&self.metrics),
        )
        .await
        .inspect_err(|e| {
            tracing::warn!(error = %e, "JWT realm reload failed; keeping current configuration");
        })?;
        log_loaded(&state.config, "JWT realm reloaded");
        self.state.store(Arc::new(state));
        Ok(())
    }

    async fn attempt(
        &self,
        state: &RealmState,
        request: &AuthenticationRequest,
        labels: &mut RealmMetricLabels,
    ) -> Result<VerifiedIdentity, RealmError> {
        AuthenticationState::Unauthenticated.enter();
        authenticate_client(state.config.client_authentication(), request)?;

        let now = self.clock.now();
        let cache_key = JwtCache::key(request.token());
        if let Some(identity) = state.cache.get(&cache_key, now) {
            self.metrics.record_event(RealmEvent::CacheHit, labels);
            tracing::debug!(principal = identity.principal(), "JWT cache hit");
            AuthenticationState::Authenticated.enter();
            return Ok(identity);
        }

        AuthenticationState::ParseToken.enter();
        let token = token::parse(request.token())?;
        if let Ok(alg) = verifier::allowed_algorithm(&token, &state.config) {
            labels.algorithm = Some(alg.name().to_owned());
        }

        AuthenticationState::VerifySignature.enter();
        verifier::verify(&token, &state.config, &state.keys).await?;

        AuthenticationState::ValidateClaims.enter();
        validate_claims(token.claims(), &state.config, now)?;

        AuthenticationState::MapIdentity.enter();
        let claims = token.into_claims();
        let identity = state.mapper.map_identity(&claims).await?;

        state.cache.insert(
            cache_key,
            identity.clone(),
            now,
            claims.expires_at,
            state.config.clock_skew(),
        );
        AuthenticationState::Authenticated.enter();
        Ok(identity)
    }

    fn finish(
        &self,
        result: Result<VerifiedIdentity, RealmError>,
        labels: RealmMetricLabels,
        started: Instant,
    ) -> Result<VerifiedIdentity, AuthenticationFailed> {
        let labels = match &result {
            Ok(identity) => {
                self.metrics.record_event(RealmEvent::Authenticated, &labels);
                tracing::debug!(principal = identity.principal(), "JWT authenticated");
                labels
            }
            Err(e) => {
                AuthenticationState::Rejected(e.kind()).enter();
                let labels = labels.with_error_kind(e.kind());
                self.metrics.record_event(RealmEvent::Rejected, &labels);
                labels
            }
        };
        self.metrics.record_duration(started.elapsed(), &labels);
        result.map_err(AuthenticationFailed::from)
    }
}

impl KeyStoreProvider for JwtRealm {
    fn key_store(&self) -> Arc<KeyStore> {
        Arc::clone(&self.state.load().keys)
    }
}

fn authenticate_client(
    mode: &ClientAuthentication,
    request: &AuthenticationRequest,
) -> Result<(), RealmError> {
    let failed = |reason: &str| Err(RealmError::ClientAuthenticationFailed(reason.to_owned()));
    match (mode, request.client_credential()) {
        (ClientAuthentication::None, None) => Ok(()),
        (ClientAuthentication::None, Some(_)) => {
            failed("client credential supplied but client authentication is disabled")
        }
        (ClientAuthentication::SharedSecret(_), None) => failed("client credential missing"),
        (ClientAuthentication::SharedSecret(_), Some(ClientCredential::Unrecognized)) => {
            failed("unrecognized client authentication scheme")
        }
        (ClientAuthentication::SharedSecret(expected), Some(ClientCredential::Secret(given))) => {
            if expected.ct_eq(given.as_bytes()) {
                Ok(())
            } else {
                failed("client secret mismatch")
            }
        }
    }
}

fn log_loaded(config: &RealmConfig, message: &'static str) {
    let algorithms: Vec<&str> = config
        .allowed_algorithms()
        .iter()
        .map(|alg| alg.name())
        .collect();
    tracing::info!(
        issuer = config.issuer(),
        algorithms = %algorithms.join(","),
        delegated_authorization = !config.authorization_realms().is_empty(),
        cache_size = config.cache().size,
        "{message}"
    );
}
