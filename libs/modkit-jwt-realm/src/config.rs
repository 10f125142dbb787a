use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::providers::{Env, Format, Yaml};
use figment::Figment;
use serde::Deserialize;
use tokio::sync::Semaphore;
use url::Url;

use crate::algorithm::{KeyFamily, SignatureAlgorithm};
use crate::config_error::ConfigError;
use crate::duration::{humantime_duration, SignedDuration};
use crate::jwk::JwkSet;
use crate::mapping::ClaimPattern;
use crate::secret::SecretString;

/// Raw realm settings as read from YAML or the environment.
///
/// Nothing here is trusted until [`RealmConfig::from_settings`] validates it.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JwtRealmSettings {
    /// Exact `iss` value tokens must carry.
    #[serde(default)]
    pub allowed_issuer: String,

    #[serde(default)]
    pub allowed_signature_algorithms: Vec<String>,

    #[serde(default)]
    pub allowed_audiences: Vec<String>,

    /// Tolerance for `exp`/`nbf`/`iat`. A negative value disables time checks.
    #[serde(default = "default_clock_skew")]
    pub allowed_clock_skew: SignedDuration,

    /// Local path or `https://` URL of a public-key JWK set.
    #[serde(default)]
    pub pkc_jwkset_path: Option<String>,

    /// Inline HMAC secret (UTF-8).
    #[serde(default)]
    pub hmac_key: Option<SecretString>,

    /// Inline HMAC JWK set (JSON).
    #[serde(default)]
    pub hmac_jwkset: Option<SecretString>,

    #[serde(default)]
    pub claims: ClaimNames,

    #[serde(default)]
    pub claim_patterns: ClaimPatterns,

    #[serde(default = "default_true")]
    pub populate_user_metadata: bool,

    #[serde(default)]
    pub client_authentication: ClientAuthenticationSettings,

    /// Realms that resolve roles for the authenticated principal.
    #[serde(default)]
    pub authorization_realms: Vec<String>,

    #[serde(default)]
    pub header: HeaderSettings,

    #[serde(default)]
    pub http: HttpSettings,

    #[serde(default)]
    pub ssl: SslSettings,

    #[serde(default)]
    pub jwt_cache: JwtCacheSettings,

    #[serde(default)]
    pub jwkset_refresh: RefreshSettings,
}

fn default_clock_skew() -> SignedDuration {
    SignedDuration::from_secs(60)
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClaimNames {
    #[serde(default = "default_principal_claim")]
    pub principal: String,

    #[serde(default)]
    pub groups: Option<String>,
}

fn default_principal_claim() -> String {
    "sub".to_owned()
}

impl Default for ClaimNames {
    fn default() -> Self {
        Self {
            principal: default_principal_claim(),
            groups: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClaimPatterns {
    #[serde(default)]
    pub principal: Option<String>,

    #[serde(default)]
    pub groups: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientAuthenticationType {
    #[default]
    None,
    SharedSecret,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientAuthenticationSettings {
    #[serde(rename = "type", default)]
    pub kind: ClientAuthenticationType,

    #[serde(default)]
    pub shared_secret: Option<SecretString>,
}

/// Names and schemes of the credential-carrying headers.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HeaderSettings {
    #[serde(default = "default_header_name")]
    pub name: String,

    #[serde(default = "default_header_scheme")]
    pub scheme: String,

    #[serde(default = "default_client_header_name")]
    pub client_name: String,

    #[serde(default = "default_client_header_scheme")]
    pub client_scheme: String,
}

fn default_header_name() -> String {
    "Authorization".to_owned()
}

fn default_header_scheme() -> String {
    "Bearer".to_owned()
}

fn default_client_header_name() -> String {
    "X-Client-Authentication".to_owned()
}

fn default_client_header_scheme() -> String {
    "SharedSecret".to_owned()
}

impl Default for HeaderSettings {
    fn default() -> Self {
        Self {
            name: default_header_name(),
            scheme: default_header_scheme(),
            client_name: default_client_header_name(),
            client_scheme: default_client_header_scheme(),
        }
    }
}

/// Connection settings for fetching a remote JWK set.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HttpSettings {
    #[serde(default = "default_http_timeout")]
    pub connect_timeout: SignedDuration,

    /// Maximum wait for a free connection slot.
    #[serde(default = "default_http_timeout")]
    pub connection_read_timeout: SignedDuration,

    /// Maximum wait for the response, body included.
    #[serde(default = "default_http_timeout")]
    pub socket_timeout: SignedDuration,

    #[serde(default = "default_max_connections")]
    pub max_connections: usize,

    #[serde(default = "default_max_connections")]
    pub max_endpoint_connections: usize,

    #[serde(default = "default_max_response_bytes")]
    pub max_response_bytes: usize,

    /// Permit `http://` JWK set URLs. Only meant for tests.
    #[serde(default)]
    pub allow_insecure_http: bool,
}

fn default_http_timeout() -> SignedDuration {
    SignedDuration::from_secs(5)
}

fn default_max_connections() -> usize {
    200
}

fn default_max_response_bytes() -> usize {
    1024 * 1024
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            connect_timeout: default_http_timeout(),
            connection_read_timeout: default_http_timeout(),
            socket_timeout: default_http_timeout(),
            max_connections: default_max_connections(),
            max_endpoint_connections: default_max_connections(),
            max_response_bytes: default_max_response_bytes(),
            allow_insecure_http: false,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SslSettings {
    /// PEM files with trusted CA certificates. Empty means the OS store.
    #[serde(default)]
    pub certificate_authorities: Vec<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JwtCacheSettings {
    /// Maximum cached identities. `0` disables the cache.
    #[serde(default = "default_cache_size")]
    pub size: usize,

    #[serde(default = "default_cache_ttl", with = "humantime_duration")]
    pub ttl: Duration,
}

fn default_cache_size() -> usize {
    100_000
}

fn default_cache_ttl() -> Duration {
    Duration::from_secs(20 * 60)
}

impl Default for JwtCacheSettings {
    fn default() -> Self {
        Self {
            size: default_cache_size(),
            ttl: default_cache_ttl(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RefreshSettings {
    #[serde(default = "default_refresh_interval", with = "humantime_duration")]
    pub interval: Duration,

    #[serde(default = "default_max_backoff", with = "humantime_duration")]
    pub max_backoff: Duration,

    /// Minimum spacing between refreshes triggered by an unknown `kid`.
    #[serde(default = "default_on_demand_cooldown", with = "humantime_duration")]
    pub on_demand_cooldown: Duration,
}

fn default_refresh_interval() -> Duration {
    Duration::from_secs(300)
}

fn default_max_backoff() -> Duration {
    Duration::from_secs(3600)
}

fn default_on_demand_cooldown() -> Duration {
    Duration::from_secs(60)
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            interval: default_refresh_interval(),
            max_backoff: default_max_backoff(),
            on_demand_cooldown: default_on_demand_cooldown(),
        }
    }
}

impl JwtRealmSettings {
    /// Extract settings from an already assembled figment.
    ///
    /// # Errors
    /// Returns [`ConfigError::Load`] when the figment does not deserialize.
    pub fn from_figment(figment: &Figment) -> Result<Self, ConfigError> {
        Ok(figment.extract()?)
    }
}

/// Load settings from a YAML file, overridden by `<env_prefix>*` variables.
///
/// Nested keys use `__`, e.g. `JWT_REALM_HTTP__CONNECT_TIMEOUT=2s`.
///
/// # Errors
/// Returns [`ConfigError::Io`] when the file cannot be read and
/// [`ConfigError::Load`] when the merged values do not deserialize.
pub fn load_settings(
    path: impl AsRef<Path>,
    env_prefix: &str,
) -> Result<JwtRealmSettings, ConfigError> {
    let path = path.as_ref();
    std::fs::metadata(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let figment = Figment::new()
        .merge(Yaml::file(path))
        .merge(Env::prefixed(env_prefix).split("__"));
    JwtRealmSettings::from_figment(&figment)
}

/// Clock tolerance for time-based claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockSkew {
    Tolerance(Duration),
    /// Time checks are skipped entirely.
    Disabled,
}

impl ClockSkew {
    #[must_use]
    pub fn tolerance(self) -> Option<Duration> {
        match self {
            Self::Tolerance(d) => Some(d),
            Self::Disabled => None,
        }
    }
}

impl From<SignedDuration> for ClockSkew {
    fn from(value: SignedDuration) -> Self {
        match value {
            SignedDuration::Negative(_) => Self::Disabled,
            SignedDuration::NonNegative(d) => Self::Tolerance(d),
        }
    }
}

/// HMAC trust material.
#[derive(Debug, Clone)]
pub enum HmacKeySource {
    /// A single shared secret with no key id.
    Secret(SecretString),
    /// An inline JWK set of `oct` keys.
    JwkSet(SecretString),
}

/// Public-key trust material.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicKeySource {
    File(PathBuf),
    Url(Url),
}

#[derive(Debug, Clone, Default)]
pub struct KeySources {
    pub hmac: Option<HmacKeySource>,
    pub public: Option<PublicKeySource>,
}

#[derive(Debug, Clone)]
pub enum ClientAuthentication {
    None,
    SharedSecret(SecretString),
}

/// A claim name with an optional extraction pattern.
#[derive(Debug, Clone)]
pub struct ClaimMapping {
    pub claim: String,
    pub pattern: Option<ClaimPattern>,
}

/// Validated, immutable realm configuration.
#[derive(Debug, Clone)]
pub struct RealmConfig {
    issuer: String,
    allowed_algorithms: BTreeSet<SignatureAlgorithm>,
    allowed_audiences: BTreeSet<String>,
    clock_skew: ClockSkew,
    key_sources: KeySources,
    principal: ClaimMapping,
    groups: Option<ClaimMapping>,
    populate_user_metadata: bool,
    client_authentication: ClientAuthentication,
    authorization_realms: Vec<String>,
    header: HeaderSettings,
    http: HttpSettings,
    ssl: SslSettings,
    cache: JwtCacheSettings,
    refresh: RefreshSettings,
}

impl TryFrom<JwtRealmSettings> for RealmConfig {
    type Error = ConfigError;

    fn try_from(settings: JwtRealmSettings) -> Result<Self, Self::Error> {
        Self::from_settings(settings)
    }
}

impl RealmConfig {
    /// Validate raw settings. Every error names the offending setting.
    ///
    /// # Errors
    /// Returns [`ConfigError::Invalid`] for the first setting that fails.
    pub fn from_settings(settings: JwtRealmSettings) -> Result<Self, ConfigError> {
        let issuer = settings.allowed_issuer.trim().to_owned();
        if issuer.is_empty() {
            return Err(ConfigError::invalid("allowed_issuer", "must not be empty"));
        }

        let allowed_algorithms = parse_algorithms(&settings.allowed_signature_algorithms)?;
        let allowed_audiences = parse_audiences(&settings.allowed_audiences)?;
        let key_sources = parse_key_sources(&settings, &allowed_algorithms)?;

        let principal_claim = settings.claims.principal.trim().to_owned();
        if principal_claim.is_empty() {
            return Err(ConfigError::invalid("claims.principal", "must not be empty"));
        }
        let principal = ClaimMapping {
            claim: principal_claim,
            pattern: compile_pattern(
                "claim_patterns.principal",
                settings.claim_patterns.principal.as_deref(),
            )?,
        };

        let groups = match settings.claims.groups.as_deref().map(str::trim) {
            Some("") => return Err(ConfigError::invalid("claims.groups", "must not be empty")),
            Some(claim) => Some(ClaimMapping {
                claim: claim.to_owned(),
                pattern: compile_pattern(
                    "claim_patterns.groups",
                    settings.claim_patterns.groups.as_deref(),
                )?,
            }),
            None if settings.claim_patterns.groups.is_some() => {
                return Err(ConfigError::invalid(
                    "claim_patterns.groups",
                    "requires claims.groups to be set",
                ));
            }
            None => None,
        };

        let client_authentication = parse_client_authentication(settings.client_authentication)?;

        if settings
            .authorization_realms
            .iter()
            .any(|r| r.trim().is_empty())
        {
            return Err(ConfigError::invalid(
                "authorization_realms",
                "realm names must not be empty",
            ));
        }

        validate_headers(&settings.header)?;
        validate_http(&settings.http)?;

        if settings.jwt_cache.size > 0 && settings.jwt_cache.ttl.is_zero() {
            return Err(ConfigError::invalid(
                "jwt_cache.ttl",
                "must be positive when jwt_cache.size is non-zero",
            ));
        }
        if settings.jwkset_refresh.interval.is_zero() {
            return Err(ConfigError::invalid(
                "jwkset_refresh.interval",
                "must be positive",
            ));
        }
        if settings.jwkset_refresh.max_backoff < settings.jwkset_refresh.interval {
            return Err(ConfigError::invalid(
                "jwkset_refresh.max_backoff",
                "must not be shorter than jwkset_refresh.interval",
            ));
        }

        Ok(Self {
            issuer,
            allowed_algorithms,
            allowed_audiences,
            clock_skew: settings.allowed_clock_skew.into(),
            key_sources,
            principal,
            groups,
            populate_user_metadata: settings.populate_user_metadata,
            client_authentication,
            authorization_realms: settings.authorization_realms,
            header: settings.header,
            http: settings.http,
            ssl: settings.ssl,
            cache: settings.jwt_cache,
            refresh: settings.jwkset_refresh,
        })
    }

    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    #[must_use]
    pub fn allowed_algorithms(&self) -> &BTreeSet<SignatureAlgorithm> {
        &self.allowed_algorithms
    }

    #[must_use]
    pub fn is_algorithm_allowed(&self, alg: SignatureAlgorithm) -> bool {
        self.allowed_algorithms.contains(&alg)
    }

    #[must_use]
    pub fn allowed_audiences(&self) -> &BTreeSet<String> {
        &self.allowed_audiences
    }

    #[must_use]
    pub fn clock_skew(&self) -> ClockSkew {
        self.clock_skew
    }

    #[must_use]
    pub fn key_sources(&self) -> &KeySources {
        &self.key_sources
    }

    #[must_use]
    pub fn principal(&self) -> &ClaimMapping {
        &self.principal
    }

    #[must_use]
    pub fn groups(&self) -> Option<&ClaimMapping> {
        self.groups.as_ref()
    }

    #[must_use]
    pub fn populate_user_metadata(&self) -> bool {
        self.populate_user_metadata
    }

    #[must_use]
    pub fn client_authentication(&self) -> &ClientAuthentication {
        &self.client_authentication
    }

    #[must_use]
    pub fn authorization_realms(&self) -> &[String] {
        &self.authorization_realms
    }

    #[must_use]
    pub fn header(&self) -> &HeaderSettings {
        &self.header
    }

    #[must_use]
    pub fn http(&self) -> &HttpSettings {
        &self.http
    }

    #[must_use]
    pub fn ssl(&self) -> &SslSettings {
        &self.ssl
    }

    #[must_use]
    pub fn cache(&self) -> &JwtCacheSettings {
        &self.cache
    }

    #[must_use]
    pub fn refresh(&self) -> &RefreshSettings {
        &self.refresh
    }

    fn allows_family(&self, family: KeyFamily) -> bool {
        allows_family(&self.allowed_algorithms, family)
    }

    #[must_use]
    pub fn allows_hmac(&self) -> bool {
        self.allows_family(KeyFamily::Hmac)
    }
}

fn allows_family(algs: &BTreeSet<SignatureAlgorithm>, family: KeyFamily) -> bool {
    algs.iter().any(|a| a.family() == family)
}

fn parse_algorithms(raw: &[String]) -> Result<BTreeSet<SignatureAlgorithm>, ConfigError> {
    const SETTING: &str = "allowed_signature_algorithms";

    if raw.is_empty() {
        return Err(ConfigError::invalid(SETTING, "must not be empty"));
    }
    raw.iter()
        .map(|name| {
            name.trim()
                .parse::<SignatureAlgorithm>()
                .map_err(|e| ConfigError::invalid(SETTING, e.to_string()))
        })
        .collect()
}

fn parse_audiences(raw: &[String]) -> Result<BTreeSet<String>, ConfigError> {
    const SETTING: &str = "allowed_audiences";

    if raw.is_empty() {
        return Err(ConfigError::invalid(SETTING, "must not be empty"));
    }
    raw.iter()
        .map(|aud| {
            let aud = aud.trim();
            if aud.is_empty() {
                Err(ConfigError::invalid(SETTING, "audiences must not be empty"))
            } else {
                Ok(aud.to_owned())
            }
        })
        .collect()
}

fn parse_key_sources(
    settings: &JwtRealmSettings,
    algs: &BTreeSet<SignatureAlgorithm>,
) -> Result<KeySources, ConfigError> {
    let hmac = match (&settings.hmac_key, &settings.hmac_jwkset) {
        (Some(_), Some(_)) => {
            return Err(ConfigError::invalid(
                "hmac_key",
                "must not be combined with hmac_jwkset",
            ));
        }
        (Some(secret), None) => {
            if secret.is_empty() {
                return Err(ConfigError::invalid("hmac_key", "must not be empty"));
            }
            warn_short_hmac_secret(secret.len(), algs);
            Some(HmacKeySource::Secret(secret.clone()))
        }
        (None, Some(jwkset)) => {
            let set = JwkSet::parse(jwkset.expose())
                .map_err(|e| ConfigError::invalid("hmac_jwkset", e.to_string()))?;
            if !set.keys().iter().any(|k| k.family() == KeyFamily::Hmac) {
                return Err(ConfigError::invalid(
                    "hmac_jwkset",
                    "contains no usable oct keys",
                ));
            }
            Some(HmacKeySource::JwkSet(jwkset.clone()))
        }
        (None, None) => None,
    };

    let public = settings
        .pkc_jwkset_path
        .as_deref()
        .map(|raw| parse_public_source(raw, settings.http.allow_insecure_http))
        .transpose()?;

    let wants_hmac = allows_family(algs, KeyFamily::Hmac);
    let wants_public =
        allows_family(algs, KeyFamily::Rsa) || allows_family(algs, KeyFamily::Ec);

    if wants_hmac && hmac.is_none() {
        return Err(ConfigError::invalid(
            "allowed_signature_algorithms",
            "HMAC algorithms require hmac_key or hmac_jwkset",
        ));
    }
    if wants_public && public.is_none() {
        return Err(ConfigError::invalid(
            "allowed_signature_algorithms",
            "RSA and EC algorithms require pkc_jwkset_path",
        ));
    }
    if !wants_hmac {
        if settings.hmac_key.is_some() {
            return Err(ConfigError::invalid(
                "hmac_key",
                "set but no HMAC algorithm is allowed",
            ));
        }
        if settings.hmac_jwkset.is_some() {
            return Err(ConfigError::invalid(
                "hmac_jwkset",
                "set but no HMAC algorithm is allowed",
            ));
        }
    }
    if !wants_public && public.is_some() {
        return Err(ConfigError::invalid(
            "pkc_jwkset_path",
            "set but no RSA or EC algorithm is allowed",
        ));
    }

    Ok(KeySources { hmac, public })
}

fn warn_short_hmac_secret(len: usize, algs: &BTreeSet<SignatureAlgorithm>) {
    for alg in algs {
        if let Some(min) = alg.min_hmac_secret_len()
            && len < min
        {
            tracing::warn!(
                setting = "hmac_key",
                algorithm = %alg,
                secret_len = len,
                recommended_min = min,
                "HMAC secret is shorter than recommended"
            );
        }
    }
}

fn parse_public_source(raw: &str, allow_insecure: bool) -> Result<PublicKeySource, ConfigError> {
    const SETTING: &str = "pkc_jwkset_path";

    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ConfigError::invalid(SETTING, "must not be empty"));
    }
    if !raw.contains("://") {
        return Ok(PublicKeySource::File(PathBuf::from(raw)));
    }

    let url = Url::parse(raw).map_err(|e| ConfigError::invalid(SETTING, e.to_string()))?;
    match url.scheme() {
        "https" => Ok(PublicKeySource::Url(url)),
        "http" if allow_insecure => Ok(PublicKeySource::Url(url)),
        "http" => Err(ConfigError::invalid(
            SETTING,
            "must use https (set http.allow_insecure_http to permit http)",
        )),
        "file" => url
            .to_file_path()
            .map(PublicKeySource::File)
            .map_err(|()| ConfigError::invalid(SETTING, "invalid file URL")),
        other => Err(ConfigError::invalid(
            SETTING,
            format!("unsupported URL scheme '{other}'"),
        )),
    }
}

fn compile_pattern(
    setting: &'static str,
    raw: Option<&str>,
) -> Result<Option<ClaimPattern>, ConfigError> {
    raw.map(|p| ClaimPattern::new(p).map_err(|reason| ConfigError::invalid(setting, reason)))
        .transpose()
}

fn parse_client_authentication(
    settings: ClientAuthenticationSettings,
) -> Result<ClientAuthentication, ConfigError> {
    const SETTING: &str = "client_authentication.shared_secret";

    match (settings.kind, settings.shared_secret) {
        (ClientAuthenticationType::None, None) => Ok(ClientAuthentication::None),
        (ClientAuthenticationType::None, Some(_)) => Err(ConfigError::invalid(
            SETTING,
            "must not be set when client_authentication.type is none",
        )),
        (ClientAuthenticationType::SharedSecret, Some(secret)) if !secret.is_empty() => {
            Ok(ClientAuthentication::SharedSecret(secret))
        }
        (ClientAuthenticationType::SharedSecret, _) => Err(ConfigError::invalid(
            SETTING,
            "required when client_authentication.type is shared_secret",
        )),
    }
}

fn validate_headers(header: &HeaderSettings) -> Result<(), ConfigError> {
    let names = [
        ("header.name", &header.name),
        ("header.client_name", &header.client_name),
    ];
    for (setting, value) in names {
        http::HeaderName::from_bytes(value.as_bytes())
            .map_err(|e| ConfigError::invalid(setting, e.to_string()))?;
    }

    if header.name.eq_ignore_ascii_case(&header.client_name) {
        return Err(ConfigError::invalid(
            "header.client_name",
            "must differ from header.name",
        ));
    }

    let schemes = [
        ("header.scheme", &header.scheme),
        ("header.client_scheme", &header.client_scheme),
    ];
    for (setting, value) in schemes {
        if value.is_empty() || value.chars().any(char::is_whitespace) {
            return Err(ConfigError::invalid(
                setting,
                "must be a single non-empty token",
            ));
        }
    }
    Ok(())
}

fn validate_http(http: &HttpSettings) -> Result<(), ConfigError> {
    if http.max_connections == 0 {
        return Err(ConfigError::invalid("http.max_connections", "must be at least 1"));
    }
    if http.max_connections > Semaphore::MAX_PERMITS {
        return Err(ConfigError::invalid(
            "http.max_connections",
            format!("must not exceed {}", Semaphore::MAX_PERMITS),
        ));
    }
    if http.max_endpoint_connections == 0 {
        return Err(ConfigError::invalid(
            "http.max_endpoint_connections",
            "must be at least 1",
        ));
    }
    if http.max_response_bytes == 0 {
        return Err(ConfigError::invalid(
            "http.max_response_bytes",
            "must be at least 1",
        ));
    }
    Ok(())
}
