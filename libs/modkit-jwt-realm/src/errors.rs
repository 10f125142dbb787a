use std::fmt;

use thiserror::Error;

/// Reasons an authentication attempt is rejected.
///
/// These are internal diagnostics. Callers outside the realm only ever see
/// [`AuthenticationFailed`], whose message does not reveal the reason.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RealmError {
    #[error("malformed token: {0}")]
    MalformedToken(String),

    #[error("signature algorithm not allowed: {0}")]
    AlgorithmNotAllowed(String),

    #[error("signature verification failed against {candidates} candidate key(s)")]
    SignatureInvalid { candidates: usize },

    #[error("no verification key available: {0}")]
    KeyUnavailable(String),

    #[error("issuer mismatch: expected {expected}, got {actual:?}")]
    IssuerMismatch {
        expected: String,
        actual: Option<String>,
    },

    #[error("audience mismatch: expected one of {expected:?}, got {actual:?}")]
    AudienceMismatch {
        expected: Vec<String>,
        actual: Vec<String>,
    },

    #[error("token expired")]
    TokenExpired,

    #[error("token not yet valid")]
    TokenNotYetValid,

    #[error("principal claim '{claim}' missing or not matching the configured pattern")]
    PrincipalClaimMissing { claim: String },

    #[error("role resolution failed: {0}")]
    RoleResolutionFailed(String),

    #[error("client authentication failed: {0}")]
    ClientAuthenticationFailed(String),

    #[error("invalid configuration: {0}")]
    ConfigurationInvalid(String),

    #[error("authentication cancelled")]
    Cancelled,
}

impl RealmError {
    /// Stable label for logs and metrics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MalformedToken(_) => "malformed_token",
            Self::AlgorithmNotAllowed(_) => "algorithm_not_allowed",
            Self::SignatureInvalid { .. } => "signature_invalid",
            Self::KeyUnavailable(_) => "key_unavailable",
            Self::IssuerMismatch { .. } => "issuer_mismatch",
            Self::AudienceMismatch { .. } => "audience_mismatch",
            Self::TokenExpired => "token_expired",
            Self::TokenNotYetValid => "token_not_yet_valid",
            Self::PrincipalClaimMissing { .. } => "principal_claim_missing",
            Self::RoleResolutionFailed(_) => "role_resolution_failed",
            Self::ClientAuthenticationFailed(_) => "client_authentication_failed",
            Self::ConfigurationInvalid(_) => "configuration_invalid",
            Self::Cancelled => "cancelled",
        }
    }
}

/// The only error surfaced to an unauthenticated caller.
///
/// `Display` never includes the reason, so a client cannot tell an expired
/// token from a forged one. Use [`AuthenticationFailed::reason`] for internal
/// diagnostics.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthenticationFailed {
    reason: RealmError,
}

impl AuthenticationFailed {
    #[must_use]
    pub fn new(reason: RealmError) -> Self {
        Self { reason }
    }

    #[must_use]
    pub fn reason(&self) -> &RealmError {
        &self.reason
    }

    #[must_use]
    pub fn into_reason(self) -> RealmError {
        self.reason
    }
}

impl From<RealmError> for AuthenticationFailed {
    fn from(reason: RealmError) -> Self {
        Self::new(reason)
    }
}

impl fmt::Display for AuthenticationFailed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("authentication failed")
    }
}

impl fmt::Debug for AuthenticationFailed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthenticationFailed")
            .field("kind", &self.reason.kind())
            .finish_non_exhaustive()
    }
}

impl std::error::Error for AuthenticationFailed {}

#[cfg(feature = "axum-ext")]
impl axum::response::IntoResponse for AuthenticationFailed {
    fn into_response(self) -> axum::response::Response {
        use axum::http::{header, StatusCode};
        use axum::response::Json;
        use serde_json::json;

        // Misconfiguration is the server's fault, not the caller's.
        if matches!(self.reason, RealmError::ConfigurationInvalid(_)) {
            let status = StatusCode::INTERNAL_SERVER_ERROR;
            let body = Json(json!({
                "error": "internal server error",
                "status": status.as_u16(),
            }));
            return (status, body).into_response();
        }

        let status = StatusCode::UNAUTHORIZED;
        let body = Json(json!({
            "error": "authentication failed",
            "status": status.as_u16(),
        }));

        (status, [(header::WWW_AUTHENTICATE, "Bearer")], body).into_response()
    }
}
