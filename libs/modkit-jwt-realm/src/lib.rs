#![warn(warnings)]

// Token handling
pub mod algorithm;
pub mod claims;
pub mod token;
pub mod validation;
pub mod verifier;

// Key material
pub mod jwk;
pub mod keys;

// Identity
pub mod identity;
pub mod mapping;

// Realm
pub mod cache;
pub mod realm;
pub mod request;

// Configuration, errors and hooks
pub mod config;
pub mod config_error;
pub mod duration;
pub mod errors;
pub mod metrics;
pub mod secret;

#[cfg(feature = "axum-ext")]
pub mod axum_ext;

pub use algorithm::{EcCurve, KeyFamily, SignatureAlgorithm};
pub use claims::{JwtClaims, JwtHeader};
pub use config::{load_settings, ClockSkew, JwtRealmSettings, RealmConfig};
pub use config_error::ConfigError;
pub use duration::SignedDuration;
pub use errors::{AuthenticationFailed, RealmError};
pub use identity::VerifiedIdentity;
pub use jwk::{JsonWebKey, JwkError, JwkSet};
pub use keys::{run_key_refresh_task, KeyLoadError, KeySet, KeyStore, KeyStoreProvider};
pub use mapping::{ClaimPattern, IdentityMapper, RoleResolutionError, RoleResolver};
pub use metrics::{LoggingMetrics, NoOpMetrics, RealmEvent, RealmMetricLabels, RealmMetrics};
pub use realm::{AuthenticationState, Clock, JwtRealm, JwtRealmBuilder, SystemClock};
pub use request::{AuthenticationRequest, ClientCredential};
pub use secret::SecretString;
pub use token::ParsedToken;

#[cfg(feature = "axum-ext")]
pub use axum_ext::{jwt_auth_required, AuthenticatedIdentity};
