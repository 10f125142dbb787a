//! Decoded JWT header and claims.
//!
//! Everything in this module is untrusted input until the signature has been
//! verified.

use serde_json::{Map, Value};
use time::OffsetDateTime;

/// Registered claim and header parameter names (RFC 7515, RFC 7519).
pub struct StandardClaim;

impl StandardClaim {
    pub const ISS: &'static str = "iss";
    pub const SUB: &'static str = "sub";
    pub const AUD: &'static str = "aud";
    pub const EXP: &'static str = "exp";
    pub const NBF: &'static str = "nbf";
    pub const IAT: &'static str = "iat";

    /// Header: signature algorithm.
    pub const ALG: &'static str = "alg";
    /// Header: media type of the token.
    pub const TYP: &'static str = "typ";
    /// Header: key identifier.
    pub const KID: &'static str = "kid";
}

/// JOSE header fields the realm looks at.
///
/// `alg` is kept as the raw string so the verifier can report a rejected
/// name verbatim. `jwk`, `jku` and `x5u` are never read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JwtHeader {
    pub alg: String,
    pub typ: Option<String>,
    pub kid: Option<String>,
}

/// Parsed claim set.
#[derive(Debug, Clone, PartialEq)]
pub struct JwtClaims {
    pub issuer: Option<String>,
    pub subject: Option<String>,
    /// `aud` normalized to a list; a single string becomes one entry.
    pub audiences: Vec<String>,
    pub issued_at: Option<OffsetDateTime>,
    pub not_before: Option<OffsetDateTime>,
    pub expires_at: Option<OffsetDateTime>,
    /// Every claim, registered ones included.
    raw: Map<String, Value>,
}

impl JwtClaims {
    pub(crate) fn new(
        issuer: Option<String>,
        subject: Option<String>,
        audiences: Vec<String>,
        times: ClaimTimes,
        raw: Map<String, Value>,
    ) -> Self {
        Self {
            issuer,
            subject,
            audiences,
            issued_at: times.issued_at,
            not_before: times.not_before,
            expires_at: times.expires_at,
            raw,
        }
    }

    /// Look up any claim by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.raw.get(name)
    }

    #[must_use]
    pub fn raw(&self) -> &Map<String, Value> {
        &self.raw
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ClaimTimes {
    pub issued_at: Option<OffsetDateTime>,
    pub not_before: Option<OffsetDateTime>,
    pub expires_at: Option<OffsetDateTime>,
}
