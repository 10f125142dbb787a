//! Claim checks run after the signature has been verified.

use std::time::Duration;

use time::OffsetDateTime;

use crate::config::RealmConfig;
use crate::errors::RealmError;
use crate::claims::JwtClaims;

/// Check issuer, audience and time claims, in that order, stopping at the
/// first failure.
///
/// With a disabled clock skew the time checks are skipped entirely.
///
/// # Errors
/// * [`RealmError::IssuerMismatch`] when `iss` is absent or differs;
/// * [`RealmError::AudienceMismatch`] when no `aud` entry is allowed;
/// * [`RealmError::MalformedToken`] when `exp` is absent;
/// * [`RealmError::TokenExpired`] / [`RealmError::TokenNotYetValid`].
pub fn validate_claims(
    claims: &JwtClaims,
    config: &RealmConfig,
    now: OffsetDateTime,
) -> Result<(), RealmError> {
    validate_issuer(claims, config)?;
    validate_audience(claims, config)?;

    match config.clock_skew().tolerance() {
        Some(skew) => validate_times(claims, now, skew),
        None => Ok(()),
    }
}

fn validate_issuer(claims: &JwtClaims, config: &RealmConfig) -> Result<(), RealmError> {
    if claims.issuer.as_deref() == Some(config.issuer()) {
        return Ok(());
    }
    Err(RealmError::IssuerMismatch {
        expected: config.issuer().to_owned(),
        actual: claims.issuer.clone(),
    })
}

fn validate_audience(claims: &JwtClaims, config: &RealmConfig) -> Result<(), RealmError> {
    let allowed = config.allowed_audiences();
    if claims.audiences.iter().any(|aud| allowed.contains(aud)) {
        return Ok(());
    }
    Err(RealmError::AudienceMismatch {
        expected: allowed.iter().cloned().collect(),
        actual: claims.audiences.clone(),
    })
}

fn validate_times(
    claims: &JwtClaims,
    now: OffsetDateTime,
    skew: Duration,
) -> Result<(), RealmError> {
    let skew = time::Duration::try_from(skew).unwrap_or(time::Duration::MAX);
    let earliest = now.saturating_sub(skew);
    let latest = now.saturating_add(skew);

    let exp = claims
        .expires_at
        .ok_or_else(|| RealmError::MalformedToken("missing exp claim".to_owned()))?;
    if exp < earliest {
        return Err(RealmError::TokenExpired);
    }

    if claims.not_before.is_some_and(|nbf| nbf > latest) {
        return Err(RealmError::TokenNotYetValid);
    }

    if claims.issued_at.is_some_and(|iat| iat > latest) {
        return Err(RealmError::TokenNotYetValid);
    }

    Ok(())
}
