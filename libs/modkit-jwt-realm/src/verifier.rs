//! Signature verification against the configured allow-list.
//!
//! The token's `alg` header only selects among algorithms the realm already
//! allows. Anything else, `none` included, is rejected before a key is
//! looked up.

use std::sync::Arc;

use jsonwebtoken::{decode, DecodingKey, Validation};
use p521::ecdsa::signature::Verifier as _;
use serde_json::Value;

use crate::algorithm::SignatureAlgorithm;
use crate::config::RealmConfig;
use crate::errors::RealmError;
use crate::jwk::{JsonWebKey, VerificationKey};
use crate::keys::KeyStore;
use crate::token::ParsedToken;

/// Resolve the token's algorithm against the allow-list.
///
/// # Errors
/// [`RealmError::AlgorithmNotAllowed`] for unknown names, `none`, and
/// algorithms outside the allow-list.
pub fn allowed_algorithm(
    token: &ParsedToken,
    config: &RealmConfig,
) -> Result<SignatureAlgorithm, RealmError> {
    let claimed = token.header().alg.as_str();
    claimed
        .parse::<SignatureAlgorithm>()
        .ok()
        .filter(|alg| config.is_algorithm_allowed(*alg))
        .ok_or_else(|| RealmError::AlgorithmNotAllowed(claimed.to_owned()))
}

/// Verify the token signature and return the key that verified it.
///
/// # Errors
/// * [`RealmError::AlgorithmNotAllowed`] before any key lookup;
/// * [`RealmError::KeyUnavailable`] when no key could verify `alg`;
/// * [`RealmError::SignatureInvalid`] when every candidate key failed.
pub async fn verify(
    token: &ParsedToken,
    config: &RealmConfig,
    store: &KeyStore,
) -> Result<Arc<JsonWebKey>, RealmError> {
    let alg = allowed_algorithm(token, config)?;
    let candidates = store.candidates(alg, token.header().kid.as_deref()).await?;

    let count = candidates.len();
    for key in candidates {
        if verify_with_key(token, alg, &key) {
            tracing::debug!(algorithm = %alg, kid = ?key.kid(), "Token signature verified");
            return Ok(key);
        }
    }

    tracing::debug!(algorithm = %alg, candidates = count, "Token signature did not verify");
    Err(RealmError::SignatureInvalid { candidates: count })
}

/// Cryptographic check of one key. Never consults claims.
pub(crate) fn verify_with_key(token: &ParsedToken, alg: SignatureAlgorithm, key: &JsonWebKey) -> bool {
    if !key.is_compatible_with(alg) {
        return false;
    }
    match key.verification_key() {
        VerificationKey::Jwt(decoding_key) => verify_jsonwebtoken(token, alg, decoding_key),
        VerificationKey::P521(verifying_key) => {
            alg == SignatureAlgorithm::ES512 && verify_p521(token, verifying_key)
        }
    }
}

fn verify_jsonwebtoken(token: &ParsedToken, alg: SignatureAlgorithm, key: &DecodingKey) -> bool {
    let Some(jwt_alg) = alg.as_jsonwebtoken() else {
        return false;
    };

    let mut validation = Validation::new(jwt_alg);

    // Claims are checked by the realm's own validator.
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;
    let empty_claims: &[&str] = &[];
    validation.set_required_spec_claims(empty_claims);

    decode::<Value>(token.raw(), key, &validation).is_ok()
}

fn verify_p521(token: &ParsedToken, key: &p521::ecdsa::VerifyingKey) -> bool {
    let Ok(signature) = p521::ecdsa::Signature::from_slice(token.signature()) else {
        return false;
    };
    key.verify(token.signing_input().as_bytes(), &signature)
        .is_ok()
}
