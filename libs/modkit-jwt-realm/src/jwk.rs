//! JSON Web Keys (RFC 7517) usable for signature verification.

use std::fmt;
use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use jsonwebtoken::DecodingKey;
use serde::Deserialize;
use serde_json::Value;

use crate::algorithm::{EcCurve, KeyFamily, SignatureAlgorithm};
use crate::secret::SecretBytes;

/// Smallest RSA modulus accepted, in bytes (2048 bits).
const MIN_RSA_MODULUS_BYTES: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JwkError {
    #[error("invalid JWK set JSON: {0}")]
    Json(String),

    #[error("JWK set contains no usable signature keys")]
    NoUsableKeys,
}

#[derive(Deserialize)]
struct RawJwkSet {
    keys: Vec<Value>,
}

#[derive(Deserialize)]
struct RawJwk {
    kty: String,
    #[serde(default)]
    kid: Option<String>,
    #[serde(default)]
    alg: Option<String>,
    #[serde(rename = "use", default)]
    key_use: Option<String>,
    #[serde(default)]
    k: Option<String>,
    #[serde(default)]
    n: Option<String>,
    #[serde(default)]
    e: Option<String>,
    #[serde(default)]
    crv: Option<String>,
    #[serde(default)]
    x: Option<String>,
    #[serde(default)]
    y: Option<String>,
}

/// Key material with everything needed to verify a signature.
#[derive(Clone)]
pub(crate) enum VerificationKey {
    /// HMAC, RSA, P-256 and P-384 keys, verified through `jsonwebtoken`.
    Jwt(DecodingKey),
    /// P-521 keys, verified through `p521`.
    P521(p521::ecdsa::VerifyingKey),
}

#[derive(Clone)]
enum KeyKind {
    Hmac(SecretBytes),
    Rsa,
    Ec(EcCurve),
}

/// A single verification key.
#[derive(Clone)]
pub struct JsonWebKey {
    kid: Option<String>,
    alg: Option<SignatureAlgorithm>,
    kind: KeyKind,
    verification: VerificationKey,
}

impl fmt::Debug for JsonWebKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonWebKey")
            .field("kid", &self.kid)
            .field("alg", &self.alg)
            .field("family", &self.family())
            .field("curve", &self.curve())
            .finish_non_exhaustive()
    }
}

impl JsonWebKey {
    /// An HMAC key from raw secret bytes, e.g. the inline `hmac_key` setting.
    #[must_use]
    pub fn from_secret(kid: Option<String>, secret: &[u8]) -> Self {
        Self {
            kid,
            alg: None,
            kind: KeyKind::Hmac(SecretBytes::new(secret.to_vec())),
            verification: VerificationKey::Jwt(DecodingKey::from_secret(secret)),
        }
    }

    #[must_use]
    pub fn kid(&self) -> Option<&str> {
        self.kid.as_deref()
    }

    /// Algorithm the key is pinned to, if it declares one.
    #[must_use]
    pub fn alg(&self) -> Option<SignatureAlgorithm> {
        self.alg
    }

    #[must_use]
    pub fn family(&self) -> KeyFamily {
        match self.kind {
            KeyKind::Hmac(_) => KeyFamily::Hmac,
            KeyKind::Rsa => KeyFamily::Rsa,
            KeyKind::Ec(_) => KeyFamily::Ec,
        }
    }

    #[must_use]
    pub fn curve(&self) -> Option<EcCurve> {
        match self.kind {
            KeyKind::Ec(curve) => Some(curve),
            KeyKind::Hmac(_) | KeyKind::Rsa => None,
        }
    }

    /// Whether this key may verify a signature made with `alg`.
    ///
    /// Family must match, a declared `alg` must be equal, and EC keys must be
    /// on the curve the algorithm is bound to.
    #[must_use]
    pub fn is_compatible_with(&self, alg: SignatureAlgorithm) -> bool {
        if self.family() != alg.family() {
            return false;
        }
        if self.alg.is_some_and(|declared| declared != alg) {
            return false;
        }
        match self.kind {
            KeyKind::Ec(curve) => alg.curve() == Some(curve),
            KeyKind::Hmac(_) | KeyKind::Rsa => true,
        }
    }

    pub(crate) fn verification_key(&self) -> &VerificationKey {
        &self.verification
    }

    fn from_raw(raw: RawJwk) -> Result<Self, String> {
        if let Some(key_use) = raw.key_use.as_deref()
            && key_use != "sig"
        {
            return Err(format!("use '{key_use}' is not 'sig'"));
        }

        let alg = raw
            .alg
            .as_deref()
            .map(str::parse::<SignatureAlgorithm>)
            .transpose()
            .map_err(|e| e.to_string())?;

        let (kind, verification) = match raw.kty.as_str() {
            "oct" => {
                let k = raw.k.as_deref().ok_or("oct key without 'k'")?;
                let secret = decode_b64(k, "k")?;
                if secret.is_empty() {
                    return Err("oct key with empty 'k'".to_owned());
                }
                let verification = VerificationKey::Jwt(DecodingKey::from_secret(&secret));
                (KeyKind::Hmac(SecretBytes::new(secret)), verification)
            }
            "RSA" => {
                let n = raw.n.as_deref().ok_or("RSA key without 'n'")?;
                let e = raw.e.as_deref().ok_or("RSA key without 'e'")?;
                let modulus = decode_b64(n, "n")?;
                let significant = modulus.iter().skip_while(|b| **b == 0).count();
                if significant < MIN_RSA_MODULUS_BYTES {
                    return Err(format!(
                        "RSA modulus of {} bits is below 2048",
                        significant * 8
                    ));
                }
                decode_b64(e, "e")?;
                let key = DecodingKey::from_rsa_components(n, e)
                    .map_err(|err| format!("invalid RSA key: {err}"))?;
                (KeyKind::Rsa, VerificationKey::Jwt(key))
            }
            "EC" => {
                let crv = raw.crv.as_deref().ok_or("EC key without 'crv'")?;
                let curve =
                    EcCurve::from_jwk_name(crv).ok_or_else(|| format!("unsupported curve '{crv}'"))?;
                let x = raw.x.as_deref().ok_or("EC key without 'x'")?;
                let y = raw.y.as_deref().ok_or("EC key without 'y'")?;
                let len = curve.coordinate_len();
                let x_bytes = coordinate(x, "x", len)?;
                let y_bytes = coordinate(y, "y", len)?;
                let verification = match curve {
                    EcCurve::P256 | EcCurve::P384 => VerificationKey::Jwt(
                        DecodingKey::from_ec_components(
                            &URL_SAFE_NO_PAD.encode(&x_bytes),
                            &URL_SAFE_NO_PAD.encode(&y_bytes),
                        )
                        .map_err(|err| format!("invalid EC key: {err}"))?,
                    ),
                    EcCurve::P521 => {
                        let mut sec1 = Vec::with_capacity(1 + 2 * len);
                        sec1.push(0x04);
                        sec1.extend_from_slice(&x_bytes);
                        sec1.extend_from_slice(&y_bytes);
                        let key = p521::ecdsa::VerifyingKey::from_sec1_bytes(&sec1)
                            .map_err(|err| format!("invalid P-521 point: {err}"))?;
                        VerificationKey::P521(key)
                    }
                };
                (KeyKind::Ec(curve), verification)
            }
            other => return Err(format!("unsupported kty '{other}'")),
        };

        let key = Self {
            kid: raw.kid,
            alg,
            kind,
            verification,
        };
        if let Some(alg) = alg
            && !key.is_compatible_with(alg)
        {
            return Err(format!("alg '{alg}' does not match the key type"));
        }
        Ok(key)
    }
}

fn decode_b64(value: &str, member: &str) -> Result<Vec<u8>, String> {
    URL_SAFE_NO_PAD
        .decode(value.trim_end_matches('='))
        .map_err(|e| format!("member '{member}' is not base64url: {e}"))
}

/// Decode an EC coordinate, left-padding producers that strip leading zeros.
fn coordinate(value: &str, member: &str, len: usize) -> Result<Vec<u8>, String> {
    let bytes = decode_b64(value, member)?;
    if bytes.is_empty() || bytes.len() > len {
        return Err(format!("member '{member}' must be at most {len} bytes"));
    }
    let mut padded = vec![0u8; len - bytes.len()];
    padded.extend_from_slice(&bytes);
    Ok(padded)
}

/// Parsed `{"keys": [...]}` document.
///
/// Unusable entries are skipped with a warning; a set must keep at least one.
#[derive(Debug, Clone)]
pub struct JwkSet {
    keys: Vec<Arc<JsonWebKey>>,
}

impl JwkSet {
    #[must_use]
    pub fn new(keys: Vec<JsonWebKey>) -> Self {
        Self {
            keys: keys.into_iter().map(Arc::new).collect(),
        }
    }

    /// Parse a JWK set document.
    ///
    /// # Errors
    /// [`JwkError::Json`] when the document is not a JWK set, and
    /// [`JwkError::NoUsableKeys`] when every entry was skipped.
    pub fn parse(json: &str) -> Result<Self, JwkError> {
        Self::parse_slice(json.as_bytes())
    }

    /// Byte-slice form of [`JwkSet::parse`].
    ///
    /// # Errors
    /// Same as [`JwkSet::parse`].
    pub fn parse_slice(json: &[u8]) -> Result<Self, JwkError> {
        let raw: RawJwkSet =
            serde_json::from_slice(json).map_err(|e| JwkError::Json(e.to_string()))?;

        let mut keys = Vec::with_capacity(raw.keys.len());
        for (index, entry) in raw.keys.into_iter().enumerate() {
            let parsed = serde_json::from_value::<RawJwk>(entry)
                .map_err(|e| e.to_string())
                .and_then(|raw_key| {
                    let kid = raw_key.kid.clone();
                    JsonWebKey::from_raw(raw_key).map_err(|reason| match kid {
                        Some(kid) => format!("kid '{kid}': {reason}"),
                        None => reason,
                    })
                });
            match parsed {
                Ok(key) => keys.push(Arc::new(key)),
                Err(reason) => {
                    tracing::warn!(index, reason = %reason, "Skipping unusable JWK");
                }
            }
        }

        if keys.is_empty() {
            return Err(JwkError::NoUsableKeys);
        }
        Ok(Self { keys })
    }

    #[must_use]
    pub fn keys(&self) -> &[Arc<JsonWebKey>] {
        &self.keys
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn contains_kid(&self, kid: &str) -> bool {
        self.keys.iter().any(|k| k.kid() == Some(kid))
    }
}
