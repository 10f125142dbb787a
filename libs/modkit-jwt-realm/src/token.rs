//! Structural decoding of compact JWS tokens.
//!
//! [`parse`] only checks shape: three base64url segments, JSON objects, and
//! well-typed registered claims. It makes no trust decisions.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use serde_json::{Map, Value};
use time::OffsetDateTime;

use crate::claims::{ClaimTimes, JwtClaims, JwtHeader, StandardClaim};
use crate::errors::RealmError;

/// A token split into its parts. Not yet verified.
#[derive(Debug, Clone)]
pub struct ParsedToken {
    raw: String,
    signing_input_len: usize,
    header: JwtHeader,
    claims: JwtClaims,
    signature: Vec<u8>,
}

impl ParsedToken {
    /// The compact serialization exactly as received.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// `base64url(header) || '.' || base64url(payload)`.
    #[must_use]
    pub fn signing_input(&self) -> &str {
        &self.raw[..self.signing_input_len]
    }

    #[must_use]
    pub fn header(&self) -> &JwtHeader {
        &self.header
    }

    #[must_use]
    pub fn claims(&self) -> &JwtClaims {
        &self.claims
    }

    #[must_use]
    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    #[must_use]
    pub fn into_claims(self) -> JwtClaims {
        self.claims
    }
}

fn malformed(reason: impl Into<String>) -> RealmError {
    RealmError::MalformedToken(reason.into())
}

/// Split and decode a compact JWT.
///
/// # Errors
/// Returns [`RealmError::MalformedToken`] on a wrong segment count, invalid
/// base64url, non-object JSON, or mistyped registered claims.
pub fn parse(raw: &str) -> Result<ParsedToken, RealmError> {
    let mut segments = raw.split('.');
    let (Some(header_b64), Some(payload_b64), Some(signature_b64), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(malformed("expected three dot-separated segments"));
    };

    if header_b64.is_empty() || payload_b64.is_empty() {
        return Err(malformed("empty header or payload segment"));
    }
    if signature_b64.is_empty() {
        return Err(malformed("empty signature segment"));
    }

    let header = parse_header(&decode_object(header_b64, "header")?)?;
    let claims = parse_claims(decode_object(payload_b64, "payload")?)?;
    let signature = URL_SAFE_NO_PAD
        .decode(signature_b64)
        .map_err(|e| malformed(format!("signature: {e}")))?;

    Ok(ParsedToken {
        raw: raw.to_owned(),
        signing_input_len: header_b64.len() + 1 + payload_b64.len(),
        header,
        claims,
        signature,
    })
}

fn decode_object(segment: &str, what: &str) -> Result<Map<String, Value>, RealmError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| malformed(format!("{what}: {e}")))?;
    match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(malformed(format!("{what} is not a JSON object"))),
        Err(e) => Err(malformed(format!("{what}: {e}"))),
    }
}

fn parse_header(map: &Map<String, Value>) -> Result<JwtHeader, RealmError> {
    let alg = match map.get(StandardClaim::ALG) {
        Some(Value::String(alg)) => alg.clone(),
        Some(_) => return Err(malformed("header 'alg' is not a string")),
        None => return Err(malformed("header 'alg' is missing")),
    };
    let typ = optional_string(map, StandardClaim::TYP, "header")?;
    if let Some(typ) = &typ
        && !typ.eq_ignore_ascii_case("JWT")
    {
        return Err(malformed(format!("unsupported header typ '{typ}'")));
    }
    if map.contains_key("crit") {
        return Err(malformed("critical header extensions are not supported"));
    }
    let kid = optional_string(map, StandardClaim::KID, "header")?;

    Ok(JwtHeader { alg, typ, kid })
}

fn parse_claims(map: Map<String, Value>) -> Result<JwtClaims, RealmError> {
    let issuer = optional_string(&map, StandardClaim::ISS, "claim")?;
    let subject = optional_string(&map, StandardClaim::SUB, "claim")?;

    let audiences = match map.get(StandardClaim::AUD) {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::String(aud)) => vec![aud.clone()],
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| match v {
                Value::String(s) => Ok(s.clone()),
                _ => Err(malformed("claim 'aud' contains a non-string entry")),
            })
            .collect::<Result<_, _>>()?,
        Some(_) => return Err(malformed("claim 'aud' must be a string or array")),
    };

    let times = ClaimTimes {
        issued_at: numeric_date(&map, StandardClaim::IAT)?,
        not_before: numeric_date(&map, StandardClaim::NBF)?,
        expires_at: numeric_date(&map, StandardClaim::EXP)?,
    };

    Ok(JwtClaims::new(issuer, subject, audiences, times, map))
}

fn optional_string(
    map: &Map<String, Value>,
    name: &str,
    what: &str,
) -> Result<Option<String>, RealmError> {
    match map.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(malformed(format!("{what} '{name}' is not a string"))),
    }
}

/// RFC 7519 NumericDate. Fractional seconds are truncated.
fn numeric_date(
    map: &Map<String, Value>,
    name: &str,
) -> Result<Option<OffsetDateTime>, RealmError> {
    let secs = match map.get(name) {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(n)) => {
            if let Some(i) = n.as_i64() {
                i
            } else {
                let f = n
                    .as_f64()
                    .filter(|f| f.is_finite())
                    .ok_or_else(|| malformed(format!("claim '{name}' is out of range")))?;
                float_secs(f).ok_or_else(|| malformed(format!("claim '{name}' is out of range")))?
            }
        }
        Some(_) => return Err(malformed(format!("claim '{name}' is not a number"))),
    };

    OffsetDateTime::from_unix_timestamp(secs)
        .map(Some)
        .map_err(|_| malformed(format!("claim '{name}' is out of range")))
}

#[allow(clippy::cast_possible_truncation)]
fn float_secs(f: f64) -> Option<i64> {
    // Bounds well inside i64 and the `time` crate's supported range.
    const LIMIT: f64 = 253_402_300_799.0;
    let t = f.trunc();
    (t.abs() <= LIMIT).then_some(t as i64)
}
