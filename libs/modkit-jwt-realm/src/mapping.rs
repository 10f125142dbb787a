//! Mapping verified claims to a [`VerifiedIdentity`].

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use thiserror::Error;

use crate::claims::JwtClaims;
use crate::config::{ClaimMapping, RealmConfig};
use crate::config_error::ConfigError;
use crate::errors::RealmError;
use crate::identity::VerifiedIdentity;

/// Prefix of metadata entries copied from claims.
pub const METADATA_PREFIX: &str = "jwt_claim_";

/// A regex with exactly one capture group, applied to a claim value.
#[derive(Debug, Clone)]
pub struct ClaimPattern {
    regex: Regex,
}

impl ClaimPattern {
    /// Compile `pattern`.
    ///
    /// # Errors
    /// Returns a message when the regex does not compile or does not have
    /// exactly one capture group.
    pub fn new(pattern: &str) -> Result<Self, String> {
        let regex = Regex::new(pattern).map_err(|e| format!("invalid regex: {e}"))?;
        let groups = regex.captures_len() - 1;
        if groups != 1 {
            return Err(format!(
                "pattern must contain exactly one capture group, found {groups}"
            ));
        }
        Ok(Self { regex })
    }

    /// The first capture group of the first match, unless empty.
    #[must_use]
    pub fn extract<'a>(&self, value: &'a str) -> Option<&'a str> {
        self.regex
            .captures(value)?
            .get(1)
            .map(|m| m.as_str())
            .filter(|s| !s.is_empty())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }
}

/// Why a role resolver could not answer.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct RoleResolutionError {
    message: String,
}

impl RoleResolutionError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Delegated authorization: look up roles for an authenticated principal.
///
/// `Ok` with an empty set means the principal has no roles.
#[async_trait]
pub trait RoleResolver: Send + Sync {
    async fn resolve_roles(
        &self,
        principal: &str,
        metadata: &BTreeMap<String, Value>,
    ) -> Result<BTreeSet<String>, RoleResolutionError>;
}

/// Turns verified claims into an identity.
pub struct IdentityMapper {
    principal: ClaimMapping,
    groups: Option<ClaimMapping>,
    populate_metadata: bool,
    role_resolver: Option<Arc<dyn RoleResolver>>,
}

impl fmt::Debug for IdentityMapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityMapper")
            .field("principal", &self.principal)
            .field("groups", &self.groups)
            .field("populate_metadata", &self.populate_metadata)
            .field("delegated", &self.role_resolver.is_some())
            .finish_non_exhaustive()
    }
}

impl IdentityMapper {
    /// # Errors
    /// [`ConfigError::MissingRoleResolver`] when `authorization_realms` is
    /// configured but no resolver is supplied.
    pub fn from_config(
        config: &RealmConfig,
        role_resolver: Option<Arc<dyn RoleResolver>>,
    ) -> Result<Self, ConfigError> {
        let role_resolver = if config.authorization_realms().is_empty() {
            if role_resolver.is_some() {
                tracing::debug!("Role resolver ignored: no authorization_realms configured");
            }
            None
        } else {
            Some(role_resolver.ok_or(ConfigError::MissingRoleResolver)?)
        };

        Ok(Self {
            principal: config.principal().clone(),
            groups: config.groups().cloned(),
            populate_metadata: config.populate_user_metadata(),
            role_resolver,
        })
    }

    /// Build the identity for verified `claims`.
    ///
    /// # Errors
    /// * [`RealmError::PrincipalClaimMissing`] when no principal can be derived;
    /// * [`RealmError::RoleResolutionFailed`] when the role resolver fails.
    pub async fn map_identity(&self, claims: &JwtClaims) -> Result<VerifiedIdentity, RealmError> {
        let principal = self.principal(claims)?;
        let metadata = if self.populate_metadata {
            metadata(claims)
        } else {
            BTreeMap::new()
        };

        let groups = match &self.role_resolver {
            Some(resolver) => resolver
                .resolve_roles(&principal, &metadata)
                .await
                .map_err(|e| RealmError::RoleResolutionFailed(e.to_string()))?,
            None => self.groups(claims),
        };

        Ok(VerifiedIdentity::new(principal, groups, metadata))
    }

    fn principal(&self, claims: &JwtClaims) -> Result<String, RealmError> {
        let missing = || RealmError::PrincipalClaimMissing {
            claim: self.principal.claim.clone(),
        };

        let value = claims
            .get(&self.principal.claim)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .ok_or_else(missing)?;

        match &self.principal.pattern {
            Some(pattern) => pattern.extract(value).map(str::to_owned).ok_or_else(missing),
            None => Ok(value.to_owned()),
        }
    }

    fn groups(&self, claims: &JwtClaims) -> BTreeSet<String> {
        let Some(mapping) = &self.groups else {
            return BTreeSet::new();
        };

        let values: Vec<&str> = match claims.get(&mapping.claim) {
            Some(Value::String(s)) => vec![s.as_str()],
            Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        };

        values
            .into_iter()
            .filter_map(|v| match &mapping.pattern {
                Some(pattern) => pattern.extract(v),
                None => Some(v).filter(|s| !s.is_empty()),
            })
            .map(str::to_owned)
            .collect()
    }
}

fn metadata(claims: &JwtClaims) -> BTreeMap<String, Value> {
    claims
        .raw()
        .iter()
        .filter(|(_, value)| is_metadata_value(value))
        .map(|(name, value)| (format!("{METADATA_PREFIX}{name}"), value.clone()))
        .collect()
}

fn is_scalar(value: &Value) -> bool {
    matches!(value, Value::String(_) | Value::Number(_) | Value::Bool(_))
}

fn is_metadata_value(value: &Value) -> bool {
    match value {
        Value::Array(items) => items.iter().all(is_scalar),
        other => is_scalar(other),
    }
}
