use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use serde_json::Value;

/// An authenticated end user.
///
/// Only the realm can build one, and only after the token's signature and
/// claims have been verified.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerifiedIdentity {
    principal: String,
    groups: BTreeSet<String>,
    metadata: BTreeMap<String, Value>,
}

impl VerifiedIdentity {
    pub(crate) fn new(
        principal: String,
        groups: BTreeSet<String>,
        metadata: BTreeMap<String, Value>,
    ) -> Self {
        Self {
            principal,
            groups,
            metadata,
        }
    }

    /// Non-empty user name.
    #[must_use]
    pub fn principal(&self) -> &str {
        &self.principal
    }

    #[must_use]
    pub fn groups(&self) -> &BTreeSet<String> {
        &self.groups
    }

    #[must_use]
    pub fn has_group(&self, group: &str) -> bool {
        self.groups.contains(group)
    }

    /// `jwt_claim_<name>` entries copied from the token.
    #[must_use]
    pub fn metadata(&self) -> &BTreeMap<String, Value> {
        &self.metadata
    }
}
