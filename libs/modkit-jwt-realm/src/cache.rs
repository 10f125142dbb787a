//! Cache of identities for tokens that already authenticated.

use std::time::Duration;

use dashmap::DashMap;
use sha2::{Digest, Sha256};
use time::OffsetDateTime;

use crate::config::{ClockSkew, JwtCacheSettings};
use crate::identity::VerifiedIdentity;

#[derive(Debug, Clone)]
struct CachedIdentity {
    identity: VerifiedIdentity,
    expires_at: OffsetDateTime,
}

/// Bounded map from token digest to identity.
///
/// Entries expire at the earlier of the configured TTL and the token's own
/// expiry (plus clock skew). Raw tokens are never stored.
#[derive(Debug)]
pub struct JwtCache {
    entries: DashMap<String, CachedIdentity>,
    size: usize,
    ttl: time::Duration,
}

impl JwtCache {
    #[must_use]
    pub fn new(settings: &JwtCacheSettings) -> Self {
        Self {
            entries: DashMap::new(),
            size: settings.size,
            ttl: to_time(settings.ttl),
        }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.size > 0
    }

    /// Cache key for a raw token.
    #[must_use]
    pub fn key(token: &str) -> String {
        hex::encode(Sha256::digest(token.as_bytes()))
    }

    /// Identity cached for `key`, unless it has expired at `now`.
    #[must_use]
    pub fn get(&self, key: &str, now: OffsetDateTime) -> Option<VerifiedIdentity> {
        if !self.is_enabled() {
            return None;
        }
        let hit = self.entries.get(key).map(|e| e.value().clone())?;
        if hit.expires_at < now {
            self.entries.remove(key);
            return None;
        }
        Some(hit.identity)
    }

    pub fn insert(
        &self,
        key: String,
        identity: VerifiedIdentity,
        now: OffsetDateTime,
        token_expiry: Option<OffsetDateTime>,
        skew: ClockSkew,
    ) {
        if !self.is_enabled() {
            return;
        }

        let mut expires_at = now.saturating_add(self.ttl);
        if let (Some(exp), Some(skew)) = (token_expiry, skew.tolerance()) {
            expires_at = expires_at.min(exp.saturating_add(to_time(skew)));
        }
        if expires_at < now {
            return;
        }

        if self.entries.len() >= self.size && !self.entries.contains_key(&key) {
            self.entries.retain(|_, e| e.expires_at >= now);
            if self.entries.len() >= self.size {
                let victim = self.entries.iter().next().map(|e| e.key().clone());
                if let Some(victim) = victim {
                    self.entries.remove(&victim);
                }
            }
        }

        self.entries.insert(
            key,
            CachedIdentity {
                identity,
                expires_at,
            },
        );
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn to_time(d: Duration) -> time::Duration {
    time::Duration::try_from(d).unwrap_or(time::Duration::MAX)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use std::collections::{BTreeMap, BTreeSet};

    fn identity(name: &str) -> VerifiedIdentity {
        VerifiedIdentity::new(name.to_owned(), BTreeSet::new(), BTreeMap::new())
    }

    fn cache(size: usize, ttl_secs: u64) -> JwtCache {
        JwtCache::new(&JwtCacheSettings {
            size,
            ttl: Duration::from_secs(ttl_secs),
        })
    }

    fn at(secs: i64) -> OffsetDateTime {
        OffsetDateTime::from_unix_timestamp(secs).unwrap()
    }

    const SKEW: ClockSkew = ClockSkew::Tolerance(Duration::from_secs(60));

    #[test]
    fn test_key_is_sha256_hex() {
        let key = JwtCache::key("a.b.c");
        assert_eq!(key.len(), 64);
        assert_ne!(key, JwtCache::key("a.b.d"));
        assert!(!key.contains("a.b.c"));
    }

    #[test]
    fn test_entry_expires_at_ttl() {
        let cache = cache(10, 100);
        cache.insert("k".into(), identity("u"), at(1000), None, SKEW);
        assert!(cache.get("k", at(1100)).is_some());
        assert!(cache.get("k", at(1101)).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_entry_never_outlives_token() {
        let cache = cache(10, 1200);
        cache.insert("k".into(), identity("u"), at(1000), Some(at(1010)), SKEW);
        assert!(cache.get("k", at(1070)).is_some());
        assert!(cache.get("k", at(1071)).is_none());
    }

    #[test]
    fn test_disabled_skew_uses_ttl_only() {
        let cache = cache(10, 100);
        cache.insert("k".into(), identity("u"), at(1000), Some(at(10)), ClockSkew::Disabled);
        assert!(cache.get("k", at(1050)).is_some());
    }

    #[test]
    fn test_zero_size_disables() {
        let cache = cache(0, 100);
        cache.insert("k".into(), identity("u"), at(1000), None, SKEW);
        assert!(!cache.is_enabled());
        assert!(cache.get("k", at(1000)).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_size_is_bounded() {
        let cache = cache(2, 100);
        for (i, name) in ["a", "b", "c"].iter().enumerate() {
            let offset = i64::try_from(i).unwrap();
            cache.insert((*name).to_owned(), identity(name), at(1000 + offset), None, SKEW);
        }
        assert_eq!(cache.len(), 2);
        assert!(cache.get("c", at(1003)).is_some());
    }

    #[test]
    fn test_expired_entries_are_purged_before_eviction() {
        let cache = cache(2, 100);
        cache.insert("old".into(), identity("old"), at(0), None, SKEW);
        cache.insert("live".into(), identity("live"), at(1000), None, SKEW);
        cache.insert("new".into(), identity("new"), at(1001), None, SKEW);
        assert_eq!(cache.len(), 2);
        assert!(cache.get("live", at(1001)).is_some());
        assert!(cache.get("new", at(1001)).is_some());
    }
}
