use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use super::remote::JwksClient;
use crate::jwk::{JwkError, JwkSet};

/// Why a JWK set could not be loaded.
#[derive(Debug, Clone, Error)]
pub enum KeyLoadError {
    #[error("failed to read '{path}': {reason}")]
    Io { path: String, reason: String },

    #[error("{setting} of {limit:?} elapsed")]
    Timeout {
        setting: &'static str,
        limit: Duration,
    },

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("unexpected HTTP status {0}")]
    Status(u16),

    #[error("response exceeds {0} bytes")]
    TooLarge(usize),

    #[error(transparent)]
    Parse(#[from] JwkError),
}

/// Where a refreshable key set comes from.
pub enum KeySource {
    File(PathBuf),
    Remote(JwksClient),
}

impl KeySource {
    /// Load and parse the current document.
    ///
    /// # Errors
    /// Returns [`KeyLoadError`] when the document is unreachable or invalid.
    pub async fn load(&self) -> Result<JwkSet, KeyLoadError> {
        match self {
            Self::File(path) => {
                let bytes = tokio::fs::read(path).await.map_err(|e| KeyLoadError::Io {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                })?;
                Ok(JwkSet::parse_slice(&bytes)?)
            }
            Self::Remote(client) => {
                let bytes = client.fetch().await?;
                Ok(JwkSet::parse_slice(&bytes)?)
            }
        }
    }

    #[must_use]
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote(_))
    }

    /// Label used in logs and metrics.
    #[must_use]
    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for KeySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "file:{}", path.display()),
            Self::Remote(client) => write!(f, "{}", client.url()),
        }
    }
}

impl fmt::Debug for KeySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("KeySource").field(&self.label()).finish()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_file_source_loads_and_reports_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jwks.json");
        std::fs::write(&path, r#"{"keys":[{"kty":"oct","kid":"a","k":"c2VjcmV0"}]}"#).unwrap();

        let source = KeySource::File(path.clone());
        let set = source.load().await.unwrap();
        assert!(set.contains_kid("a"));
        assert!(source.label().starts_with("file:"));
        assert!(!source.is_remote());

        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(
            source.load().await,
            Err(KeyLoadError::Parse(JwkError::Json(_)))
        ));

        std::fs::remove_file(&path).unwrap();
        assert!(matches!(source.load().await, Err(KeyLoadError::Io { .. })));
    }
}
