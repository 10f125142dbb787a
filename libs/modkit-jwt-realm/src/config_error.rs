use thiserror::Error;

/// Errors raised while loading or validating realm settings.
///
/// Fatal to realm startup; never produced per request.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid setting '{setting}': {reason}")]
    Invalid {
        setting: &'static str,
        reason: String,
    },

    #[error("authorization_realms is set but no role resolver was supplied")]
    MissingRoleResolver,

    #[error("failed to load settings: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("failed to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    pub(crate) fn invalid(setting: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            setting,
            reason: reason.into(),
        }
    }

    /// Name of the offending setting, when the error is tied to one.
    #[must_use]
    pub fn setting(&self) -> Option<&'static str> {
        match self {
            Self::Invalid { setting, .. } => Some(setting),
            Self::MissingRoleResolver => Some("authorization_realms"),
            Self::Load(_) | Self::Io { .. } => None,
        }
    }
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Load(Box::new(err))
    }
}

impl From<ConfigError> for crate::errors::RealmError {
    fn from(err: ConfigError) -> Self {
        crate::errors::RealmError::ConfigurationInvalid(err.to_string())
    }
}
