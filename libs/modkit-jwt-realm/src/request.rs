//! Credentials presented with a request.

use http::HeaderMap;

use crate::config::HeaderSettings;
use crate::secret::SecretString;

/// What the client put in the client-authentication header.
#[derive(Debug, Clone)]
pub enum ClientCredential {
    /// `<client_scheme> <secret>`.
    Secret(SecretString),
    /// The header was present but did not use the configured scheme.
    Unrecognized,
}

/// A bearer token and an optional client credential.
#[derive(Debug, Clone)]
pub struct AuthenticationRequest {
    token: SecretString,
    client_credential: Option<ClientCredential>,
}

impl AuthenticationRequest {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: SecretString::new(token),
            client_credential: None,
        }
    }

    #[must_use]
    pub fn with_client_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_credential = Some(ClientCredential::Secret(SecretString::new(secret)));
        self
    }

    /// Extract credentials from request headers.
    ///
    /// Returns `None` when the token header is missing, uses another scheme,
    /// or carries an empty token. Scheme names compare case-insensitively.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap, settings: &HeaderSettings) -> Option<Self> {
        let token = scheme_value(headers, &settings.name, &settings.scheme)?;

        let client_credential = headers.get(settings.client_name.as_str()).map(|_| {
            scheme_value(headers, &settings.client_name, &settings.client_scheme)
                .map_or(ClientCredential::Unrecognized, |secret| {
                    ClientCredential::Secret(SecretString::new(secret))
                })
        });

        Some(Self {
            token: SecretString::new(token),
            client_credential,
        })
    }

    #[must_use]
    pub fn token(&self) -> &str {
        self.token.expose()
    }

    #[must_use]
    pub fn client_credential(&self) -> Option<&ClientCredential> {
        self.client_credential.as_ref()
    }
}

/// `<scheme> <value>` from header `name`.
fn scheme_value<'a>(headers: &'a HeaderMap, name: &str, scheme: &str) -> Option<&'a str> {
    let value = headers.get(name)?.to_str().ok()?.trim();
    let (presented, rest) = value.split_once(char::is_whitespace)?;
    if !presented.eq_ignore_ascii_case(scheme) {
        return None;
    }
    Some(rest.trim()).filter(|v| !v.is_empty())
}
