//! HTTPS client for remote JWK set endpoints.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use bytes::Bytes;
use http::header::{ACCEPT, CONTENT_LENGTH};
use http_body_util::{BodyExt, Empty, Limited};
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::{TokioExecutor, TokioTimer};
use rustls_pki_types::pem::PemObject;
use rustls_pki_types::CertificateDer;
use tokio::sync::Semaphore;
use url::Url;

use super::source::KeyLoadError;
use crate::config::{HttpSettings, SslSettings};
use crate::config_error::ConfigError;

static NATIVE_ROOTS_CACHE: OnceLock<Vec<CertificateDer<'static>>> = OnceLock::new();

fn native_root_certs() -> &'static [CertificateDer<'static>] {
    NATIVE_ROOTS_CACHE
        .get_or_init(|| {
            let result = rustls_native_certs::load_native_certs();
            for err in &result.errors {
                tracing::warn!(error = %err, "error loading native root certificate");
            }
            if result.certs.is_empty() {
                tracing::warn!("no native root CA certificates found");
            } else {
                tracing::debug!(count = result.certs.len(), "loaded native root certificates");
            }
            result.certs
        })
        .as_slice()
}

fn crypto_provider() -> Arc<rustls::crypto::CryptoProvider> {
    rustls::crypto::CryptoProvider::get_default()
        .cloned()
        .unwrap_or_else(|| Arc::new(rustls::crypto::aws_lc_rs::default_provider()))
}

fn root_store(ssl: &SslSettings) -> Result<rustls::RootCertStore, ConfigError> {
    const SETTING: &str = "ssl.certificate_authorities";

    let mut store = rustls::RootCertStore::empty();

    if ssl.certificate_authorities.is_empty() {
        let (added, ignored) = store.add_parsable_certificates(native_root_certs().iter().cloned());
        if ignored > 0 {
            tracing::warn!(added, ignored, "some native root certificates could not be parsed");
        }
        return Ok(store);
    }

    for path in &ssl.certificate_authorities {
        let certs = CertificateDer::pem_file_iter(path)
            .and_then(|iter| iter.collect::<Result<Vec<_>, _>>())
            .map_err(|e| ConfigError::invalid(SETTING, format!("{}: {e}", path.display())))?;
        if certs.is_empty() {
            return Err(ConfigError::invalid(
                SETTING,
                format!("{}: no certificates found", path.display()),
            ));
        }
        for cert in certs {
            store
                .add(cert)
                .map_err(|e| ConfigError::invalid(SETTING, format!("{}: {e}", path.display())))?;
        }
    }
    Ok(store)
}

fn tls_config(ssl: &SslSettings) -> Result<rustls::ClientConfig, ConfigError> {
    let roots = root_store(ssl)?;
    rustls::ClientConfig::builder_with_provider(crypto_provider())
        .with_safe_default_protocol_versions()
        .map_err(|e| ConfigError::invalid("ssl", format!("failed to set TLS protocol versions: {e}")))
        .map(|builder| builder.with_root_certificates(roots).with_no_client_auth())
}

/// Fetches one JWK set URL with bounded concurrency and timeouts.
///
/// * `connect_timeout` bounds TCP connect.
/// * `connection_read_timeout` bounds the wait for a free connection slot.
/// * `socket_timeout` bounds the whole exchange, body included.
pub struct JwksClient {
    url: Url,
    client: Client<HttpsConnector<HttpConnector>, Empty<Bytes>>,
    permits: Semaphore,
    acquire_timeout: Option<Duration>,
    socket_timeout: Option<Duration>,
    max_response_bytes: usize,
}

impl JwksClient {
    /// # Errors
    /// Returns [`ConfigError`] when the trust material cannot be loaded.
    pub fn new(url: Url, http: &HttpSettings, ssl: &SslSettings) -> Result<Self, ConfigError> {
        if url.scheme() == "http" {
            tracing::warn!(
                url = %url,
                "insecure HTTP enabled for JWK set fetch; use only for testing"
            );
        }

        let mut connector = HttpConnector::new();
        connector.enforce_http(false);
        connector.set_connect_timeout(http.connect_timeout.as_timeout());

        let builder =
            hyper_rustls::HttpsConnectorBuilder::new().with_tls_config(tls_config(ssl)?);
        let https = if http.allow_insecure_http {
            builder
                .https_or_http()
                .enable_all_versions()
                .wrap_connector(connector)
        } else {
            builder
                .https_only()
                .enable_all_versions()
                .wrap_connector(connector)
        };

        let client = Client::builder(TokioExecutor::new())
            .pool_timer(TokioTimer::new())
            .pool_max_idle_per_host(http.max_endpoint_connections)
            .build(https);

        Ok(Self {
            url,
            client,
            permits: Semaphore::new(http.max_connections),
            acquire_timeout: http.connection_read_timeout.as_timeout(),
            socket_timeout: http.socket_timeout.as_timeout(),
            max_response_bytes: http.max_response_bytes,
        })
    }

    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// GET the JWK set document.
    ///
    /// # Errors
    /// Returns [`KeyLoadError`] on timeout, transport failure, non-2xx status
    /// or an oversized body.
    pub async fn fetch(&self) -> Result<Bytes, KeyLoadError> {
        let acquire = self.permits.acquire();
        let permit = match self.acquire_timeout {
            Some(limit) => tokio::time::timeout(limit, acquire)
                .await
                .map_err(|_| KeyLoadError::Timeout {
                    setting: "http.connection_read_timeout",
                    limit,
                })?,
            None => acquire.await,
        }
        .map_err(|_| KeyLoadError::Http("connection pool closed".to_owned()))?;

        let exchange = self.exchange();
        let result = match self.socket_timeout {
            Some(limit) => tokio::time::timeout(limit, exchange)
                .await
                .map_err(|_| KeyLoadError::Timeout {
                    setting: "http.socket_timeout",
                    limit,
                })?,
            None => exchange.await,
        };
        drop(permit);
        result
    }

    async fn exchange(&self) -> Result<Bytes, KeyLoadError> {
        let request = http::Request::get(self.url.as_str())
            .header(ACCEPT, "application/json")
            .body(Empty::<Bytes>::new())
            .map_err(|e| KeyLoadError::Http(e.to_string()))?;

        let response = self
            .client
            .request(request)
            .await
            .map_err(|e| KeyLoadError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(KeyLoadError::Status(status.as_u16()));
        }

        let declared = response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<usize>().ok());
        if declared.is_some_and(|len| len > self.max_response_bytes) {
            return Err(KeyLoadError::TooLarge(self.max_response_bytes));
        }

        let body = Limited::new(response.into_body(), self.max_response_bytes)
            .collect()
            .await
            .map_err(|e| {
                if e.is::<http_body_util::LengthLimitError>() {
                    KeyLoadError::TooLarge(self.max_response_bytes)
                } else {
                    KeyLoadError::Http(e.to_string())
                }
            })?;
        Ok(body.to_bytes())
    }
}
