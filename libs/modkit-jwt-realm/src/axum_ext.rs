//! Axum middleware and extractor backed by a [`JwtRealm`].

use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, HeaderMap, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::errors::{AuthenticationFailed, RealmError};
use crate::identity::VerifiedIdentity;
use crate::realm::JwtRealm;
use crate::request::AuthenticationRequest;

/// Identity placed in request extensions by [`jwt_auth_required`].
///
/// Extracting it from a route without that middleware is a 500.
#[derive(Debug, Clone)]
pub struct AuthenticatedIdentity(pub VerifiedIdentity);

impl<S> FromRequestParts<S> for AuthenticatedIdentity
where
    S: Send + Sync,
{
    type Rejection = AuthenticationFailed;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<VerifiedIdentity>()
            .cloned()
            .map(AuthenticatedIdentity)
            .ok_or_else(|| {
                tracing::warn!("VerifiedIdentity not found - jwt_auth_required not configured");
                AuthenticationFailed::new(RealmError::ConfigurationInvalid(
                    "jwt_auth_required middleware not installed".to_owned(),
                ))
            })
    }
}

/// Reject requests without a valid JWT.
///
/// CORS preflight requests pass through untouched. On success the
/// [`VerifiedIdentity`] is inserted into request extensions.
///
/// ```ignore
/// let app = Router::new()
///     .route("/me", get(me))
///     .layer(axum::middleware::from_fn_with_state(realm.clone(), jwt_auth_required));
/// ```
pub async fn jwt_auth_required(
    State(realm): State<Arc<JwtRealm>>,
    mut request: Request,
    next: Next,
) -> Response {
    if is_preflight_request(request.method(), request.headers()) {
        return next.run(request).await;
    }

    let config = realm.config();
    let Some(credentials) = AuthenticationRequest::from_headers(request.headers(), config.header())
    else {
        tracing::debug!(header = %config.header().name, "No bearer token presented");
        return AuthenticationFailed::new(RealmError::MalformedToken(
            "no bearer token presented".to_owned(),
        ))
        .into_response();
    };

    match realm.authenticate(&credentials).await {
        Ok(identity) => {
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        Err(err) => err.into_response(),
    }
}

fn is_preflight_request(method: &Method, headers: &HeaderMap) -> bool {
    method == Method::OPTIONS
        && headers.contains_key(axum::http::header::ORIGIN)
        && headers.contains_key(axum::http::header::ACCESS_CONTROL_REQUEST_METHOD)
}
