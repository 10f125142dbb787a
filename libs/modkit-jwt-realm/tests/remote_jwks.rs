#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Remote JWK set fetch, on-demand refresh and stale fallback.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::*;
use httpmock::prelude::*;
use modkit_jwt_realm::{run_key_refresh_task, JwtRealm, KeyStoreProvider, RealmError, SignatureAlgorithm};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

fn remote_overrides(server: &MockServer, refresh: Value) -> Value {
    json!({
        "allowed_signature_algorithms": ["RS256", "ES512"],
        "hmac_key": null,
        "pkc_jwkset_path": server.url("/jwkset.json"),
        "http": {"allow_insecure_http": true, "socket_timeout": "2s"},
        "jwkset_refresh": refresh,
    })
}

fn serve<'a>(server: &'a MockServer, status: u16, body: &Value) -> httpmock::Mock<'a> {
    let body = body.to_string();
    server.mock(|when, then| {
        when.method(GET).path("/jwkset.json");
        then.status(status)
            .header("content-type", "application/json")
            .body(body);
    })
}

#[tokio::test]
async fn remote_set_is_fetched_at_startup() {
    let server = MockServer::start();
    let mock = serve(&server, 200, &public_jwks());

    let realm = realm(remote_overrides(&server, json!({}))).await;
    mock.assert_hits(1);

    for alg in [SignatureAlgorithm::RS256, SignatureAlgorithm::ES512] {
        let token = sign(alg, None, &claims());
        assert!(realm.authenticate(&request(&token)).await.is_ok(), "{alg}");
    }
    // Served from the loaded set.
    mock.assert_hits(1);

    let set = realm.key_store().public_key_set().unwrap();
    assert_eq!(set.version(), 1);
    assert_eq!(set.keys().len(), 4);
}

#[tokio::test]
async fn unknown_kid_triggers_one_on_demand_refresh() {
    let server = MockServer::start();
    let mut initial = serve(&server, 200, &public_jwks());
    let realm = realm(remote_overrides(&server, json!({"on_demand_cooldown": "60s"}))).await;
    initial.assert_hits(1);

    initial.delete();
    let rotated = serve(&server, 200, &rotated_rsa_jwks("rsa-2"));

    let token = sign(SignatureAlgorithm::RS256, Some("rsa-2"), &claims());
    assert!(realm.authenticate(&request(&token)).await.is_ok());
    rotated.assert_hits(1);
    assert_eq!(realm.key_store().public_key_set().unwrap().version(), 2);

    // Another unknown kid inside the cooldown does not hit the endpoint.
    let token = sign(SignatureAlgorithm::RS256, Some("rsa-3"), &claims());
    let err = realm.authenticate(&request(&token)).await.unwrap_err();
    assert!(matches!(err.reason(), RealmError::KeyUnavailable(_)));
    rotated.assert_hits(1);
}

#[tokio::test]
async fn failed_refresh_keeps_serving_last_good_set() {
    let server = MockServer::start();
    let mut good = serve(&server, 200, &public_jwks());
    let realm = realm(remote_overrides(&server, json!({}))).await;

    good.delete();
    let failing = serve(&server, 500, &json!({}));

    let store = realm.key_store();
    assert!(store.refresh_now().await.is_err());
    failing.assert_hits(1);
    assert!(store.last_refresh_error().await.unwrap().contains("500"));

    let token = sign(SignatureAlgorithm::RS256, Some("rsa-1"), &claims());
    assert!(realm.authenticate(&request(&token)).await.is_ok());
    assert_eq!(store.public_key_set().unwrap().version(), 1);
}

#[tokio::test]
async fn unreachable_endpoint_at_startup_is_retried_on_demand() {
    let server = MockServer::start();
    let mut failing = serve(&server, 503, &json!({}));
    let realm = realm(remote_overrides(&server, json!({"on_demand_cooldown": "1ms"}))).await;
    failing.assert_hits(1);
    assert!(realm.key_store().public_key_set().is_none());

    failing.delete();
    let good = serve(&server, 200, &public_jwks());
    tokio::time::sleep(Duration::from_millis(5)).await;

    let token = sign(SignatureAlgorithm::RS256, None, &claims());
    assert!(realm.authenticate(&request(&token)).await.is_ok());
    good.assert_hits(1);
}

#[tokio::test]
async fn startup_without_keys_rejects_with_key_unavailable() {
    let server = MockServer::start();
    let _failing = serve(&server, 503, &json!({}));
    let realm = realm(remote_overrides(&server, json!({}))).await;

    let token = sign(SignatureAlgorithm::RS256, None, &claims());
    let err = realm.authenticate(&request(&token)).await.unwrap_err();
    assert!(matches!(err.reason(), RealmError::KeyUnavailable(_)));
}

#[tokio::test]
async fn invalid_document_is_a_refresh_failure() {
    let server = MockServer::start();
    let mut good = serve(&server, 200, &public_jwks());
    let realm = realm(remote_overrides(&server, json!({}))).await;

    good.delete();
    let _unusable = serve(&server, 200, &json!({"keys": [{"kty": "OKP", "crv": "Ed25519", "x": "AA"}]}));

    assert!(realm.key_store().refresh_now().await.is_err());
    assert_eq!(realm.key_store().public_key_set().unwrap().keys().len(), 4);
}

#[tokio::test]
async fn background_task_refreshes_until_cancelled() {
    let server = MockServer::start();
    let mock = serve(&server, 200, &public_jwks());
    let realm = Arc::new(
        realm(remote_overrides(
            &server,
            json!({"interval": "50ms", "max_backoff": "1s"}),
        ))
        .await,
    );

    let cancel = CancellationToken::new();
    let task = tokio::spawn(run_key_refresh_task(Arc::clone(&realm), cancel.clone()));

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while mock.hits() < 3 && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(mock.hits() >= 3);

    cancel.cancel();
    task.await.unwrap();
    let hits = mock.hits();
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(mock.hits(), hits);
    assert!(realm.key_store().public_key_set().unwrap().version() >= 3);
}

#[tokio::test]
async fn reload_switches_key_source() {
    let server = MockServer::start();
    let _mock = serve(&server, 200, &public_jwks());
    let realm: JwtRealm = realm(json!({})).await;

    let rs = sign(SignatureAlgorithm::RS256, Some("rsa-1"), &claims());
    assert!(realm.authenticate(&request(&rs)).await.is_err());

    realm
        .reload(config(remote_overrides(&server, json!({}))))
        .await
        .unwrap();
    assert!(realm.authenticate(&request(&rs)).await.is_ok());

    let hs = sign(SignatureAlgorithm::HS256, None, &claims());
    let err = realm.authenticate(&request(&hs)).await.unwrap_err();
    assert!(matches!(err.reason(), RealmError::AlgorithmNotAllowed(_)));
}
