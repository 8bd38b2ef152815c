mod helpers;

use std::sync::atomic::Ordering;

use care_session::error::ApiError;
use futures::future::join_all;
use serde_json::Value;

use helpers::{spawn_app, spawn_app_with, spawn_app_with_tokens};

#[tokio::test]
async fn concurrent_401s_share_a_single_refresh() {
    let app = spawn_app_with_tokens(|backend| backend.revoked_access_pair()).await;
    let revoked = app.app.store.access_token().unwrap();

    let calls = (0..5).map(|_| app.app.client.get("clients"));
    let results = join_all(calls).await;

    for result in &results {
        let clients = result.as_ref().expect("Request should succeed after refresh");
        assert_eq!(clients.as_array().map(Vec::len), Some(2));
    }
    assert_eq!(app.backend.refresh_calls.load(Ordering::SeqCst), 1);

    let rotated = app.app.store.access_token().unwrap();
    assert_ne!(rotated, revoked);

    let seen = app.backend.requests_to("/clients");
    assert_eq!(seen.len(), 10);
    let retried_with_rotated = seen
        .iter()
        .filter(|token| token.as_deref() == Some(rotated.as_str()))
        .count();
    assert_eq!(retried_with_rotated, 5);
    assert!(!app.app.coordinator.is_refreshing());
}

#[tokio::test]
async fn second_401_is_returned_without_another_refresh() {
    let app = spawn_app_with_tokens(|backend| backend.issue_pair()).await;

    let result = app.app.client.get("reports").await;

    assert_eq!(
        result,
        Err(ApiError::Unauthorized("Not allowed to view reports".to_string()))
    );
    assert_eq!(app.backend.requests_to("/reports").len(), 2);
    assert_eq!(app.backend.refresh_calls.load(Ordering::SeqCst), 1);
    // The rotated session stays; only a failed refresh tears it down.
    assert!(app.app.store.access_token().is_some());
    assert_eq!(app.navigator.redirect_count(), 0);
}

#[tokio::test]
async fn expired_token_is_refreshed_before_sending() {
    let app = spawn_app_with_tokens(|backend| backend.expired_access_pair()).await;
    let expired = app.app.store.access_token().unwrap();

    let result = app.app.client.get("clients").await;

    assert!(result.is_ok());
    assert_eq!(app.backend.refresh_calls.load(Ordering::SeqCst), 1);

    // The expired token never reaches the business endpoint.
    let seen = app.backend.requests_to("/clients");
    assert_eq!(seen.len(), 1);
    assert_ne!(seen[0].as_deref(), Some(expired.as_str()));
    assert_eq!(seen[0], app.app.store.access_token());
}

#[tokio::test]
async fn concurrent_requests_with_expired_token_refresh_once() {
    let app = spawn_app_with_tokens(|backend| backend.expired_access_pair()).await;

    let (first, second) = tokio::join!(
        app.app.client.get("clients"),
        app.app.client.get("clients")
    );

    assert!(first.is_ok());
    assert!(second.is_ok());
    assert_eq!(app.backend.refresh_calls.load(Ordering::SeqCst), 1);
    assert_eq!(app.backend.requests_to("/clients").len(), 2);
}

#[tokio::test]
async fn expired_token_without_refresh_token_tears_down() {
    let app = spawn_app_with(|_, storage| {
        use care_session::auth::KeyValueStorage;
        let expired = helpers::sign_token(helpers::EMAIL, "access", -60);
        storage.set("token", &expired).unwrap();
    })
    .await;

    let result = app.app.client.get("clients").await;

    assert!(matches!(result, Err(ApiError::RefreshFailure(_))));
    assert_eq!(app.backend.refresh_calls.load(Ordering::SeqCst), 0);
    assert!(app.backend.requests_to("/clients").is_empty());
    assert_eq!(app.app.store.access_token(), None);
    assert_eq!(app.navigator.redirect_count(), 1);
}

#[tokio::test]
async fn failed_refresh_rejects_every_waiter_and_redirects_once() {
    // Neither token is known to the backend, so the refresh is rejected.
    let app = spawn_app_with_tokens(|_| {
        (
            helpers::sign_token(helpers::EMAIL, "access", 900),
            helpers::sign_token(helpers::EMAIL, "refresh", 86_400),
        )
    })
    .await;

    let calls = (0..3).map(|_| app.app.client.get("clients"));
    let results = join_all(calls).await;

    for result in results {
        assert!(
            matches!(result, Err(ApiError::RefreshFailure(_))),
            "Unexpected result: {:?}",
            result
        );
    }
    assert_eq!(app.backend.refresh_calls.load(Ordering::SeqCst), 1);
    assert_eq!(app.app.store.get(), Default::default());
    assert_eq!(app.navigator.redirect_count(), 1);
    assert!(!app.app.coordinator.is_refreshing());
}

#[tokio::test]
async fn missing_access_token_fails_without_network() {
    let app = spawn_app().await;

    let result = app.app.client.get("clients").await;

    assert_eq!(result, Err(ApiError::NoSession));
    assert!(app.backend.requests_to("/clients").is_empty());
    assert_eq!(app.navigator.redirect_count(), 1);
}

#[tokio::test]
async fn redirect_happens_once_per_session() {
    let app = spawn_app().await;

    let _ = app.app.client.get("clients").await;
    let _ = app.app.client.get("clients").await;

    assert_eq!(app.navigator.redirect_count(), 1);
    let redirects = app.navigator.redirects.lock().unwrap();
    assert_eq!(redirects[0].0, "/signin");
}

#[tokio::test]
async fn skipped_auth_sends_no_bearer() {
    let app = spawn_app_with_tokens(|backend| backend.issue_pair()).await;

    let result = app
        .app
        .client
        .request(reqwest::Method::GET, "notices", None, true)
        .await;

    assert_eq!(
        result.unwrap().get("notice").and_then(Value::as_str),
        Some("Maintenance on Sunday")
    );
    assert_eq!(app.backend.requests_to("/notices"), vec![None]);
}
