use std::sync::Arc;

use reqwest::{Method, StatusCode};
use serde_json::json;
use services::transport::{ApiResponse, ScriptedTransport, Transport};
use services::{AppServices, Clock, ErrorKind};
use study_core::model::DeckId;
use study_core::time::fixed_now;

fn app() -> (ScriptedTransport, AppServices) {
    let transport = ScriptedTransport::new();
    let shared: Arc<dyn Transport> = Arc::new(transport.clone());
    (
        transport,
        AppServices::with_transport(shared, Clock::fixed(fixed_now())),
    )
}

async fn signed_in(token: &str) -> (ScriptedTransport, AppServices) {
    let (transport, app) = app();
    transport.push_json(
        Method::POST,
        "auth/login",
        200,
        json!({"accessToken": token, "user": {"id": 1, "email": "ana@example.com"}}),
    );
    app.session()
        .login("ana@example.com", "secret")
        .await
        .expect("login");
    (transport, app)
}

#[tokio::test]
async fn expired_token_is_refreshed_and_request_replayed_once() {
    let (transport, app) = signed_in("stale").await;
    transport.push_json(Method::GET, "decks/own", 401, json!({"detail": "expired"}));
    transport.push_json(Method::POST, "auth/refresh-token", 200, json!({"accessToken": "fresh"}));
    transport.push_json(
        Method::GET,
        "decks/own",
        200,
        json!({"data": [{"id": 3, "name": "Verbs"}]}),
    );

    let decks = app.decks().own().await.expect("decks after refresh");

    assert_eq!(decks.len(), 1);
    assert_eq!(transport.count(&Method::POST, "auth/refresh-token"), 1);
    let sent = transport.requests();
    let deck_calls: Vec<_> = sent.iter().filter(|r| r.path() == "decks/own").collect();
    assert_eq!(deck_calls.len(), 2);
    assert_eq!(deck_calls[0].header("Authorization"), Some("Bearer stale"));
    assert_eq!(deck_calls[1].header("Authorization"), Some("Bearer fresh"));
    assert_eq!(deck_calls[1].attempt(), 1);
    assert_eq!(deck_calls[0].id(), deck_calls[1].id());
    assert!(app.session().is_authenticated());
}

#[tokio::test]
async fn concurrent_401s_share_one_refresh() {
    let (transport, app) = signed_in("stale").await;
    transport.push_json(Method::GET, "decks/own", 401, json!({}));
    transport.push_json(Method::GET, "decks/5", 401, json!({}));
    let release = transport.push_held(
        Method::POST,
        "auth/refresh-token",
        Ok(ApiResponse::json(StatusCode::OK, &json!({"accessToken": "fresh"}))),
    );
    transport.push_json(Method::GET, "decks/own", 200, json!({"data": []}));
    transport.push_json(Method::GET, "decks/5", 200, json!({"data": {"id": 5, "name": "Five"}}));

    let decks = app.decks();
    let (own, one, ()) = tokio::join!(decks.own(), decks.get(DeckId::new(5)), async {
        tokio::task::yield_now().await;
        release.release();
    });

    assert!(own.expect("own decks").is_empty());
    assert_eq!(one.expect("deck").name, "Five");
    assert_eq!(transport.count(&Method::POST, "auth/refresh-token"), 1);
    assert!(!app.session().is_refreshing());
}

#[tokio::test]
async fn rejected_refresh_signs_out_and_fails_request() {
    let (transport, app) = signed_in("stale").await;
    transport.push_json(Method::GET, "decks/own", 401, json!({}));
    transport.push_json(
        Method::POST,
        "auth/refresh-token",
        401,
        json!({"detail": "Refresh token expired"}),
    );

    let err = app.decks().own().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Refresh);
    assert_eq!(err.to_string(), "Refresh token expired");
    assert!(!app.session().is_authenticated());
    assert!(app.session().current_user().is_none());
    assert_eq!(transport.count(&Method::GET, "decks/own"), 1);
}

#[tokio::test]
async fn replay_rejected_again_signs_out_without_second_refresh() {
    let (transport, app) = signed_in("stale").await;
    transport.push_json(Method::GET, "decks/own", 401, json!({}));
    transport.push_json(Method::POST, "auth/refresh-token", 200, json!({"accessToken": "fresh"}));
    transport.push_json(Method::GET, "decks/own", 401, json!({"detail": "still no"}));
    transport.push_json(Method::POST, "auth/logout", 200, json!({}));

    let err = app.decks().own().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Auth);
    assert_eq!(transport.count(&Method::POST, "auth/refresh-token"), 1);
    assert_eq!(transport.count(&Method::GET, "decks/own"), 2);
    assert!(!app.session().is_authenticated());
}

#[tokio::test]
async fn anonymous_401_is_not_retried() {
    let (transport, app) = app();
    transport.push_json(Method::GET, "decks/own", 401, json!({"detail": "Login required"}));

    let err = app.decks().own().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Auth);
    assert_eq!(transport.count(&Method::POST, "auth/refresh-token"), 0);
}

#[tokio::test]
async fn check_auth_restores_session_then_loads_profile() {
    let (transport, app) = app();
    transport.push_json(Method::POST, "auth/refresh-token", 200, json!({"accessToken": "cookie"}));
    transport.push_json(Method::GET, "auth/me", 200, json!({"id": 9, "username": "ana"}));

    app.session().check_auth().await;
    let user = app.users().fetch_current().await.expect("profile");

    assert!(app.session().auth_checked());
    assert_eq!(user.and_then(|u| u.username).as_deref(), Some("ana"));
    let me = transport
        .requests()
        .into_iter()
        .find(|r| r.path() == "auth/me")
        .expect("profile request");
    assert_eq!(me.header("Authorization"), Some("Bearer cookie"));
}
