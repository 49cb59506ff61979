mod common;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use serde_json::json;

use docbridge::{identity::IdentityProvider, store::DocumentStore};
use docbridge_gateway::config::GatewayConfig;

use common::{ProfileRefusingStore, app, app_with};

fn sign_out_request(cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(Method::POST).uri("/api/sign-out");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, format!("session={cookie}"));
    }

    builder.body(Body::empty()).unwrap()
}

#[tokio::test]
async fn sign_up_provisions_a_profile_and_sets_the_cookie() {
    let app = app();
    let response = app
        .json(
            Method::POST,
            "/api/sign-up",
            json!({ "credentials": { "email": "ada@example.com", "password": "secret1" } }),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);
    assert_eq!(response.body["status"], json!("success"));

    let uid = response.body["user"].as_str().unwrap().to_string();
    let cookie = response.session_cookie().unwrap();
    assert_eq!(response.body["sessionCookie"], json!(cookie));

    let set_cookie = response.set_cookie().unwrap();
    for attribute in ["HttpOnly", "SameSite=Strict", "Path=/", "Max-Age=432000"] {
        assert!(set_cookie.contains(attribute), "{set_cookie} lacks {attribute}");
    }
    assert!(!set_cookie.contains("Secure"));

    let profile = app
        .json(Method::GET, "/api/get-object", json!({ "collectionName": "users", "docId": uid }))
        .await;
    assert_eq!(
        profile.body["data"],
        json!({ "id": uid, "uid": uid, "email": "ada@example.com", "role": "user", "status": "active" })
    );
}

#[tokio::test]
async fn secure_cookies_when_configured() {
    let config = GatewayConfig {
        cookie_secure: true,
        ..GatewayConfig::default()
    };
    let app = app_with(config, DocumentStore::new(docbridge::memory::InMemoryStore::new()));

    app.sign_up("ada@example.com", "secret1").await;
    let response = app
        .json(
            Method::POST,
            "/api/sign-in",
            json!({ "credentials": { "email": "ada@example.com", "password": "secret1" } }),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.set_cookie().unwrap().contains("Secure"));
}

#[tokio::test]
async fn wrong_password_issues_no_session() {
    let app = app();
    app.sign_up("ada@example.com", "secret1").await;

    let response = app
        .json(
            Method::POST,
            "/api/sign-in",
            json!({ "credentials": { "email": "ada@example.com", "password": "not-it" } }),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body, json!({ "status": "error", "message": "auth/wrong-password" }));
    assert!(response.set_cookie().is_none());
}

#[tokio::test]
async fn invalid_credentials_never_reach_the_provider() {
    let app = app();

    for credentials in [
        json!({ "email": "nope", "password": "secret1" }),
        json!({ "email": "ada@example.com", "password": "123" }),
        json!({ "email": "ada@example.com" }),
    ] {
        let response = app
            .json(Method::POST, "/api/sign-in", json!({ "credentials": credentials }))
            .await;

        assert_eq!(response.status, StatusCode::BAD_REQUEST);
    }

    assert_eq!(app.identity.calls(), 0);
}

#[tokio::test]
async fn sign_out_without_cookie_makes_no_provider_call() {
    let app = app();
    let response = app.send(sign_out_request(None)).await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body, json!({ "status": "error", "message": "No active session" }));
    assert_eq!(app.identity.calls(), 0);
}

#[tokio::test]
async fn signed_out_sessions_are_revoked() {
    let app = app();
    let (_, cookie) = app.sign_up("ada@example.com", "secret1").await;

    let response = app.send(sign_out_request(Some(&cookie))).await;
    assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);
    assert_eq!(response.message(), "Logged out successfully");

    let cleared = response.set_cookie().unwrap();
    assert!(cleared.starts_with("session=;"), "{cleared}");
    assert!(cleared.contains("Max-Age=0"), "{cleared}");

    assert!(app.identity.inner.verify_session_cookie(&cookie, true).await.is_err());

    let again = app.send(sign_out_request(Some(&cookie))).await;
    assert_eq!(again.status, StatusCode::UNAUTHORIZED);
    assert_eq!(again.message(), "Invalid session");
    assert!(again.set_cookie().unwrap().starts_with("session=;"));
}

#[tokio::test]
async fn failed_profile_provisioning_removes_the_identity() {
    let app = app_with(
        GatewayConfig::default(),
        DocumentStore::new(ProfileRefusingStore::default()),
    );

    let response = app
        .json(
            Method::POST,
            "/api/sign-up",
            json!({ "credentials": { "email": "ada@example.com", "password": "secret1" } }),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.message(), "unavailable");
    assert!(response.set_cookie().is_none());
    assert!(app.identity.inner.user_by_email("ada@example.com").await.is_none());

    let retry = app
        .json(
            Method::POST,
            "/api/sign-in",
            json!({ "credentials": { "email": "ada@example.com", "password": "secret1" } }),
        )
        .await;
    assert_eq!(retry.message(), "auth/user-not-found");
}

#[tokio::test]
async fn duplicate_sign_up_is_a_dependency_error() {
    let app = app();
    app.sign_up("ada@example.com", "secret1").await;

    let response = app
        .json(
            Method::POST,
            "/api/sign-up",
            json!({ "credentials": { "email": "ada@example.com", "password": "secret2" } }),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.message(), "auth/email-already-in-use");
}

#[tokio::test]
async fn account_maintenance() {
    let app = app();
    let (uid, _) = app.sign_up("ada@example.com", "secret1").await;

    let reset = app
        .json(Method::POST, "/api/reset-password", json!({ "email": "ada@example.com" }))
        .await;
    assert_eq!(reset.status, StatusCode::OK);
    assert_eq!(reset.message(), "Password reset email sent");
    assert_eq!(app.identity.inner.password_reset_outbox().await, vec!["ada@example.com".to_string()]);

    let updated = app
        .json(
            Method::POST,
            "/api/update-user",
            json!({ "credentials": { "uid": uid, "user": { "displayName": "Ada", "password": "secret2" } } }),
        )
        .await;
    assert_eq!(updated.status, StatusCode::OK, "{:?}", updated.body);
    assert_eq!(updated.message(), format!("User {uid} successful updated"));

    let signed_in = app
        .json(
            Method::POST,
            "/api/sign-in",
            json!({ "credentials": { "email": "ada@example.com", "password": "secret2" } }),
        )
        .await;
    assert_eq!(signed_in.status, StatusCode::OK);

    let profile = app
        .json(Method::GET, "/api/get-object", json!({ "collectionName": "users", "docId": uid }))
        .await;
    assert!(profile.body["data"].get("displayName").is_none());

    let rejected = app
        .json(
            Method::POST,
            "/api/update-user",
            json!({ "credentials": { "uid": uid, "user": { "role": "admin" } } }),
        )
        .await;
    assert_eq!(rejected.status, StatusCode::BAD_REQUEST);
}
