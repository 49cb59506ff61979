#![allow(dead_code)]

use std::{
    net::SocketAddr,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    extract::ConnectInfo,
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use docbridge::{
    backend::StoreBackend,
    document::{Fields, StoredDocument},
    error::{DocumentStoreError, DocumentStoreResult},
    identity::{IdentityProvider, IdentityResult, SessionClaims, SignedInUser, UserRecord, UserUpdate},
    memory::{InMemoryBlobStorage, InMemoryIdentityProvider, InMemoryStore},
    query::{CollectionPath, Query},
    store::DocumentStore,
};
use docbridge_gateway::{config::GatewayConfig, http};

pub const BOUNDARY: &str = "docbridge-test-boundary";

/// Identity provider that counts every call before delegating.
#[derive(Debug, Clone, Default)]
pub struct CountingIdentity {
    pub inner: InMemoryIdentityProvider,
    calls: Arc<AtomicUsize>,
}

impl CountingIdentity {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn count(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl IdentityProvider for CountingIdentity {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> IdentityResult<SignedInUser> {
        self.count();
        self.inner.sign_in_with_password(email, password).await
    }

    async fn create_user_with_password(&self, email: &str, password: &str) -> IdentityResult<SignedInUser> {
        self.count();
        self.inner.create_user_with_password(email, password).await
    }

    async fn create_session_cookie(&self, id_token: &str, expires_in: Duration) -> IdentityResult<String> {
        self.count();
        self.inner.create_session_cookie(id_token, expires_in).await
    }

    async fn verify_session_cookie(&self, session_cookie: &str, check_revoked: bool) -> IdentityResult<SessionClaims> {
        self.count();
        self.inner.verify_session_cookie(session_cookie, check_revoked).await
    }

    async fn revoke_refresh_tokens(&self, uid: &str) -> IdentityResult<()> {
        self.count();
        self.inner.revoke_refresh_tokens(uid).await
    }

    async fn send_password_reset_email(&self, email: &str) -> IdentityResult<()> {
        self.count();
        self.inner.send_password_reset_email(email).await
    }

    async fn update_user(&self, uid: &str, update: UserUpdate) -> IdentityResult<UserRecord> {
        self.count();
        self.inner.update_user(uid, update).await
    }

    async fn delete_user(&self, uid: &str) -> IdentityResult<()> {
        self.count();
        self.inner.delete_user(uid).await
    }
}

/// Store that refuses to create documents in `users`, everything else goes through.
#[derive(Debug, Clone, Default)]
pub struct ProfileRefusingStore {
    pub inner: InMemoryStore,
}

#[async_trait]
impl StoreBackend for ProfileRefusingStore {
    async fn add_document(&self, collection: &CollectionPath, fields: Fields) -> DocumentStoreResult<String> {
        self.inner.add_document(collection, fields).await
    }

    async fn create_document(&self, collection: &CollectionPath, id: &str, fields: Fields) -> DocumentStoreResult<()> {
        if collection.as_str() == "users" {
            return Err(DocumentStoreError::Unavailable("profile writes are down".into()));
        }

        self.inner.create_document(collection, id, fields).await
    }

    async fn set_document(&self, collection: &CollectionPath, id: &str, fields: Fields) -> DocumentStoreResult<()> {
        self.inner.set_document(collection, id, fields).await
    }

    async fn delete_document(&self, collection: &CollectionPath, id: &str) -> DocumentStoreResult<()> {
        self.inner.delete_document(collection, id).await
    }

    async fn get_document(&self, collection: &CollectionPath, id: &str) -> DocumentStoreResult<Option<StoredDocument>> {
        self.inner.get_document(collection, id).await
    }

    async fn query_documents(&self, query: &Query) -> DocumentStoreResult<Vec<StoredDocument>> {
        self.inner.query_documents(query).await
    }
}

/// Store whose reads of nested collections fail, top-level reads go through.
#[derive(Debug, Clone, Default)]
pub struct NestedReadFailingStore {
    pub inner: InMemoryStore,
}

#[async_trait]
impl StoreBackend for NestedReadFailingStore {
    async fn add_document(&self, collection: &CollectionPath, fields: Fields) -> DocumentStoreResult<String> {
        self.inner.add_document(collection, fields).await
    }

    async fn create_document(&self, collection: &CollectionPath, id: &str, fields: Fields) -> DocumentStoreResult<()> {
        self.inner.create_document(collection, id, fields).await
    }

    async fn set_document(&self, collection: &CollectionPath, id: &str, fields: Fields) -> DocumentStoreResult<()> {
        self.inner.set_document(collection, id, fields).await
    }

    async fn delete_document(&self, collection: &CollectionPath, id: &str) -> DocumentStoreResult<()> {
        self.inner.delete_document(collection, id).await
    }

    async fn get_document(&self, collection: &CollectionPath, id: &str) -> DocumentStoreResult<Option<StoredDocument>> {
        self.inner.get_document(collection, id).await
    }

    async fn query_documents(&self, query: &Query) -> DocumentStoreResult<Vec<StoredDocument>> {
        if query.collection.as_str().contains('/') {
            return Err(DocumentStoreError::Unavailable("sub-collection reads are down".into()));
        }

        self.inner.query_documents(query).await
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: DocumentStore,
    pub identity: CountingIdentity,
    pub blobs: InMemoryBlobStorage,
}

pub fn app() -> TestApp {
    app_with(GatewayConfig::default(), DocumentStore::new(InMemoryStore::new()))
}

pub fn app_with(config: GatewayConfig, store: DocumentStore) -> TestApp {
    let identity = CountingIdentity::default();
    let blobs = InMemoryBlobStorage::new(config.storage_bucket.clone());
    let state = http::AppState::new(
        &config,
        store.clone(),
        Arc::new(identity.clone()),
        Arc::new(blobs.clone()),
    );

    TestApp {
        router: http::router(&config, state),
        store,
        identity,
        blobs,
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    pub fn message(&self) -> &str {
        self.body["message"].as_str().unwrap_or_default()
    }

    pub fn set_cookie(&self) -> Option<&str> {
        self.headers
            .get(header::SET_COOKIE)
            .and_then(|value| value.to_str().ok())
    }

    /// The `session` cookie value set by the response.
    pub fn session_cookie(&self) -> Option<String> {
        self.set_cookie()?
            .split(';')
            .next()?
            .strip_prefix("session=")
            .map(str::to_string)
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router should respond");
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body should be readable")
            .to_bytes();
        let body = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));

        TestResponse { status, headers, body }
    }

    pub async fn json(&self, method: Method, uri: &str, body: Value) -> TestResponse {
        self.send(json_request(method, uri, body)).await
    }

    /// Signs up `email`, returning the uid and the session cookie.
    pub async fn sign_up(&self, email: &str, password: &str) -> (String, String) {
        let response = self
            .json(
                Method::POST,
                "/api/sign-up",
                serde_json::json!({ "credentials": { "email": email, "password": password } }),
            )
            .await;

        assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);

        (
            response.body["user"].as_str().unwrap_or_default().to_string(),
            response.session_cookie().expect("sign-up should set the session cookie"),
        )
    }
}

pub fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request should build")
}

pub fn from_client(mut request: Request<Body>, ip: [u8; 4]) -> Request<Body> {
    request
        .extensions_mut()
        .insert(ConnectInfo(SocketAddr::from((ip, 40000))));
    request
}

/// Builds a multipart body from `(name, file name, content)` parts.
pub fn multipart_request(uri: &str, parts: &[(&str, Option<&str>, &str)]) -> Request<Body> {
    let mut body = String::new();

    for (name, file_name, content) in parts {
        body.push_str(&format!("--{BOUNDARY}\r\n"));
        match file_name {
            Some(file_name) => body.push_str(&format!(
                "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: text/plain\r\n\r\n"
            )),
            None => body.push_str(&format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n")),
        }
        body.push_str(content);
        body.push_str("\r\n");
    }
    body.push_str(&format!("--{BOUNDARY}--\r\n"));

    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
        .body(Body::from(body))
        .expect("request should build")
}
