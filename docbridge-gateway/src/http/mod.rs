//! HTTP surface: `/healthz` and the `/api` routes.

pub mod handlers;
pub mod schemas;

use std::{net::SocketAddr, sync::Arc};

use axum::{
    Router,
    extract::{ConnectInfo, DefaultBodyLimit, Request, State},
    http::{HeaderName, HeaderValue, Method, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
};
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use docbridge::{blob::BlobStorage, identity::IdentityProvider, store::DocumentStore};

use crate::{
    config::GatewayConfig,
    credentials::CredentialExchange,
    deadline::Deadline,
    error::ApiError,
    files::FileService,
    mutation::MutationGateway,
    rate_limit::{RateDecision, RateLimiter},
    reader::CollectionReader,
    revocation::SessionRevocation,
};

const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");

#[derive(Debug, Clone)]
pub struct AppState {
    pub reader: CollectionReader,
    pub mutations: MutationGateway,
    pub credentials: CredentialExchange,
    pub revocation: SessionRevocation,
    pub files: FileService,
    pub rate_limiter: RateLimiter,
    pub cookie_secure: bool,
}

impl AppState {
    pub fn new(
        config: &GatewayConfig,
        store: DocumentStore,
        identity: Arc<dyn IdentityProvider>,
        blobs: Arc<dyn BlobStorage>,
    ) -> Self {
        let deadline = Deadline::new(config.upstream_timeout());

        Self {
            reader: CollectionReader::new(store.clone(), deadline),
            mutations: MutationGateway::new(store.clone(), deadline),
            credentials: CredentialExchange::new(identity.clone(), store, deadline),
            revocation: SessionRevocation::new(identity, deadline),
            files: FileService::new(blobs, config.file_url_base.clone(), deadline),
            rate_limiter: RateLimiter::new(
                config.rate_limit_max,
                config.rate_limit_window(),
                config.rate_limit_max_keys,
            ),
            cookie_secure: config.cookie_secure,
        }
    }
}

pub fn router(config: &GatewayConfig, state: AppState) -> Router {
    let api = Router::new()
        .route("/get-collection", get(handlers::get_collection))
        .route("/get-object", get(handlers::get_object))
        .route("/create-object", post(handlers::create_object))
        .route("/update-object", put(handlers::update_object))
        .route("/delete-object", delete(handlers::delete_object))
        .route("/upload-file", post(handlers::upload_file))
        .route("/delete-file", post(handlers::delete_file))
        .route("/sign-in", post(handlers::sign_in))
        .route("/sign-up", post(handlers::sign_up))
        .route("/sign-out", post(handlers::sign_out))
        .route("/reset-password", post(handlers::reset_password))
        .route("/update-user", post(handlers::update_user))
        .route_layer(middleware::from_fn_with_state(state.clone(), rate_limit));

    Router::new()
        .route("/healthz", get(handlers::healthz))
        .nest("/api", api)
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(cors_layer(&config.cors_origins))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[HeaderValue]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE]);

    if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer
            .allow_origin(AllowOrigin::list(origins.iter().cloned()))
            .allow_credentials(true)
    }
}

/// Counts the request against its client IP and answers 429 once the window is spent.
async fn rate_limit(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if !state.rate_limiter.is_enabled() {
        return next.run(request).await;
    }

    let client = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string());
    let decision = state.rate_limiter.check(&client);

    let mut response = if decision.allowed {
        next.run(request).await
    } else {
        tracing::warn!(client = %client, "rate limit exceeded");

        let mut response = ApiError::RateLimited.into_response();
        response.headers_mut().insert(
            header::RETRY_AFTER,
            HeaderValue::from(decision.reset_after.as_secs().max(1)),
        );
        response
    };

    insert_rate_headers(&mut response, &decision);
    response
}

fn insert_rate_headers(response: &mut Response, decision: &RateDecision) {
    let headers = response.headers_mut();

    headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(decision.limit));
    headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(decision.remaining));
}
