use std::{net::SocketAddr, sync::Arc};

use docbridge::{
    memory::{InMemoryBlobStorage, InMemoryIdentityProvider, InMemoryStore},
    store::DocumentStore,
};
use docbridge_gateway::{
    config::{GatewayConfig, StartupError, StoreBackendKind},
    http,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = match GatewayConfig::load() {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("STARTUP_ERROR {}", err);
            std::process::exit(1);
        }
    };

    let store = match build_store(&config).await {
        Ok(store) => store,
        Err(err) => {
            eprintln!("STARTUP_ERROR {}", err);
            std::process::exit(1);
        }
    };

    tracing::warn!("identity provider and blob storage are in-memory; state is lost on restart");

    let state = http::AppState::new(
        &config,
        store.clone(),
        Arc::new(InMemoryIdentityProvider::new()),
        Arc::new(InMemoryBlobStorage::new(config.storage_bucket.clone())),
    );
    let app = http::router(&config, state);

    let listener = match tokio::net::TcpListener::bind(config.bind_addr).await {
        Ok(listener) => listener,
        Err(_) => {
            eprintln!("STARTUP_ERROR ERR_BIND_FAILED: failed to bind gateway listener");
            std::process::exit(1);
        }
    };

    tracing::info!(bind_addr = %config.bind_addr, backend = ?config.store_backend, "docbridge-gateway listening");

    if let Err(err) = axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        eprintln!("STARTUP_ERROR ERR_SERVER_FAILED: {}", err);
        std::process::exit(1);
    }

    if let Err(err) = store.shutdown().await {
        tracing::warn!(code = %err.code(), error = %err, "store shutdown failed");
    }
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        tracing::warn!("failed to listen for ctrl-c; running until killed");
        std::future::pending::<()>().await;
    }

    tracing::info!("shutting down");
}

async fn build_store(config: &GatewayConfig) -> Result<DocumentStore, StartupError> {
    match config.store_backend {
        StoreBackendKind::Memory => Ok(DocumentStore::new(InMemoryStore::new())),
        #[cfg(feature = "mongodb")]
        StoreBackendKind::MongoDb => {
            use docbridge::{backend::StoreBackendBuilder, mongodb::MongoDbStore};

            let uri = config.mongodb_uri.as_deref().unwrap_or_default();

            MongoDbStore::builder(uri, &config.mongodb_database)
                .build()
                .await
                .map(DocumentStore::new)
                .map_err(|err| StartupError {
                    code: "ERR_STORE_INIT",
                    message: err.to_string(),
                })
        }
        #[cfg(not(feature = "mongodb"))]
        StoreBackendKind::MongoDb => Err(StartupError {
            code: "ERR_INVALID_CONFIG",
            message: "DOCBRIDGE_STORE_BACKEND=mongodb requires building with the mongodb feature".to_string(),
        }),
    }
}
