//! `message-api` — service binary entry point.
//!
//! Startup sequence:
//! 1. Load and validate [`Config`] from environment variables.
//! 2. Initialise structured logging.
//! 3. Open the sealed identity and trust stores.
//! 4. Build the mutual-TLS client context.
//! 5. Configure the shared MongoDB client.
//! 6. Build the Axum router and serve until a shutdown signal.
//! 7. Shut down the MongoDB client.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use message_api::config::Config;
use message_api::db::{DatabaseHandle, MongoMessageStore};
use message_api::keystore::KeyStore;
use message_api::server::{self, state::AppState};
use message_api::telemetry;
use message_api::tls::TlsContext;

#[tokio::main]
async fn main() -> Result<()> {
    // -----------------------------------------------------------------------
    // 1. Configuration
    // -----------------------------------------------------------------------
    let cfg = Config::from_env().map_err(|e| {
        // Logging is not yet up; write to stderr directly.
        eprintln!("ERROR: configuration invalid: {e:#}");
        e
    })?;

    // -----------------------------------------------------------------------
    // 2. Telemetry
    // -----------------------------------------------------------------------
    telemetry::init(&cfg.log_level)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        http_port = cfg.http_port,
        "message-api starting"
    );

    // -----------------------------------------------------------------------
    // 3. Credentials
    // -----------------------------------------------------------------------
    let identity = KeyStore::load(&cfg.keystore_path, &cfg.keystore_passphrase)
        .context("failed to load client identity store")?;
    let trust = KeyStore::load(&cfg.truststore_path, &cfg.truststore_passphrase)
        .context("failed to load trust store")?;

    // -----------------------------------------------------------------------
    // 4. TLS context
    // -----------------------------------------------------------------------
    let tls = TlsContext::build(&identity, &trust).context("failed to build TLS context")?;
    drop((identity, trust));
    info!(trust_anchors = tls.anchor_count(), "TLS context ready");

    // -----------------------------------------------------------------------
    // 5. Database client
    // -----------------------------------------------------------------------
    let handle = DatabaseHandle::connect(&cfg.mongodb_uri, &cfg.mongodb_database, tls)
        .await
        .context("failed to configure database client")?;
    let store = MongoMessageStore::new(handle.clone(), &cfg.mongodb_collection);

    // -----------------------------------------------------------------------
    // 6. HTTP server
    // -----------------------------------------------------------------------
    let router = server::router::build(AppState::new(Arc::new(store)));
    let addr: std::net::SocketAddr = ([0, 0, 0, 0], cfg.http_port).into();
    let served = server::serve(addr, router).await;

    // -----------------------------------------------------------------------
    // 7. Teardown
    // -----------------------------------------------------------------------
    handle.shutdown().await;
    served
}
