//! `stash` — card, ticket and bill storage service.
//!
//! Startup sequence:
//! 1. Load and validate [`Config`] from environment variables.
//! 2. Initialise the telemetry pipeline (tracing + optional OTLP export).
//! 3. Build the [`KeyProvider`] for the configured derivation mode.
//! 4. Build the Axum router and start the HTTP server.

mod cards;
mod config;
mod crypto;
mod keys;
mod records;
mod server;
mod store;
mod telemetry;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use cards::CardCodec;
use config::Config;
use keys::{KeyDerivation, KeyProvider};
use server::state::AppState;
use store::{MemoryPersistence, SecureCardStore};

#[tokio::main]
async fn main() -> Result<()> {
    // -----------------------------------------------------------------------
    // 1. Configuration
    // -----------------------------------------------------------------------
    let cfg = Config::from_env().map_err(|e| {
        // Telemetry is not yet up; write to stderr directly.
        eprintln!("ERROR: configuration invalid: {e:#}");
        e
    })?;

    // -----------------------------------------------------------------------
    // 2. Telemetry
    // -----------------------------------------------------------------------
    telemetry::init_telemetry(cfg.otel_exporter_otlp_endpoint.as_deref(), &cfg.log_level)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        listen_port = cfg.listen_port,
        key_derivation = cfg.key_derivation.as_str(),
        "stash starting"
    );

    // -----------------------------------------------------------------------
    // 3. Field keys
    // -----------------------------------------------------------------------
    let keys = KeyProvider::from_config(cfg.key_derivation, cfg.key_derivation_secret.as_deref())
        .context("failed to initialise key provider")?;
    if keys.derivation() == KeyDerivation::Legacy {
        warn!("legacy key derivation enabled: field keys are computable from user ids alone");
    }

    // -----------------------------------------------------------------------
    // 4. HTTP server
    // -----------------------------------------------------------------------
    let cards = SecureCardStore::new(Arc::new(MemoryPersistence::new()));
    let state = AppState::new(CardCodec::new(keys), cards, cfg.user_header_name.clone());
    let router = server::router::build(state);

    let addr: std::net::SocketAddr = ([0, 0, 0, 0], cfg.listen_port).into();
    info!(addr = %addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, router).await?;

    Ok(())
}
