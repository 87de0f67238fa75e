// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use relational_market_server::{
    api::router,
    blockchain::{address_from_private_key, generate_private_key},
    config::{Config, LogFormat, DEFAULT_LOG_FILTER},
    state::AppState,
    storage::{DatabaseStorage, MemoryStorage, Storage},
};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn init_logging(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .init(),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() {
    let config = Config::from_env().expect("Invalid configuration");
    init_logging(config.log_format);

    let storage: Arc<dyn Storage> = match &config.database_path {
        Some(path) => {
            tracing::info!(path = %path.display(), "Opening redb storage");
            Arc::new(DatabaseStorage::open(path).expect("Failed to open database"))
        }
        None => {
            tracing::warn!("DATABASE_PATH not set; data is kept in memory only");
            Arc::new(MemoryStorage::new())
        }
    };

    let service_key = match config.service_wallet_key.clone() {
        Some(key) => key,
        None => {
            tracing::warn!("SERVICE_WALLET_KEY not set; generating an ephemeral service wallet");
            generate_private_key().expect("Failed to generate service wallet key")
        }
    };
    let service_address =
        address_from_private_key(&service_key).expect("Invalid service wallet key");

    let state = AppState::new(storage, service_address.clone());
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .expect("Failed to bind listener");

    tracing::info!(
        addr = %config.bind_addr,
        service_address = %service_address,
        "Relational Market server listening (docs at /docs)"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("HTTP server failed");
}
