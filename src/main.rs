// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Lead-Calendar-Sync API Server
//!
//! Connects agents' Google and Outlook calendars to the lead dashboard and
//! syncs scheduled visits into them.

use lead_calendar_sync::{
    config::{Config, TokenStoreKind},
    db::{FirestoreStore, JsonFileStore, TokenStore},
    services::build_http_client,
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging()?;

    let config = Config::from_env()?;
    tracing::info!(port = config.port, "Starting Lead-Calendar-Sync API");

    // Fail fast on half-configured providers
    let enabled = config.validate()?;
    for provider in ["google", "outlook"] {
        if !enabled.contains(&provider) {
            tracing::warn!(provider, "No credentials configured, provider disabled");
        }
    }

    let store: Arc<dyn TokenStore> = match config.token_store {
        TokenStoreKind::JsonFile => Arc::new(JsonFileStore::new(&config.token_store_dir).await?),
        TokenStoreKind::Firestore => Arc::new(FirestoreStore::new(&config.gcp_project_id).await?),
    };

    let http = build_http_client(&config)?;

    // Outlook account cache lives for the whole process
    let outlook_accounts = Arc::new(dashmap::DashMap::new());
    tracing::info!("Outlook account cache initialized");

    let state = Arc::new(AppState::new(config.clone(), http, store, outlook_accounts));

    // Build router
    let app = lead_calendar_sync::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("lead_calendar_sync=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
