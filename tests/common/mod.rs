// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::Body;
use axum::http::Request;
use lead_calendar_sync::config::Config;
use lead_calendar_sync::db::{FirestoreStore, MemoryStore};
use lead_calendar_sync::models::{AccountHandle, RefreshMethod, TokenRecord};
use lead_calendar_sync::routes::create_router;
use lead_calendar_sync::time_utils::now_epoch_millis;
use lead_calendar_sync::AppState;
use std::sync::Arc;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a Firestore store against the emulator.
#[allow(dead_code)]
pub async fn test_firestore() -> FirestoreStore {
    FirestoreStore::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Config with every provider endpoint pointed at `base` (a wiremock server).
#[allow(dead_code)]
pub fn test_config(base: &str) -> Config {
    let mut config = Config::default();

    config.google.auth_url = format!("{}/o/oauth2/v2/auth", base);
    config.google.token_url = format!("{}/google/token", base);
    config.google.revoke_url = format!("{}/google/revoke", base);
    config.google.api_base = format!("{}/calendar/v3", base);

    config.outlook.authority_host = base.to_string();
    config.outlook.graph_base = format!("{}/v1.0", base);

    config
}

/// Create a test app backed by an in-memory store.
/// Returns the router, the shared state and the store for seeding.
#[allow(dead_code)]
pub fn create_test_app(config: Config) -> (axum::Router, Arc<AppState>, MemoryStore) {
    let store = MemoryStore::new();
    let state = Arc::new(AppState::new(
        config,
        reqwest::Client::new(),
        Arc::new(store.clone()),
        Arc::new(dashmap::DashMap::new()),
    ));

    (create_router(state.clone()), state, store)
}

/// Google record with the given access token and expiry offset from now.
#[allow(dead_code)]
pub fn google_record(user_id: &str, access_token: &str, expires_in_millis: i64) -> TokenRecord {
    TokenRecord {
        user_id: user_id.to_string(),
        user_email: format!("{}@agence.fr", user_id),
        agency_id: "agency-1".to_string(),
        access_token: access_token.to_string(),
        refresh: RefreshMethod::GoogleRefreshToken("R1".to_string()),
        expiry_epoch_millis: now_epoch_millis() + expires_in_millis,
        id_token: None,
        updated_at: "2025-06-01T14:00:00Z".to_string(),
    }
}

/// Outlook record whose account handle names `home_account_id`.
#[allow(dead_code)]
pub fn outlook_record(
    user_id: &str,
    access_token: &str,
    expires_in_millis: i64,
    home_account_id: &str,
) -> TokenRecord {
    TokenRecord {
        user_id: user_id.to_string(),
        user_email: format!("{}@agence.fr", user_id),
        agency_id: "agency-1".to_string(),
        access_token: access_token.to_string(),
        refresh: RefreshMethod::OutlookAccountHandle(AccountHandle {
            home_account_id: home_account_id.to_string(),
            environment: "login.microsoftonline.com".to_string(),
            tenant_id: "tenant-1".to_string(),
            username: None,
        }),
        expiry_epoch_millis: now_epoch_millis() + expires_in_millis,
        id_token: None,
        updated_at: "2025-06-01T14:00:00Z".to_string(),
    }
}

/// JSON POST request.
#[allow(dead_code)]
pub fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Read a response body as JSON.
#[allow(dead_code)]
pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Read a response body as text.
#[allow(dead_code)]
pub async fn body_text(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
