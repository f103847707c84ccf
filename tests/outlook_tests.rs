// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Outlook sign-in and silent token renewal.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use lead_calendar_sync::db::TokenStore;
use lead_calendar_sync::error::AppError;
use lead_calendar_sync::models::{Provider, RefreshMethod};
use lead_calendar_sync::services::tokens::OUTLOOK_RECONNECT_MESSAGE;
use lead_calendar_sync::services::OAuthState;
use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod common;
use common::{create_test_app, outlook_record, test_config};

const TOKEN_PATH: &str = "/common/oauth2/v2.0/token";

fn b64(value: serde_json::Value) -> String {
    URL_SAFE_NO_PAD.encode(serde_json::to_vec(&value).unwrap())
}

async fn mount_code_exchange(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=code-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token_type": "Bearer",
            "access_token": "OA1",
            "expires_in": 3600,
            "refresh_token": "ORT1",
            "id_token": format!(
                "eyJhbGciOiJub25lIn0.{}.sig",
                b64(json!({"oid": "uid-1", "tid": "tenant-1", "preferred_username": "agent@agence.fr"}))
            ),
            "client_info": b64(json!({"uid": "uid-1", "utid": "tenant-1"})),
        })))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_sign_in_then_silent_refresh() {
    let server = MockServer::start().await;
    mount_code_exchange(&server).await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=ORT1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "OA2",
            "expires_in": 3600,
            "refresh_token": "ORT2"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (_app, state, store) = create_test_app(test_config(&server.uri()));
    let oauth_state = OAuthState::new("u1", "agent@agence.fr", "agency-1", Some(Provider::Outlook));

    let record = state
        .tokens
        .handle_oauth_callback(Provider::Outlook, "code-1", &oauth_state)
        .await
        .unwrap();

    assert_eq!(record.access_token, "OA1");
    assert!(record.id_token.is_some());
    let account = match &record.refresh {
        RefreshMethod::OutlookAccountHandle(account) => account.clone(),
        other => panic!("expected account handle, got {:?}", other),
    };
    assert_eq!(account.home_account_id, "uid-1.tenant-1");
    assert_eq!(account.username.as_deref(), Some("agent@agence.fr"));

    // The refresh token never reaches the store
    let stored_json = serde_json::to_string(&store.get(Provider::Outlook, "u1").await.unwrap())
        .unwrap();
    assert!(!stored_json.contains("ORT1"));

    // Age the record past expiry
    let mut expired = record.clone();
    expired.expiry_epoch_millis = 0;
    store.put(&expired).await.unwrap();

    let token = state
        .tokens
        .get_valid_access_token(Provider::Outlook, "u1")
        .await
        .unwrap();
    assert_eq!(token, "OA2");

    let stored = store.get(Provider::Outlook, "u1").await.unwrap().unwrap();
    assert_eq!(stored.access_token, "OA2");
    assert_eq!(stored.refresh, RefreshMethod::OutlookAccountHandle(account));
    // Kept from the sign-in
    assert_eq!(stored.id_token, record.id_token);
}

#[tokio::test]
async fn test_unknown_account_needs_reconnect() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let (_app, state, store) = create_test_app(test_config(&server.uri()));
    store
        .put(&outlook_record("u1", "OA1", -1000, "gone.tenant-1"))
        .await
        .unwrap();

    let err = state
        .tokens
        .get_valid_access_token(Provider::Outlook, "u1")
        .await
        .unwrap_err();

    match &err {
        AppError::RefreshFailed(msg) => assert_eq!(msg, OUTLOOK_RECONNECT_MESSAGE),
        other => panic!("expected RefreshFailed, got {:?}", other),
    }
    assert!(err.requires_reconnect());
}

#[tokio::test]
async fn test_rejected_silent_refresh_drops_cached_account() {
    let server = MockServer::start().await;
    mount_code_exchange(&server).await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("grant_type=refresh_token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "AADSTS70000: The user could not be authenticated."
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (_app, state, store) = create_test_app(test_config(&server.uri()));
    let oauth_state = OAuthState::new("u1", "agent@agence.fr", "agency-1", None);
    let mut record = state
        .tokens
        .handle_oauth_callback(Provider::Outlook, "code-1", &oauth_state)
        .await
        .unwrap();
    record.expiry_epoch_millis = 0;
    store.put(&record).await.unwrap();

    for _ in 0..2 {
        // Second attempt fails locally, without another token request
        let err = state
            .tokens
            .get_valid_access_token(Provider::Outlook, "u1")
            .await
            .unwrap_err();
        match err {
            AppError::RefreshFailed(msg) => assert_eq!(msg, OUTLOOK_RECONNECT_MESSAGE),
            other => panic!("expected RefreshFailed, got {:?}", other),
        }
    }
}

#[tokio::test]
async fn test_fresh_outlook_token_is_returned_as_is() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let (_app, state, store) = create_test_app(test_config(&server.uri()));
    store
        .put(&outlook_record("u1", "OA1", 3_600_000, "uid-1.tenant-1"))
        .await
        .unwrap();

    let token = state
        .tokens
        .get_valid_access_token(Provider::Outlook, "u1")
        .await
        .unwrap();
    assert_eq!(token, "OA1");
}

#[tokio::test]
async fn test_failed_code_exchange_stores_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "AADSTS54005: OAuth2 Authorization code was already redeemed."
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (_app, state, store) = create_test_app(test_config(&server.uri()));
    let oauth_state = OAuthState::new("u1", "agent@agence.fr", "agency-1", None);

    let err = state
        .tokens
        .handle_oauth_callback(Provider::Outlook, "used-code", &oauth_state)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ProviderRequestFailed(_)));
    assert!(store.get(Provider::Outlook, "u1").await.unwrap().is_none());
}
