// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Microsoft identity platform and Graph calendar client.
//!
//! Outlook sign-ins do not hand a refresh token to the rest of the
//! application. The client keeps it in an in-process account cache keyed by
//! home account id, and callers only ever hold an [`AccountHandle`]. A new
//! access token is obtained with [`OutlookClient::acquire_token_silent`],
//! which fails once the cached account is gone (process restart, revoked
//! consent), at which point the user has to sign in again.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use dashmap::DashMap;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use super::{describe_failure, REMINDER_OFFSETS_MINUTES};
use crate::config::OutlookConfig;
use crate::error::AppError;
use crate::models::{AccountHandle, CalendarEventRef, EventDetails};
use crate::services::oauth_state::OAuthState;
use crate::time_utils::now_epoch_millis;

const SCOPES: &[&str] = &[
    "offline_access",
    "openid",
    "profile",
    "User.Read",
    "Calendars.ReadWrite",
];

/// Used when the token endpoint omits `expires_in`.
// TODO: drop the fallback once Microsoft confirms `expires_in` is always sent
// for v2.0 code and refresh grants.
const DEFAULT_EXPIRES_IN_MILLIS: i64 = 3_600_000;

/// Refresh credential held on behalf of a signed-in account.
#[derive(Clone)]
pub struct CachedAccount {
    pub account: AccountHandle,
    refresh_token: String,
}

/// Shared account cache type for use in AppState.
pub type AccountCache = Arc<DashMap<String, CachedAccount>>;

/// Result of a successful token acquisition.
#[derive(Debug, Clone)]
pub struct AuthenticationResult {
    pub access_token: String,
    pub id_token: Option<String>,
    pub account: AccountHandle,
    pub expiry_epoch_millis: i64,
}

/// Why a silent acquisition failed.
#[derive(Debug, thiserror::Error)]
pub enum SilentFlowError {
    #[error("no cached account for {0}")]
    NoCachedAccount(String),

    #[error("interaction required: {0}")]
    InteractionRequired(String),

    #[error("token request failed: {0}")]
    Request(String),
}

#[derive(Debug, Deserialize)]
struct MicrosoftTokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    id_token: Option<String>,
    #[serde(default)]
    client_info: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ClientInfo {
    uid: String,
    utid: String,
}

#[derive(Debug, Default, Deserialize)]
struct IdTokenClaims {
    #[serde(default)]
    oid: Option<String>,
    #[serde(default)]
    tid: Option<String>,
    #[serde(default)]
    preferred_username: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphEventResponse {
    id: String,
    #[serde(default)]
    web_link: Option<String>,
}

/// Confidential client for one tenant, built per request.
#[derive(Clone)]
pub struct OutlookClient {
    http: reqwest::Client,
    config: OutlookConfig,
    accounts: AccountCache,
}

impl OutlookClient {
    /// Build a client, failing if any credential is unset.
    pub fn from_config(
        config: &OutlookConfig,
        http: reqwest::Client,
        accounts: AccountCache,
    ) -> Result<Self, AppError> {
        if config.client_id.is_empty() {
            return Err(AppError::ConfigurationMissing("OUTLOOK_CLIENT_ID"));
        }
        if config.client_secret.is_empty() {
            return Err(AppError::ConfigurationMissing("OUTLOOK_CLIENT_SECRET"));
        }
        if config.redirect_uri.is_empty() {
            return Err(AppError::ConfigurationMissing("OUTLOOK_REDIRECT_URI"));
        }

        Ok(Self {
            http,
            config: config.clone(),
            accounts,
        })
    }

    fn authority(&self) -> String {
        format!("{}/{}", self.config.authority_host, self.config.tenant_id)
    }

    fn token_url(&self) -> String {
        format!("{}/oauth2/v2.0/token", self.authority())
    }

    /// Consent URL requesting `offline_access` with a forced consent prompt.
    pub fn auth_url(&self, state: &OAuthState) -> String {
        format!(
            "{}/oauth2/v2.0/authorize?\
             client_id={}&\
             response_type=code&\
             redirect_uri={}&\
             response_mode=query&\
             scope={}&\
             prompt=consent&\
             client_info=1&\
             state={}",
            self.authority(),
            urlencoding::encode(&self.config.client_id),
            urlencoding::encode(&self.config.redirect_uri),
            urlencoding::encode(&SCOPES.join(" ")),
            urlencoding::encode(&state.encode()),
        )
    }

    /// Exchange an authorization code; caches the account for silent use.
    pub async fn acquire_token_by_code(
        &self,
        code: &str,
    ) -> Result<AuthenticationResult, AppError> {
        let scope = SCOPES.join(" ");
        let response = self
            .http
            .post(self.token_url())
            .form(&[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("code", code),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
                ("scope", scope.as_str()),
                ("client_info", "1"),
            ])
            .send()
            .await
            .map_err(|e| AppError::ProviderRequestFailed(format!("Token exchange failed: {}", e)))?;

        if !response.status().is_success() {
            let failure = describe_failure(response).await;
            tracing::error!(error = %failure, "Microsoft token exchange failed");
            return Err(AppError::ProviderRequestFailed(format!(
                "Token exchange failed: {}",
                failure
            )));
        }

        let body: MicrosoftTokenResponse = response.json().await.map_err(|e| {
            AppError::ProviderRequestFailed(format!("Failed to parse token response: {}", e))
        })?;

        let account = self
            .account_from_response(&body, None)
            .ok_or_else(|| {
                AppError::ProviderRequestFailed(
                    "Token response did not identify the signed-in account".to_string(),
                )
            })?;

        match &body.refresh_token {
            Some(refresh_token) => {
                self.accounts.insert(
                    account.home_account_id.clone(),
                    CachedAccount {
                        account: account.clone(),
                        refresh_token: refresh_token.clone(),
                    },
                );
            }
            None => tracing::warn!(
                home_account_id = %account.home_account_id,
                "No refresh token issued; silent renewal will not be possible"
            ),
        }

        Ok(into_result(body, account))
    }

    /// Obtain a new access token for a previously signed-in account without
    /// user interaction.
    pub async fn acquire_token_silent(
        &self,
        account: &AccountHandle,
    ) -> Result<AuthenticationResult, SilentFlowError> {
        let cached = self
            .accounts
            .get(&account.home_account_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| SilentFlowError::NoCachedAccount(account.home_account_id.clone()))?;

        let scope = SCOPES.join(" ");
        let response = self
            .http
            .post(self.token_url())
            .form(&[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("refresh_token", cached.refresh_token.as_str()),
                ("grant_type", "refresh_token"),
                ("scope", scope.as_str()),
                ("client_info", "1"),
            ])
            .send()
            .await
            .map_err(|e| SilentFlowError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let failure = describe_failure(response).await;
            if status.is_client_error() {
                // invalid_grant and friends: the cached session is dead.
                self.accounts.remove(&account.home_account_id);
                return Err(SilentFlowError::InteractionRequired(failure));
            }
            return Err(SilentFlowError::Request(failure));
        }

        let body: MicrosoftTokenResponse = response
            .json()
            .await
            .map_err(|e| SilentFlowError::Request(format!("JSON parse error: {}", e)))?;

        let refreshed = self
            .account_from_response(&body, Some(&cached.account))
            .unwrap_or_else(|| cached.account.clone());

        let refresh_token = body
            .refresh_token
            .clone()
            .unwrap_or_else(|| cached.refresh_token.clone());
        self.accounts.insert(
            refreshed.home_account_id.clone(),
            CachedAccount {
                account: refreshed.clone(),
                refresh_token,
            },
        );

        Ok(into_result(body, refreshed))
    }

    /// Forget a signed-in account. Returns whether it was cached.
    pub fn remove_account(&self, account: &AccountHandle) -> bool {
        self.accounts.remove(&account.home_account_id).is_some()
    }

    /// Create an event in the signed-in user's default calendar.
    pub async fn create_event(
        &self,
        access_token: &str,
        details: &EventDetails,
        time_zone: &str,
    ) -> Result<CalendarEventRef, AppError> {
        let url = format!("{}/me/events", self.config.graph_base);

        // Graph supports a single reminder per event; use the nearest one.
        let body = json!({
            "subject": details.title,
            "body": { "contentType": "HTML", "content": details.description },
            "start": { "dateTime": details.start_date_time, "timeZone": time_zone },
            "end": { "dateTime": details.end_date_time, "timeZone": time_zone },
            "isReminderOn": true,
            "reminderMinutesBeforeStart": REMINDER_OFFSETS_MINUTES[0],
        });

        let response = self
            .http
            .post(&url)
            .bearer_auth(access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::ProviderRequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AppError::ProviderRequestFailed(
                describe_failure(response).await,
            ));
        }

        let event: GraphEventResponse = response.json().await.map_err(|e| {
            AppError::ProviderRequestFailed(format!("JSON parse error: {}", e))
        })?;

        Ok(CalendarEventRef {
            provider_event_id: event.id,
            html_link: event.web_link.unwrap_or_default(),
        })
    }

    /// Delete an event by Graph id.
    pub async fn delete_event(&self, access_token: &str, event_id: &str) -> Result<(), AppError> {
        let url = format!(
            "{}/me/events/{}",
            self.config.graph_base,
            urlencoding::encode(event_id)
        );

        let response = self
            .http
            .delete(&url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AppError::ProviderRequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AppError::ProviderRequestFailed(
                describe_failure(response).await,
            ));
        }
        Ok(())
    }

    /// Derive the account from `client_info`, falling back to id token
    /// claims, then to `previous`.
    fn account_from_response(
        &self,
        body: &MicrosoftTokenResponse,
        previous: Option<&AccountHandle>,
    ) -> Option<AccountHandle> {
        let claims = body
            .id_token
            .as_deref()
            .and_then(decode_id_token_claims)
            .unwrap_or_default();

        let (uid, utid) = match body.client_info.as_deref().and_then(decode_client_info) {
            Some(info) => (info.uid, info.utid),
            None => match (claims.oid.clone(), claims.tid.clone()) {
                (Some(oid), Some(tid)) => (oid, tid),
                _ => return previous.cloned(),
            },
        };

        let environment = self
            .config
            .authority_host
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .trim_end_matches('/')
            .to_string();

        Some(AccountHandle {
            home_account_id: format!("{}.{}", uid, utid),
            environment,
            tenant_id: utid,
            username: claims
                .preferred_username
                .or_else(|| previous.and_then(|p| p.username.clone())),
        })
    }
}

fn into_result(body: MicrosoftTokenResponse, account: AccountHandle) -> AuthenticationResult {
    let expires_in_millis = match body.expires_in {
        Some(secs) => secs.saturating_mul(1000),
        None => {
            tracing::debug!("Token response has no expires_in, assuming one hour");
            DEFAULT_EXPIRES_IN_MILLIS
        }
    };

    AuthenticationResult {
        access_token: body.access_token,
        id_token: body.id_token,
        account,
        expiry_epoch_millis: now_epoch_millis().saturating_add(expires_in_millis),
    }
}

fn decode_base64_json<T: for<'de> Deserialize<'de>>(segment: &str) -> Option<T> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment.trim_end_matches('='))
        .ok()?;
    serde_json::from_slice(&bytes).ok()
}

fn decode_client_info(client_info: &str) -> Option<ClientInfo> {
    decode_base64_json(client_info)
}

/// Read id token claims. The token came straight from the token endpoint
/// over TLS, so the signature is not checked here.
fn decode_id_token_claims(id_token: &str) -> Option<IdTokenClaims> {
    let payload = id_token.split('.').nth(1)?;
    decode_base64_json(payload)
}
