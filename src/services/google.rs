// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google OAuth and Calendar v3 client.
//!
//! Handles:
//! - Consent URL with offline access
//! - Authorization code exchange and refresh-token grants
//! - Token revocation on disconnect
//! - Creating and deleting events in the primary calendar

use serde::Deserialize;
use serde_json::json;

use super::{describe_failure, REMINDER_OFFSETS_MINUTES};
use crate::config::GoogleConfig;
use crate::error::AppError;
use crate::models::{CalendarEventRef, EventDetails};
use crate::services::oauth_state::OAuthState;
use crate::time_utils::now_epoch_millis;

const SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/calendar",
    "https://www.googleapis.com/auth/calendar.events",
];

/// Google API client, built per request from static configuration.
#[derive(Clone)]
pub struct GoogleClient {
    http: reqwest::Client,
    config: GoogleConfig,
}

/// Tokens returned by the Google token endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoogleTokens {
    pub access_token: String,
    /// Only present on the first consent and when Google rotates it.
    pub refresh_token: Option<String>,
    pub expiry_epoch_millis: i64,
}

#[derive(Debug, Deserialize)]
struct GoogleTokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
}

impl GoogleTokenResponse {
    fn into_tokens(self) -> GoogleTokens {
        let expires_in = self.expires_in.unwrap_or(3600);
        GoogleTokens {
            access_token: self.access_token,
            refresh_token: self.refresh_token.filter(|t| !t.is_empty()),
            expiry_epoch_millis: now_epoch_millis().saturating_add(expires_in.saturating_mul(1000)),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleEventResponse {
    id: String,
    #[serde(default)]
    html_link: Option<String>,
}

impl GoogleClient {
    /// Build a client, failing if any credential is unset.
    pub fn from_config(config: &GoogleConfig, http: reqwest::Client) -> Result<Self, AppError> {
        if config.client_id.is_empty() {
            return Err(AppError::ConfigurationMissing("GOOGLE_CLIENT_ID"));
        }
        if config.client_secret.is_empty() {
            return Err(AppError::ConfigurationMissing("GOOGLE_CLIENT_SECRET"));
        }
        if config.redirect_uri.is_empty() {
            return Err(AppError::ConfigurationMissing("GOOGLE_REDIRECT_URI"));
        }

        Ok(Self {
            http,
            config: config.clone(),
        })
    }

    /// Consent URL. `prompt=consent` makes Google issue a refresh token even
    /// for users who already authorized the app.
    pub fn auth_url(&self, state: &OAuthState) -> String {
        format!(
            "{}?\
             client_id={}&\
             redirect_uri={}&\
             response_type=code&\
             scope={}&\
             access_type=offline&\
             prompt=consent&\
             state={}",
            self.config.auth_url,
            urlencoding::encode(&self.config.client_id),
            urlencoding::encode(&self.config.redirect_uri),
            urlencoding::encode(&SCOPES.join(" ")),
            urlencoding::encode(&state.encode()),
        )
    }

    /// Exchange an authorization code for the initial token set.
    pub async fn exchange_code(&self, code: &str) -> Result<GoogleTokens, AppError> {
        let response = self
            .http
            .post(&self.config.token_url)
            .form(&[
                ("code", code),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(|e| AppError::ProviderRequestFailed(format!("Token exchange failed: {}", e)))?;

        if !response.status().is_success() {
            let failure = describe_failure(response).await;
            tracing::error!(error = %failure, "Google token exchange failed");
            return Err(AppError::ProviderRequestFailed(format!(
                "Token exchange failed: {}",
                failure
            )));
        }

        let body: GoogleTokenResponse = response.json().await.map_err(|e| {
            AppError::ProviderRequestFailed(format!("Failed to parse token response: {}", e))
        })?;
        Ok(body.into_tokens())
    }

    /// Mint a new access token from a refresh token.
    pub async fn refresh_access_token(
        &self,
        refresh_token: &str,
    ) -> Result<GoogleTokens, AppError> {
        let response = self
            .http
            .post(&self.config.token_url)
            .form(&[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .map_err(|e| AppError::RefreshFailed(format!("Token refresh request failed: {}", e)))?;

        if !response.status().is_success() {
            let failure = describe_failure(response).await;
            tracing::warn!(error = %failure, "Google token refresh rejected");
            return Err(AppError::RefreshFailed(format!(
                "Google authorization expired or was revoked, please reconnect Google Agenda ({})",
                failure
            )));
        }

        let body: GoogleTokenResponse = response.json().await.map_err(|e| {
            AppError::RefreshFailed(format!("Failed to parse refresh response: {}", e))
        })?;
        Ok(body.into_tokens())
    }

    /// Revoke a token (refresh tokens revoke the whole grant).
    pub async fn revoke(&self, token: &str) -> Result<(), AppError> {
        let response = self
            .http
            .post(&self.config.revoke_url)
            .form(&[("token", token)])
            .send()
            .await
            .map_err(|e| AppError::ProviderRequestFailed(format!("Revocation failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::ProviderRequestFailed(
                describe_failure(response).await,
            ));
        }
        Ok(())
    }

    /// Insert an event in the user's primary calendar.
    pub async fn create_event(
        &self,
        access_token: &str,
        details: &EventDetails,
        time_zone: &str,
    ) -> Result<CalendarEventRef, AppError> {
        let url = format!("{}/calendars/primary/events", self.config.api_base);
        let overrides: Vec<_> = REMINDER_OFFSETS_MINUTES
            .iter()
            .map(|minutes| json!({ "method": "popup", "minutes": minutes }))
            .collect();

        let body = json!({
            "summary": details.title,
            "description": details.description,
            "start": { "dateTime": details.start_date_time, "timeZone": time_zone },
            "end": { "dateTime": details.end_date_time, "timeZone": time_zone },
            "reminders": { "useDefault": false, "overrides": overrides },
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

        let event: GoogleEventResponse = response.json().await.map_err(|e| {
            AppError::ProviderRequestFailed(format!("JSON parse error: {}", e))
        })?;

        Ok(CalendarEventRef {
            provider_event_id: event.id,
            html_link: event.html_link.unwrap_or_default(),
        })
    }

    /// Delete an event from the primary calendar.
    pub async fn delete_event(&self, access_token: &str, event_id: &str) -> Result<(), AppError> {
        let url = format!(
            "{}/calendars/primary/events/{}",
            self.config.api_base,
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
}
