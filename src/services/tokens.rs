// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Calendar token lifecycle: initial storage after consent, lazy refresh,
//! disconnect.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::config::Config;
use crate::db::TokenStore;
use crate::error::AppError;
use crate::models::{Provider, RefreshMethod, TokenRecord};
use crate::services::google::{GoogleClient, GoogleTokens};
use crate::services::oauth_state::OAuthState;
use crate::services::outlook::{AccountCache, AuthenticationResult, OutlookClient};
use crate::time_utils::{format_utc_rfc3339, now_epoch_millis};

/// Message shown when the Outlook silent flow cannot renew a token.
pub const OUTLOOK_RECONNECT_MESSAGE: &str =
    "Outlook session expired, please reconnect your Outlook calendar";

/// Shared refresh locks type for use in AppState.
pub type RefreshLocks = Arc<DashMap<(Provider, String), Arc<Mutex<()>>>>;

/// Token set from a code exchange, before it becomes a record.
enum Exchanged {
    Google(GoogleTokens),
    Outlook(AuthenticationResult),
}

/// Hands out usable access tokens, refreshing stored ones on demand.
///
/// Provider clients are built from configuration on every call; only the
/// HTTP connection pool, the refresh locks and the Outlook account cache
/// are shared between requests.
#[derive(Clone)]
pub struct TokenManager {
    config: Arc<Config>,
    http: reqwest::Client,
    store: Arc<dyn TokenStore>,
    /// Per-user mutex to serialize refresh operations.
    refresh_locks: RefreshLocks,
    outlook_accounts: AccountCache,
}

impl TokenManager {
    pub fn new(
        config: Arc<Config>,
        http: reqwest::Client,
        store: Arc<dyn TokenStore>,
        refresh_locks: RefreshLocks,
        outlook_accounts: AccountCache,
    ) -> Self {
        Self {
            config,
            http,
            store,
            refresh_locks,
            outlook_accounts,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Mutex serializing every store write for one user and provider.
    fn user_lock(&self, provider: Provider, user_id: &str) -> Arc<Mutex<()>> {
        self.refresh_locks
            .entry((provider, user_id.to_string()))
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    pub fn google(&self) -> Result<GoogleClient, AppError> {
        GoogleClient::from_config(&self.config.google, self.http.clone())
    }

    pub fn outlook(&self) -> Result<OutlookClient, AppError> {
        OutlookClient::from_config(
            &self.config.outlook,
            self.http.clone(),
            self.outlook_accounts.clone(),
        )
    }

    /// Consent URL for the provider, carrying the session context in `state`.
    pub fn auth_url(&self, provider: Provider, state: &OAuthState) -> Result<String, AppError> {
        match provider {
            Provider::Google => Ok(self.google()?.auth_url(state)),
            Provider::Outlook => Ok(self.outlook()?.auth_url(state)),
        }
    }

    // ─── OAuth Callback Handling ─────────────────────────────────────────────

    /// Exchange an authorization code and store the resulting record,
    /// replacing any previous one for this user.
    pub async fn handle_oauth_callback(
        &self,
        provider: Provider,
        code: &str,
        state: &OAuthState,
    ) -> Result<TokenRecord, AppError> {
        let now = format_utc_rfc3339(chrono::Utc::now());

        // Exchange outside the lock; only the store update is serialized
        // against in-flight refreshes and disconnects.
        let exchanged = match provider {
            Provider::Google => Exchanged::Google(self.google()?.exchange_code(code).await?),
            Provider::Outlook => {
                Exchanged::Outlook(self.outlook()?.acquire_token_by_code(code).await?)
            }
        };

        let lock = self.user_lock(provider, &state.user_id);
        let _guard = lock.lock().await;

        let record = match exchanged {
            Exchanged::Google(tokens) => {
                // Google only issues a refresh token with a fresh consent;
                // keep the one we already have otherwise.
                let refresh_token = match tokens.refresh_token {
                    Some(token) => token,
                    None => match self.store.get(provider, &state.user_id).await? {
                        Some(TokenRecord {
                            refresh: RefreshMethod::GoogleRefreshToken(previous),
                            ..
                        }) => {
                            tracing::info!(
                                user_id = %state.user_id,
                                "No refresh token in exchange, keeping the stored one"
                            );
                            previous
                        }
                        _ => {
                            return Err(AppError::ProviderRequestFailed(
                                "Google did not issue a refresh token; remove the app's access \
                                 in your Google account and connect again"
                                    .to_string(),
                            ))
                        }
                    },
                };

                TokenRecord {
                    user_id: state.user_id.clone(),
                    user_email: state.user_email.clone(),
                    agency_id: state.agency_id.clone(),
                    access_token: tokens.access_token,
                    refresh: RefreshMethod::GoogleRefreshToken(refresh_token),
                    expiry_epoch_millis: tokens.expiry_epoch_millis,
                    id_token: None,
                    updated_at: now,
                }
            }
            Exchanged::Outlook(result) => TokenRecord {
                user_id: state.user_id.clone(),
                user_email: state.user_email.clone(),
                agency_id: state.agency_id.clone(),
                access_token: result.access_token,
                refresh: RefreshMethod::OutlookAccountHandle(result.account),
                expiry_epoch_millis: result.expiry_epoch_millis,
                id_token: result.id_token,
                updated_at: now,
            },
        };

        self.store.put(&record).await?;

        tracing::info!(
            user_id = %record.user_id,
            provider = %provider,
            agency_id = %record.agency_id,
            "OAuth callback handled, tokens stored"
        );

        Ok(record)
    }

    // ─── Token Management ────────────────────────────────────────────────────

    /// Get a valid (not expiring within 5 minutes) access token for the user.
    ///
    /// 1. Read the record; none means the calendar was never connected
    /// 2. Fresh token: return it
    /// 3. Stale: take the per-user lock and re-read (another request may
    ///    have refreshed meanwhile)
    /// 4. Still stale: refresh with the provider, persist, return
    pub async fn get_valid_access_token(
        &self,
        provider: Provider,
        user_id: &str,
    ) -> Result<String, AppError> {
        let record = self
            .store
            .get(provider, user_id)
            .await?
            .ok_or(AppError::NotAuthenticated)?;

        if !record.is_stale_at(now_epoch_millis()) {
            return Ok(record.access_token);
        }

        let lock = self.user_lock(provider, user_id);
        let _guard = lock.lock().await;

        let record = self
            .store
            .get(provider, user_id)
            .await?
            .ok_or(AppError::NotAuthenticated)?;

        if !record.is_stale_at(now_epoch_millis()) {
            tracing::debug!(user_id, provider = %provider, "Token refreshed by another request");
            return Ok(record.access_token);
        }

        tracing::info!(
            user_id,
            provider = %provider,
            remaining_ms = record.expiry_epoch_millis.saturating_sub(now_epoch_millis()),
            "Access token stale, refreshing"
        );

        let refreshed = self.refresh(record).await?;

        if refreshed.expiry_epoch_millis <= now_epoch_millis() {
            return Err(AppError::RefreshFailed(format!(
                "{} returned an already expired token, please reconnect",
                provider.display_name()
            )));
        }

        self.store.put(&refreshed).await?;

        tracing::info!(user_id, provider = %provider, "Token refreshed and stored");
        Ok(refreshed.access_token)
    }

    /// Provider-specific refresh; returns the record to persist.
    async fn refresh(&self, record: TokenRecord) -> Result<TokenRecord, AppError> {
        let updated_at = format_utc_rfc3339(chrono::Utc::now());

        match record.refresh.clone() {
            RefreshMethod::GoogleRefreshToken(refresh_token) => {
                let tokens = self.google()?.refresh_access_token(&refresh_token).await?;

                // Google rarely rotates refresh tokens; keep ours if none came back.
                let refresh_token = tokens.refresh_token.unwrap_or(refresh_token);

                Ok(TokenRecord {
                    access_token: tokens.access_token,
                    refresh: RefreshMethod::GoogleRefreshToken(refresh_token),
                    expiry_epoch_millis: tokens.expiry_epoch_millis,
                    updated_at,
                    ..record
                })
            }
            RefreshMethod::OutlookAccountHandle(account) => {
                let result = self
                    .outlook()?
                    .acquire_token_silent(&account)
                    .await
                    .map_err(|e| {
                        tracing::warn!(
                            user_id = %record.user_id,
                            error = %e,
                            "Outlook silent token acquisition failed"
                        );
                        AppError::RefreshFailed(OUTLOOK_RECONNECT_MESSAGE.to_string())
                    })?;

                Ok(TokenRecord {
                    access_token: result.access_token,
                    refresh: RefreshMethod::OutlookAccountHandle(result.account),
                    expiry_epoch_millis: result.expiry_epoch_millis,
                    id_token: result.id_token.or_else(|| record.id_token.clone()),
                    updated_at,
                    ..record
                })
            }
        }
    }

    /// Whether a token record exists for the user.
    pub async fn is_connected(&self, provider: Provider, user_id: &str) -> Result<bool, AppError> {
        Ok(self.store.get(provider, user_id).await?.is_some())
    }

    /// Delete the user's record and drop the provider-side grant.
    ///
    /// Provider cleanup is best effort: failures are logged, the local
    /// record is removed regardless.
    pub async fn disconnect(&self, provider: Provider, user_id: &str) -> Result<bool, AppError> {
        let record = {
            // Wait out any refresh in flight so it cannot write the record back.
            let lock = self.user_lock(provider, user_id);
            let _guard = lock.lock().await;

            let Some(record) = self.store.get(provider, user_id).await? else {
                return Ok(false);
            };
            self.store.delete(provider, user_id).await?;
            record
        };
        tracing::info!(user_id, provider = %provider, "Calendar disconnected");

        match &record.refresh {
            RefreshMethod::GoogleRefreshToken(refresh_token) => {
                let revoked = match self.google() {
                    Ok(google) => google.revoke(refresh_token).await,
                    Err(e) => Err(e),
                };
                if let Err(e) = revoked {
                    tracing::warn!(user_id, error = %e, "Failed to revoke Google token");
                }
            }
            RefreshMethod::OutlookAccountHandle(account) => {
                if let Ok(outlook) = self.outlook() {
                    outlook.remove_account(account);
                }
            }
        }

        Ok(true)
    }
}
