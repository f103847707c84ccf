// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Persisted OAuth token records, one per user per calendar provider.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Look-ahead before expiry at which a token counts as stale (5 minutes).
pub const TOKEN_REFRESH_MARGIN_MILLIS: i64 = 5 * 60 * 1000;

/// External calendar provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Google,
    Outlook,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Google => "google",
            Provider::Outlook => "outlook",
        }
    }

    /// Human-readable name for user-facing pages.
    pub fn display_name(&self) -> &'static str {
        match self {
            Provider::Google => "Google Agenda",
            Provider::Outlook => "Outlook",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Account descriptor used by the Microsoft silent flow.
///
/// This is not a credential: it only names the cached account whose
/// refresh token the Outlook client holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountHandle {
    /// `<object id>.<tenant id>` of the signed-in account
    pub home_account_id: String,
    /// Login host the account was issued by
    pub environment: String,
    pub tenant_id: String,
    #[serde(default)]
    pub username: Option<String>,
}

/// How a stale access token gets replaced.
///
/// Google hands out a long-lived refresh token; Microsoft sign-ins are
/// re-acquired silently from the cached account. The two are kept apart
/// because they fail and recover differently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", content = "value", rename_all = "camelCase")]
pub enum RefreshMethod {
    GoogleRefreshToken(String),
    OutlookAccountHandle(AccountHandle),
}

impl RefreshMethod {
    pub fn provider(&self) -> Provider {
        match self {
            RefreshMethod::GoogleRefreshToken(_) => Provider::Google,
            RefreshMethod::OutlookAccountHandle(_) => Provider::Outlook,
        }
    }
}

/// User's calendar tokens as stored by the token store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRecord {
    /// Application user id (also used as document key)
    pub user_id: String,
    /// Carried for display only
    pub user_email: String,
    /// Carried for display only
    pub agency_id: String,
    /// Short-lived bearer token
    pub access_token: String,
    pub refresh: RefreshMethod,
    /// Absolute expiry of `access_token`
    pub expiry_epoch_millis: i64,
    /// OpenID id token from the initial sign-in (Outlook only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
    /// Last write (RFC 3339)
    pub updated_at: String,
}

impl TokenRecord {
    pub fn provider(&self) -> Provider {
        self.refresh.provider()
    }

    /// True if the access token expires within the refresh margin of `now_millis`
    /// (or has already expired).
    pub fn is_stale_at(&self, now_millis: i64) -> bool {
        self.expiry_epoch_millis < now_millis.saturating_add(TOKEN_REFRESH_MARGIN_MILLIS)
    }
}
