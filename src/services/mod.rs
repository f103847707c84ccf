// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod calendar;
pub mod google;
pub mod oauth_state;
pub mod outlook;
pub mod tokens;

pub use calendar::CalendarService;
pub use google::GoogleClient;
pub use oauth_state::OAuthState;
pub use outlook::{AccountCache, OutlookClient};
pub use tokens::{RefreshLocks, TokenManager};

use crate::config::Config;
use std::time::Duration;

/// Reminders attached to every visit, in minutes before start.
pub const REMINDER_OFFSETS_MINUTES: [u32; 2] = [30, 1440];

/// Shared HTTP client with explicit timeouts for all provider calls.
pub fn build_http_client(config: &Config) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.http_timeout_secs))
        .connect_timeout(Duration::from_secs(config.http_connect_timeout_secs))
        .build()
}

/// "HTTP <status>: <body>" for a failed provider response.
pub(crate) async fn describe_failure(response: reqwest::Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    format!("HTTP {}: {}", status, body)
}
