// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Lead-Calendar-Sync: calendar connection backend for the lead dashboard
//!
//! This crate brokers the Google and Outlook OAuth flows for real-estate
//! agents, keeps their calendar tokens usable, and puts scheduled property
//! visits into their external calendar.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::TokenStore;
use services::{AccountCache, CalendarService, TokenManager};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Arc<Config>,
    pub tokens: TokenManager,
    pub calendar: CalendarService,
}

impl AppState {
    /// Wire the services around a token store.
    ///
    /// `outlook_accounts` holds the Microsoft refresh credentials behind each
    /// account handle; share one cache per process.
    pub fn new(
        config: Config,
        http: reqwest::Client,
        store: Arc<dyn TokenStore>,
        outlook_accounts: AccountCache,
    ) -> Self {
        let config = Arc::new(config);
        let refresh_locks = Arc::new(dashmap::DashMap::new());

        let tokens = TokenManager::new(
            config.clone(),
            http,
            store,
            refresh_locks,
            outlook_accounts,
        );
        let calendar = CalendarService::new(tokens.clone());

        Self {
            config,
            tokens,
            calendar,
        }
    }
}
