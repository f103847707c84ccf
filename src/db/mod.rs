// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Token store backends.
//!
//! Every backend keeps exactly one [`TokenRecord`] per (user, provider):
//! `put` replaces whatever was there before.

pub mod firestore;
pub mod json_file;
pub mod memory;

pub use firestore::FirestoreStore;
pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

use crate::error::AppError;
use crate::models::{Provider, TokenRecord};
use async_trait::async_trait;

/// Collection names as constants.
pub mod collections {
    use crate::models::Provider;

    pub const GOOGLE_TOKENS: &str = "google_tokens";
    pub const OUTLOOK_TOKENS: &str = "outlook_tokens";

    /// Collection (or JSON document stem) holding a provider's records.
    pub fn tokens_for(provider: Provider) -> &'static str {
        match provider {
            Provider::Google => GOOGLE_TOKENS,
            Provider::Outlook => OUTLOOK_TOKENS,
        }
    }
}

/// Persistence for per-user token records.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Fetch the record for a user, if any.
    async fn get(&self, provider: Provider, user_id: &str)
        -> Result<Option<TokenRecord>, AppError>;

    /// Store a record, fully replacing any previous one for the same user.
    async fn put(&self, record: &TokenRecord) -> Result<(), AppError>;

    /// Remove a record. Returns whether one existed.
    async fn delete(&self, provider: Provider, user_id: &str) -> Result<bool, AppError>;
}
