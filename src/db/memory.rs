// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory token store for tests and offline mode.

use super::TokenStore;
use crate::error::AppError;
use crate::models::{Provider, TokenRecord};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct MemoryStore {
    records: Arc<DashMap<(Provider, String), TokenRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenStore for MemoryStore {
    async fn get(
        &self,
        provider: Provider,
        user_id: &str,
    ) -> Result<Option<TokenRecord>, AppError> {
        Ok(self
            .records
            .get(&(provider, user_id.to_string()))
            .map(|r| r.value().clone()))
    }

    async fn put(&self, record: &TokenRecord) -> Result<(), AppError> {
        self.records
            .insert((record.provider(), record.user_id.clone()), record.clone());
        Ok(())
    }

    async fn delete(&self, provider: Provider, user_id: &str) -> Result<bool, AppError> {
        Ok(self
            .records
            .remove(&(provider, user_id.to_string()))
            .is_some())
    }
}
