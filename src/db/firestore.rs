// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore token store.
//!
//! One document per user in a per-provider collection
//! (`google_tokens/{user_id}`, `outlook_tokens/{user_id}`), so writes touch
//! a single row instead of a shared document.

use super::{collections, TokenStore};
use crate::error::AppError;
use crate::models::{Provider, TokenRecord};
use async_trait::async_trait;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreStore {
    client: firestore::FirestoreDb,
}

impl FirestoreStore {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // The emulator does not check credentials, so skip the ADC lookup.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Store(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self { client })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| AppError::Store(format!("Failed to connect to Firestore Emulator: {}", e)))?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self { client })
    }

}

/// Firestore document ids may not contain '/'.
fn document_id(user_id: &str) -> String {
    urlencoding::encode(user_id).into_owned()
}

#[async_trait]
impl TokenStore for FirestoreStore {
    async fn get(
        &self,
        provider: Provider,
        user_id: &str,
    ) -> Result<Option<TokenRecord>, AppError> {
        self.client
            .fluent()
            .select()
            .by_id_in(collections::tokens_for(provider))
            .obj()
            .one(&document_id(user_id))
            .await
            .map_err(|e| AppError::Store(e.to_string()))
    }

    async fn put(&self, record: &TokenRecord) -> Result<(), AppError> {
        let _: () = self
            .client
            .fluent()
            .update()
            .in_col(collections::tokens_for(record.provider()))
            .document_id(document_id(&record.user_id))
            .object(record)
            .execute()
            .await
            .map_err(|e| AppError::Store(e.to_string()))?;
        Ok(())
    }

    async fn delete(&self, provider: Provider, user_id: &str) -> Result<bool, AppError> {
        let existed = self.get(provider, user_id).await?.is_some();

        self.client
            .fluent()
            .delete()
            .from(collections::tokens_for(provider))
            .document_id(document_id(user_id))
            .execute()
            .await
            .map_err(|e| AppError::Store(e.to_string()))?;
        Ok(existed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_id_escapes_slashes() {
        assert_eq!(document_id("user/1"), "user%2F1");
        assert_eq!(document_id("rec123"), "rec123");
    }
}
