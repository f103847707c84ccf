// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! JSON document token store.
//!
//! Each provider has one document (`<dir>/google_tokens.json`,
//! `<dir>/outlook_tokens.json`) mapping user id to record. The whole
//! document is read on every access and rewritten on every change, which is
//! fine for a handful of agents but not for large user counts.

use super::{collections, TokenStore};
use crate::error::AppError;
use crate::models::{Provider, TokenRecord};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

type Document = BTreeMap<String, TokenRecord>;

pub struct JsonFileStore {
    dir: PathBuf,
    /// Serializes read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    /// Open (and create if needed) the store directory.
    pub async fn new(dir: impl Into<PathBuf>) -> Result<Self, AppError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await.map_err(|e| {
            AppError::Store(format!("Failed to create {}: {}", dir.display(), e))
        })?;

        tracing::info!(dir = %dir.display(), "Using JSON token store");

        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path_for(&self, provider: Provider) -> PathBuf {
        self.dir
            .join(format!("{}.json", collections::tokens_for(provider)))
    }

    async fn load(&self, path: &Path) -> Result<Document, AppError> {
        match tokio::fs::read(path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(Document::new()),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                AppError::Store(format!("Corrupt token document {}: {}", path.display(), e))
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Document::new()),
            Err(e) => Err(AppError::Store(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    /// Write to a sibling temp file and rename over the document.
    async fn save(&self, path: &Path, doc: &Document) -> Result<(), AppError> {
        let bytes = serde_json::to_vec_pretty(doc)
            .map_err(|e| AppError::Store(format!("Failed to serialize tokens: {}", e)))?;

        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(|e| AppError::Store(format!("Failed to write {}: {}", tmp.display(), e)))?;
        tokio::fs::rename(&tmp, path).await.map_err(|e| {
            AppError::Store(format!("Failed to replace {}: {}", path.display(), e))
        })?;
        Ok(())
    }
}

#[async_trait]
impl TokenStore for JsonFileStore {
    async fn get(
        &self,
        provider: Provider,
        user_id: &str,
    ) -> Result<Option<TokenRecord>, AppError> {
        let mut doc = self.load(&self.path_for(provider)).await?;
        Ok(doc.remove(user_id))
    }

    async fn put(&self, record: &TokenRecord) -> Result<(), AppError> {
        let path = self.path_for(record.provider());
        let _guard = self.write_lock.lock().await;

        let mut doc = self.load(&path).await?;
        doc.insert(record.user_id.clone(), record.clone());
        self.save(&path, &doc).await
    }

    async fn delete(&self, provider: Provider, user_id: &str) -> Result<bool, AppError> {
        let path = self.path_for(provider);
        let _guard = self.write_lock.lock().await;

        let mut doc = self.load(&path).await?;
        if doc.remove(user_id).is_none() {
            return Ok(false);
        }
        self.save(&path, &doc).await?;
        Ok(true)
    }
}
