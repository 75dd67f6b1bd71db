//! Blob storage abstraction for evidence and correction photos.
//!
//! Supports local filesystem storage and an in-process memory store.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::config::{StorageKind, StorageSettings};
use crate::{AppError, AppResult};

/// Logical bucket a file is uploaded into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    /// Staff-supplied proof attached when a violation is reported.
    EvidencePhotos,
    /// Student-supplied proof that a violation was corrected.
    CorrectionPhotos,
}

impl Bucket {
    /// Key prefix for this bucket.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EvidencePhotos => "evidence-photos",
            Self::CorrectionPhotos => "correction-photos",
        }
    }
}

/// Blob store for uploaded photos.
///
/// Uploads are never removed: a photo whose record write failed stays
/// behind as an orphan.
#[async_trait::async_trait]
pub trait StorageBackend: Send + Sync {
    /// Store `data` under `key` and return its retrieval URL.
    async fn upload(&self, key: &str, data: &[u8], content_type: &str) -> AppResult<String>;

    /// The retrieval URL a key has, or will have once uploaded.
    fn public_url(&self, key: &str) -> String;
}

/// Build the storage backend selected by the configuration.
#[must_use]
pub fn from_settings(settings: &StorageSettings) -> Arc<dyn StorageBackend> {
    match settings.kind {
        StorageKind::Local => Arc::new(LocalStorage::new(
            settings.base_path.clone(),
            settings.base_url.clone(),
        )),
        StorageKind::Memory => Arc::new(MemoryStorage::new(settings.base_url.clone())),
    }
}

/// Local filesystem storage backend.
pub struct LocalStorage {
    base_path: PathBuf,
    base_url: String,
}

impl LocalStorage {
    /// Create a new local storage backend.
    #[must_use]
    pub const fn new(base_path: PathBuf, base_url: String) -> Self {
        Self { base_path, base_url }
    }
}

#[async_trait::async_trait]
impl StorageBackend for LocalStorage {
    async fn upload(&self, key: &str, data: &[u8], content_type: &str) -> AppResult<String> {
        let path = self.base_path.join(key);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::Storage(format!("Failed to create directory: {e}")))?;
        }

        tokio::fs::write(&path, data)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to write file: {e}")))?;

        tracing::debug!(key = %key, size = data.len(), content_type, "Stored file on local disk");

        Ok(self.public_url(key))
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), key)
    }
}

/// In-memory storage backend for tests and local development.
#[derive(Default)]
pub struct MemoryStorage {
    base_url: String,
    files: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    /// Create a new in-memory storage backend.
    #[must_use]
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            files: RwLock::new(HashMap::new()),
        }
    }

    /// Number of stored files.
    pub async fn len(&self) -> usize {
        self.files.read().await.len()
    }

    /// Whether no file has been stored.
    pub async fn is_empty(&self) -> bool {
        self.files.read().await.is_empty()
    }

    /// Stored bytes for a key.
    pub async fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.files.read().await.get(key).cloned()
    }
}

#[async_trait::async_trait]
impl StorageBackend for MemoryStorage {
    async fn upload(&self, key: &str, data: &[u8], _content_type: &str) -> AppResult<String> {
        self.files
            .write()
            .await
            .insert(key.to_string(), data.to_vec());

        Ok(self.public_url(key))
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), key)
    }
}

/// Generate a storage key for an uploaded photo.
///
/// Keys look like `{bucket}/{millis}.{ext}`, or `{bucket}/{owner}-{millis}.{ext}`
/// when the upload belongs to a specific record.
#[must_use]
pub fn generate_storage_key(
    bucket: Bucket,
    owner: Option<&str>,
    original_name: &str,
    at: DateTime<Utc>,
) -> String {
    let timestamp = at.timestamp_millis();

    let extension = original_name
        .rfind('.')
        .filter(|&pos| pos > 0 && pos < original_name.len() - 1)
        .map(|pos| &original_name[pos + 1..])
        .filter(|ext| ext.len() <= 10 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or("bin");

    match owner {
        Some(owner) => format!("{}/{owner}-{timestamp}.{extension}", bucket.as_str()),
        None => format!("{}/{timestamp}.{extension}", bucket.as_str()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 9, 30, 0).unwrap()
    }

    #[test]
    fn test_generate_storage_key_evidence() {
        let key = generate_storage_key(Bucket::EvidencePhotos, None, "photo.jpg", at());
        assert_eq!(key, format!("evidence-photos/{}.jpg", at().timestamp_millis()));
    }

    #[test]
    fn test_generate_storage_key_correction_has_owner() {
        let key = generate_storage_key(Bucket::CorrectionPhotos, Some("v1"), "fix.PNG", at());
        assert!(key.starts_with("correction-photos/v1-"));
        assert!(key.ends_with(".PNG"));
    }

    #[test]
    fn test_generate_storage_key_no_extension() {
        let key = generate_storage_key(Bucket::EvidencePhotos, None, "file", at());
        assert!(key.ends_with(".bin"));
    }

    #[tokio::test]
    async fn test_memory_storage_round_trip() {
        let storage = MemoryStorage::new("https://files.example.edu/".to_string());
        let url = storage
            .upload("evidence-photos/1.jpg", b"jpeg", "image/jpeg")
            .await
            .unwrap();

        assert_eq!(url, "https://files.example.edu/evidence-photos/1.jpg");
        assert_eq!(url, storage.public_url("evidence-photos/1.jpg"));
        assert_eq!(storage.len().await, 1);
        assert_eq!(storage.get("evidence-photos/1.jpg").await.unwrap(), b"jpeg");
    }
}
