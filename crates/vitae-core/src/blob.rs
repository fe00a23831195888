//! Blob storage for uploaded portfolio assets (profile photos).

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use crate::error::{VitaeError, VitaeResult};

const MOCK_AVATAR_BASE: &str = "https://avatar.vercel.sh";
const MOCK_AVATAR_WARNING: &str = "Blob storage not configured, using a generated avatar.";

/// Publicly reachable location of a stored blob.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredBlob {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn store_blob(&self, name: &str, bytes: &[u8], content_type: &str) -> VitaeResult<StoredBlob>;
}

/// Keep only characters safe in a file name; path components are discarded.
fn sanitize_name(name: &str) -> String {
    let base = Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload");
    let cleaned: String = base
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if cleaned.trim_matches('.').is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

/// Writes blobs to a local directory served under `public_base`.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    dir: PathBuf,
    public_base: String,
}

impl LocalBlobStore {
    pub fn new(dir: impl Into<PathBuf>, public_base: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            public_base: public_base.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn store_blob(&self, name: &str, bytes: &[u8], content_type: &str) -> VitaeResult<StoredBlob> {
        if bytes.is_empty() {
            return Err(VitaeError::InvalidInput("empty upload".to_string()));
        }
        tokio::fs::create_dir_all(&self.dir).await?;
        let file = format!("{}-{}", Uuid::new_v4(), sanitize_name(name));
        tokio::fs::write(self.dir.join(&file), bytes).await?;
        tracing::info!(file = %file, content_type, size = bytes.len(), "[VITAE] Blob stored");
        Ok(StoredBlob {
            url: format!("{}/{}", self.public_base, file),
            warning: None,
        })
    }
}

/// No storage configured: hands back a generated avatar URL.
#[derive(Debug, Default, Clone)]
pub struct PlaceholderBlobStore;

#[async_trait]
impl BlobStore for PlaceholderBlobStore {
    async fn store_blob(&self, _name: &str, _bytes: &[u8], _content_type: &str) -> VitaeResult<StoredBlob> {
        tracing::warn!("[VITAE] Blob storage not configured, returning mock avatar");
        Ok(StoredBlob {
            url: format!("{}/{}", MOCK_AVATAR_BASE, Uuid::new_v4().simple()),
            warning: Some(MOCK_AVATAR_WARNING.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_paths_and_odd_chars() {
        assert_eq!(sanitize_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_name("foto profilo.jpg"), "foto_profilo.jpg");
        assert_eq!(sanitize_name(""), "upload");
    }

    #[tokio::test]
    async fn local_store_writes_file_and_builds_url() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path(), "http://localhost:8000/blobs/");
        let blob = store.store_blob("me.png", b"png", "image/png").await.unwrap();
        assert!(blob.url.starts_with("http://localhost:8000/blobs/"));
        assert!(blob.url.ends_with("-me.png"));
        assert!(blob.warning.is_none());
        let file = blob.url.rsplit('/').next().unwrap();
        assert_eq!(std::fs::read(dir.path().join(file)).unwrap(), b"png");
    }

    #[tokio::test]
    async fn local_store_rejects_empty_upload() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path(), "http://x");
        assert!(matches!(
            store.store_blob("a.png", b"", "image/png").await,
            Err(VitaeError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn placeholder_returns_mock_avatar_with_warning() {
        let blob = PlaceholderBlobStore.store_blob("a.png", b"x", "image/png").await.unwrap();
        assert!(blob.url.starts_with(MOCK_AVATAR_BASE));
        assert!(blob.warning.is_some());
    }
}
