//! Blob storage for uploaded profile images.

use crate::error::ApiError;
use crate::models::Upload;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Allowed MIME types for upload
pub const ALLOWED_TYPES: &[&str] = &["image/jpeg", "image/png", "image/gif", "image/webp"];

/// Stores an uploaded file and returns the public URL it is reachable at
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn upload(&self, file: Upload) -> Result<String, ApiError>;

    /// Delete a previously uploaded file by the URL `upload` returned
    async fn remove(&self, url: &str) -> Result<(), ApiError>;
}

/// Writes uploads to a local directory that is served as static files
pub struct LocalBlobStore {
    root: PathBuf,
    base_url: String,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn upload(&self, file: Upload) -> Result<String, ApiError> {
        if !ALLOWED_TYPES.contains(&file.content_type.as_str()) {
            return Err(ApiError::BadRequest(format!(
                "File type '{}' not allowed. Allowed types: {:?}",
                file.content_type, ALLOWED_TYPES
            )));
        }

        // Never trust the client file name beyond its extension
        let extension = Path::new(&file.file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()))
            .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
            .unwrap_or_default();
        let name = format!("{}{}", Uuid::new_v4(), extension);

        tokio::fs::create_dir_all(&self.root).await?;
        tokio::fs::write(self.root.join(&name), &file.data).await?;

        tracing::debug!(file = %name, bytes = file.data.len(), "Stored upload");
        Ok(format!("{}/{}", self.base_url, name))
    }

    async fn remove(&self, url: &str) -> Result<(), ApiError> {
        let name = url
            .strip_prefix(&self.base_url)
            .map(|rest| rest.trim_start_matches('/'))
            .filter(|name| !name.is_empty() && !name.contains('/') && !name.contains(".."))
            .ok_or_else(|| ApiError::Storage(format!("Not a stored upload: {url}")))?;

        match tokio::fs::remove_file(self.root.join(name)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png(name: &str) -> Upload {
        Upload {
            file_name: name.into(),
            content_type: "image/png".into(),
            data: vec![0x89, b'P', b'N', b'G'],
        }
    }

    #[tokio::test]
    async fn test_upload_writes_file_and_returns_url() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path(), "/media/");

        let url = store.upload(png("me.PNG")).await.unwrap();

        assert!(url.starts_with("/media/"));
        assert!(url.ends_with(".png"));
        let name = url.trim_start_matches("/media/");
        let written = std::fs::read(dir.path().join(name)).unwrap();
        assert_eq!(written, vec![0x89, b'P', b'N', b'G']);
    }

    #[tokio::test]
    async fn test_path_components_are_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path(), "/media");

        let url = store.upload(png("../../etc/passwd")).await.unwrap();
        assert!(!url.contains(".."));
    }

    #[tokio::test]
    async fn test_remove_deletes_stored_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path(), "/media");

        let url = store.upload(png("me.png")).await.unwrap();
        store.remove(&url).await.unwrap();

        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
        // Already gone is fine
        store.remove(&url).await.unwrap();
    }

    #[tokio::test]
    async fn test_remove_rejects_foreign_urls() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path(), "/media");

        assert!(store.remove("/elsewhere/a.png").await.is_err());
        assert!(store.remove("/media/../secret").await.is_err());
    }

    #[tokio::test]
    async fn test_rejects_non_images() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path(), "/media");

        let err = store
            .upload(Upload {
                file_name: "run.sh".into(),
                content_type: "text/x-shellscript".into(),
                data: b"#!/bin/sh".to_vec(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }
}
