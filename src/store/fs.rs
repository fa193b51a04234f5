//! Filesystem blob store for the local backend.
//!
//! Blobs live under a root directory and resolve to URLs in the same shape
//! the hosted store uses (`<base>/o/<encoded path>?alt=media`), so
//! [`blob_path_from_url`](super::blob_path_from_url) round-trips and the
//! `serve` command can hand the bytes back over `/media`.

use std::path::PathBuf;

use async_trait::async_trait;

use super::{encode_blob_path, BlobStore, OBJECT_MARKER};
use crate::error::{Error, Result};

pub struct FsBlobStore {
    root: PathBuf,
    base_url: String,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            root: root.into(),
            base_url,
        }
    }

    fn blob_file(&self, path: &str) -> Result<PathBuf> {
        if path.is_empty()
            || path
                .split('/')
                .any(|seg| seg.is_empty() || seg == "." || seg == "..")
        {
            return Err(Error::Other(format!("invalid blob path: {}", path)));
        }
        Ok(self.root.join(path))
    }

    fn url_for(&self, path: &str) -> String {
        format!(
            "{}{}{}?alt=media",
            self.base_url,
            OBJECT_MARKER,
            encode_blob_path(path)
        )
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn upload(&self, path: &str, bytes: Vec<u8>, _content_type: &str) -> Result<String> {
        let file = self.blob_file(path)?;
        if let Some(parent) = file.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::Upload(format!("mkdir {}: {}", parent.display(), e)))?;
        }
        tokio::fs::write(&file, &bytes)
            .await
            .map_err(|e| Error::Upload(format!("write {}: {}", file.display(), e)))?;
        tracing::debug!(path = %path, bytes = bytes.len(), "stored blob");
        Ok(self.url_for(path))
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let file = self.blob_file(path)?;
        match tokio::fs::remove_file(&file).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::NotFound(format!("blob {}", path)))
            }
            Err(e) => Err(Error::DeleteBlob(format!("{}: {}", path, e))),
        }
    }

    async fn download_url(&self, path: &str) -> Result<String> {
        self.blob_file(path)?;
        Ok(self.url_for(path))
    }
}
