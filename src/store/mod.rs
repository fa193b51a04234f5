//! Storage collaborators: document store and blob store.

pub mod fs;
pub mod http;
pub mod sqlite;

use async_trait::async_trait;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::record::MemoryRecord;

/// Marker segment separating the store host from the percent-encoded object
/// path in a resolved download URL.
pub const OBJECT_MARKER: &str = "/o/";

/// Fields written on document insert. The id and creation timestamp are
/// assigned by the store itself.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct DocumentFields {
    pub title: String,
    pub description: Option<String>,
    pub image_url: String,
}

/// Field-level partial update; `None` leaves the stored value untouched.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct DocumentPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl DocumentPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.image_url.is_none()
    }
}

/// Metadata document collection.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a new document and return its assigned id.
    async fn insert(&self, fields: DocumentFields) -> Result<String>;

    /// Apply a partial update to an existing document. Fails with
    /// `Error::NotFound` when the id has no document.
    async fn update(&self, id: &str, patch: DocumentPatch) -> Result<()>;

    /// Delete a document by id.
    async fn delete(&self, id: &str) -> Result<()>;

    /// One-shot snapshot of all documents, newest first.
    async fn list_created_desc(&self) -> Result<Vec<MemoryRecord>>;
}

/// Binary object store addressed by path.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Upload bytes under `path` and return the resolved download URL.
    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<String>;

    /// Delete the object at `path`.
    async fn delete(&self, path: &str) -> Result<()>;

    /// Resolve `path` to a fetchable URL without uploading anything.
    async fn download_url(&self, path: &str) -> Result<String>;
}

// Everything except [A-Za-z0-9._~-] is escaped, so `/` becomes `%2F` and the
// whole object path fits in a single URL segment.
const BLOB_PATH_ESCAPES: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'-');

/// Percent-encode an object path for embedding after the `/o/` marker.
pub fn encode_blob_path(path: &str) -> String {
    utf8_percent_encode(path, BLOB_PATH_ESCAPES).to_string()
}

/// Recover the storage path from a resolved download URL.
///
/// Download URLs embed the percent-encoded object path after the `/o/`
/// marker: `https://host/v0/o/images%2Fphoto.jpg?alt=media` refers to the
/// object `images/photo.jpg`. Fails when the marker is absent, the path
/// segment is empty, or it does not decode as UTF-8.
pub fn blob_path_from_url(url: &str) -> Result<String> {
    let (_, tail) = url
        .split_once(OBJECT_MARKER)
        .ok_or_else(|| Error::Other(format!("no '{}' marker in url: {}", OBJECT_MARKER, url)))?;
    let encoded = match tail.split_once('?') {
        Some((path, _query)) => path,
        None => tail,
    };
    if encoded.is_empty() {
        return Err(Error::Other(format!("empty object path in url: {}", url)));
    }
    let path = percent_decode_str(encoded)
        .decode_utf8()
        .map_err(|e| Error::Other(format!("object path is not valid UTF-8: {}", e)))?;
    Ok(path.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blob_path_from_url() {
        let url = "https://blobs.example.com/v0/o/images%2Fmemory-image-1.jpg?alt=media";
        assert_eq!(
            blob_path_from_url(url).unwrap(),
            "images/memory-image-1.jpg"
        );
    }

    #[test]
    fn test_blob_path_without_query() {
        let url = "https://blobs.example.com/v0/o/images%2Fa.png";
        assert_eq!(blob_path_from_url(url).unwrap(), "images/a.png");
    }

    #[test]
    fn test_blob_path_missing_marker() {
        let err = blob_path_from_url("https://blobs.example.com/images/a.png").unwrap_err();
        assert!(matches!(err, Error::Other(_)));
    }

    #[test]
    fn test_blob_path_empty() {
        assert!(blob_path_from_url("https://blobs.example.com/v0/o/?alt=media").is_err());
    }

    #[test]
    fn test_encode_round_trip() {
        let path = "images/memory image (1).jpg";
        let encoded = encode_blob_path(path);
        assert!(!encoded.contains('/'));
        let url = format!("https://h/o/{}?alt=media", encoded);
        assert_eq!(blob_path_from_url(&url).unwrap(), path);
    }
}
