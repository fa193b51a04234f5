//! Local image assets and blob naming.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::Result;

/// A locally available image, resolvable to raw bytes and a content type.
#[derive(Clone, Debug)]
pub struct LocalAsset {
    path: PathBuf,
}

impl LocalAsset {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the full image into memory.
    pub async fn read_bytes(&self) -> Result<Vec<u8>> {
        Ok(tokio::fs::read(&self.path).await?)
    }

    /// Lowercased file extension; defaults to `jpg` when absent.
    pub fn extension(&self) -> String {
        self.path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_else(|| "jpg".to_string())
    }

    pub fn content_type(&self) -> &'static str {
        content_type_for_extension(&self.extension())
    }
}

/// Content type from a file extension, defaulting to JPEG like the capture
/// sources we ingest from.
pub fn content_type_for_extension(ext: &str) -> &'static str {
    match ext {
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "heic" => "image/heic",
        "bmp" => "image/bmp",
        _ => "image/jpeg",
    }
}

/// Content type from a blob path, using its final extension.
pub fn content_type_for_path(path: &str) -> &'static str {
    let ext = path.rsplit('.').next().unwrap_or("");
    content_type_for_extension(&ext.to_ascii_lowercase())
}

static UPLOAD_SEQ: AtomicU64 = AtomicU64::new(0);

/// Time-based unique blob name under the `images/` namespace. The process
/// counter keeps same-millisecond uploads from colliding.
pub fn generate_asset_name(extension: &str) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let seq = UPLOAD_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("images/memory-image-{}-{}.{}", millis, seq, extension)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_names_are_unique() {
        let a = generate_asset_name("jpg");
        let b = generate_asset_name("jpg");
        assert_ne!(a, b);
        assert!(a.starts_with("images/memory-image-"));
        assert!(a.ends_with(".jpg"));
    }

    #[test]
    fn test_content_types() {
        assert_eq!(content_type_for_extension("png"), "image/png");
        assert_eq!(content_type_for_extension("jpg"), "image/jpeg");
        // Unknown extensions fall back to jpeg.
        assert_eq!(content_type_for_extension("tiff"), "image/jpeg");
        assert_eq!(content_type_for_path("images/photo.PNG"), "image/png");
    }

    #[test]
    fn test_extension_defaults_to_jpg() {
        let asset = LocalAsset::new("/tmp/photo");
        assert_eq!(asset.extension(), "jpg");
        assert_eq!(asset.content_type(), "image/jpeg");

        let asset = LocalAsset::new("/tmp/photo.WEBP");
        assert_eq!(asset.extension(), "webp");
        assert_eq!(asset.content_type(), "image/webp");
    }
}
