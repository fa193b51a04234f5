//! Memory record types.

use serde::{Deserialize, Serialize};

use crate::asset::LocalAsset;

/// A saved memory: title, optional description, optional photo.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct MemoryRecord {
    /// Identifier assigned by the document store on insert.
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Resolved download URL of the uploaded photo; empty when no photo is
    /// attached. Matches the sentinel stored in the document.
    #[serde(default)]
    pub image_url: String,
    /// Creation time in epoch milliseconds, assigned by the document store.
    pub created_at: i64,
}

impl MemoryRecord {
    pub fn has_image(&self) -> bool {
        !self.image_url.is_empty()
    }
}

/// Input for creating a record.
#[derive(Clone, Debug, Default)]
pub struct MemoryDraft {
    pub title: String,
    pub description: Option<String>,
    pub image: Option<LocalAsset>,
}

impl MemoryDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_image(mut self, image: LocalAsset) -> Self {
        self.image = Some(image);
        self
    }
}

/// Partial update; only supplied fields change.
#[derive(Clone, Debug, Default)]
pub struct MemoryPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    /// Replacement photo. The previous blob stays in the store; see the
    /// service docs for the ownership caveat.
    pub image: Option<LocalAsset>,
}

impl MemoryPatch {
    /// Title-only patch, as used by rename.
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.image.is_none()
    }
}
