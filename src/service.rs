//! Memory record service: create, list, update, delete across both stores.
//!
//! Every operation is one caller-visible round trip, but internally an
//! operation with a photo is two dependent remote calls (upload then write,
//! or write then blob delete) with no rollback between them.

use std::sync::Arc;

use crate::asset::{generate_asset_name, LocalAsset};
use crate::error::{Error, Result};
use crate::record::{MemoryDraft, MemoryPatch, MemoryRecord};
use crate::store::{blob_path_from_url, BlobStore, DocumentFields, DocumentPatch, DocumentStore};

/// Observes byte progress of an in-flight blob upload.
pub trait ProgressObserver: Send + Sync {
    fn transferred(&self, bytes_sent: u64, bytes_total: u64);
}

pub struct MemoryService {
    documents: Arc<dyn DocumentStore>,
    blobs: Arc<dyn BlobStore>,
    progress: Option<Arc<dyn ProgressObserver>>,
}

impl MemoryService {
    pub fn new(documents: Arc<dyn DocumentStore>, blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            documents,
            blobs,
            progress: None,
        }
    }

    pub fn with_progress_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.progress = Some(observer);
        self
    }

    /// Create a new memory and return its assigned id.
    ///
    /// The photo (if any) uploads before the document insert; an upload
    /// failure aborts the whole operation and no document is written.
    pub async fn create(&self, draft: MemoryDraft) -> Result<String> {
        let title = normalize_title(&draft.title)?;

        let image_url = match &draft.image {
            Some(asset) => self.upload_asset(asset).await?,
            None => String::new(),
        };

        let fields = DocumentFields {
            title,
            description: normalize_description(draft.description),
            image_url,
        };
        let id = self.documents.insert(fields).await?;
        tracing::info!(id = %id, "created memory");
        Ok(id)
    }

    /// One-shot snapshot of all memories, newest first. Re-invoke to observe
    /// later changes.
    pub async fn list(&self) -> Result<Vec<MemoryRecord>> {
        self.documents.list_created_desc().await
    }

    /// Apply a partial update; omitted fields keep their stored values.
    ///
    /// A replacement photo uploads under a fresh name before the document
    /// write. The blob it replaces stays in the store; callers that kept the
    /// old URL can delete it themselves.
    pub async fn update(&self, id: &str, patch: MemoryPatch) -> Result<()> {
        let title = match &patch.title {
            Some(title) => Some(normalize_title(title)?),
            None => None,
        };

        let image_url = match &patch.image {
            Some(asset) => Some(self.upload_asset(asset).await?),
            None => None,
        };

        let doc_patch = DocumentPatch {
            title,
            description: patch.description,
            image_url,
        };
        if doc_patch.is_empty() {
            return Ok(());
        }
        self.documents.update(id, doc_patch).await?;
        tracing::info!(id = %id, "updated memory");
        Ok(())
    }

    /// Title-only update.
    pub async fn rename(&self, id: &str, title: &str) -> Result<()> {
        self.update(id, MemoryPatch::title(title)).await
    }

    /// Delete the document, then its blob.
    ///
    /// A document-delete failure propagates and the blob is left untouched.
    /// Once the document is gone the blob delete is best effort: failures
    /// there are logged and swallowed, leaving an orphaned blob at worst.
    pub async fn delete(&self, id: &str, image_url: &str) -> Result<()> {
        self.documents.delete(id).await?;
        tracing::info!(id = %id, "deleted memory");

        if image_url.is_empty() {
            return Ok(());
        }
        match blob_path_from_url(image_url) {
            Ok(path) => {
                if let Err(e) = self.blobs.delete(&path).await {
                    tracing::warn!(id = %id, path = %path, error = %e,
                        "document deleted but blob removal failed");
                }
            }
            Err(e) => {
                tracing::warn!(id = %id, url = %image_url, error = %e,
                    "could not derive blob path from url");
            }
        }
        Ok(())
    }

    async fn upload_asset(&self, asset: &LocalAsset) -> Result<String> {
        let bytes = asset
            .read_bytes()
            .await
            .map_err(|e| Error::Upload(format!("read {}: {}", asset.path().display(), e)))?;
        let total = bytes.len() as u64;
        if let Some(observer) = &self.progress {
            observer.transferred(0, total);
        }

        let name = generate_asset_name(&asset.extension());
        let url = self.blobs.upload(&name, bytes, asset.content_type()).await?;
        if let Some(observer) = &self.progress {
            observer.transferred(total, total);
        }
        tracing::debug!(name = %name, bytes = total, "uploaded asset");
        Ok(url)
    }
}

fn normalize_title(title: &str) -> Result<String> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(Error::Validation("title must not be empty".to_string()));
    }
    Ok(trimmed.to_string())
}

fn normalize_description(description: Option<String>) -> Option<String> {
    description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::encode_blob_path;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
    use std::sync::Mutex;

    #[derive(Clone)]
    struct StoredDoc {
        id: String,
        fields: DocumentFields,
        created_at: i64,
    }

    #[derive(Default)]
    struct FakeDocuments {
        docs: Mutex<Vec<StoredDoc>>,
        clock: AtomicI64,
    }

    #[async_trait]
    impl DocumentStore for FakeDocuments {
        async fn insert(&self, fields: DocumentFields) -> Result<String> {
            let created_at = self.clock.fetch_add(1, Ordering::SeqCst);
            let id = format!("doc-{}", created_at);
            self.docs.lock().unwrap().push(StoredDoc {
                id: id.clone(),
                fields,
                created_at,
            });
            Ok(id)
        }

        async fn update(&self, id: &str, patch: DocumentPatch) -> Result<()> {
            let mut docs = self.docs.lock().unwrap();
            let doc = docs
                .iter_mut()
                .find(|d| d.id == id)
                .ok_or_else(|| Error::NotFound(format!("memory {}", id)))?;
            if let Some(title) = patch.title {
                doc.fields.title = title;
            }
            if let Some(description) = patch.description {
                doc.fields.description = Some(description);
            }
            if let Some(image_url) = patch.image_url {
                doc.fields.image_url = image_url;
            }
            Ok(())
        }

        async fn delete(&self, id: &str) -> Result<()> {
            let mut docs = self.docs.lock().unwrap();
            let before = docs.len();
            docs.retain(|d| d.id != id);
            if docs.len() == before {
                return Err(Error::NotFound(format!("memory {}", id)));
            }
            Ok(())
        }

        async fn list_created_desc(&self) -> Result<Vec<MemoryRecord>> {
            let mut docs: Vec<StoredDoc> = self.docs.lock().unwrap().clone();
            docs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(docs
                .into_iter()
                .map(|d| MemoryRecord {
                    id: d.id,
                    title: d.fields.title,
                    description: d.fields.description,
                    image_url: d.fields.image_url,
                    created_at: d.created_at,
                })
                .collect())
        }
    }

    #[derive(Default)]
    struct FakeBlobs {
        blobs: Mutex<HashMap<String, Vec<u8>>>,
        fail_delete: AtomicBool,
    }

    impl FakeBlobs {
        fn url_for(path: &str) -> String {
            format!("https://blobs.test/v0/o/{}?alt=media", encode_blob_path(path))
        }

        fn len(&self) -> usize {
            self.blobs.lock().unwrap().len()
        }

        fn contains(&self, path: &str) -> bool {
            self.blobs.lock().unwrap().contains_key(path)
        }
    }

    #[async_trait]
    impl BlobStore for FakeBlobs {
        async fn upload(&self, path: &str, bytes: Vec<u8>, _content_type: &str) -> Result<String> {
            self.blobs.lock().unwrap().insert(path.to_string(), bytes);
            Ok(Self::url_for(path))
        }

        async fn delete(&self, path: &str) -> Result<()> {
            if self.fail_delete.load(Ordering::SeqCst) {
                return Err(Error::DeleteBlob("injected failure".to_string()));
            }
            match self.blobs.lock().unwrap().remove(path) {
                Some(_) => Ok(()),
                None => Err(Error::NotFound(format!("blob {}", path))),
            }
        }

        async fn download_url(&self, path: &str) -> Result<String> {
            Ok(Self::url_for(path))
        }
    }

    struct Harness {
        service: MemoryService,
        docs: Arc<FakeDocuments>,
        blobs: Arc<FakeBlobs>,
        _dir: tempfile::TempDir,
        image: LocalAsset,
    }

    fn harness() -> Harness {
        let docs = Arc::new(FakeDocuments::default());
        let blobs = Arc::new(FakeBlobs::default());
        let service = MemoryService::new(docs.clone(), blobs.clone());

        let dir = tempfile::tempdir().unwrap();
        let image_path = dir.path().join("beach.jpg");
        std::fs::write(&image_path, b"sand and waves").unwrap();

        Harness {
            service,
            docs,
            blobs,
            _dir: dir,
            image: LocalAsset::new(image_path),
        }
    }

    #[tokio::test]
    async fn test_create_without_image() {
        let h = harness();
        let id = h.service.create(MemoryDraft::new("Trip")).await.unwrap();

        let records = h.service.list().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, id);
        assert_eq!(records[0].title, "Trip");
        assert_eq!(records[0].image_url, "");
        assert!(!records[0].has_image());
        assert_eq!(h.blobs.len(), 0);
    }

    #[tokio::test]
    async fn test_create_with_image_uploads_blob() {
        let h = harness();
        h.service
            .create(MemoryDraft::new("Trip").with_image(h.image.clone()))
            .await
            .unwrap();

        let records = h.service.list().await.unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].has_image());
        assert_eq!(h.blobs.len(), 1);

        // The stored URL resolves back to the uploaded blob.
        let path = blob_path_from_url(&records[0].image_url).unwrap();
        assert!(h.blobs.contains(&path));
        assert_eq!(
            h.blobs.blobs.lock().unwrap().get(&path).unwrap(),
            b"sand and waves"
        );
    }

    #[tokio::test]
    async fn test_empty_title_rejected_before_any_call() {
        let h = harness();
        let err = h
            .service
            .create(MemoryDraft::new("   ").with_image(h.image.clone()))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(h.docs.docs.lock().unwrap().is_empty());
        assert_eq!(h.blobs.len(), 0);
    }

    #[tokio::test]
    async fn test_upload_failure_creates_no_document() {
        let h = harness();
        let missing = LocalAsset::new("/nonexistent/beach.jpg");
        let err = h
            .service
            .create(MemoryDraft::new("Trip").with_image(missing))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Upload(_)));
        assert!(h.docs.docs.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let h = harness();
        for title in ["one", "two", "three"] {
            h.service.create(MemoryDraft::new(title)).await.unwrap();
        }

        let records = h.service.list().await.unwrap();
        let titles: Vec<&str> = records.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["three", "two", "one"]);

        h.service.create(MemoryDraft::new("four")).await.unwrap();
        let records = h.service.list().await.unwrap();
        assert_eq!(records.len(), 4);
        assert_eq!(records[0].title, "four");
    }

    #[tokio::test]
    async fn test_update_title_leaves_other_fields() {
        let h = harness();
        let id = h
            .service
            .create(
                MemoryDraft::new("Trip")
                    .with_description("beach day")
                    .with_image(h.image.clone()),
            )
            .await
            .unwrap();
        let before = h.service.list().await.unwrap().remove(0);

        h.service.rename(&id, "Holiday").await.unwrap();

        let after = h.service.list().await.unwrap().remove(0);
        assert_eq!(after.title, "Holiday");
        assert_eq!(after.description.as_deref(), Some("beach day"));
        assert_eq!(after.image_url, before.image_url);
    }

    #[tokio::test]
    async fn test_update_unknown_id() {
        let h = harness();
        let err = h.service.rename("doc-404", "x").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_update_with_image_keeps_old_blob() {
        let h = harness();
        let id = h
            .service
            .create(MemoryDraft::new("Trip").with_image(h.image.clone()))
            .await
            .unwrap();
        let old_url = h.service.list().await.unwrap().remove(0).image_url;

        h.service
            .update(
                &id,
                MemoryPatch {
                    image: Some(h.image.clone()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let new_url = h.service.list().await.unwrap().remove(0).image_url;
        assert_ne!(new_url, old_url);
        // The replaced blob is not cleaned up.
        assert_eq!(h.blobs.len(), 2);
        assert!(h.blobs.contains(&blob_path_from_url(&old_url).unwrap()));
    }

    #[tokio::test]
    async fn test_delete_removes_document_and_blob() {
        let h = harness();
        let id = h
            .service
            .create(MemoryDraft::new("Trip").with_image(h.image.clone()))
            .await
            .unwrap();
        let record = h.service.list().await.unwrap().remove(0);

        h.service.delete(&id, &record.image_url).await.unwrap();

        assert!(h.service.list().await.unwrap().is_empty());
        assert_eq!(h.blobs.len(), 0);
    }

    #[tokio::test]
    async fn test_delete_without_image_skips_blob_store() {
        let h = harness();
        let id = h.service.create(MemoryDraft::new("Trip")).await.unwrap();
        h.service.delete(&id, "").await.unwrap();
        assert!(h.service.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_blob_delete_failure_is_swallowed() {
        let h = harness();
        let id = h
            .service
            .create(MemoryDraft::new("Trip").with_image(h.image.clone()))
            .await
            .unwrap();
        let record = h.service.list().await.unwrap().remove(0);

        h.blobs.fail_delete.store(true, Ordering::SeqCst);
        h.service.delete(&id, &record.image_url).await.unwrap();

        // Document is gone; the blob is orphaned but the call succeeded.
        assert!(h.service.list().await.unwrap().is_empty());
        assert_eq!(h.blobs.len(), 1);
    }

    #[tokio::test]
    async fn test_document_delete_failure_leaves_blob() {
        let h = harness();
        h.service
            .create(MemoryDraft::new("Trip").with_image(h.image.clone()))
            .await
            .unwrap();
        let record = h.service.list().await.unwrap().remove(0);

        let err = h
            .service
            .delete("doc-404", &record.image_url)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert_eq!(h.blobs.len(), 1);
    }

    #[tokio::test]
    async fn test_local_backend_end_to_end() {
        use crate::store::fs::FsBlobStore;
        use crate::store::sqlite::SqliteDocumentStore;

        let dir = tempfile::tempdir().unwrap();
        let image_path = dir.path().join("beach.jpg");
        std::fs::write(&image_path, b"sand and waves").unwrap();

        let blob_root = dir.path().join("blobs");
        let documents: Arc<dyn DocumentStore> =
            Arc::new(SqliteDocumentStore::open(dir.path().join("memories.db")).unwrap());
        let blobs: Arc<dyn BlobStore> = Arc::new(FsBlobStore::new(
            &blob_root,
            "http://127.0.0.1:7151/media",
        ));
        let service = MemoryService::new(documents, blobs);

        let id = service
            .create(MemoryDraft::new("Trip").with_image(LocalAsset::new(&image_path)))
            .await
            .unwrap();

        let records = service.list().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "Trip");
        assert!(records[0].has_image());

        let blob_path = blob_path_from_url(&records[0].image_url).unwrap();
        assert!(blob_root.join(&blob_path).exists());

        service.delete(&id, &records[0].image_url).await.unwrap();
        assert!(service.list().await.unwrap().is_empty());
        assert!(!blob_root.join(&blob_path).exists());
    }

    #[tokio::test]
    async fn test_progress_observer_sees_completion() {
        struct Last(Mutex<Option<(u64, u64)>>);
        impl ProgressObserver for Last {
            fn transferred(&self, sent: u64, total: u64) {
                *self.0.lock().unwrap() = Some((sent, total));
            }
        }

        let h = harness();
        let last = Arc::new(Last(Mutex::new(None)));
        let service = MemoryService::new(h.docs.clone(), h.blobs.clone())
            .with_progress_observer(last.clone());

        service
            .create(MemoryDraft::new("Trip").with_image(h.image.clone()))
            .await
            .unwrap();

        let total = b"sand and waves".len() as u64;
        assert_eq!(*last.0.lock().unwrap(), Some((total, total)));
    }
}
