//! HTTP clients for a hosted document and blob backend.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;

use super::{encode_blob_path, BlobStore, DocumentFields, DocumentPatch, DocumentStore, OBJECT_MARKER};
use crate::error::{Error, Result};
use crate::record::MemoryRecord;

/// Remote document collection over JSON/HTTP.
pub struct HttpDocumentStore {
    client: Client,
    base_url: String,
    collection: String,
    api_token: Option<String>,
}

#[derive(Deserialize)]
struct InsertResponse {
    id: String,
}

#[derive(Deserialize)]
struct ListResponse {
    documents: Vec<MemoryRecord>,
}

impl HttpDocumentStore {
    pub fn new(
        base_url: impl Into<String>,
        collection: impl Into<String>,
        api_token: Option<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            collection: collection.into(),
            api_token,
        }
    }

    fn documents_url(&self) -> String {
        format!("{}/collections/{}/documents", self.base_url, self.collection)
    }

    fn document_url(&self, id: &str) -> String {
        format!("{}/{}", self.documents_url(), id)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl DocumentStore for HttpDocumentStore {
    async fn insert(&self, fields: DocumentFields) -> Result<String> {
        let response = self
            .authorize(self.client.post(self.documents_url()).json(&fields))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Error::Write(format!(
                "insert returned {}",
                response.status()
            )));
        }
        let body: InsertResponse = response.json().await?;
        Ok(body.id)
    }

    async fn update(&self, id: &str, patch: DocumentPatch) -> Result<()> {
        let response = self
            .authorize(self.client.patch(self.document_url(id)).json(&patch))
            .send()
            .await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(Error::NotFound(format!("memory {}", id)));
        }
        if !status.is_success() {
            return Err(Error::Write(format!("update returned {}", status)));
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let response = self
            .authorize(self.client.delete(self.document_url(id)))
            .send()
            .await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(Error::NotFound(format!("memory {}", id)));
        }
        if !status.is_success() {
            return Err(Error::DeleteDocument(format!("delete returned {}", status)));
        }
        Ok(())
    }

    async fn list_created_desc(&self) -> Result<Vec<MemoryRecord>> {
        let url = format!(
            "{}?order_by=created_at&direction=desc",
            self.documents_url()
        );
        let response = self.authorize(self.client.get(url)).send().await?;
        if !response.status().is_success() {
            return Err(Error::Other(format!("list returned {}", response.status())));
        }
        let body: ListResponse = response.json().await?;
        Ok(body.documents)
    }
}

/// Remote blob bucket addressed by percent-encoded object path.
pub struct HttpBlobStore {
    client: Client,
    base_url: String,
    api_token: Option<String>,
}

impl HttpBlobStore {
    pub fn new(base_url: impl Into<String>, api_token: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_token,
        }
    }

    fn object_url(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, OBJECT_MARKER, encode_blob_path(path))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<String> {
        let response = self
            .authorize(
                self.client
                    .post(self.object_url(path))
                    .header(CONTENT_TYPE, content_type)
                    .body(bytes),
            )
            .send()
            .await
            .map_err(|e| Error::Upload(e.to_string()))?;
        if !response.status().is_success() {
            return Err(Error::Upload(format!(
                "upload returned {}",
                response.status()
            )));
        }
        Ok(format!("{}?alt=media", self.object_url(path)))
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let response = self
            .authorize(self.client.delete(self.object_url(path)))
            .send()
            .await
            .map_err(|e| Error::DeleteBlob(e.to_string()))?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(Error::NotFound(format!("blob {}", path)));
        }
        if !status.is_success() {
            return Err(Error::DeleteBlob(format!("delete returned {}", status)));
        }
        Ok(())
    }

    async fn download_url(&self, path: &str) -> Result<String> {
        Ok(format!("{}?alt=media", self.object_url(path)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_urls() {
        let store = HttpDocumentStore::new("https://api.example.com/", "memories", None);
        assert_eq!(
            store.documents_url(),
            "https://api.example.com/collections/memories/documents"
        );
        assert_eq!(
            store.document_url("abc"),
            "https://api.example.com/collections/memories/documents/abc"
        );
    }

    #[test]
    fn test_object_url_encodes_path() {
        let store = HttpBlobStore::new("https://blobs.example.com", None);
        assert_eq!(
            store.object_url("images/a b.jpg"),
            "https://blobs.example.com/o/images%2Fa%20b.jpg"
        );
    }
}
