use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::{PipelineError, Result};

/// Upload payload carrying explicit content-type metadata.
#[derive(Debug, Clone)]
pub enum Payload {
    /// Tabular text, uploaded as `text/csv`.
    Text(String),
    /// Raw bytes, uploaded as `application/octet-stream`.
    Binary(Vec<u8>),
}

impl Payload {
    pub fn content_type(&self) -> &'static str {
        match self {
            Payload::Text(_) => "text/csv",
            Payload::Binary(_) => "application/octet-stream",
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Payload::Text(text) => text.into_bytes(),
            Payload::Binary(bytes) => bytes,
        }
    }
}

/// Outcome of a best-effort delete. Absence and transport failures are
/// logged by the implementation and never raised.
#[derive(Debug, Clone, PartialEq)]
pub enum DeleteOutcome {
    Deleted,
    Missing,
    Failed(String),
}

/// Object-store collaborator consumed by the pipeline core.
#[async_trait]
pub trait ObjectStorePort: Send + Sync {
    /// Object names under `prefix`, excluding pseudo-directory markers.
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;

    /// Download an object's bytes to a local scratch path.
    async fn download(&self, object: &str, local_path: &Path) -> Result<()>;

    async fn upload(&self, object: &str, payload: Payload) -> Result<()>;

    async fn exists(&self, object: &str) -> Result<bool>;

    async fn delete(&self, object: &str) -> DeleteOutcome;
}

/// In-memory object store for development and testing.
pub struct InMemoryObjectStore {
    objects: Arc<Mutex<BTreeMap<String, Vec<u8>>>>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self {
            objects: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }

    /// Seed an object directly, bypassing the upload path.
    pub fn put(&self, object: &str, bytes: Vec<u8>) {
        let mut objects = self.objects.lock().unwrap();
        objects.insert(object.to_string(), bytes);
    }

    pub fn get(&self, object: &str) -> Option<Vec<u8>> {
        let objects = self.objects.lock().unwrap();
        objects.get(object).cloned()
    }

    pub fn object_names(&self) -> Vec<String> {
        let objects = self.objects.lock().unwrap();
        objects.keys().cloned().collect()
    }
}

#[async_trait]
impl ObjectStorePort for InMemoryObjectStore {
    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let objects = self.objects.lock().unwrap();
        Ok(objects
            .keys()
            .filter(|name| name.starts_with(prefix) && !name.ends_with('/'))
            .cloned()
            .collect())
    }

    async fn download(&self, object: &str, local_path: &Path) -> Result<()> {
        let bytes = self.get(object).ok_or_else(|| PipelineError::Fetch {
            object: object.to_string(),
            message: "object not found".to_string(),
        })?;
        fs::write(local_path, bytes)?;
        debug!("📥 {} downloaded to {}", object, local_path.display());
        Ok(())
    }

    async fn upload(&self, object: &str, payload: Payload) -> Result<()> {
        self.put(object, payload.into_bytes());
        debug!("📤 {} uploaded", object);
        Ok(())
    }

    async fn exists(&self, object: &str) -> Result<bool> {
        Ok(self.get(object).is_some())
    }

    async fn delete(&self, object: &str) -> DeleteOutcome {
        let mut objects = self.objects.lock().unwrap();
        match objects.remove(object) {
            Some(_) => {
                info!("🗑️ deleted {}", object);
                DeleteOutcome::Deleted
            }
            None => {
                info!("{} does not exist in the bucket", object);
                DeleteOutcome::Missing
            }
        }
    }
}

/// Google Cloud Storage adapter speaking the JSON API over HTTPS.
///
/// Authenticates with a bearer token from `GCP_BEARER_TOKEN` when set;
/// public buckets work unauthenticated.
pub struct GcsObjectStore {
    client: reqwest::Client,
    base_url: String,
    bucket: String,
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    items: Vec<ObjectMeta>,
}

#[derive(Debug, Deserialize)]
struct ObjectMeta {
    name: String,
}

impl GcsObjectStore {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self::with_base_url(bucket, "https://storage.googleapis.com")
    }

    pub fn with_base_url(bucket: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            bucket: bucket.into(),
            token: std::env::var("GCP_BEARER_TOKEN").ok(),
        }
    }

    fn object_url(&self, object: &str) -> String {
        format!(
            "{}/storage/v1/b/{}/o/{}",
            self.base_url,
            self.bucket,
            urlencoding::encode(object)
        )
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.header("Authorization", format!("Bearer {token}")),
            None => request,
        }
    }
}

#[async_trait]
impl ObjectStorePort for GcsObjectStore {
    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let url = format!("{}/storage/v1/b/{}/o", self.base_url, self.bucket);
        let response = self
            .authorize(self.client.get(&url))
            .query(&[("prefix", prefix)])
            .send()
            .await?
            .error_for_status()?;
        let listing: ListResponse = response.json().await?;
        Ok(listing
            .items
            .into_iter()
            .map(|item| item.name)
            .filter(|name| !name.ends_with('/'))
            .collect())
    }

    async fn download(&self, object: &str, local_path: &Path) -> Result<()> {
        let response = self
            .authorize(self.client.get(self.object_url(object)))
            .query(&[("alt", "media")])
            .send()
            .await
            .map_err(|e| PipelineError::Fetch {
                object: object.to_string(),
                message: e.to_string(),
            })?;
        if !response.status().is_success() {
            return Err(PipelineError::Fetch {
                object: object.to_string(),
                message: format!("status {}", response.status()),
            });
        }
        let bytes = response.bytes().await.map_err(|e| PipelineError::Fetch {
            object: object.to_string(),
            message: e.to_string(),
        })?;
        fs::write(local_path, &bytes)?;
        info!("📥 {} downloaded to {}", object, local_path.display());
        Ok(())
    }

    async fn upload(&self, object: &str, payload: Payload) -> Result<()> {
        let url = format!("{}/upload/storage/v1/b/{}/o", self.base_url, self.bucket);
        let content_type = payload.content_type();
        self.authorize(self.client.post(&url))
            .query(&[("uploadType", "media"), ("name", object)])
            .header("Content-Type", content_type)
            .body(payload.into_bytes())
            .send()
            .await?
            .error_for_status()?;
        info!("📤 {} uploaded to bucket {}", object, self.bucket);
        Ok(())
    }

    async fn exists(&self, object: &str) -> Result<bool> {
        let response = self
            .authorize(self.client.get(self.object_url(object)))
            .send()
            .await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(false);
        }
        response.error_for_status()?;
        Ok(true)
    }

    async fn delete(&self, object: &str) -> DeleteOutcome {
        let response = match self
            .authorize(self.client.delete(self.object_url(object)))
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!("❌ delete of {} failed: {}", object, e);
                return DeleteOutcome::Failed(e.to_string());
            }
        };
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            info!("{} does not exist in the bucket", object);
            return DeleteOutcome::Missing;
        }
        if response.status().is_success() {
            info!("🗑️ deleted {}", object);
            DeleteOutcome::Deleted
        } else {
            warn!("❌ delete of {} returned status {}", object, response.status());
            DeleteOutcome::Failed(format!("status {}", response.status()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn list_respects_prefix_and_skips_directory_markers() {
        let store = InMemoryObjectStore::new();
        store.put("input/", Vec::new());
        store.put("input/a.csv", b"a".to_vec());
        store.put("input/b.csv", b"b".to_vec());
        store.put("done/c.csv", b"c".to_vec());

        let names = store.list("input/").await.unwrap();
        assert_eq!(names, vec!["input/a.csv", "input/b.csv"]);
    }

    #[tokio::test]
    async fn download_of_missing_object_is_a_fetch_error() {
        let store = InMemoryObjectStore::new();
        let scratch = std::env::temp_dir().join("store-test-missing.csv");
        let err = store.download("input/nope.csv", &scratch).await.unwrap_err();
        assert!(matches!(err, PipelineError::Fetch { .. }));
    }

    #[tokio::test]
    async fn exists_tracks_upload_and_delete() {
        let store = InMemoryObjectStore::new();
        assert!(!store.exists("done/a.csv").await.unwrap());
        store
            .upload("done/a.csv", Payload::Text("a,b\n1,2\n".to_string()))
            .await
            .unwrap();
        assert!(store.exists("done/a.csv").await.unwrap());
        assert_eq!(store.delete("done/a.csv").await, DeleteOutcome::Deleted);
        assert!(!store.exists("done/a.csv").await.unwrap());
    }

    #[tokio::test]
    async fn delete_reports_missing_without_error() {
        let store = InMemoryObjectStore::new();
        store.put("clean/x.csv", b"x".to_vec());
        assert_eq!(store.delete("clean/x.csv").await, DeleteOutcome::Deleted);
        assert_eq!(store.delete("clean/x.csv").await, DeleteOutcome::Missing);
    }

    #[tokio::test]
    async fn text_payload_carries_csv_content_type() {
        let payload = Payload::Text("a,b\n".to_string());
        assert_eq!(payload.content_type(), "text/csv");
        assert_eq!(Payload::Binary(vec![1]).content_type(), "application/octet-stream");
    }
}
