//! Object store backends for published renderings.
//!
//! - [`HttpObjectStore`] talks to a storage REST API in the style of Supabase
//!   Storage: `POST {base}/object/{bucket}/{key}` to upload and
//!   `{base}/object/public/{bucket}/{key}` to read publicly.
//! - [`LocalObjectStore`] copies objects into a directory that some web server
//!   exposes under a base URL. Used when no remote store is configured.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

use crate::contract::{ObjectHandle, ObjectStore};
use crate::error::BoxError;
use crate::load_config::StorageConfig;

/// Picks the object store described by the configuration.
pub fn from_config(storage: &StorageConfig) -> Arc<dyn ObjectStore> {
    match storage {
        StorageConfig::Http {
            base_url,
            bucket,
            api_key,
        } => Arc::new(HttpObjectStore::new(
            base_url.as_str(),
            bucket.as_str(),
            api_key.clone(),
        )),
        StorageConfig::Local {
            dir,
            public_base_url,
        } => Arc::new(LocalObjectStore::new(dir.clone(), public_base_url.as_str())),
    }
}

pub struct HttpObjectStore {
    base_url: String,
    bucket: String,
    api_key: SecretString,
    client: reqwest::Client,
}

impl std::fmt::Debug for HttpObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpObjectStore")
            .field("base_url", &self.base_url)
            .field("bucket", &self.bucket)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl HttpObjectStore {
    pub fn new(
        base_url: impl Into<String>,
        bucket: impl Into<String>,
        api_key: SecretString,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            bucket: bucket.into(),
            api_key,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn upload(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<ObjectHandle, BoxError> {
        let url = format!("{}/object/{}/{}", self.base_url, self.bucket, key);
        info!(url = %url, size = bytes.len(), "Uploading object");

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.api_key.expose_secret())
            .header("Content-Type", content_type)
            .header("x-upsert", "false")
            .body(bytes)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %body, key, "Object store rejected upload");
            return Err(format!(
                "upload of {key} failed with status {}: {body}",
                status.as_u16()
            )
            .into());
        }
        Ok(ObjectHandle {
            key: key.to_string(),
        })
    }

    fn public_url(&self, handle: &ObjectHandle) -> String {
        format!(
            "{}/object/public/{}/{}",
            self.base_url, self.bucket, handle.key
        )
    }
}

#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    dir: PathBuf,
    public_base_url: String,
}

impl LocalObjectStore {
    pub fn new(dir: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn upload(
        &self,
        key: &str,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<ObjectHandle, BoxError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(key);
        tokio::fs::write(&path, bytes).await?;
        info!(path = %path.display(), "Stored object locally");
        Ok(ObjectHandle {
            key: key.to_string(),
        })
    }

    fn public_url(&self, handle: &ObjectHandle) -> String {
        format!("{}/{}", self.public_base_url, handle.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn local_store_writes_and_builds_url() {
        let dir = tempdir().unwrap();
        let store =
            LocalObjectStore::new(dir.path().join("public"), "http://localhost:5000/files/");
        let handle = store
            .upload("doc.pdf", b"%PDF-1.7".to_vec(), "application/pdf")
            .await
            .unwrap();
        assert_eq!(
            std::fs::read(dir.path().join("public/doc.pdf")).unwrap(),
            b"%PDF-1.7"
        );
        assert_eq!(store.public_url(&handle), "http://localhost:5000/files/doc.pdf");
    }

    #[test]
    fn http_store_public_url_layout() {
        let store = HttpObjectStore::new(
            "https://proj.supabase.co/storage/v1/",
            "docs",
            SecretString::from("key"),
        );
        let url = store.public_url(&ObjectHandle {
            key: "a.pdf".into(),
        });
        assert_eq!(url, "https://proj.supabase.co/storage/v1/object/public/docs/a.pdf");
    }
}
