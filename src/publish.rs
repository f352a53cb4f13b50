//! Render a stored document to PDF and publish it to the object store.
//!
//! The rendering is written to the renderings directory first, uploaded from
//! there, and the local file is removed whether the upload worked or not.

use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::contract::ObjectStore;
use crate::error::{Result, ZenError};
use crate::render::{render_markdown, RenderTheme};

pub struct Publisher {
    store: Arc<dyn ObjectStore>,
    renderings_dir: PathBuf,
    theme: RenderTheme,
}

impl Publisher {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        renderings_dir: impl Into<PathBuf>,
        theme: RenderTheme,
    ) -> Self {
        Self {
            store,
            renderings_dir: renderings_dir.into(),
            theme,
        }
    }

    /// Renders `document` and returns the public URL of the uploaded PDF.
    pub async fn render_and_publish(&self, document: &str) -> Result<String> {
        let markdown = document.to_string();
        let theme = self.theme.clone();
        let bytes = tokio::task::spawn_blocking(move || render_markdown(&markdown, &theme))
            .await
            .map_err(|e| ZenError::Unexpected(format!("render task failed: {e}")))??;

        tokio::fs::create_dir_all(&self.renderings_dir)
            .await
            .map_err(|e| ZenError::io(&self.renderings_dir, e))?;
        let local = tempfile::Builder::new()
            .prefix("rendering-")
            .suffix(".pdf")
            .tempfile_in(&self.renderings_dir)
            .map_err(|e| ZenError::io(&self.renderings_dir, e))?;
        tokio::fs::write(local.path(), &bytes)
            .await
            .map_err(|e| ZenError::io(local.path(), e))?;
        info!(path = %local.path().display(), size = bytes.len(), "Wrote rendering");

        let key = format!(
            "{}-{}-documentation.pdf",
            chrono::Utc::now().timestamp_millis(),
            Uuid::new_v4().simple()
        );
        let contents = tokio::fs::read(local.path())
            .await
            .map_err(|e| ZenError::io(local.path(), e))?;
        let upload = self.store.upload(&key, contents, "application/pdf").await;

        let local_path = local.path().to_path_buf();
        if let Err(e) = local.close() {
            warn!(error = ?e, path = %local_path.display(), "Failed to remove local rendering");
        }

        let handle = upload.map_err(|e| {
            error!(error = %e, key = %key, "Publishing rendering failed");
            ZenError::Upstream(e.to_string())
        })?;
        let url = self.store.public_url(&handle);
        info!(url = %url, "Published rendering");
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{MockObjectStore, ObjectHandle};
    use tempfile::tempdir;

    #[tokio::test]
    async fn uploads_pdf_and_cleans_up() {
        let dir = tempdir().unwrap();
        let mut store = MockObjectStore::new();
        store
            .expect_upload()
            .withf(|key, bytes, content_type| {
                key.ends_with("-documentation.pdf")
                    && bytes.starts_with(b"%PDF")
                    && content_type.eq_ignore_ascii_case("application/pdf")
            })
            .times(1)
            .returning(|key, _, _| {
                Ok(ObjectHandle {
                    key: key.to_string(),
                })
            });
        store
            .expect_public_url()
            .returning(|h| format!("https://cdn.example/{}", h.key));

        let renderings = dir.path().join("renderings");
        let publisher = Publisher::new(Arc::new(store), &renderings, RenderTheme::default());
        let url = publisher.render_and_publish("## a.js\n\ntext").await.unwrap();

        assert!(url.starts_with("https://cdn.example/"));
        assert_eq!(std::fs::read_dir(&renderings).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn upload_failure_is_fatal_and_still_cleans_up() {
        let dir = tempdir().unwrap();
        let mut store = MockObjectStore::new();
        store
            .expect_upload()
            .returning(|_, _, _| Err("bucket quota exceeded".into()));
        store.expect_public_url().never();

        let renderings = dir.path().join("renderings");
        let publisher = Publisher::new(Arc::new(store), &renderings, RenderTheme::default());
        let err = publisher.render_and_publish("text").await.unwrap_err();

        assert!(matches!(err, ZenError::Upstream(ref m) if m.contains("quota")));
        assert_eq!(std::fs::read_dir(&renderings).unwrap().count(), 0);
    }
}
