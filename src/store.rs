//! Durable storage of aggregated markdown documents.
//!
//! Documents live as individual files in one directory. Names combine a UTC
//! timestamp with a random UUID, so two saves never pick the same name even
//! within the same millisecond.

use std::path::{Path, PathBuf};
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::error::{Result, ZenError};

#[derive(Debug, Clone)]
pub struct DocumentStore {
    dir: PathBuf,
}

impl DocumentStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes `document` and returns the name it can be loaded back with.
    pub async fn save(&self, document: &str) -> Result<String> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| ZenError::io(&self.dir, e))?;

        let name = format!(
            "docs-{}-{}.md",
            chrono::Utc::now().format("%Y%m%dT%H%M%S%3fZ"),
            Uuid::new_v4().simple()
        );
        let path = self.dir.join(&name);
        tokio::fs::write(&path, document).await.map_err(|e| {
            error!(error = ?e, path = %path.display(), "Failed to write document");
            ZenError::io(&path, e)
        })?;
        info!(document = %name, size = document.len(), "Saved documentation");
        Ok(name)
    }

    /// Reads back a document previously returned by [`DocumentStore::save`].
    pub async fn load(&self, name: &str) -> Result<String> {
        let path = self.resolve(name)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => {
                debug!(document = %name, size = content.len(), "Loaded documentation");
                Ok(content)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ZenError::NotFound(format!("documentation file {name}")))
            }
            Err(e) => Err(ZenError::io(path, e)),
        }
    }

    fn resolve(&self, name: &str) -> Result<PathBuf> {
        let plain = !name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains(['/', '\\'])
            && !name.contains("..");
        if !plain {
            return Err(ZenError::InvalidInput(format!(
                "invalid document name: {name:?}"
            )));
        }
        Ok(self.dir.join(name))
    }
}
