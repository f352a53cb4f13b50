//! Orchestrates one documentation request:
//! upload → extract → discover → generate → aggregate → store → cleanup.
//!
//! # Responsibilities
//! - Fail fast when the generation service credential is missing, before any
//!   file is touched.
//! - Give every request its own working directory (UUID named) under the
//!   configured data directory.
//! - Route all generation through the shared [`GenerationLane`].
//! - Remove the uploaded archive and the extracted tree afterwards; failures
//!   while cleaning up are logged and otherwise ignored.
//!
//! # Error Handling
//! Per-file generation failures end up in the report. Anything else (bad
//! archive, no matching files, I/O) aborts the request with a [`ZenError`].

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::aggregate::aggregate;
use crate::contract::{GenerationReport, TextGenerator};
use crate::discover::discover;
use crate::error::{Result, ZenError};
use crate::extract::extract_archive;
use crate::generate::GenerationLane;
use crate::load_config::AppConfig;
use crate::openrouter::OpenRouterClient;
use crate::store::DocumentStore;

pub struct Workflow {
    config: Arc<AppConfig>,
    generator: Option<Arc<dyn TextGenerator>>,
    documents: DocumentStore,
    lane: GenerationLane,
}

impl Workflow {
    /// Builds a workflow around an explicit generator. `None` means the
    /// generation service is not configured.
    pub fn new(config: AppConfig, generator: Option<Arc<dyn TextGenerator>>) -> Self {
        let documents = DocumentStore::new(config.generated_docs_dir());
        Self {
            config: Arc::new(config),
            generator,
            documents,
            lane: GenerationLane::new(),
        }
    }

    /// Builds a workflow talking to the configured OpenRouter endpoint.
    pub fn from_config(config: AppConfig) -> Result<Self> {
        let generator: Option<Arc<dyn TextGenerator>> = match &config.api_key {
            Some(key) => Some(Arc::new(OpenRouterClient::new(
                key.clone(),
                config.generator.clone(),
            )?)),
            None => None,
        };
        Ok(Self::new(config, generator))
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn documents(&self) -> &DocumentStore {
        &self.documents
    }

    fn generator(&self) -> Result<&Arc<dyn TextGenerator>> {
        self.generator.as_ref().ok_or_else(|| {
            error!("Generation requested without OPENROUTER_API_KEY");
            ZenError::MissingConfig("OPENROUTER_API_KEY")
        })
    }

    /// Persists an uploaded archive and documents its contents.
    pub async fn generate_from_upload(
        &self,
        original_name: &str,
        bytes: &[u8],
    ) -> Result<GenerationReport> {
        self.generator()?;

        let uploads = self.config.uploads_dir();
        tokio::fs::create_dir_all(&uploads)
            .await
            .map_err(|e| ZenError::io(&uploads, e))?;
        let upload_path = uploads.join(format!(
            "{}-{}",
            Uuid::new_v4().simple(),
            sanitize_file_name(original_name)
        ));
        tokio::fs::write(&upload_path, bytes)
            .await
            .map_err(|e| ZenError::io(&upload_path, e))?;
        info!(path = %upload_path.display(), size = bytes.len(), "Stored upload");

        let result = self.generate_from_archive(&upload_path).await;
        remove_quietly(&upload_path).await;
        result
    }

    /// Documents every matching file in `archive`.
    pub async fn generate_from_archive(&self, archive: &Path) -> Result<GenerationReport> {
        let generator = self.generator()?.clone();
        info!(archive = %archive.display(), "Starting documentation generation");

        let work_dir = self
            .config
            .parsed_code_dir()
            .join(Uuid::new_v4().simple().to_string());
        let result = self.run_in(archive, &work_dir, generator.as_ref()).await;
        remove_quietly(&work_dir).await;

        match &result {
            Ok(report) => info!(
                document = %report.document,
                processed = report.processed_files(),
                successful = report.successful_files(),
                "Documentation generated successfully"
            ),
            Err(e) => error!(error = %e, "Documentation generation failed"),
        }
        result
    }

    async fn run_in(
        &self,
        archive: &Path,
        work_dir: &Path,
        generator: &dyn TextGenerator,
    ) -> Result<GenerationReport> {
        let archive: PathBuf = archive.to_path_buf();
        let target = work_dir.to_path_buf();
        let extensions = self.config.extensions.clone();

        let files = tokio::task::spawn_blocking(move || {
            extract_archive(&archive, &target)?;
            discover(&target, &extensions)
        })
        .await
        .map_err(|e| ZenError::Unexpected(format!("extraction task failed: {e}")))??;

        if files.is_empty() {
            warn!("Upload contains no matching files");
            return Err(ZenError::NoMatchingFiles {
                extensions: self.config.extensions.clone(),
            });
        }
        info!(count = files.len(), "Found files to process");

        let entries = self
            .lane
            .run(&files, generator, &self.config.pipeline)
            .await;
        let documentation = aggregate(&entries);
        let document = self.documents.save(&documentation).await?;

        Ok(GenerationReport {
            document,
            documentation,
            entries,
        })
    }
}

/// Keeps only the final path component of an uploaded file name.
fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .filter(|c| !c.is_control())
        .collect::<String>()
        .trim_start_matches('.')
        .to_string();
    if cleaned.is_empty() {
        "upload.zip".to_string()
    } else {
        cleaned
    }
}

async fn remove_quietly(path: &Path) {
    let outcome = match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_dir() => tokio::fs::remove_dir_all(path).await,
        Ok(_) => tokio::fs::remove_file(path).await,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    };
    if let Err(e) = outcome {
        warn!(error = ?e, path = %path.display(), "Failed to clean up temporary files");
    }
}
