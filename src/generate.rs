//! Per-file documentation generation.
//!
//! Files are documented strictly one after another. Each generation call is
//! bounded by a timeout, and after every call (successful or not) the pipeline
//! idles for the pacing interval so the generation service never sees more
//! than one request per call latency plus that interval. A failed call never
//! aborts the run: it becomes a [`DocEntry`] with [`DocStatus::Error`] and a
//! placeholder summary naming the reason.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::contract::{DocEntry, DocStatus, SourceFile, TextGenerator};

/// Summary used when the service answers without any content.
pub const EMPTY_SUMMARY: &str = "No summary returned";

/// Prefix of the summary recorded for a failed file.
pub const FAILURE_MARKER: &str = "⚠️ Failed to generate documentation";

/// Timing knobs of the pipeline.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Idle time after every generation call.
    pub pacing_interval: Duration,
    /// Upper bound for a single generation call.
    pub request_timeout: Duration,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            pacing_interval: Duration::from_millis(2000),
            request_timeout: Duration::from_millis(60_000),
        }
    }
}

/// Process-wide gate that keeps generation runs from overlapping.
///
/// Every request clones the same lane, so two uploads processed at once still
/// hit the generation service one file at a time.
#[derive(Debug, Clone)]
pub struct GenerationLane {
    permits: Arc<Semaphore>,
}

impl GenerationLane {
    pub fn new() -> Self {
        Self {
            permits: Arc::new(Semaphore::new(1)),
        }
    }

    /// Runs `generate_docs` once the lane is free.
    pub async fn run(
        &self,
        files: &[SourceFile],
        generator: &dyn TextGenerator,
        settings: &PipelineSettings,
    ) -> Vec<DocEntry> {
        // The semaphore is never closed, acquiring can only wait.
        let _permit = self.permits.acquire().await;
        generate_docs(files, generator, settings).await
    }
}

impl Default for GenerationLane {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds the prompt sent to the generation service for one file.
pub fn build_prompt(source: &str) -> String {
    format!(
        "Generate clean, readable, and well-structured documentation for the following source code. Include:\n\
         - Purpose\n\
         - Functionality\n\
         - Parameters and return values\n\
         - Example usages\n\
         - Any dependencies\n\
         \n\
         Format the response in clean markdown.\n\
         \n\
         Code:\n\
         ```\n\
         {source}\n\
         ```"
    )
}

/// Documents every file in order and returns exactly one entry per file.
pub async fn generate_docs(
    files: &[SourceFile],
    generator: &dyn TextGenerator,
    settings: &PipelineSettings,
) -> Vec<DocEntry> {
    info!(count = files.len(), "Starting documentation generation");
    let mut entries = Vec::with_capacity(files.len());

    for file in files {
        let file_name = file.file_name();
        let full_path = file.path.display().to_string();
        info!(file = %file_name, "Processing file");

        let prompt = build_prompt(&file.content);
        let outcome =
            tokio::time::timeout(settings.request_timeout, generator.generate(&prompt)).await;

        let entry = match outcome {
            Ok(Ok(content)) => {
                let summary = match content {
                    Some(text) if !text.is_empty() => text,
                    _ => {
                        warn!(file = %file_name, "Generation service returned no content");
                        EMPTY_SUMMARY.to_string()
                    }
                };
                info!(file = %file_name, "Documented file");
                DocEntry {
                    file_name,
                    full_path,
                    summary,
                    status: DocStatus::Success,
                }
            }
            Ok(Err(e)) => {
                error!(file = %full_path, error = %e, "Generation failed");
                failed_entry(file_name, full_path, &e.to_string())
            }
            Err(_) => {
                let reason = format!(
                    "timeout of {}ms exceeded",
                    settings.request_timeout.as_millis()
                );
                error!(file = %full_path, %reason, "Generation timed out");
                failed_entry(file_name, full_path, &reason)
            }
        };
        entries.push(entry);

        tokio::time::sleep(settings.pacing_interval).await;
    }

    let successful = entries.iter().filter(|e| e.is_success()).count();
    info!(
        processed = entries.len(),
        successful, "Documentation generation finished"
    );
    entries
}

fn failed_entry(file_name: String, full_path: String, reason: &str) -> DocEntry {
    DocEntry {
        file_name,
        full_path,
        summary: format!("{FAILURE_MARKER}: {reason}"),
        status: DocStatus::Error,
    }
}
