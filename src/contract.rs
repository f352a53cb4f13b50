//! # contract: data passed between stages and the collaborator traits
//!
//! The workflow reaches two external services, the text generation service and
//! the object store. Both sit behind a trait here so the pipeline can run
//! against real HTTP clients, local stand-ins or `mockall` mocks.
//!
//! ## Mocking & Testing
//! - Traits are annotated with `automock`; enable the `test-export-mocks`
//!   feature (on by default) to use `MockTextGenerator` / `MockObjectStore`
//!   from integration tests.

use async_trait::async_trait;
use mockall::automock;
use serde::Serialize;
use std::path::PathBuf;

use crate::error::BoxError;

/// A discovered source file with its full text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub content: String,
}

impl SourceFile {
    /// Base name of the file, lossily converted for display.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.to_string_lossy().into_owned())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocStatus {
    Success,
    Error,
}

/// Generated documentation for one source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocEntry {
    pub file_name: String,
    pub full_path: String,
    pub summary: String,
    pub status: DocStatus,
}

impl DocEntry {
    pub fn is_success(&self) -> bool {
        self.status == DocStatus::Success
    }
}

/// Result of one upload-to-document run.
#[derive(Debug, Clone)]
pub struct GenerationReport {
    /// Name of the stored markdown document.
    pub document: String,
    /// Full aggregated markdown.
    pub documentation: String,
    /// One entry per discovered file, in discovery order.
    pub entries: Vec<DocEntry>,
}

impl GenerationReport {
    pub fn processed_files(&self) -> usize {
        self.entries.len()
    }

    pub fn successful_files(&self) -> usize {
        self.entries.iter().filter(|e| e.is_success()).count()
    }
}

/// Trait for the external text generation service.
///
/// `Ok(None)` means the service answered successfully but without any content;
/// the pipeline substitutes a placeholder for it.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<Option<String>, BoxError>;
}

/// Handle of an object stored in the object store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectHandle {
    pub key: String,
}

/// Trait for the remote object store used by the publish path.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `bytes` under `key`, returning the handle of the created object.
    async fn upload(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<ObjectHandle, BoxError>;

    /// Public retrieval URL of an uploaded object.
    fn public_url(&self, handle: &ObjectHandle) -> String;
}
