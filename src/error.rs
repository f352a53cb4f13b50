//! Error type shared by every stage of the documentation workflow.
//!
//! Per-file generation failures never show up here: the pipeline turns them
//! into [`crate::contract::DocEntry`] values with an error status. Everything
//! below aborts the request it happens in.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ZenError>;

/// Boxed error returned by external collaborators (generation service, object store).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum ZenError {
    /// The caller sent something unusable (no upload, bad document name).
    #[error("{0}")]
    InvalidInput(String),

    /// Discovery finished without a single file matching the configured suffixes.
    #[error("no files matching {extensions:?} found in upload")]
    NoMatchingFiles { extensions: Vec<String> },

    /// Required configuration value is absent.
    #[error("missing configuration: {0}")]
    MissingConfig(&'static str),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("failed to read archive {path}: {message}")]
    Archive { path: PathBuf, message: String },

    /// Generation service or object store failure outside the per-file path.
    #[error("upstream service failed: {0}")]
    Upstream(String),

    #[error("failed to render document: {0}")]
    Render(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl ZenError {
    /// Wraps an I/O error together with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ZenError::Io {
            path: path.into(),
            source,
        }
    }

    /// True for caller mistakes that the HTTP layer answers with 400.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ZenError::InvalidInput(_) | ZenError::NoMatchingFiles { .. } | ZenError::Archive { .. }
        )
    }
}
