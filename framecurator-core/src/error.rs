//! Error types for the framecurator-core library.
//!
//! The variants follow the failure taxonomy of the curation pipeline:
//! asset errors and frame decode errors are recovered inside a lane, invalid
//! annotations are dropped individually, and configuration errors abort the
//! run before any work starts.

use std::path::PathBuf;
use thiserror::Error;

/// Custom error types for framecurator-core
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Failed to open video asset '{id}': {reason}")]
    AssetOpen { id: String, reason: String },

    #[error("Failed to decode frame {index} of '{id}': {reason}")]
    FrameDecode {
        id: String,
        index: u64,
        reason: String,
    },

    #[error("Invalid annotation: {0}")]
    InvalidAnnotation(String),

    #[error("Augmented annotation violates box invariants: {0}")]
    AnnotationInvariant(String),

    #[error("Invalid provenance string: {0}")]
    Provenance(String),

    #[error("No processable files found in {0}")]
    NoFilesFound(PathBuf),

    #[error("Path error: {0}")]
    PathError(String),

    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

/// Result type for framecurator-core operations
pub type CoreResult<T> = std::result::Result<T, CoreError>;

/// Shorthand for a configuration error with a formatted message.
pub(crate) fn config_error(message: impl Into<String>) -> CoreError {
    CoreError::Config(message.into())
}
