//! Error types for document loading and chunking.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for ingest operations.
pub type Result<T> = std::result::Result<T, IngestError>;

#[derive(Debug, Error)]
pub enum IngestError {
    /// Source directory is missing, not a directory, or cannot be listed.
    #[error("Document directory not found or not listable: {path}")]
    DirectoryNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A single file could not be read as text.
    #[error("Failed to read document: {path}")]
    UnreadableDocument {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Listing and reading the directory took longer than the configured limit.
    #[error("Loading documents from {path} timed out after {timeout_secs}s")]
    LoadTimeout { path: PathBuf, timeout_secs: u64 },

    #[error("Invalid chunk config (chunk_size={chunk_size}, chunk_overlap={chunk_overlap}): {reason}")]
    InvalidChunkConfig {
        chunk_size: usize,
        chunk_overlap: usize,
        reason: &'static str,
    },
}

impl IngestError {
    /// Path of the offending file or directory, if the error concerns one.
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::DirectoryNotFound { path, .. }
            | Self::UnreadableDocument { path, .. }
            | Self::LoadTimeout { path, .. } => Some(path),
            Self::InvalidChunkConfig { .. } => None,
        }
    }
}
