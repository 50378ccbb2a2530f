use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::chunker::{ChunkerConfig, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use crate::error::Result;
use crate::reader::{DEFAULT_EXTENSIONS, DocumentLoader, UnreadablePolicy};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub data_directory: PathBuf,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub extensions: Vec<String>,
    pub on_unreadable: UnreadablePolicy,
    /// Upper bound on the loading step. Chunking is not covered.
    pub load_timeout_secs: Option<u64>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            data_directory: PathBuf::from("data"),
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            on_unreadable: UnreadablePolicy::Abort,
            load_timeout_secs: Some(30),
        }
    }
}

impl IngestConfig {
    pub fn chunker_config(&self) -> ChunkerConfig {
        ChunkerConfig::new(self.chunk_size, self.chunk_overlap)
    }

    pub fn loader(&self) -> DocumentLoader {
        DocumentLoader::new(self.extensions.iter().cloned(), self.on_unreadable)
    }

    pub fn validate(&self) -> Result<()> {
        self.chunker_config().validate()
    }
}
