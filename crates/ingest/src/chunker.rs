use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::chunk::Chunk;
use crate::error::{IngestError, Result};

pub const DEFAULT_CHUNK_SIZE: usize = 500;
pub const DEFAULT_CHUNK_OVERLAP: usize = 50;

/// Sliding window parameters, both measured in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkerConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl ChunkerConfig {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(self.invalid("chunk_size must be greater than zero"));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(self.invalid("chunk_overlap must be smaller than chunk_size"));
        }
        Ok(())
    }

    fn invalid(&self, reason: &'static str) -> IngestError {
        IngestError::InvalidChunkConfig {
            chunk_size: self.chunk_size,
            chunk_overlap: self.chunk_overlap,
            reason,
        }
    }

    fn step(&self) -> usize {
        self.chunk_size - self.chunk_overlap
    }
}

/// Splits text into fixed-size overlapping windows.
///
/// The config is validated once in [`Chunker::new`], so chunking itself
/// cannot fail.
#[derive(Debug, Clone)]
pub struct Chunker {
    config: ChunkerConfig,
}

impl Chunker {
    pub fn new(config: ChunkerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> ChunkerConfig {
        self.config
    }

    pub fn chunk_text(&self, document_id: &str, text: &str) -> Vec<Chunk> {
        // Byte position of every char boundary, plus the end of the text
        let boundaries: Vec<usize> = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .collect();
        let len = boundaries.len() - 1;
        let step = self.config.step();

        let mut chunks = Vec::new();
        let mut start = 0;

        while start < len {
            let end = (start + self.config.chunk_size).min(len);
            let content = &text[boundaries[start]..boundaries[end]];

            chunks.push(Chunk::new(
                document_id.to_string(),
                chunks.len(),
                (start, end),
                content.to_string(),
            ));

            if end == len {
                break;
            }
            start += step;
        }

        chunks
    }

    /// Chunk every document, grouped by document in ascending id order.
    pub fn chunk_documents(&self, documents: &HashMap<String, String>) -> Vec<Chunk> {
        let mut ids: Vec<&String> = documents.keys().collect();
        ids.sort();

        ids.into_iter()
            .flat_map(|id| self.chunk_text(id, &documents[id]))
            .collect()
    }

    /// Same output as [`Chunker::chunk_documents`], with documents chunked on
    /// the rayon pool.
    pub fn chunk_documents_parallel(&self, documents: &HashMap<String, String>) -> Vec<Chunk> {
        let mut chunks: Vec<Chunk> = documents
            .par_iter()
            .flat_map_iter(|(id, text)| self.chunk_text(id, text))
            .collect();

        chunks.sort_by(|a, b| {
            a.document_id
                .cmp(&b.document_id)
                .then(a.sequence_index.cmp(&b.sequence_index))
        });
        chunks
    }
}

pub fn chunk_document(
    document_id: &str,
    text: &str,
    chunk_size: usize,
    chunk_overlap: usize,
) -> Result<Vec<Chunk>> {
    let chunker = Chunker::new(ChunkerConfig::new(chunk_size, chunk_overlap))?;
    Ok(chunker.chunk_text(document_id, text))
}

pub fn chunk_documents(
    documents: &HashMap<String, String>,
    chunk_size: usize,
    chunk_overlap: usize,
) -> Result<Vec<Chunk>> {
    let chunker = Chunker::new(ChunkerConfig::new(chunk_size, chunk_overlap))?;
    Ok(chunker.chunk_documents(documents))
}
