use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub document_id: String,
    pub chunk_id: String,
    pub sequence_index: usize,
    /// Character (not byte) offsets into the source text, end exclusive.
    pub start_offset: usize,
    pub end_offset: usize,
    pub content: String,
}

impl Chunk {
    pub fn new(
        document_id: String,
        sequence_index: usize,
        offset: (usize, usize),
        content: String,
    ) -> Self {
        let chunk_id = Self::generate_chunk_id(&document_id, &content, offset);

        Self {
            document_id,
            chunk_id,
            sequence_index,
            start_offset: offset.0,
            end_offset: offset.1,
            content,
        }
    }

    fn generate_chunk_id(document_id: &str, content: &str, offset: (usize, usize)) -> String {
        let mut hasher = Sha256::new();
        hasher.update(document_id.as_bytes());
        hasher.update(content.as_bytes());
        hasher.update(offset.0.to_string().as_bytes());
        hasher.update(offset.1.to_string().as_bytes());
        let result = hasher.finalize();
        hex::encode(&result[..16])
    }

    /// Number of characters covered by this chunk.
    pub fn char_len(&self) -> usize {
        self.end_offset - self.start_offset
    }

    /// Estimate token count (rough: 1.3 tokens per word)
    pub fn estimated_tokens(&self) -> usize {
        let word_count = self.content.split_whitespace().count();
        (word_count as f64 * 1.3) as usize
    }
}
