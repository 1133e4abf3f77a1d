//! Fixed-size character windows with overlap.
//!
//! Pure and deterministic: no I/O, no shared state. Sizes are counted in
//! characters, never bytes, so multi-byte text splits on valid
//! boundaries. Consecutive windows from the same document overlap by
//! `overlap_chars`; the final window ends exactly at the end of the text,
//! so no window is wholly contained in its predecessor.

use docqa_core::config::defaults;
use docqa_core::error::{Error, Result};
use docqa_core::types::{DocumentChunk, SourceDocument};

#[derive(Debug, Clone)]
pub struct CharacterSplitter {
    max_chars: usize,
    overlap_chars: usize,
}

impl Default for CharacterSplitter {
    fn default() -> Self {
        Self {
            max_chars: defaults::CHUNK_MAX_CHARS,
            overlap_chars: defaults::CHUNK_OVERLAP_CHARS,
        }
    }
}

impl CharacterSplitter {
    pub fn new(max_chars: usize, overlap_chars: usize) -> Result<Self> {
        if max_chars == 0 {
            return Err(Error::InvalidConfig("chunking.max_chars must be > 0".into()));
        }
        if overlap_chars >= max_chars {
            return Err(Error::InvalidConfig(format!(
                "chunking.overlap_chars ({overlap_chars}) must be smaller than chunking.max_chars ({max_chars})"
            )));
        }
        Ok(Self { max_chars, overlap_chars })
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    pub fn overlap_chars(&self) -> usize {
        self.overlap_chars
    }

    /// Split one document into ordered overlapping chunks covering its
    /// whole text. Empty text yields no chunks; text no longer than
    /// `max_chars` yields exactly one.
    pub fn split(&self, doc: &SourceDocument) -> Vec<DocumentChunk> {
        // Byte offset of every char boundary, plus the end of the text.
        let bounds: Vec<usize> = doc
            .text
            .char_indices()
            .map(|(b, _)| b)
            .chain(std::iter::once(doc.text.len()))
            .collect();
        let total_len = bounds.len() - 1;
        if total_len == 0 {
            return Vec::new();
        }

        let step = self.max_chars - self.overlap_chars;
        let mut chunks = Vec::new();
        let mut start = 0usize;
        loop {
            let end = (start + self.max_chars).min(total_len);
            chunks.push(DocumentChunk {
                id: format!("{}:{}", doc.doc_id, chunks.len()),
                doc_id: doc.doc_id.clone(),
                doc_path: doc.path.clone(),
                content: doc.text[bounds[start]..bounds[end]].to_string(),
                char_offset: start,
                chunk_index: chunks.len(),
                total_chunks: 0,
            });
            if end == total_len {
                break;
            }
            start += step;
        }
        let total_chunks = chunks.len();
        for chunk in &mut chunks {
            chunk.total_chunks = total_chunks;
        }
        chunks
    }

    /// Split a batch of documents, preserving document order.
    pub fn split_all(&self, docs: &[SourceDocument]) -> Vec<DocumentChunk> {
        docs.iter().flat_map(|d| self.split(d)).collect()
    }
}
