//! Domain types shared by the loader, splitter, index, and pipeline.

use serde::{Deserialize, Serialize};

pub type ChunkId = String;

/// Raw extracted text of one source file. Produced by the loader,
/// consumed by the splitter, then discarded.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    /// Stable document identity (file stem).
    pub doc_id: String,
    /// Original path to the source file.
    pub path: String,
    /// Full extracted text content.
    pub text: String,
}

/// A bounded, possibly-overlapping window of a source document's text.
/// The unit of embedding and retrieval.
///
/// - `id`: `{doc_id}:{chunk_index}`, unique within one build
/// - `char_offset`: character (not byte) offset into the source text
/// - `content` holds at most the configured maximum number of characters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentChunk {
    pub id: ChunkId,
    pub doc_id: String,
    pub doc_path: String,
    pub content: String,
    pub char_offset: usize,
    pub chunk_index: usize,
    pub total_chunks: usize,
}

/// A retrieved chunk paired with its similarity score. Higher is better.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: DocumentChunk,
    pub score: f32,
}
