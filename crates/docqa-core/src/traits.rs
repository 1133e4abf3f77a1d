//! Collaborator seams for the heavyweight model-backed components.
//!
//! Both are loaded once per process and shared across pipeline instances
//! behind `Arc`; after initialization they are logically read-only, so
//! `Send + Sync` is part of the contract.

/// Turns text into fixed-dimension L2-normalized vectors.
///
/// Must be deterministic: same text in, same vector out.
pub trait Embedder: Send + Sync {
    /// Output dimensionality of every vector this embedder produces.
    fn dim(&self) -> usize;
    /// Maximum input length in tokens; longer inputs are truncated.
    fn max_len(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;
}

/// Produces a single completion for a prompt.
///
/// Calls block for up to the configured deadline, typically seconds on
/// CPU. There is no cancellation beyond that deadline.
pub trait Generator: Send + Sync {
    fn generate(&self, prompt: &str) -> anyhow::Result<String>;
}
