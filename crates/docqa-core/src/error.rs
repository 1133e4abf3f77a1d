//! Pipeline error taxonomy.
//!
//! Collaborator traits (`Embedder`, `Generator`) speak `anyhow::Result`;
//! the pipeline wraps their failures into these variants exactly once at
//! the boundary and propagates them to the caller unhandled. Nothing in
//! this workspace retries, suppresses, or substitutes fallback answers.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// A source file is missing, unreadable, or not a valid .docx archive.
    #[error("Failed to load {}: {reason}", path.display())]
    Load { path: PathBuf, reason: String },

    /// Zero chunks were available to build an index. Building a pipeline
    /// over an empty corpus is rejected outright rather than producing an
    /// instance that silently answers without context.
    #[error("Empty corpus: {0}")]
    EmptyCorpus(String),

    #[error("Embedding failed: {0}")]
    Embedding(anyhow::Error),

    #[error("Index build failed: {0}")]
    IndexBuild(String),

    #[error("Generation failed: {0}")]
    Generation(anyhow::Error),

    /// Generation exceeded its wall-clock deadline. Not retried here;
    /// whether to retry an expensive generation is the caller's call.
    #[error("Generation exceeded deadline of {0:?}")]
    GenerationTimeout(Duration),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, Error>;
