//! docqa-pipeline
//!
//! Composes loader → splitter → embedder → index at build time, and
//! embedder → index → generator at question time. A pipeline is either
//! fully built or it does not exist: any failure during construction
//! surfaces to the caller and leaves nothing behind. Once built, the
//! wrapped index never changes; superseding a document set means building
//! a new pipeline and swapping the handle, so in-flight questions can
//! never observe a partial rebuild.

use std::path::Path;
use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};

use docqa_core::error::{Error, Result};
use docqa_core::traits::{Embedder, Generator};
use docqa_core::types::{ScoredChunk, SourceDocument};
use docqa_index::RetrievalIndex;
use docqa_text::{CharacterSplitter, DocxLoader};

pub mod prompt;

const EMBED_BATCH: usize = 32;

pub struct AnswerPipeline {
    index: RetrievalIndex,
    embedder: Arc<dyn Embedder>,
    generator: Arc<dyn Generator>,
    k: usize,
}

impl std::fmt::Debug for AnswerPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnswerPipeline")
            .field("k", &self.k)
            .finish_non_exhaustive()
    }
}

impl AnswerPipeline {
    /// Split, embed, and index a document set. Rejects an empty corpus
    /// outright: a pipeline that could only answer without context would
    /// be indistinguishable from one answering from real passages.
    pub fn build(
        documents: &[SourceDocument],
        splitter: &CharacterSplitter,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn Generator>,
        k: usize,
    ) -> Result<Self> {
        if k == 0 {
            return Err(Error::InvalidConfig("retrieval.k must be > 0".into()));
        }
        if documents.is_empty() {
            return Err(Error::EmptyCorpus("no source documents provided".into()));
        }
        let chunks = splitter.split_all(documents);
        if chunks.is_empty() {
            return Err(Error::EmptyCorpus(format!(
                "{} document(s) produced no text chunks",
                documents.len()
            )));
        }

        println!("Embedding {} chunks from {} document(s)", chunks.len(), documents.len());
        let pb = ProgressBar::new(chunks.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        let mut embeddings: Vec<Vec<f32>> = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(EMBED_BATCH) {
            let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
            let vecs = embedder.embed_batch(&texts).map_err(Error::Embedding)?;
            embeddings.extend(vecs);
            pb.set_position(embeddings.len() as u64);
        }
        pb.finish_and_clear();

        let index = RetrievalIndex::build(chunks, embeddings)?;
        println!("✅ Indexed {} chunks", index.len());
        Ok(Self { index, embedder, generator, k })
    }

    /// Batch-mode entry point: every `.docx` under a directory, built
    /// once, reused for any number of questions.
    pub fn build_from_dir(
        dir: &Path,
        splitter: &CharacterSplitter,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn Generator>,
        k: usize,
    ) -> Result<Self> {
        let docs = DocxLoader::new().load_dir(dir)?;
        if docs.is_empty() {
            return Err(Error::EmptyCorpus(format!(
                "no .docx files under {}",
                dir.display()
            )));
        }
        Self::build(&docs, splitter, embedder, generator, k)
    }

    /// Single-document entry point.
    pub fn build_from_file(
        path: &Path,
        splitter: &CharacterSplitter,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn Generator>,
        k: usize,
    ) -> Result<Self> {
        let doc = DocxLoader::new().load_file(path)?;
        Self::build(std::slice::from_ref(&doc), splitter, embedder, generator, k)
    }

    /// Answer one question: embed it, retrieve top-k chunks, stuff them
    /// into a prompt, and invoke the generator. No pipeline state changes
    /// between calls; concurrent callers may share `&self`.
    pub fn answer(&self, question: &str) -> Result<String> {
        let retrieved = self.retrieve(question)?;
        let prompt = prompt::stuff_prompt(&retrieved, question);
        self.generator.generate(&prompt).map_err(into_generation_error)
    }

    /// Embed the question and return its top-k chunks, best first.
    pub fn retrieve(&self, question: &str) -> Result<Vec<ScoredChunk>> {
        let query_vec = self
            .embedder
            .embed_batch(std::slice::from_ref(&question.to_string()))
            .map_err(Error::Embedding)?
            .remove(0);
        Ok(self.index.search(&query_vec, self.k))
    }

    pub fn chunk_count(&self) -> usize {
        self.index.len()
    }
}

/// Per-request mode: rebuild split → embed → index from scratch for a
/// single document and answer one question against it. Always correct,
/// never stale, and wasteful by design — callers wanting reuse hold an
/// [`AnswerPipeline`] instead. The choice between the two is explicit,
/// never implied by an entry point.
pub fn answer_once(
    path: &Path,
    question: &str,
    splitter: &CharacterSplitter,
    embedder: Arc<dyn Embedder>,
    generator: Arc<dyn Generator>,
    k: usize,
) -> Result<String> {
    let pipeline = AnswerPipeline::build_from_file(path, splitter, embedder, generator, k)?;
    pipeline.answer(question)
}

/// Generator failures pass the taxonomy through where possible: a
/// deadline overrun stays `GenerationTimeout`, everything else wraps as
/// `Generation`.
fn into_generation_error(e: anyhow::Error) -> Error {
    match e.downcast::<Error>() {
        Ok(core_err) => core_err,
        Err(other) => Error::Generation(other),
    }
}
