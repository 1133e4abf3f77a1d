use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use docqa_core::error::Error;
use docqa_core::traits::{Embedder, Generator};
use docqa_core::types::SourceDocument;
use docqa_embed::get_default_embedder;
use docqa_llm::FakeGenerator;
use docqa_pipeline::{answer_once, AnswerPipeline};
use docqa_text::CharacterSplitter;

fn fake_embedder() -> Arc<dyn Embedder> {
    std::env::set_var("APP_USE_FAKE_EMBEDDINGS", "1");
    get_default_embedder().expect("fake embedder")
}

fn doc(doc_id: &str, text: &str) -> SourceDocument {
    SourceDocument {
        doc_id: doc_id.to_string(),
        path: format!("/tmp/{doc_id}.docx"),
        text: text.to_string(),
    }
}

const FRANCE_TEXT: &str =
    "The capital of France is Paris. It has a population of over two million.";

#[test]
fn single_short_document_scenario() {
    let embedder = fake_embedder();
    let generator = Arc::new(FakeGenerator::with_answer("Paris."));
    let splitter = CharacterSplitter::default();

    let pipeline = AnswerPipeline::build(
        &[doc("france", FRANCE_TEXT)],
        &splitter,
        embedder,
        Arc::clone(&generator) as Arc<dyn Generator>,
        3,
    )
    .expect("build");

    // Well under the 500-character chunk size
    assert_eq!(pipeline.chunk_count(), 1);

    let question = "What is the capital of France?";
    let retrieved = pipeline.retrieve(question).expect("retrieve");
    assert_eq!(retrieved.len(), 1);
    assert_eq!(retrieved[0].chunk.content, FRANCE_TEXT);

    let answer = pipeline.answer(question).expect("answer");
    assert_eq!(answer, "Paris.");

    // The generator saw the chunk's full text and the question verbatim
    let prompts = generator.recorded_prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains(FRANCE_TEXT));
    assert!(prompts[0].contains(question));
}

#[test]
fn empty_corpus_is_rejected_consistently() {
    let splitter = CharacterSplitter::default();

    let err = AnswerPipeline::build(
        &[],
        &splitter,
        fake_embedder(),
        Arc::new(FakeGenerator::new()),
        3,
    )
    .expect_err("zero documents must not build");
    assert!(matches!(err, Error::EmptyCorpus(_)), "got {err:?}");

    // Documents that split into zero chunks are rejected the same way,
    // every time.
    for _ in 0..2 {
        let err = AnswerPipeline::build(
            &[doc("empty", "")],
            &splitter,
            fake_embedder(),
            Arc::new(FakeGenerator::new()),
            3,
        )
        .expect_err("empty text must not build");
        assert!(matches!(err, Error::EmptyCorpus(_)));
    }
}

#[test]
fn retrieval_is_bounded_by_corpus_size() {
    let splitter = CharacterSplitter::default();
    let pipeline = AnswerPipeline::build(
        &[doc("one", "A single small passage about beekeeping.")],
        &splitter,
        fake_embedder(),
        Arc::new(FakeGenerator::new()),
        50,
    )
    .expect("build");

    let retrieved = pipeline.retrieve("bees").expect("retrieve");
    assert_eq!(retrieved.len(), 1, "k beyond corpus size returns all chunks");
}

#[test]
fn rebuilt_pipelines_share_no_index_state() {
    let splitter = CharacterSplitter::default();
    let embedder = fake_embedder();

    let a = AnswerPipeline::build(
        &[doc("x", "Solar panels convert sunlight into electricity.")],
        &splitter,
        Arc::clone(&embedder),
        Arc::new(FakeGenerator::new()),
        3,
    )
    .expect("build a");
    let b = AnswerPipeline::build(
        &[doc("y", "Wind turbines convert moving air into electricity.")],
        &splitter,
        Arc::clone(&embedder),
        Arc::new(FakeGenerator::new()),
        3,
    )
    .expect("build b");

    for hit in a.retrieve("electricity generation").expect("retrieve a") {
        assert_eq!(hit.chunk.doc_id, "x", "pipeline A must only surface its own chunks");
    }
    for hit in b.retrieve("electricity generation").expect("retrieve b") {
        assert_eq!(hit.chunk.doc_id, "y", "pipeline B must only surface its own chunks");
    }
}

#[test]
fn long_document_retrieves_the_relevant_chunk() {
    let splitter = CharacterSplitter::default();
    let filler = "Grain storage requires dry, ventilated space. ".repeat(40);
    let text = format!("{filler}The smelter furnace must reach 1538 degrees to melt iron.");

    let pipeline = AnswerPipeline::build(
        &[doc("manual", &text)],
        &splitter,
        fake_embedder(),
        Arc::new(FakeGenerator::new()),
        3,
    )
    .expect("build");
    assert!(pipeline.chunk_count() > 3, "document splits into several chunks");

    let retrieved = pipeline
        .retrieve("What temperature must the smelter furnace reach to melt iron?")
        .expect("retrieve");
    assert_eq!(retrieved.len(), 3);
    assert!(
        retrieved[0].chunk.content.contains("1538"),
        "top chunk should hold the furnace passage, got: {}",
        retrieved[0].chunk.content
    );
}

struct FailingGenerator;

impl Generator for FailingGenerator {
    fn generate(&self, _prompt: &str) -> anyhow::Result<String> {
        Err(anyhow::anyhow!("inference backend crashed"))
    }
}

struct TimingOutGenerator;

impl Generator for TimingOutGenerator {
    fn generate(&self, _prompt: &str) -> anyhow::Result<String> {
        Err(Error::GenerationTimeout(std::time::Duration::from_secs(120)).into())
    }
}

#[test]
fn generator_failures_keep_their_taxonomy() {
    let splitter = CharacterSplitter::default();

    let pipeline = AnswerPipeline::build(
        &[doc("d", FRANCE_TEXT)],
        &splitter,
        fake_embedder(),
        Arc::new(FailingGenerator),
        3,
    )
    .expect("build");
    let err = pipeline.answer("q").expect_err("generation fails");
    assert!(matches!(err, Error::Generation(_)), "got {err:?}");

    let pipeline = AnswerPipeline::build(
        &[doc("d", FRANCE_TEXT)],
        &splitter,
        fake_embedder(),
        Arc::new(TimingOutGenerator),
        3,
    )
    .expect("build");
    let err = pipeline.answer("q").expect_err("generation times out");
    assert!(matches!(err, Error::GenerationTimeout(_)), "got {err:?}");
}

/// Write a minimal .docx so the per-request path exercises the real loader.
fn write_docx(path: &Path, paragraph: &str) {
    let xml = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
         <w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\">\
         <w:body><w:p><w:r><w:t>{paragraph}</w:t></w:r></w:p></w:body></w:document>"
    );
    let file = std::fs::File::create(path).expect("create docx");
    let mut zip = zip::ZipWriter::new(file);
    let opts = zip::write::SimpleFileOptions::default();
    zip.start_file("word/document.xml", opts).expect("start entry");
    zip.write_all(xml.as_bytes()).expect("write entry");
    zip.finish().expect("finish zip");
}

#[test]
fn answer_once_rebuilds_from_the_file_each_call() {
    let tmp = tempfile::TempDir::new().expect("tempdir");
    let path = tmp.path().join("france.docx");
    write_docx(&path, FRANCE_TEXT);

    let generator = Arc::new(FakeGenerator::with_answer("Paris."));
    let splitter = CharacterSplitter::default();

    let answer = answer_once(
        &path,
        "What is the capital of France?",
        &splitter,
        fake_embedder(),
        Arc::clone(&generator) as Arc<dyn Generator>,
        3,
    )
    .expect("answer");
    assert_eq!(answer, "Paris.");
    assert!(generator.recorded_prompts()[0].contains(FRANCE_TEXT));

    let err = answer_once(
        Path::new("/nonexistent/missing.docx"),
        "anything",
        &splitter,
        fake_embedder(),
        Arc::new(FakeGenerator::new()),
        3,
    )
    .expect_err("missing document fails to build");
    assert!(matches!(err, Error::Load { .. }));
}
