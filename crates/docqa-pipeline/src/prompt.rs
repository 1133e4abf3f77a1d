//! "Stuff" prompt assembly: every retrieved chunk verbatim, then the
//! question. No summarization, no map-reduce across chunks.

use docqa_core::types::ScoredChunk;

const INSTRUCTION: &str = "Use the following pieces of context to answer the question at the end. \
If you don't know the answer, just say that you don't know, don't try to make up an answer.";

pub fn stuff_prompt(retrieved: &[ScoredChunk], question: &str) -> String {
    let context: Vec<&str> = retrieved.iter().map(|s| s.chunk.content.as_str()).collect();
    format!(
        "{INSTRUCTION}\n\n{}\n\nQuestion: {}\nHelpful Answer:",
        context.join("\n\n"),
        question
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use docqa_core::types::{DocumentChunk, ScoredChunk};

    fn scored(content: &str) -> ScoredChunk {
        ScoredChunk {
            chunk: DocumentChunk {
                id: "d:0".into(),
                doc_id: "d".into(),
                doc_path: "/tmp/d.docx".into(),
                content: content.into(),
                char_offset: 0,
                chunk_index: 0,
                total_chunks: 1,
            },
            score: 1.0,
        }
    }

    #[test]
    fn prompt_contains_chunks_verbatim_and_question_at_end() {
        let prompt = stuff_prompt(
            &[scored("First passage."), scored("Second passage.")],
            "What is the capital of France?",
        );
        assert!(prompt.contains("First passage.\n\nSecond passage."));
        assert!(prompt.ends_with("Question: What is the capital of France?\nHelpful Answer:"));
    }
}
