use std::env;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use docqa_core::config::{defaults, expand_path, Config};
use docqa_core::traits::{Embedder, Generator};
use docqa_embed::get_embedder;
use docqa_llm::{get_generator, GenerationOptions};
use docqa_pipeline::{answer_once, AnswerPipeline};
use docqa_text::CharacterSplitter;

fn parse_args() -> (String, Vec<String>) {
    let mut args: Vec<String> = env::args().collect();
    let prog = args.remove(0);
    if args.is_empty() {
        eprintln!("Usage: {} <ask|chat> [args...]", prog);
        eprintln!("  ask  <file.docx> \"<question>\"   answer one question against one document");
        eprintln!("  chat <dir>                       index every .docx under <dir>, then ask interactively");
        std::process::exit(1);
    }
    let cmd = args.remove(0);
    (cmd, args)
}

struct Collaborators {
    splitter: CharacterSplitter,
    embedder: Arc<dyn Embedder>,
    generator: Arc<dyn Generator>,
    k: usize,
}

/// Build the process-wide model handles once; every pipeline built
/// afterwards shares them. Model load dominates startup cost.
fn load_collaborators(config: &Config) -> anyhow::Result<Collaborators> {
    let max_chars: usize = config.get("chunking.max_chars").unwrap_or(defaults::CHUNK_MAX_CHARS);
    let overlap: usize = config.get("chunking.overlap_chars").unwrap_or(defaults::CHUNK_OVERLAP_CHARS);
    let splitter = CharacterSplitter::new(max_chars, overlap)?;

    let embed_dir: Option<PathBuf> = config.get::<String>("embedding.model_dir").ok().map(expand_path);
    let embedder = get_embedder(embed_dir)?;

    let options = GenerationOptions {
        ctx_tokens: config.get("generation.ctx_tokens").unwrap_or(defaults::GEN_CTX_TOKENS),
        max_new_tokens: config.get("generation.max_new_tokens").unwrap_or(defaults::GEN_MAX_NEW_TOKENS),
        temperature: config.get("generation.temperature").unwrap_or(defaults::GEN_TEMPERATURE),
        top_p: config.get("generation.top_p").unwrap_or(defaults::GEN_TOP_P),
        threads: config.get("generation.threads").unwrap_or(defaults::GEN_THREADS),
        timeout: Duration::from_secs(
            config.get("generation.timeout_secs").unwrap_or(defaults::GEN_TIMEOUT_SECS),
        ),
    };
    let model_path: Option<PathBuf> = config.get::<String>("generation.model_path").ok().map(expand_path);
    let tokenizer_path: Option<PathBuf> =
        config.get::<String>("generation.tokenizer_path").ok().map(expand_path);
    let generator = get_generator(model_path, tokenizer_path, options)?;

    let k: usize = config.get("retrieval.k").unwrap_or(defaults::RETRIEVAL_K);
    Ok(Collaborators { splitter, embedder, generator, k })
}

fn main() -> anyhow::Result<()> {
    let config = Config::load().map_err(|e| {
        eprintln!("Error loading config: {}", e);
        e
    })?;
    let (cmd, args) = parse_args();
    match cmd.as_str() {
        "ask" => {
            let (file, question) = match (args.first(), args.get(1)) {
                (Some(f), Some(q)) => (PathBuf::from(f), q.clone()),
                _ => {
                    eprintln!("Usage: docqa ask <file.docx> \"<question>\"");
                    std::process::exit(1);
                }
            };
            let c = load_collaborators(&config)?;
            let answer = answer_once(&file, &question, &c.splitter, c.embedder, c.generator, c.k)?;
            println!("\n💬 {}", answer);
        }
        "chat" => {
            let dir = args.first().map(PathBuf::from).unwrap_or_else(|| {
                let d: String = config.get("data.docs_dir").unwrap_or_else(|_| "docs".to_string());
                PathBuf::from(d)
            });
            let c = load_collaborators(&config)?;
            let pipeline =
                AnswerPipeline::build_from_dir(&dir, &c.splitter, c.embedder, c.generator, c.k)?;
            run_chat_loop(&pipeline, &dir)?;
        }
        _ => {
            eprintln!("Unknown command: {}", cmd);
            std::process::exit(1);
        }
    }
    Ok(())
}

/// One question per line; `exit`, `quit`, or EOF ends the session. The
/// pipeline is built once above and reused for every question.
fn run_chat_loop(pipeline: &AnswerPipeline, dir: &Path) -> anyhow::Result<()> {
    println!("📚 Knowledge base ready: {} chunks from {}", pipeline.chunk_count(), dir.display());
    println!("Type a question, or 'exit' to quit.");
    let stdin = io::stdin();
    loop {
        print!("\n❓ ");
        io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if question.eq_ignore_ascii_case("exit") || question.eq_ignore_ascii_case("quit") {
            break;
        }
        match pipeline.answer(question) {
            Ok(answer) => println!("💬 {}", answer),
            Err(e) => eprintln!("⚠️  {}", e),
        }
    }
    Ok(())
}
