use std::path::Path;
use std::time::Duration;

use docqa_core::config::{defaults, expand_path, resolve_with_base};
use docqa_core::error::Error;

#[test]
fn expand_path_passes_plain_paths_through() {
    let p = expand_path("models/llama-2-7b-chat.Q4_K_M.gguf");
    assert_eq!(p, Path::new("models/llama-2-7b-chat.Q4_K_M.gguf"));
}

#[test]
fn expand_path_expands_env_vars() {
    std::env::set_var("DOCQA_TEST_BASE", "/srv/models");
    let p = expand_path("${DOCQA_TEST_BASE}/embedder");
    assert_eq!(p, Path::new("/srv/models/embedder"));
}

#[test]
fn resolve_with_base_keeps_absolute_and_joins_relative() {
    let base = Path::new("/data");
    assert_eq!(resolve_with_base(base, "/abs/file"), Path::new("/abs/file"));
    assert_eq!(resolve_with_base(base, "rel/file"), Path::new("/data/rel/file"));
}

#[test]
fn error_messages_name_the_failing_stage() {
    let e = Error::EmptyCorpus("no .docx files under /tmp/empty".to_string());
    assert!(e.to_string().contains("Empty corpus"));

    let e = Error::GenerationTimeout(Duration::from_secs(defaults::GEN_TIMEOUT_SECS));
    assert!(e.to_string().contains("deadline"));

    let e = Error::Load { path: "/tmp/x.docx".into(), reason: "not a zip".into() };
    assert!(e.to_string().contains("/tmp/x.docx"));
}
