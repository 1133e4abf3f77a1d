//! Configuration loader and path helpers.
//!
//! Figment merges `config.toml` + `config.<env>.toml` (selected by
//! `RUST_ENV`) + `APP_*` environment variables. Callers pull individual
//! keys with [`Config::get`] and fall back to [`defaults`] when a key is
//! absent.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::env;
use std::path::{Path, PathBuf};

/// Built-in operating point, matching the shipped `config.toml`.
pub mod defaults {
    /// Maximum characters per chunk.
    pub const CHUNK_MAX_CHARS: usize = 500;
    /// Characters of overlap between consecutive chunks.
    pub const CHUNK_OVERLAP_CHARS: usize = 50;
    /// Chunks retrieved per question.
    pub const RETRIEVAL_K: usize = 3;
    /// Generator context window in tokens.
    pub const GEN_CTX_TOKENS: usize = 2048;
    /// Upper bound on generated tokens per answer.
    pub const GEN_MAX_NEW_TOKENS: usize = 256;
    pub const GEN_TEMPERATURE: f64 = 0.1;
    pub const GEN_TOP_P: f64 = 0.95;
    /// CPU threads the generator's inference pool may use.
    pub const GEN_THREADS: usize = 8;
    /// Wall-clock deadline for one generation call, in seconds.
    pub const GEN_TIMEOUT_SECS: u64 = 120;
}

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new().merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_"));

        Ok(Self { figment })
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after
/// expansion. Absolute paths are returned as-is.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
