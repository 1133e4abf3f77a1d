//! docqa-embed
//!
//! Sentence embedding for chunks and questions. The real embedder runs a
//! local sentence-transformers BERT encoder through candle (masked mean
//! pooling + L2 normalization); the fake embedder is a deterministic
//! hash-based stand-in so tests and offline development never load model
//! weights. Both are shared process-wide behind `Arc` — model load is the
//! dominant cost and the loaded model is read-only.

use anyhow::{anyhow, ensure, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use tokenizers::Tokenizer;

use docqa_core::traits::Embedder;

pub mod device;
pub mod pool;
pub mod tokenize;

pub use device::select_device;
pub use pool::{l2_normalize, mean_pool};

/// Token budget per embedded text; longer inputs are truncated.
const EMBED_MAX_LEN: usize = 256;

pub struct SentenceEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    dim: usize,
}

impl SentenceEmbedder {
    /// Load tokenizer, config, and weights from a local model directory.
    /// Any missing file fails the constructor; there is no download path.
    pub fn load(model_dir: &Path) -> Result<Self> {
        let device = select_device();
        println!("🔄 Loading sentence encoder from {}...", model_dir.display());

        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;

        let config_path = model_dir.join("config.json");
        let config: BertConfig = serde_json::from_str(&std::fs::read_to_string(&config_path)?)?;
        let dim = config.hidden_size;

        let weights_path = model_dir.join("pytorch_model.bin");
        let weights = candle_core::pickle::read_all(&weights_path)?;
        let weights_map: std::collections::HashMap<String, Tensor> = weights.into_iter().collect();
        let vb = VarBuilder::from_tensors(weights_map, DType::F32, &device);
        let model = BertModel::load(vb, &config)?;

        println!("✅ Sentence encoder loaded (dim={dim})");
        Ok(Self { model, tokenizer, device, dim })
    }

    fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let (input_ids, attention_mask) =
            tokenize::encode_padded(&self.tokenizer, text, EMBED_MAX_LEN, &self.device)?;
        let token_type_ids = input_ids.zeros_like()?;
        let hidden = self
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))?;

        let pooled = mean_pool(&hidden, &attention_mask)?;
        let normalized = l2_normalize(&pooled)?;
        let out: Vec<f32> = normalized.to_device(&Device::Cpu)?.squeeze(0)?.to_vec1()?;
        ensure!(out.len() == self.dim, "embedding dim {} != model dim {}", out.len(), self.dim);
        Ok(out)
    }
}

impl Embedder for SentenceEmbedder {
    fn dim(&self) -> usize {
        self.dim
    }

    fn max_len(&self) -> usize {
        EMBED_MAX_LEN
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed_one(t)).collect()
    }
}

/// Output dimension of the fake embedder, matching a MiniLM-class encoder.
pub const FAKE_DIM: usize = 384;

/// Deterministic bag-of-words hashing embedder. Identical text maps to the
/// identical vector; texts sharing most tokens land closer under cosine
/// than unrelated texts. Never loads weights.
struct FakeEmbedder {
    dim: usize,
}

impl Embedder for FakeEmbedder {
    fn dim(&self) -> usize {
        self.dim
    }

    fn max_len(&self) -> usize {
        EMBED_MAX_LEN
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| Ok(self.embed_text(t))).collect()
    }
}

impl FakeEmbedder {
    fn embed_text(&self, text: &str) -> Vec<f32> {
        use std::hash::{Hash, Hasher};
        use twox_hash::XxHash64;
        let mut v = vec![0f32; self.dim];
        for (i, token) in text.split_whitespace().enumerate() {
            let token = token.to_lowercase();
            let mut hasher = XxHash64::with_seed(0);
            token.hash(&mut hasher);
            let h = hasher.finish();
            let bucket = (h as usize) % self.dim;
            let weight = (((h >> 32) as u32) as f32) / (u32::MAX as f32);
            v[bucket] += weight + (i as f32 % 3.0) * 0.01;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt().max(1e-6);
        for x in &mut v {
            *x /= norm;
        }
        v
    }
}

fn use_fake_from_env() -> bool {
    std::env::var("APP_USE_FAKE_EMBEDDINGS")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Build the process-wide embedder handle. `APP_USE_FAKE_EMBEDDINGS=1`
/// selects the fake; otherwise weights load from `model_dir` when given,
/// falling back to `APP_EMBEDDING_MODEL_DIR` and then `models/embedding`.
pub fn get_embedder(model_dir: Option<PathBuf>) -> Result<Arc<dyn Embedder>> {
    if use_fake_from_env() {
        println!("🧪 Using FakeEmbedder");
        return Ok(Arc::new(FakeEmbedder { dim: FAKE_DIM }));
    }
    let dir = match model_dir {
        Some(d) => d,
        None => resolve_model_dir()?,
    };
    Ok(Arc::new(SentenceEmbedder::load(&dir)?))
}

pub fn get_default_embedder() -> Result<Arc<dyn Embedder>> {
    get_embedder(None)
}

fn resolve_model_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("APP_EMBEDDING_MODEL_DIR") {
        let p = PathBuf::from(&dir);
        if p.exists() {
            println!("📦 Using APP_EMBEDDING_MODEL_DIR: {}", p.display());
            return Ok(p);
        }
    }
    let default = Path::new("models/embedding");
    if default.exists() {
        println!("📦 Using model dir: {}", default.display());
        return Ok(default.to_path_buf());
    }
    Err(anyhow!(
        "Could not locate the embedding model directory (set APP_EMBEDDING_MODEL_DIR or create models/embedding)"
    ))
}
