//! docqa-llm
//!
//! Local quantized causal language model behind the `Generator` trait.
//! The real implementation loads a GGUF llama checkpoint through candle
//! and samples near-deterministically (temperature 0.1, top-p 0.95),
//! favoring faithfulness to retrieved context over creativity. The fake
//! implementation records every prompt it receives so pipeline tests can
//! assert on prompt contents without touching model weights.
//!
//! Generation is a blocking call that may take seconds on CPU. It cannot
//! be interrupted, but each decoded token checks a wall-clock deadline so
//! an unattended call has a configured upper bound.

use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use candle_core::quantized::gguf_file;
use candle_core::{Device, Tensor};
use candle_transformers::generation::{LogitsProcessor, Sampling};
use candle_transformers::models::quantized_llama::ModelWeights;
use tokenizers::Tokenizer;

use docqa_core::config::defaults;
use docqa_core::error::Error;
use docqa_core::traits::Generator;

const EOS_TOKEN: &str = "</s>";
const REPEAT_PENALTY: f32 = 1.1;
const REPEAT_LAST_N: usize = 64;
const SAMPLING_SEED: u64 = 299792458;

/// Sampling and resource knobs for one generator instance.
#[derive(Debug, Clone)]
pub struct GenerationOptions {
    pub ctx_tokens: usize,
    pub max_new_tokens: usize,
    pub temperature: f64,
    pub top_p: f64,
    pub threads: usize,
    pub timeout: Duration,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            ctx_tokens: defaults::GEN_CTX_TOKENS,
            max_new_tokens: defaults::GEN_MAX_NEW_TOKENS,
            temperature: defaults::GEN_TEMPERATURE,
            top_p: defaults::GEN_TOP_P,
            threads: defaults::GEN_THREADS,
            timeout: Duration::from_secs(defaults::GEN_TIMEOUT_SECS),
        }
    }
}

fn select_device() -> Device {
    #[cfg(feature = "metal")]
    {
        if let Ok(dev) = Device::new_metal(0) {
            println!("🚀 Device: Metal (MPS)");
            return dev;
        }
    }
    println!("🖥️  Device: CPU");
    Device::Cpu
}

pub struct LlamaGenerator {
    // forward() advances the KV cache, so the weights sit behind a lock;
    // one generation runs at a time per handle.
    model: Mutex<ModelWeights>,
    tokenizer: Tokenizer,
    device: Device,
    options: GenerationOptions,
    eos_token: u32,
}

impl std::fmt::Debug for LlamaGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlamaGenerator")
            .field("options", &self.options)
            .field("eos_token", &self.eos_token)
            .finish_non_exhaustive()
    }
}

impl LlamaGenerator {
    /// Load a quantized GGUF checkpoint and its tokenizer. Either file
    /// missing is a constructor error: the model artifact is a startup
    /// requirement, not a per-request concern.
    pub fn load(model_path: &Path, tokenizer_path: &Path, options: GenerationOptions) -> Result<Self> {
        if !model_path.exists() {
            return Err(anyhow!("Model file not found: {}", model_path.display()));
        }

        if options.threads > 0 {
            // Sizes the global pool candle's CPU kernels run on. A no-op
            // if some earlier caller already initialized it.
            rayon::ThreadPoolBuilder::new()
                .num_threads(options.threads)
                .build_global()
                .ok();
        }

        let device = select_device();
        println!("🔄 Loading GGUF model from {}...", model_path.display());
        let mut file = std::fs::File::open(model_path)
            .with_context(|| format!("open {}", model_path.display()))?;
        let content = gguf_file::Content::read(&mut file)
            .with_context(|| format!("read GGUF metadata from {}", model_path.display()))?;
        let model = ModelWeights::from_gguf(content, &mut file, &device)?;

        let tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;
        let eos_token = tokenizer
            .token_to_id(EOS_TOKEN)
            .ok_or_else(|| anyhow!("tokenizer has no {EOS_TOKEN} token"))?;

        println!("✅ Quantized model loaded (ctx={} tokens)", options.ctx_tokens);
        Ok(Self { model: Mutex::new(model), tokenizer, device, options, eos_token })
    }

    fn sampling(&self) -> Sampling {
        if self.options.temperature <= 0.0 {
            Sampling::ArgMax
        } else {
            Sampling::TopP { p: self.options.top_p, temperature: self.options.temperature }
        }
    }

    fn generate_inner(&self, prompt: &str) -> Result<String> {
        let deadline = Instant::now() + self.options.timeout;

        let encoded = self
            .tokenizer
            .encode(prompt, true)
            .map_err(|e| anyhow!("Tokenization failed: {}", e))?;
        let mut prompt_tokens = encoded.get_ids().to_vec();

        // Keep the tail of an oversized prompt: the question sits at the
        // end, leading context is droppable.
        let budget = self.options.ctx_tokens.saturating_sub(self.options.max_new_tokens).max(1);
        if prompt_tokens.len() > budget {
            prompt_tokens.drain(..prompt_tokens.len() - budget);
        }

        let mut model = self
            .model
            .lock()
            .map_err(|_| anyhow!("generator lock poisoned by an earlier panic"))?;
        let mut logits_processor = LogitsProcessor::from_sampling(SAMPLING_SEED, self.sampling());

        let input = Tensor::new(prompt_tokens.as_slice(), &self.device)?.unsqueeze(0)?;
        let logits = model.forward(&input, 0)?.squeeze(0)?;
        let mut next_token = logits_processor.sample(&logits)?;

        let mut generated: Vec<u32> = Vec::with_capacity(self.options.max_new_tokens);
        if next_token != self.eos_token {
            generated.push(next_token);
        }

        while generated.len() < self.options.max_new_tokens && next_token != self.eos_token {
            if Instant::now() >= deadline {
                return Err(Error::GenerationTimeout(self.options.timeout).into());
            }
            let input = Tensor::new(&[next_token], &self.device)?.unsqueeze(0)?;
            let logits = model
                .forward(&input, prompt_tokens.len() + generated.len() - 1)?
                .squeeze(0)?;
            let logits = if REPEAT_PENALTY == 1.0 {
                logits
            } else {
                let start_at = generated.len().saturating_sub(REPEAT_LAST_N);
                candle_transformers::utils::apply_repeat_penalty(
                    &logits,
                    REPEAT_PENALTY,
                    &generated[start_at..],
                )?
            };
            next_token = logits_processor.sample(&logits)?;
            if next_token != self.eos_token {
                generated.push(next_token);
            }
        }

        let text = self
            .tokenizer
            .decode(&generated, true)
            .map_err(|e| anyhow!("Detokenization failed: {}", e))?;
        Ok(text.trim().to_string())
    }
}

impl Generator for LlamaGenerator {
    fn generate(&self, prompt: &str) -> Result<String> {
        self.generate_inner(prompt)
    }
}

/// Deterministic stand-in generator. Returns a canned completion and
/// keeps every prompt it was handed, in call order.
#[derive(Debug, Default)]
pub struct FakeGenerator {
    prompts: Mutex<Vec<String>>,
    answer: Option<String>,
}

impl FakeGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_answer(answer: impl Into<String>) -> Self {
        Self { prompts: Mutex::new(Vec::new()), answer: Some(answer.into()) }
    }

    /// Prompts seen so far, oldest first.
    pub fn recorded_prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

impl Generator for FakeGenerator {
    fn generate(&self, prompt: &str) -> Result<String> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        Ok(self
            .answer
            .clone()
            .unwrap_or_else(|| "FAKE ANSWER".to_string()))
    }
}

fn use_fake_from_env() -> bool {
    std::env::var("APP_USE_FAKE_GENERATOR")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Build the process-wide generator handle. `APP_USE_FAKE_GENERATOR=1`
/// selects the fake; otherwise the GGUF checkpoint and tokenizer load
/// from the given paths, falling back to env overrides and the
/// conventional `models/` locations.
pub fn get_generator(
    model_path: Option<PathBuf>,
    tokenizer_path: Option<PathBuf>,
    options: GenerationOptions,
) -> Result<Arc<dyn Generator>> {
    if use_fake_from_env() {
        println!("🧪 Using FakeGenerator");
        return Ok(Arc::new(FakeGenerator::new()));
    }
    let model_path = resolve(model_path, "APP_GENERATION_MODEL_PATH", "models/llama-2-7b-chat.Q4_K_M.gguf");
    let tokenizer_path = resolve(tokenizer_path, "APP_GENERATION_TOKENIZER_PATH", "models/tokenizer.json");
    Ok(Arc::new(LlamaGenerator::load(&model_path, &tokenizer_path, options)?))
}

fn resolve(explicit: Option<PathBuf>, env_key: &str, fallback: &str) -> PathBuf {
    if let Some(p) = explicit {
        return p;
    }
    if let Ok(p) = std::env::var(env_key) {
        return PathBuf::from(p);
    }
    PathBuf::from(fallback)
}
