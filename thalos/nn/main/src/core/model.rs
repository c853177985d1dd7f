//! Decoder-only language model.

use std::time::Instant;

use crate::api::error::{NnError, NnResult};
use crate::api::traits::{Layer, Loss, Module};
use crate::api::types::{GenerationConfig, ModelConfig};
use crate::core::embedding::{ids_from_tensor, Embedding};
use crate::core::kv_cache::KVCache;
use crate::core::linear::Linear;
use crate::core::loss::CrossEntropyLoss;
use crate::core::parameter::Parameter;
use crate::core::positional::PositionalEncoding;
use crate::core::sampling::sample_next;
use crate::core::stack::TransformerDecoder;
use rand::rngs::StdRng;
use rand::Rng;
use thalos_core::{random, Tensor};

/// Token embedding, sinusoidal positions, a causal decoder stack and a
/// projection back to vocabulary logits.
#[derive(Debug, Clone)]
pub struct LanguageModel {
    config: ModelConfig,
    pub token_embedding: Embedding,
    pub positional_encoding: PositionalEncoding,
    pub decoder: TransformerDecoder,
    pub output_projection: Linear,
}

impl LanguageModel {
    /// Validates `config` and initializes every parameter from `config.seed`.
    pub fn new(config: ModelConfig) -> NnResult<Self> {
        config.validate()?;
        let mut rng = random::seeded_rng(config.seed);

        let token_embedding = Embedding::new(config.vocab_size, config.d_model, &mut rng)?;
        let positional_encoding = PositionalEncoding::new(config.d_model, config.max_seq_len)?;
        let decoder = TransformerDecoder::new(&config, &mut rng)?;
        let output_projection = Linear::new(config.d_model, config.vocab_size, &mut rng)?;

        log::debug!(
            "language model: vocab={} d_model={} layers={} heads={}",
            config.vocab_size,
            config.d_model,
            config.num_layers,
            config.num_heads
        );
        Ok(Self {
            config,
            token_embedding,
            positional_encoding,
            decoder,
            output_projection,
        })
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Logits `[ids.len(), vocab_size]` for a token sequence.
    pub fn forward_tokens(&self, ids: &[usize]) -> NnResult<Tensor> {
        self.run(ids, None::<&mut StdRng>)
    }

    /// Training-mode forward pass with dropout.
    pub fn forward_train<R: Rng + ?Sized>(&self, ids: &[usize], rng: &mut R) -> NnResult<Tensor> {
        self.run(ids, Some(rng))
    }

    fn run<R: Rng + ?Sized>(&self, ids: &[usize], rng: Option<&mut R>) -> NnResult<Tensor> {
        let _t = if log::log_enabled!(log::Level::Debug) { Some(Instant::now()) } else { None };
        if ids.is_empty() {
            return Err(NnError::InvalidArgument("empty token sequence".into()));
        }

        let x = self.token_embedding.forward_ids(ids)?;
        let x = self.positional_encoding.forward(&x)?;
        let x = match rng {
            Some(r) => self.decoder.forward_train(&x, None, r)?,
            None => self.decoder.forward(&x, None)?,
        };
        let logits = self.output_projection.forward(&x)?;

        if let Some(t) = _t {
            log::debug!(
                "[perf] model::forward seq_len={} {:.3}ms",
                ids.len(),
                t.elapsed().as_secs_f64() * 1000.0
            );
        }
        Ok(logits)
    }

    /// Empty [`KVCache`] sized for this model.
    pub fn new_cache(&self) -> KVCache {
        KVCache::new(self.config.num_layers, self.config.max_seq_len, self.config.d_model)
    }

    /// Logits `[ids.len(), vocab_size]` for tokens that continue the
    /// sequence already held in `cache`. Positions start at
    /// `cache.current_len()`.
    pub fn forward_with_cache(&self, ids: &[usize], cache: &mut KVCache) -> NnResult<Tensor> {
        let _t = if log::log_enabled!(log::Level::Debug) { Some(Instant::now()) } else { None };
        if ids.is_empty() {
            return Err(NnError::InvalidArgument("empty token sequence".into()));
        }
        let start = cache.current_len();
        if start + ids.len() > self.config.max_seq_len {
            return Err(NnError::InvalidArgument(format!(
                "sequence length {} exceeds max_seq_len {}",
                start + ids.len(),
                self.config.max_seq_len
            )));
        }

        let x = self.token_embedding.forward_ids(ids)?;
        let x = self.positional_encoding.forward_from(&x, start)?;
        let x = self.decoder.forward_with_cache(&x, cache)?;
        let logits = self.output_projection.forward(&x)?;

        if let Some(t) = _t {
            log::debug!(
                "[perf] model::forward_with_cache start={} new={} {:.3}ms",
                start,
                ids.len(),
                t.elapsed().as_secs_f64() * 1000.0
            );
        }
        Ok(logits)
    }

    /// Mean next-token cross-entropy of `ids`: the logits at position `i`
    /// are scored against `ids[i + 1]`.
    pub fn loss(&self, ids: &[usize]) -> NnResult<f64> {
        if ids.len() < 2 {
            return Err(NnError::InvalidArgument(
                "next-token loss needs at least two tokens".into(),
            ));
        }
        let logits = self.forward_tokens(&ids[..ids.len() - 1])?;
        let targets: Vec<f64> = ids[1..].iter().map(|&t| t as f64).collect();
        CrossEntropyLoss::new(None).forward(&logits, &Tensor::from_slice(&targets))
    }

    /// Autoregressive generation with a [`KVCache`], so each step runs
    /// only the newest token through the model.
    ///
    /// Returns the prompt followed by the generated tokens. Stops after
    /// `max_new_tokens`, after emitting the EOS token, or once the sequence
    /// fills `max_seq_len`.
    pub fn generate<R: Rng>(
        &self,
        prompt: &[usize],
        config: &GenerationConfig,
        rng: &mut R,
    ) -> NnResult<Vec<usize>> {
        config.validate()?;
        if prompt.is_empty() {
            return Err(NnError::InvalidArgument("generation needs a non-empty prompt".into()));
        }

        let mut tokens = prompt.to_vec();
        let mut cache = self.new_cache();
        let mut pending = prompt.len();
        for _ in 0..config.max_new_tokens {
            if tokens.len() >= self.config.max_seq_len {
                log::debug!("generate: context limit {} reached", self.config.max_seq_len);
                break;
            }
            // Only the tokens not yet in the cache go through the model.
            let logits = self.forward_with_cache(&tokens[tokens.len() - pending..], &mut cache)?;
            let last = logits.select(0, pending - 1)?;
            let next = sample_next(last.data(), config, rng)?;
            tokens.push(next);
            pending = 1;
            if config.eos_token == Some(next) {
                break;
            }
        }
        log::debug!(
            "generate: {} prompt tokens, {} new",
            prompt.len(),
            tokens.len() - prompt.len()
        );
        Ok(tokens)
    }
}

impl Module for LanguageModel {
    fn parameters(&self) -> Vec<&Parameter> {
        let mut params = self.token_embedding.parameters();
        params.extend(self.decoder.parameters());
        params.extend(self.output_projection.parameters());
        params
    }

    fn parameters_mut(&mut self) -> Vec<&mut Parameter> {
        let mut params = self.token_embedding.parameters_mut();
        params.extend(self.decoder.parameters_mut());
        params.extend(self.output_projection.parameters_mut());
        params
    }
}

impl Layer for LanguageModel {
    /// Token ids (any shape, flattened in order) to logits `[n, vocab_size]`.
    fn forward(&self, input: &Tensor) -> NnResult<Tensor> {
        self.forward_tokens(&ids_from_tensor(input)?)
    }
}
