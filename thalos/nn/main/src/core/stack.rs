//! Encoder and decoder stacks of transformer blocks.

use crate::api::error::{NnError, NnResult};
use crate::api::traits::Module;
use crate::api::types::ModelConfig;
use crate::core::kv_cache::KVCache;
use crate::core::mask::{causal_mask, combine_masks};
use crate::core::parameter::Parameter;
use crate::core::transformer_block::TransformerBlock;
use rand::rngs::StdRng;
use rand::Rng;
use thalos_core::Tensor;

fn build_layers<R: Rng>(
    config: &ModelConfig,
    cross_attention: bool,
    rng: &mut R,
) -> NnResult<Vec<TransformerBlock>> {
    (0..config.num_layers)
        .map(|_| {
            let block = TransformerBlock::from_config(config, rng)?;
            if cross_attention {
                block.with_cross_attention(config, rng)
            } else {
                Ok(block)
            }
        })
        .collect()
}

fn seq_len(x: &Tensor) -> NnResult<usize> {
    match x.dims() {
        [s, _] => Ok(*s),
        other => Err(NnError::DimensionMismatch(format!(
            "expected a [seq_len, d_model] input, got {:?}",
            other
        ))),
    }
}

fn collect_params(layers: &[TransformerBlock]) -> Vec<&Parameter> {
    layers.iter().flat_map(|l| l.parameters()).collect()
}

fn collect_params_mut(layers: &mut [TransformerBlock]) -> Vec<&mut Parameter> {
    layers.iter_mut().flat_map(|l| l.parameters_mut()).collect()
}

/// `num_layers` bidirectional blocks applied in sequence.
#[derive(Debug, Clone)]
pub struct TransformerEncoder {
    pub layers: Vec<TransformerBlock>,
}

impl TransformerEncoder {
    pub fn new<R: Rng>(config: &ModelConfig, rng: &mut R) -> NnResult<Self> {
        Ok(Self {
            layers: build_layers(config, false, rng)?,
        })
    }

    pub fn forward(&self, x: &Tensor, mask: Option<&Tensor>) -> NnResult<Tensor> {
        self.run(x, mask, None::<&mut StdRng>)
    }

    pub fn forward_train<R: Rng + ?Sized>(
        &self,
        x: &Tensor,
        mask: Option<&Tensor>,
        rng: &mut R,
    ) -> NnResult<Tensor> {
        self.run(x, mask, Some(rng))
    }

    fn run<R: Rng + ?Sized>(
        &self,
        x: &Tensor,
        mask: Option<&Tensor>,
        mut rng: Option<&mut R>,
    ) -> NnResult<Tensor> {
        seq_len(x)?;
        let mut h = x.clone();
        for layer in &self.layers {
            h = layer.run(&h, mask, None, rng.as_deref_mut())?;
        }
        Ok(h)
    }
}

impl Module for TransformerEncoder {
    fn parameters(&self) -> Vec<&Parameter> {
        collect_params(&self.layers)
    }

    fn parameters_mut(&mut self) -> Vec<&mut Parameter> {
        collect_params_mut(&mut self.layers)
    }
}

/// `num_layers` causal blocks applied in sequence.
///
/// Before each block the caller's mask (if any) is ANDed with a causal mask
/// of the current sequence length.
#[derive(Debug, Clone)]
pub struct TransformerDecoder {
    pub layers: Vec<TransformerBlock>,
}

impl TransformerDecoder {
    /// Decoder-only stack.
    pub fn new<R: Rng>(config: &ModelConfig, rng: &mut R) -> NnResult<Self> {
        Ok(Self {
            layers: build_layers(config, false, rng)?,
        })
    }

    /// Stack whose blocks also attend to an encoder memory.
    pub fn with_cross_attention<R: Rng>(config: &ModelConfig, rng: &mut R) -> NnResult<Self> {
        Ok(Self {
            layers: build_layers(config, true, rng)?,
        })
    }

    pub fn forward(&self, x: &Tensor, mask: Option<&Tensor>) -> NnResult<Tensor> {
        self.run(x, mask, None, None::<&mut StdRng>)
    }

    pub fn forward_train<R: Rng + ?Sized>(
        &self,
        x: &Tensor,
        mask: Option<&Tensor>,
        rng: &mut R,
    ) -> NnResult<Tensor> {
        self.run(x, mask, None, Some(rng))
    }

    /// Fails with `InvalidConfig` unless built [`with_cross_attention`](Self::with_cross_attention).
    pub fn forward_with_memory(
        &self,
        x: &Tensor,
        mask: Option<&Tensor>,
        memory: &Tensor,
        memory_mask: Option<&Tensor>,
    ) -> NnResult<Tensor> {
        self.run(x, mask, Some((memory, memory_mask)), None::<&mut StdRng>)
    }

    /// Run `x` `[new_len, d_model]` as the next positions after those held
    /// in `cache`, then advance the cache by `new_len`.
    pub fn forward_with_cache(&self, x: &Tensor, cache: &mut KVCache) -> NnResult<Tensor> {
        let new_len = seq_len(x)?;
        if cache.num_layers() != self.layers.len() {
            return Err(NnError::InvalidConfig(format!(
                "KVCache has {} layers, decoder has {}",
                cache.num_layers(),
                self.layers.len()
            )));
        }
        let mut h = x.clone();
        for (idx, layer) in self.layers.iter().enumerate() {
            h = layer.forward_with_cache(&h, cache, idx)?;
        }
        cache.advance(new_len);
        Ok(h)
    }

    fn run<R: Rng + ?Sized>(
        &self,
        x: &Tensor,
        mask: Option<&Tensor>,
        memory: Option<(&Tensor, Option<&Tensor>)>,
        mut rng: Option<&mut R>,
    ) -> NnResult<Tensor> {
        let causal = causal_mask(seq_len(x)?);
        let mut h = x.clone();
        for layer in &self.layers {
            let block_mask = match mask {
                Some(m) => combine_masks(m, &causal)?,
                None => causal.clone(),
            };
            h = layer.run(&h, Some(&block_mask), memory, rng.as_deref_mut())?;
        }
        Ok(h)
    }
}

impl Module for TransformerDecoder {
    fn parameters(&self) -> Vec<&Parameter> {
        collect_params(&self.layers)
    }

    fn parameters_mut(&mut self) -> Vec<&mut Parameter> {
        collect_params_mut(&mut self.layers)
    }
}
