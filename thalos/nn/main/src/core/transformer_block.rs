//! Transformer block: post-norm architecture with self-attention, optional
//! cross-attention and a feed-forward network.

use std::time::Instant;

use crate::api::error::{NnError, NnResult};
use crate::api::traits::{Layer, Module};
use crate::api::types::ModelConfig;
use crate::core::attention::MultiHeadAttention;
use crate::core::cross_attention::CrossAttentionBlock;
use crate::core::dropout::Dropout;
use crate::core::feed_forward::FeedForward;
use crate::core::kv_cache::KVCache;
use crate::core::layer_norm::LayerNorm;
use crate::core::parameter::Parameter;
use rand::rngs::StdRng;
use rand::Rng;
use thalos_core::Tensor;

/// A single transformer block with residual-then-normalize sublayers.
///
/// Structure: x -> + self_attn -> norm1 -> [+ cross_attn -> norm] -> + ffn -> norm2
#[derive(Debug, Clone)]
pub struct TransformerBlock {
    pub attention: MultiHeadAttention,
    pub cross_attention: Option<CrossAttentionBlock>,
    pub feed_forward: FeedForward,
    pub attention_norm: LayerNorm,
    pub ffn_norm: LayerNorm,
    pub dropout: Dropout,
}

impl TransformerBlock {
    pub fn new<R: Rng>(
        d_model: usize,
        num_heads: usize,
        d_ff: usize,
        dropout: f64,
        eps: f64,
        rng: &mut R,
    ) -> NnResult<Self> {
        Ok(Self {
            attention: MultiHeadAttention::new(d_model, num_heads, rng)?,
            cross_attention: None,
            feed_forward: FeedForward::new(d_model, d_ff, dropout, rng)?,
            attention_norm: LayerNorm::new(d_model, eps),
            ffn_norm: LayerNorm::new(d_model, eps),
            dropout: Dropout::new(dropout)?,
        })
    }

    pub fn from_config<R: Rng>(config: &ModelConfig, rng: &mut R) -> NnResult<Self> {
        Ok(Self {
            attention: MultiHeadAttention::new(config.d_model, config.num_heads, rng)?,
            cross_attention: None,
            feed_forward: FeedForward::with_activation(
                config.d_model,
                config.d_ff,
                config.dropout,
                config.activation,
                rng,
            )?,
            attention_norm: LayerNorm::new(config.d_model, config.layer_norm_eps),
            ffn_norm: LayerNorm::new(config.d_model, config.layer_norm_eps),
            dropout: Dropout::new(config.dropout)?,
        })
    }

    /// Adds a cross-attention sublayer between self-attention and the FFN.
    pub fn with_cross_attention<R: Rng>(mut self, config: &ModelConfig, rng: &mut R) -> NnResult<Self> {
        self.cross_attention = Some(CrossAttentionBlock::new(
            config.d_model,
            config.num_heads,
            config.dropout,
            config.layer_norm_eps,
            rng,
        )?);
        Ok(self)
    }

    /// Access the self-attention layer.
    pub fn attention(&self) -> &MultiHeadAttention {
        &self.attention
    }

    /// Inference forward pass over `[seq_len, d_model]`. Cross-attention, if
    /// present, is skipped.
    pub fn forward(&self, input: &Tensor, mask: Option<&Tensor>) -> NnResult<Tensor> {
        self.run(input, mask, None, None::<&mut StdRng>)
    }

    /// Training forward pass: dropout on every sublayer output.
    pub fn forward_train<R: Rng + ?Sized>(
        &self,
        input: &Tensor,
        mask: Option<&Tensor>,
        rng: &mut R,
    ) -> NnResult<Tensor> {
        self.run(input, mask, None, Some(rng))
    }

    /// Inference forward pass that also attends to an encoder memory.
    ///
    /// Fails with `InvalidConfig` when the block has no cross-attention.
    pub fn forward_with_memory(
        &self,
        input: &Tensor,
        mask: Option<&Tensor>,
        memory: &Tensor,
        memory_mask: Option<&Tensor>,
    ) -> NnResult<Tensor> {
        self.run(input, mask, Some((memory, memory_mask)), None::<&mut StdRng>)
    }

    pub(crate) fn run<R: Rng + ?Sized>(
        &self,
        input: &Tensor,
        mask: Option<&Tensor>,
        memory: Option<(&Tensor, Option<&Tensor>)>,
        rng: Option<&mut R>,
    ) -> NnResult<Tensor> {
        let _t = if log::log_enabled!(log::Level::Debug) { Some(Instant::now()) } else { None };

        let attn_out = self.attention.forward(input, input, input, mask)?;
        let out = self.after_attention(input, attn_out, memory, rng)?;

        if let Some(t) = _t {
            log::debug!(
                "[perf] transformer_block::forward {} {:.3}ms",
                input.shape(),
                t.elapsed().as_secs_f64() * 1000.0
            );
        }
        Ok(out)
    }

    /// Inference pass over new positions only, with causal self-attention
    /// against the keys and values cached for `layer_idx`.
    pub fn forward_with_cache(
        &self,
        input: &Tensor,
        cache: &mut KVCache,
        layer_idx: usize,
    ) -> NnResult<Tensor> {
        let attn_out = self.attention.forward_with_cache(input, cache, layer_idx)?;
        self.after_attention(input, attn_out, None, None::<&mut StdRng>)
    }

    /// Residual and norm around self-attention, then the optional
    /// cross-attention and the feed-forward sublayer.
    fn after_attention<R: Rng + ?Sized>(
        &self,
        input: &Tensor,
        attn_out: Tensor,
        memory: Option<(&Tensor, Option<&Tensor>)>,
        mut rng: Option<&mut R>,
    ) -> NnResult<Tensor> {
        // x = ln(x + attn(x))
        let attn_out = self.dropout.apply(attn_out, rng.as_deref_mut());
        let mut x = self.attention_norm.forward(&input.add(&attn_out)?)?;

        if let Some((memory, memory_mask)) = memory {
            let cross = self.cross_attention.as_ref().ok_or_else(|| {
                NnError::InvalidConfig("block was built without cross-attention".into())
            })?;
            x = cross.run(&x, memory, memory_mask, rng.as_deref_mut())?;
        }

        // x = ln(x + ffn(x))
        let ffn_out = self.feed_forward.run(&x, rng.as_deref_mut())?;
        let ffn_out = self.dropout.apply(ffn_out, rng);
        self.ffn_norm.forward(&x.add(&ffn_out)?)
    }
}

impl Module for TransformerBlock {
    fn parameters(&self) -> Vec<&Parameter> {
        let mut params = self.attention.parameters();
        params.extend(self.attention_norm.parameters());
        if let Some(ref cross) = self.cross_attention {
            params.extend(cross.parameters());
        }
        params.extend(self.feed_forward.parameters());
        params.extend(self.ffn_norm.parameters());
        params
    }

    fn parameters_mut(&mut self) -> Vec<&mut Parameter> {
        let mut params = self.attention.parameters_mut();
        params.extend(self.attention_norm.parameters_mut());
        if let Some(ref mut cross) = self.cross_attention {
            params.extend(cross.parameters_mut());
        }
        params.extend(self.feed_forward.parameters_mut());
        params.extend(self.ffn_norm.parameters_mut());
        params
    }
}
