//! Cross-attention: queries from the decoder, keys and values from an
//! encoder memory. No causal mask.

use crate::api::error::NnResult;
use crate::api::traits::{Layer, Module};
use crate::core::attention::MultiHeadAttention;
use crate::core::dropout::Dropout;
use crate::core::layer_norm::LayerNorm;
use crate::core::parameter::Parameter;
use rand::rngs::StdRng;
use rand::Rng;
use thalos_core::Tensor;

/// `LayerNorm(x + MultiHeadAttention(x, memory, memory, mask))`.
#[derive(Debug, Clone)]
pub struct CrossAttentionBlock {
    pub attention: MultiHeadAttention,
    pub norm: LayerNorm,
    pub dropout: Dropout,
}

impl CrossAttentionBlock {
    pub fn new<R: Rng>(
        d_model: usize,
        num_heads: usize,
        dropout: f64,
        eps: f64,
        rng: &mut R,
    ) -> NnResult<Self> {
        Ok(Self {
            attention: MultiHeadAttention::new(d_model, num_heads, rng)?,
            norm: LayerNorm::new(d_model, eps),
            dropout: Dropout::new(dropout)?,
        })
    }

    /// `x` is `[seq_dec, d_model]`, `memory` is `[seq_enc, d_model]`. The
    /// optional mask is `[seq_dec, seq_enc]` or broadcasts to it.
    pub fn forward(&self, x: &Tensor, memory: &Tensor, mask: Option<&Tensor>) -> NnResult<Tensor> {
        self.run(x, memory, mask, None::<&mut StdRng>)
    }

    pub fn forward_train<R: Rng + ?Sized>(
        &self,
        x: &Tensor,
        memory: &Tensor,
        mask: Option<&Tensor>,
        rng: &mut R,
    ) -> NnResult<Tensor> {
        self.run(x, memory, mask, Some(rng))
    }

    pub(crate) fn run<R: Rng + ?Sized>(
        &self,
        x: &Tensor,
        memory: &Tensor,
        mask: Option<&Tensor>,
        rng: Option<&mut R>,
    ) -> NnResult<Tensor> {
        let attended = self.attention.forward(x, memory, memory, mask)?;
        let attended = self.dropout.apply(attended, rng);
        self.norm.forward(&x.add(&attended)?)
    }
}

impl Module for CrossAttentionBlock {
    fn parameters(&self) -> Vec<&Parameter> {
        let mut params = self.attention.parameters();
        params.extend(self.norm.parameters());
        params
    }

    fn parameters_mut(&mut self) -> Vec<&mut Parameter> {
        let mut params = self.attention.parameters_mut();
        params.extend(self.norm.parameters_mut());
        params
    }
}
