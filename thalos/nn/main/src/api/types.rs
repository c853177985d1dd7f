//! Types for neural network layers

use serde::Deserialize;
use thalos_core::Tensor;

/// Activation function type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    #[default]
    Gelu,
    Relu,
    Tanh,
    Sigmoid,
    Silu,
}

impl Activation {
    pub fn apply(&self, x: &Tensor) -> Tensor {
        match self {
            Activation::Gelu => x.gelu(),
            Activation::Relu => x.relu(),
            Activation::Tanh => x.tanh(),
            Activation::Sigmoid => x.sigmoid(),
            Activation::Silu => x.silu(),
        }
    }
}

/// Hyperparameters of a [`LanguageModel`](crate::LanguageModel).
///
/// Every field has a default, so a JSON file only needs the keys it
/// overrides.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub vocab_size: usize,
    pub d_model: usize,
    pub num_heads: usize,
    pub num_layers: usize,
    pub d_ff: usize,
    pub max_seq_len: usize,
    pub dropout: f64,
    pub layer_norm_eps: f64,
    pub activation: Activation,
    /// Seed for parameter initialization.
    pub seed: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            vocab_size: 5000,
            d_model: 256,
            num_heads: 4,
            num_layers: 4,
            d_ff: 1024,
            max_seq_len: 512,
            dropout: 0.1,
            layer_norm_eps: 1e-5,
            activation: Activation::Gelu,
            seed: 42,
        }
    }
}

impl ModelConfig {
    pub fn head_dim(&self) -> usize {
        self.d_model / self.num_heads
    }
}

/// Decoding settings for [`LanguageModel::generate`](crate::LanguageModel::generate).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub max_new_tokens: usize,
    /// 0 selects greedy decoding.
    pub temperature: f64,
    pub top_k: Option<usize>,
    pub top_p: Option<f64>,
    /// Generation stops after this token is produced.
    pub eos_token: Option<usize>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_new_tokens: 100,
            temperature: 1.0,
            top_k: None,
            top_p: None,
            eos_token: Some(3),
        }
    }
}

/// Result of scaled dot-product attention.
#[derive(Debug, Clone)]
pub struct AttentionOutput {
    /// `[seq_q, d_v]`
    pub output: Tensor,
    /// `[seq_q, seq_k]`, each row a probability distribution.
    pub weights: Tensor,
}
