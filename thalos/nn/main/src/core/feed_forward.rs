//! Position-wise feed-forward network.

use crate::api::error::NnResult;
use crate::api::traits::{Layer, Module};
use crate::api::types::Activation;
use crate::core::dropout::Dropout;
use crate::core::linear::Linear;
use crate::core::parameter::Parameter;
use rand::rngs::StdRng;
use rand::Rng;
use thalos_core::Tensor;

/// `down_proj(dropout(act(up_proj(x))))`, applied to each row independently.
#[derive(Debug, Clone)]
pub struct FeedForward {
    pub up_proj: Linear,
    pub down_proj: Linear,
    pub hidden_dim: usize,
    pub activation: Activation,
    pub dropout: Dropout,
}

impl FeedForward {
    /// Create a standard feed-forward layer with GELU activation.
    pub fn new<R: Rng>(
        d_model: usize,
        hidden_dim: usize,
        dropout: f64,
        rng: &mut R,
    ) -> NnResult<Self> {
        Self::with_activation(d_model, hidden_dim, dropout, Activation::Gelu, rng)
    }

    pub fn with_activation<R: Rng>(
        d_model: usize,
        hidden_dim: usize,
        dropout: f64,
        activation: Activation,
        rng: &mut R,
    ) -> NnResult<Self> {
        Ok(Self {
            up_proj: Linear::new(d_model, hidden_dim, rng)?,
            down_proj: Linear::new(hidden_dim, d_model, rng)?,
            hidden_dim,
            activation,
            dropout: Dropout::new(dropout)?,
        })
    }

    /// Construct from pre-loaded projection layers (GELU, no dropout).
    pub fn from_weights(up_proj: Linear, down_proj: Linear) -> NnResult<Self> {
        let hidden_dim = up_proj.out_features;
        Ok(Self {
            up_proj,
            down_proj,
            hidden_dim,
            activation: Activation::Gelu,
            dropout: Dropout::new(0.0)?,
        })
    }

    /// Training-mode forward pass with dropout on the hidden activations.
    pub fn forward_train<R: Rng + ?Sized>(&self, input: &Tensor, rng: &mut R) -> NnResult<Tensor> {
        self.run(input, Some(rng))
    }

    pub(crate) fn run<R: Rng + ?Sized>(
        &self,
        input: &Tensor,
        rng: Option<&mut R>,
    ) -> NnResult<Tensor> {
        let h = self.activation.apply(&self.up_proj.forward(input)?);
        let h = self.dropout.apply(h, rng);
        self.down_proj.forward(&h)
    }
}

impl Module for FeedForward {
    fn parameters(&self) -> Vec<&Parameter> {
        let mut params = self.up_proj.parameters();
        params.extend(self.down_proj.parameters());
        params
    }

    fn parameters_mut(&mut self) -> Vec<&mut Parameter> {
        let mut params = self.up_proj.parameters_mut();
        params.extend(self.down_proj.parameters_mut());
        params
    }
}

impl Layer for FeedForward {
    fn forward(&self, input: &Tensor) -> NnResult<Tensor> {
        self.run(input, None::<&mut StdRng>)
    }
}
