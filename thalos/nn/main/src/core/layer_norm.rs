//! Layer normalization over the feature axis.

use crate::api::error::NnResult;
use crate::api::traits::{Layer, Module};
use crate::core::parameter::Parameter;
use thalos_core::Tensor;

/// `gamma * (x - mean) / sqrt(var + eps) + beta` over the last axis.
#[derive(Debug, Clone)]
pub struct LayerNorm {
    pub gamma: Parameter,
    pub beta: Parameter,
    pub eps: f64,
}

impl LayerNorm {
    /// Gain starts at one, bias at zero.
    pub fn new(features: usize, eps: f64) -> Self {
        Self {
            gamma: Parameter::new("gamma", Tensor::ones([features])),
            beta: Parameter::new("beta", Tensor::zeros([features])),
            eps,
        }
    }

    pub fn features(&self) -> usize {
        self.gamma.numel()
    }
}

impl Module for LayerNorm {
    fn parameters(&self) -> Vec<&Parameter> {
        vec![&self.gamma, &self.beta]
    }

    fn parameters_mut(&mut self) -> Vec<&mut Parameter> {
        vec![&mut self.gamma, &mut self.beta]
    }
}

impl Layer for LayerNorm {
    fn forward(&self, x: &Tensor) -> NnResult<Tensor> {
        Ok(x.layer_norm(self.gamma.value(), self.beta.value(), self.eps)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_norm_rows() {
        let ln = LayerNorm::new(4, 1e-5);
        let x = Tensor::from_rows(&[[1.0, 2.0, 3.0, 4.0], [10.0, 10.0, 10.0, 10.0]]).unwrap();
        let y = ln.forward(&x).unwrap();
        let first = &y.data()[..4];
        assert!(first.iter().sum::<f64>().abs() < 1e-9);
        assert!(first[3] > first[0]);
        // A constant row normalizes to beta.
        assert!(y.data()[4..].iter().all(|v| v.abs() < 1e-9));
        assert_eq!(ln.parameter_count(), 8);
    }

    #[test]
    fn test_layer_norm_affine() {
        let mut ln = LayerNorm::new(2, 0.0);
        ln.gamma.assign(Tensor::from_slice(&[2.0, 2.0])).unwrap();
        ln.beta.assign(Tensor::from_slice(&[1.0, 1.0])).unwrap();
        let y = ln.forward(&Tensor::from_slice(&[0.0, 2.0])).unwrap();
        assert!(y.allclose(&Tensor::from_slice(&[-1.0, 3.0]), 1e-12));
    }

    #[test]
    fn test_layer_norm_feature_mismatch() {
        let ln = LayerNorm::new(3, 1e-5);
        assert!(ln.forward(&Tensor::zeros([2, 4])).is_err());
    }
}
