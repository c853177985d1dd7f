//! Fully connected layer.

use crate::api::error::{NnError, NnResult};
use crate::api::traits::{Layer, Module};
use crate::core::parameter::Parameter;
use rand::Rng;
use thalos_core::{random, Tensor};

/// A fully connected linear layer: y = xW^T + b
#[derive(Debug, Clone)]
pub struct Linear {
    /// Weight matrix [out_features, in_features]
    pub weight: Parameter,
    /// Optional bias vector [out_features]
    pub bias: Option<Parameter>,
    pub in_features: usize,
    pub out_features: usize,
}

impl Linear {
    /// Create a new linear layer with random initialization (with bias).
    pub fn new<R: Rng>(in_features: usize, out_features: usize, rng: &mut R) -> NnResult<Self> {
        Self::with_bias(in_features, out_features, true, rng)
    }

    /// Create a linear layer without bias
    pub fn new_no_bias<R: Rng>(
        in_features: usize,
        out_features: usize,
        rng: &mut R,
    ) -> NnResult<Self> {
        Self::with_bias(in_features, out_features, false, rng)
    }

    /// Create a linear layer with or without bias.
    ///
    /// Weights are Xavier/Glorot normal, bias starts at zero.
    pub fn with_bias<R: Rng>(
        in_features: usize,
        out_features: usize,
        use_bias: bool,
        rng: &mut R,
    ) -> NnResult<Self> {
        let weight = random::xavier_normal([out_features, in_features], rng)?;
        let bias = use_bias.then(|| Parameter::new("bias", Tensor::zeros([out_features])));

        Ok(Self {
            weight: Parameter::new("weight", weight),
            bias,
            in_features,
            out_features,
        })
    }

    /// Create a linear layer from existing weights
    pub fn from_weights(weight: Tensor, bias: Option<Tensor>) -> NnResult<Self> {
        let (out_features, in_features) = match weight.dims() {
            [out, inp] => (*out, *inp),
            other => {
                return Err(NnError::InvalidConfig(format!(
                    "Weight must be 2D, got {:?}",
                    other
                )))
            }
        };

        if let Some(ref b) = bias {
            if b.dims() != [out_features] {
                return Err(NnError::DimensionMismatch(format!(
                    "Bias shape {:?} doesn't match out_features {}",
                    b.dims(),
                    out_features
                )));
            }
        }

        Ok(Self {
            weight: Parameter::new("weight", weight),
            bias: bias.map(|b| Parameter::new("bias", b)),
            in_features,
            out_features,
        })
    }
}

impl Module for Linear {
    fn parameters(&self) -> Vec<&Parameter> {
        std::iter::once(&self.weight).chain(self.bias.as_ref()).collect()
    }

    fn parameters_mut(&mut self) -> Vec<&mut Parameter> {
        std::iter::once(&mut self.weight)
            .chain(self.bias.as_mut())
            .collect()
    }
}

impl Layer for Linear {
    /// Forward pass: y = xW^T + b
    ///
    /// Input shape: [..., in_features]
    /// Output shape: [..., out_features]
    fn forward(&self, x: &Tensor) -> NnResult<Tensor> {
        if x.rank() == 0 || x.dims()[x.rank() - 1] != self.in_features {
            return Err(NnError::DimensionMismatch(format!(
                "Linear expects last dim {}, got {:?}",
                self.in_features,
                x.dims()
            )));
        }
        let weight_t = self.weight.value().t()?;
        let output = if x.rank() == 1 {
            x.unsqueeze(0)?.matmul(&weight_t)?.squeeze(0)?
        } else {
            x.matmul(&weight_t)?
        };

        match self.bias {
            Some(ref bias) => Ok(output.add(bias.value())?),
            None => Ok(output),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thalos_core::random::seeded_rng;

    #[test]
    fn test_linear_forward() {
        let mut rng = seeded_rng(0);
        let linear = Linear::new(4, 8, &mut rng).unwrap();
        let x = Tensor::randn([2, 3, 4], &mut rng);
        let y = linear.forward(&x).unwrap();
        assert_eq!(y.dims(), &[2, 3, 8]);
    }

    #[test]
    fn test_linear_no_bias() {
        let mut rng = seeded_rng(0);
        let linear = Linear::new_no_bias(4, 8, &mut rng).unwrap();
        assert!(linear.bias.is_none());
        let y = linear.forward(&Tensor::randn([2, 4], &mut rng)).unwrap();
        assert_eq!(y.dims(), &[2, 8]);
        assert_eq!(linear.parameter_count(), 32);
    }

    #[test]
    fn test_linear_vector_input() {
        let mut rng = seeded_rng(0);
        let linear = Linear::new(3, 2, &mut rng).unwrap();
        let y = linear.forward(&Tensor::ones([3])).unwrap();
        assert_eq!(y.dims(), &[2]);
    }

    #[test]
    fn test_linear_from_weights() {
        let weight = Tensor::from_rows(&[[1.0, 0.0], [0.0, 2.0], [1.0, 1.0]]).unwrap();
        let bias = Tensor::from_slice(&[0.5, 0.0, -1.0]);
        let linear = Linear::from_weights(weight, Some(bias)).unwrap();
        assert_eq!((linear.in_features, linear.out_features), (2, 3));
        assert_eq!(linear.parameter_count(), 9);

        let y = linear.forward(&Tensor::from_rows(&[[1.0, 2.0]]).unwrap()).unwrap();
        assert_eq!(y.data(), &[1.5, 4.0, 2.0]);
    }

    #[test]
    fn test_linear_from_weights_rejects_bad_bias() {
        let weight = Tensor::zeros([3, 2]);
        assert!(matches!(
            Linear::from_weights(weight.clone(), Some(Tensor::zeros([2]))),
            Err(NnError::DimensionMismatch(_))
        ));
        assert!(matches!(
            Linear::from_weights(Tensor::zeros([6]), None),
            Err(NnError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_linear_input_mismatch() {
        let mut rng = seeded_rng(0);
        let linear = Linear::new(4, 2, &mut rng).unwrap();
        assert!(matches!(
            linear.forward(&Tensor::zeros([2, 3])),
            Err(NnError::DimensionMismatch(_))
        ));
    }

    #[test]
    fn test_xavier_scale() {
        let mut rng = seeded_rng(7);
        let linear = Linear::new(200, 200, &mut rng).unwrap();
        let expected = (2.0f64 / 400.0).sqrt();
        assert!((linear.weight.value().std_all() - expected).abs() < 0.005);
    }
}
