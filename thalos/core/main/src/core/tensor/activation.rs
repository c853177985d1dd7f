//! Element-wise nonlinearities, softmax and layer normalization.

use crate::api::error::{TensorError, TensorResult};
use super::tensor::Tensor;
use super::views::split_at_axis;

/// sqrt(2 / pi), used by the tanh approximation of GELU.
const GELU_COEFF: f64 = 0.797_884_560_802_865_4;

impl Tensor {
    // ==================== Activations ====================

    pub fn relu(&self) -> Tensor {
        self.map(|x| x.max(0.0))
    }

    /// Logistic sigmoid, evaluated without overflow for large `|x|`.
    pub fn sigmoid(&self) -> Tensor {
        self.map(|x| {
            if x >= 0.0 {
                1.0 / (1.0 + (-x).exp())
            } else {
                let e = x.exp();
                e / (1.0 + e)
            }
        })
    }

    pub fn tanh(&self) -> Tensor {
        self.map(f64::tanh)
    }

    /// GELU, tanh approximation.
    pub fn gelu(&self) -> Tensor {
        self.map(|x| 0.5 * x * (1.0 + (GELU_COEFF * (x + 0.044715 * x * x * x)).tanh()))
    }

    /// SiLU (swish): `x * sigmoid(x)`.
    pub fn silu(&self) -> Tensor {
        self.map(|x| x / (1.0 + (-x).exp()))
    }

    // ==================== Softmax ====================

    /// Softmax along `axis` of a rank-1 or rank-2 tensor.
    ///
    /// The lane maximum is subtracted before exponentiating.
    pub fn softmax(&self, axis: i64) -> TensorResult<Tensor> {
        self.require_low_rank("softmax")?;
        let axis = self.shape.normalize_axis(axis)?;
        let (outer, extent, inner) = split_at_axis(self.dims(), axis);

        let mut out = vec![0.0; self.numel()];
        for o in 0..outer {
            let base = o * extent * inner;
            for i in 0..inner {
                let at = |k: usize| base + k * inner + i;
                let max_val = (0..extent)
                    .map(|k| self.data[at(k)])
                    .fold(f64::NEG_INFINITY, f64::max);
                let mut sum_exp = 0.0;
                for k in 0..extent {
                    let e = (self.data[at(k)] - max_val).exp();
                    out[at(k)] = e;
                    sum_exp += e;
                }
                for k in 0..extent {
                    out[at(k)] /= sum_exp;
                }
            }
        }
        Ok(Tensor::from_parts(out, self.shape.clone()))
    }

    // ==================== Layer normalization ====================

    /// Normalize the last axis to zero mean and unit population variance,
    /// then scale by `gamma` and shift by `beta`.
    pub fn layer_norm(&self, gamma: &Tensor, beta: &Tensor, eps: f64) -> TensorResult<Tensor> {
        self.require_low_rank("layer_norm")?;
        let features = self.dims()[self.rank() - 1];
        for param in [gamma, beta] {
            if param.numel() != features {
                return Err(TensorError::shape(&[features], param.dims()));
            }
        }

        let mut out = Vec::with_capacity(self.numel());
        for row in self.data.chunks(features.max(1)) {
            let mean = row.iter().sum::<f64>() / features as f64;
            let var = row.iter().map(|x| (x - mean) * (x - mean)).sum::<f64>() / features as f64;
            let denom = (var + eps).sqrt();
            for (j, &x) in row.iter().enumerate() {
                out.push((x - mean) / denom * gamma.data[j] + beta.data[j]);
            }
        }
        Ok(Tensor::from_parts(out, self.shape.clone()))
    }

    fn require_low_rank(&self, op: &str) -> TensorResult<()> {
        match self.rank() {
            1 | 2 => Ok(()),
            r => Err(TensorError::InvalidArgument(format!(
                "{} supports rank 1 or 2, got rank {}",
                op, r
            ))),
        }
    }
}
