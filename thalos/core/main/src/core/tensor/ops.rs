//! Element-wise arithmetic with broadcasting.
//!
//! Division follows IEEE 754 throughout: `x / 0.0` is `±inf` and `0.0 / 0.0`
//! is `NaN`. No arithmetic operation fails on the values themselves; only
//! incompatible shapes are reported as errors.

use crate::api::error::TensorResult;
use crate::core::shape::next_index;
use super::tensor::Tensor;

impl Tensor {
    // ==================== Element-wise binary ops ====================

    /// Element-wise addition with broadcasting.
    pub fn add(&self, other: &Tensor) -> TensorResult<Tensor> {
        self.zip_with(other, |a, b| a + b)
    }

    /// Element-wise subtraction with broadcasting.
    pub fn sub(&self, other: &Tensor) -> TensorResult<Tensor> {
        self.zip_with(other, |a, b| a - b)
    }

    /// Element-wise multiplication with broadcasting.
    pub fn mul(&self, other: &Tensor) -> TensorResult<Tensor> {
        self.zip_with(other, |a, b| a * b)
    }

    /// Element-wise division with broadcasting. Zero divisors yield `±inf`/`NaN`.
    pub fn div(&self, other: &Tensor) -> TensorResult<Tensor> {
        self.zip_with(other, |a, b| a / b)
    }

    /// Element-wise power with broadcasting.
    pub fn pow(&self, exponent: &Tensor) -> TensorResult<Tensor> {
        self.zip_with(exponent, f64::powf)
    }

    // ==================== Scalar ops ====================

    pub fn add_scalar(&self, scalar: f64) -> Tensor {
        self.map(|x| x + scalar)
    }

    pub fn sub_scalar(&self, scalar: f64) -> Tensor {
        self.map(|x| x - scalar)
    }

    pub fn mul_scalar(&self, scalar: f64) -> Tensor {
        self.map(|x| x * scalar)
    }

    pub fn div_scalar(&self, scalar: f64) -> Tensor {
        self.map(|x| x / scalar)
    }

    pub fn pow_scalar(&self, exponent: f64) -> Tensor {
        self.map(|x| x.powf(exponent))
    }

    pub fn neg(&self) -> Tensor {
        self.map(|x| -x)
    }

    // ==================== Unary math ====================

    pub fn abs(&self) -> Tensor {
        self.map(f64::abs)
    }

    pub fn sqrt(&self) -> Tensor {
        self.map(f64::sqrt)
    }

    pub fn exp(&self) -> Tensor {
        self.map(f64::exp)
    }

    /// Natural logarithm.
    pub fn ln(&self) -> Tensor {
        self.map(f64::ln)
    }

    /// Apply `f` to every element in row-major order, returning a new tensor
    /// of the same shape.
    pub fn map(&self, mut f: impl FnMut(f64) -> f64) -> Tensor {
        Tensor::from_parts(self.data.iter().map(|&x| f(x)).collect(), self.shape.clone())
    }

    // ==================== Masking ====================

    /// Replace elements where `mask` is zero with `value`.
    ///
    /// `mask` must broadcast to this tensor's shape.
    pub fn masked_fill(&self, mask: &Tensor, value: f64) -> TensorResult<Tensor> {
        self.zip_with(mask, |x, m| if m == 0.0 { value } else { x })
    }

    // ==================== Internal helpers ====================

    /// Combine two tensors element by element.
    ///
    /// Identical shapes pair buffers position by position. Otherwise each
    /// output multi-index is mapped back into both sources with 0 on every
    /// broadcast axis.
    pub(crate) fn zip_with(
        &self,
        other: &Tensor,
        f: impl Fn(f64, f64) -> f64,
    ) -> TensorResult<Tensor> {
        if self.shape == other.shape {
            let data = self
                .data
                .iter()
                .zip(&other.data)
                .map(|(&a, &b)| f(a, b))
                .collect();
            return Ok(Tensor::from_parts(data, self.shape.clone()));
        }

        let out_shape = self.shape.broadcast_result(&other.shape)?;
        let lhs_strides = self.shape.strides();
        let rhs_strides = other.shape.strides();
        let mut data = Vec::with_capacity(out_shape.size());

        if out_shape.size() > 0 {
            let mut index = vec![0usize; out_shape.rank()];
            loop {
                let a = self.data[self.shape.broadcast_offset(&lhs_strides, &index)];
                let b = other.data[other.shape.broadcast_offset(&rhs_strides, &index)];
                data.push(f(a, b));
                if !next_index(&mut index, out_shape.dims()) {
                    break;
                }
            }
        }

        Ok(Tensor::from_parts(data, out_shape))
    }
}
