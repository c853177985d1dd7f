//! Learnable parameter wrapper.

use crate::api::error::NnResult;
use thalos_core::{Tensor, TensorError};

/// A named, shape-locked, mutable tensor owned by exactly one layer.
///
/// Forward passes only ever read the value. The update path
/// ([`assign`](Parameter::assign), [`apply_update`](Parameter::apply_update))
/// is how an external optimizer writes new values back, and it refuses to
/// change the shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    name: String,
    value: Tensor,
}

impl Parameter {
    pub fn new(name: impl Into<String>, value: Tensor) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &Tensor {
        &self.value
    }

    pub fn dims(&self) -> &[usize] {
        self.value.dims()
    }

    pub fn numel(&self) -> usize {
        self.value.numel()
    }

    /// Replace the value with a tensor of the same shape.
    pub fn assign(&mut self, value: Tensor) -> NnResult<()> {
        self.check_shape(&value)?;
        self.value = value;
        Ok(())
    }

    /// Gradient-descent style step: `value -= lr * delta`.
    pub fn apply_update(&mut self, delta: &Tensor, lr: f64) -> NnResult<()> {
        self.check_shape(delta)?;
        self.value = self.value.sub(&delta.mul_scalar(lr))?;
        Ok(())
    }

    fn check_shape(&self, other: &Tensor) -> NnResult<()> {
        if other.dims() != self.dims() {
            return Err(TensorError::ShapeMismatch {
                expected: self.dims().to_vec(),
                got: other.dims().to_vec(),
            }
            .into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::error::NnError;

    #[test]
    fn test_assign_keeps_shape() {
        let mut p = Parameter::new("weight", Tensor::zeros([2, 3]));
        p.assign(Tensor::ones([2, 3])).unwrap();
        assert_eq!(p.value(), &Tensor::ones([2, 3]));

        let err = p.assign(Tensor::ones([3, 2])).unwrap_err();
        assert!(matches!(
            err,
            NnError::TensorError(TensorError::ShapeMismatch { .. })
        ));
        assert_eq!(p.dims(), &[2, 3]);
    }

    #[test]
    fn test_apply_update() {
        let mut p = Parameter::new("bias", Tensor::from_slice(&[1.0, 2.0]));
        p.apply_update(&Tensor::from_slice(&[10.0, -10.0]), 0.1).unwrap();
        assert!(p.value().allclose(&Tensor::from_slice(&[0.0, 3.0]), 1e-12));
        assert!(p.apply_update(&Tensor::zeros([3]), 0.1).is_err());
        assert_eq!(p.name(), "bias");
        assert_eq!(p.numel(), 2);
    }
}
