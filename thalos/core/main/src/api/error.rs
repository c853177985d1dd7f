//! Error types for tensor and linear algebra operations

use thiserror::Error;

/// Result type for tensor operations
pub type TensorResult<T> = Result<T, TensorError>;

/// Errors that can occur in tensor operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TensorError {
    /// Shapes are incompatible for reshape, construction or broadcasting.
    #[error("Shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch { expected: Vec<usize>, got: Vec<usize> },

    /// Inner dimensions disagree (matmul, dot, head splitting).
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// A pivot fell below the elimination tolerance.
    #[error("Singular matrix: pivot {pivot} has magnitude {value:e}")]
    SingularMatrix { pivot: usize, value: f64 },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Index {index} out of bounds for dimension {dim} with size {size}")]
    IndexOutOfBounds { dim: usize, index: usize, size: usize },
}

impl TensorError {
    pub(crate) fn shape(expected: &[usize], got: &[usize]) -> Self {
        TensorError::ShapeMismatch {
            expected: expected.to_vec(),
            got: got.to_vec(),
        }
    }
}
