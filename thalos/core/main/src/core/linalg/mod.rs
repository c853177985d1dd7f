//! Naive dense linear algebra over rank-2 tensors.
//!
//! All routines are single-threaded, unblocked and return freshly allocated
//! tensors. Elimination routines treat a pivot with magnitude below
//! [`PIVOT_TOLERANCE`] as singular.
//!
//! ## Example
//!
//! ```rust
//! use thalos_core::{linalg, Tensor};
//!
//! let a = Tensor::from_rows(&[[4.0, 7.0], [2.0, 6.0]]).unwrap();
//! assert_eq!(linalg::det(&a).unwrap(), 10.0);
//!
//! let inv = linalg::inv(&a).unwrap();
//! assert!(linalg::matmul(&a, &inv).unwrap().allclose(&Tensor::eye(2), 1e-12));
//! ```

mod decompose;
mod elimination;
mod products;

pub use decompose::{eig, eig_with, qr, svd, svd_truncated, svd_with};
pub use elimination::{det, inv, solve};
pub use products::{dot, matmul, norm, outer, trace, transpose};

/// Pivot magnitude below which a matrix is reported singular.
pub const PIVOT_TOLERANCE: f64 = 1e-10;

use crate::api::error::{TensorError, TensorResult};
use crate::core::tensor::Tensor;

/// Side length of a square rank-2 tensor.
pub(crate) fn require_square(a: &Tensor, op: &str) -> TensorResult<usize> {
    match a.dims() {
        [rows, cols] if rows == cols => Ok(*rows),
        dims => Err(TensorError::InvalidArgument(format!(
            "{} requires a square matrix, got shape {:?}",
            op, dims
        ))),
    }
}
