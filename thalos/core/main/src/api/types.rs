//! Core types for tensor and linear algebra operations

use crate::core::tensor::Tensor;

/// Order of a vector or matrix norm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NormOrder {
    /// Sum of absolute values.
    L1,
    /// Euclidean norm (Frobenius for matrices).
    #[default]
    L2,
    /// Largest absolute value.
    Inf,
}

impl NormOrder {
    /// Map a numeric order (`1`, `2` or `f64::INFINITY`) onto a norm.
    pub fn from_p(p: f64) -> Option<Self> {
        if p == 1.0 {
            Some(NormOrder::L1)
        } else if p == 2.0 {
            Some(NormOrder::L2)
        } else if p.is_infinite() && p > 0.0 {
            Some(NormOrder::Inf)
        } else {
            None
        }
    }
}

/// Settings for power iteration in [`eig`](crate::linalg::eig) and
/// [`svd`](crate::linalg::svd).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerIteration {
    pub max_iterations: usize,
    /// Stop once successive unit vectors differ by less than this (L2).
    pub tolerance: f64,
    /// Seed for the starting vector.
    pub seed: u64,
}

impl Default for PowerIteration {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            tolerance: 1e-10,
            seed: 42,
        }
    }
}

/// Weight initialization scheme.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Initializer {
    Zeros,
    Ones,
    Normal { mean: f64, std: f64 },
    Uniform { low: f64, high: f64 },
    XavierUniform,
    XavierNormal,
    HeUniform,
    HeNormal,
}

/// Result of a QR decomposition, `A = Q·R`.
#[derive(Debug, Clone, PartialEq)]
pub struct Qr {
    /// Columns are orthonormal, or zero where the input column was degenerate.
    pub q: Tensor,
    /// Upper triangular.
    pub r: Tensor,
}

/// Dominant eigenvalue with its unit eigenvector.
#[derive(Debug, Clone, PartialEq)]
pub struct EigenPair {
    pub value: f64,
    pub vector: Tensor,
    /// Iterations performed before convergence or the iteration cap.
    pub iterations: usize,
}

/// Leading singular triplets, `A ≈ U·diag(S)·Vᵀ`.
///
/// `u` is `[m, k]`, `s` is `[k]` and `v` is `[n, k]`. Only the components
/// requested are computed; this is not a full decomposition.
#[derive(Debug, Clone, PartialEq)]
pub struct Svd {
    pub u: Tensor,
    pub s: Tensor,
    pub v: Tensor,
}
