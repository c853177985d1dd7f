//! Gaussian elimination: linear solves, inverse and determinant.

use super::{require_square, PIVOT_TOLERANCE};
use crate::api::error::{TensorError, TensorResult};
use crate::core::shape::Shape;
use crate::core::tensor::Tensor;

/// Row-major augmented matrix `[A | B]` worked on in place.
struct Augmented {
    data: Vec<f64>,
    rows: usize,
    cols: usize,
}

impl Augmented {
    fn new(a: &Tensor, rhs: &[f64], rhs_cols: usize) -> Self {
        let n = a.dims()[0];
        let cols = n + rhs_cols;
        let mut data = Vec::with_capacity(n * cols);
        for i in 0..n {
            data.extend_from_slice(&a.data()[i * n..(i + 1) * n]);
            data.extend_from_slice(&rhs[i * rhs_cols..(i + 1) * rhs_cols]);
        }
        Self { data, rows: n, cols }
    }

    fn at(&self, r: usize, c: usize) -> f64 {
        self.data[r * self.cols + c]
    }

    fn swap_rows(&mut self, r1: usize, r2: usize) {
        if r1 != r2 {
            for c in 0..self.cols {
                self.data.swap(r1 * self.cols + c, r2 * self.cols + c);
            }
        }
    }

    /// `row[target] -= factor * row[source]`, from column `from` onwards.
    fn eliminate(&mut self, target: usize, source: usize, factor: f64, from: usize) {
        for c in from..self.cols {
            let v = self.at(source, c);
            self.data[target * self.cols + c] -= factor * v;
        }
    }

    /// Choose the largest-magnitude entry at or below the diagonal of `col`
    /// and swap it into place. Fails when it is below the tolerance.
    fn pivot(&mut self, col: usize) -> TensorResult<()> {
        let mut best = col;
        let mut best_val = self.at(col, col).abs();
        for r in col + 1..self.rows {
            let v = self.at(r, col).abs();
            if v > best_val {
                best = r;
                best_val = v;
            }
        }
        if best_val < PIVOT_TOLERANCE {
            return Err(TensorError::SingularMatrix {
                pivot: col,
                value: best_val,
            });
        }
        self.swap_rows(col, best);
        Ok(())
    }
}

/// Solve `A x = b` by Gaussian elimination with partial pivoting and back
/// substitution.
///
/// `b` is either a vector of length `n` or an `[n, k]` matrix of right-hand
/// sides; `x` has the same shape as `b`.
pub fn solve(a: &Tensor, b: &Tensor) -> TensorResult<Tensor> {
    let n = require_square(a, "solve")?;
    let rhs_cols = match b.dims() {
        [len] if *len == n => 1,
        [rows, k] if *rows == n => *k,
        _ => {
            return Err(TensorError::DimensionMismatch(format!(
                "solve: right-hand side {} does not match matrix {}",
                b.shape(),
                a.shape()
            )))
        }
    };

    let mut aug = Augmented::new(a, b.data(), rhs_cols);
    for col in 0..n {
        aug.pivot(col)?;
        let p = aug.at(col, col);
        for r in col + 1..n {
            let factor = aug.at(r, col) / p;
            if factor != 0.0 {
                aug.eliminate(r, col, factor, col);
            }
        }
    }

    let mut x = vec![0.0; n * rhs_cols];
    for k in 0..rhs_cols {
        for i in (0..n).rev() {
            let mut acc = aug.at(i, n + k);
            for j in i + 1..n {
                acc -= aug.at(i, j) * x[j * rhs_cols + k];
            }
            x[i * rhs_cols + k] = acc / aug.at(i, i);
        }
    }
    Ok(Tensor::from_parts(x, b.shape().clone()))
}

/// Inverse by Gauss-Jordan elimination on `[A | I]`.
pub fn inv(a: &Tensor) -> TensorResult<Tensor> {
    let n = require_square(a, "inv")?;
    let mut aug = Augmented::new(a, Tensor::eye(n).data(), n);

    for col in 0..n {
        aug.pivot(col)?;
        let p = aug.at(col, col);
        for c in 0..aug.cols {
            aug.data[col * aug.cols + c] /= p;
        }
        for r in 0..n {
            if r != col {
                let factor = aug.at(r, col);
                if factor != 0.0 {
                    aug.eliminate(r, col, factor, 0);
                }
            }
        }
    }

    let mut out = Vec::with_capacity(n * n);
    for r in 0..n {
        out.extend_from_slice(&aug.data[r * aug.cols + n..(r + 1) * aug.cols]);
    }
    Ok(Tensor::from_parts(out, Shape::new([n, n])))
}

/// Determinant of a square matrix.
///
/// Sizes up to 3 use closed forms (Sarrus' rule for 3x3). Larger matrices
/// use LU elimination with partial pivoting, flipping the sign per row swap;
/// an exactly zero pivot column gives 0.
pub fn det(a: &Tensor) -> TensorResult<f64> {
    let n = require_square(a, "det")?;
    let d = a.data();
    let det = match n {
        0 => 1.0,
        1 => d[0],
        2 => d[0] * d[3] - d[1] * d[2],
        3 => {
            d[0] * d[4] * d[8] + d[1] * d[5] * d[6] + d[2] * d[3] * d[7]
                - d[2] * d[4] * d[6]
                - d[1] * d[3] * d[8]
                - d[0] * d[5] * d[7]
        }
        _ => lu_det(a, n),
    };
    Ok(det)
}

fn lu_det(a: &Tensor, n: usize) -> f64 {
    let mut aug = Augmented::new(a, &[], 0);
    let mut sign = 1.0;
    for col in 0..n {
        let best = (col..n)
            .max_by(|&x, &y| aug.at(x, col).abs().total_cmp(&aug.at(y, col).abs()))
            .unwrap_or(col);
        if aug.at(best, col) == 0.0 {
            return 0.0;
        }
        if best != col {
            aug.swap_rows(col, best);
            sign = -sign;
        }
        let p = aug.at(col, col);
        for r in col + 1..n {
            let factor = aug.at(r, col) / p;
            aug.eliminate(r, col, factor, col);
        }
    }
    sign * (0..n).map(|i| aug.at(i, i)).product::<f64>()
}
