//! QR by Gram-Schmidt, dominant eigenpairs by power iteration, and an
//! approximate SVD built on top of them.
//!
//! `eig` recovers only the dominant eigenpair. `svd` recovers the leading
//! singular triplet from the dominant eigenpair of `AᵀA`; `svd_truncated`
//! extends this to the top `k` triplets by Hotelling deflation of `AᵀA`.
//! Accuracy degrades for clustered singular values and for components far
//! down the spectrum, so neither is a full decomposition.

use super::{matmul, require_square, PIVOT_TOLERANCE};
use crate::api::error::{TensorError, TensorResult};
use crate::api::types::{EigenPair, PowerIteration, Qr, Svd};
use crate::core::random;
use crate::core::shape::Shape;
use crate::core::tensor::Tensor;

fn l2(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum::<f64>().sqrt()
}

fn mat_vec(a: &[f64], n: usize, v: &[f64]) -> Vec<f64> {
    (0..n)
        .map(|i| (0..n).map(|j| a[i * n + j] * v[j]).sum())
        .collect()
}

/// QR decomposition by classical Gram-Schmidt.
///
/// For an `[m, n]` input, `Q` is `[m, n]` and `R` is `[n, n]` upper
/// triangular. A column that is linearly dependent on earlier ones becomes a
/// zero column of `Q` with `R[j, j] = 0`.
///
/// ```rust
/// use thalos_core::{linalg, Tensor};
///
/// let a = Tensor::from_rows(&[[1.0, 1.0], [0.0, 1.0]]).unwrap();
/// let qr = linalg::qr(&a).unwrap();
/// assert!(linalg::matmul(&qr.q, &qr.r).unwrap().allclose(&a, 1e-12));
/// ```
pub fn qr(a: &Tensor) -> TensorResult<Qr> {
    let (m, n) = match a.dims() {
        [m, n] => (*m, *n),
        _ => {
            return Err(TensorError::InvalidArgument(format!(
                "qr requires a rank-2 tensor, got shape {}",
                a.shape()
            )))
        }
    };
    let d = a.data();
    let mut q = vec![0.0; m * n];
    let mut r = vec![0.0; n * n];

    for j in 0..n {
        let mut v: Vec<f64> = (0..m).map(|row| d[row * n + j]).collect();
        for i in 0..j {
            let proj: f64 = (0..m).map(|row| q[row * n + i] * d[row * n + j]).sum();
            r[i * n + j] = proj;
            for (row, vr) in v.iter_mut().enumerate() {
                *vr -= proj * q[row * n + i];
            }
        }
        let norm = l2(&v);
        if norm > PIVOT_TOLERANCE {
            r[j * n + j] = norm;
            for (row, vr) in v.iter().enumerate() {
                q[row * n + j] = vr / norm;
            }
        }
    }

    Ok(Qr {
        q: Tensor::from_parts(q, Shape::new([m, n])),
        r: Tensor::from_parts(r, Shape::new([n, n])),
    })
}

/// Dominant eigenpair with the default [`PowerIteration`] settings.
pub fn eig(a: &Tensor) -> TensorResult<EigenPair> {
    eig_with(a, &PowerIteration::default())
}

/// Dominant eigenpair by power iteration.
///
/// Starts from a seeded random unit vector, repeatedly multiplies by `A` and
/// renormalizes until successive vectors agree within the tolerance (up to
/// sign) or the iteration cap is reached. The eigenvalue is the Rayleigh
/// quotient `vᵀAv / vᵀv`.
pub fn eig_with(a: &Tensor, config: &PowerIteration) -> TensorResult<EigenPair> {
    let n = require_square(a, "eig")?;
    if n == 0 {
        return Err(TensorError::InvalidArgument(
            "eig requires a non-empty matrix".into(),
        ));
    }
    let data = a.data();

    let mut rng = random::seeded_rng(config.seed);
    let mut v = random::standard_normal_vec(n, &mut rng);
    let start_norm = l2(&v);
    v.iter_mut().for_each(|x| *x /= start_norm);

    let mut iterations = 0;
    for _ in 0..config.max_iterations {
        iterations += 1;
        let w = mat_vec(data, n, &v);
        let w_norm = l2(&w);
        if w_norm < PIVOT_TOLERANCE {
            // v lies in the null space: eigenvalue 0.
            break;
        }
        let next: Vec<f64> = w.iter().map(|x| x / w_norm).collect();
        let same: f64 = l2(&next.iter().zip(&v).map(|(x, y)| x - y).collect::<Vec<_>>());
        let flipped: f64 = l2(&next.iter().zip(&v).map(|(x, y)| x + y).collect::<Vec<_>>());
        v = next;
        if same.min(flipped) < config.tolerance {
            break;
        }
    }

    let av = mat_vec(data, n, &v);
    let num: f64 = v.iter().zip(&av).map(|(x, y)| x * y).sum();
    let den: f64 = v.iter().map(|x| x * x).sum();
    let value = num / den;
    log::trace!(
        "power iteration: n={}, iterations={}, eigenvalue={:.6e}",
        n,
        iterations,
        value
    );

    Ok(EigenPair {
        value,
        vector: Tensor::from_parts(v, Shape::new([n])),
        iterations,
    })
}

/// Leading singular triplet with the default [`PowerIteration`] settings.
pub fn svd(a: &Tensor) -> TensorResult<Svd> {
    svd_with(a, 1, &PowerIteration::default())
}

/// Top `k` singular triplets with the default [`PowerIteration`] settings.
pub fn svd_truncated(a: &Tensor, k: usize) -> TensorResult<Svd> {
    svd_with(a, k, &PowerIteration::default())
}

/// Top `k` singular triplets from power iteration on `AᵀA`.
///
/// Each step takes the dominant eigenpair `(λ, v)` of the current Gram
/// matrix, sets `σ = sqrt(λ)` and `u = A·v / σ` (zero when `σ` vanishes),
/// then deflates `G ← G − λ·v·vᵀ`.
pub fn svd_with(a: &Tensor, k: usize, config: &PowerIteration) -> TensorResult<Svd> {
    let (m, n) = match a.dims() {
        [m, n] => (*m, *n),
        _ => {
            return Err(TensorError::InvalidArgument(format!(
                "svd requires a rank-2 tensor, got shape {}",
                a.shape()
            )))
        }
    };
    if k == 0 || k > m.min(n) {
        return Err(TensorError::InvalidArgument(format!(
            "svd: k={} must be in 1..={} for shape {}",
            k,
            m.min(n),
            a.shape()
        )));
    }

    let mut gram = matmul(&a.t()?, a)?.into_vec();
    let mut u = vec![0.0; m * k];
    let mut s = Vec::with_capacity(k);
    let mut v = vec![0.0; n * k];

    for c in 0..k {
        let gram_t = Tensor::from_parts(gram.clone(), Shape::new([n, n]));
        let pair = eig_with(&gram_t, config)?;
        let lambda = pair.value.max(0.0);
        let sigma = lambda.sqrt();
        let vec_v = pair.vector.data();

        let av = matmul(a, &pair.vector.reshape([n, 1])?)?;
        for row in 0..m {
            u[row * k + c] = if sigma > PIVOT_TOLERANCE {
                av.data()[row] / sigma
            } else {
                0.0
            };
        }
        for row in 0..n {
            v[row * k + c] = vec_v[row];
        }
        s.push(sigma);

        for i in 0..n {
            for j in 0..n {
                gram[i * n + j] -= lambda * vec_v[i] * vec_v[j];
            }
        }
    }

    Ok(Svd {
        u: Tensor::from_parts(u, Shape::new([m, k])),
        s: Tensor::from_parts(s, Shape::new([k])),
        v: Tensor::from_parts(v, Shape::new([n, k])),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qr_reconstructs() {
        let a = Tensor::from_rows(&[[12.0, -51.0, 4.0], [6.0, 167.0, -68.0], [-4.0, 24.0, -41.0]])
            .unwrap();
        let Qr { q, r } = qr(&a).unwrap();
        assert!(matmul(&q, &r).unwrap().allclose(&a, 1e-9));
        assert!(matmul(&q.t().unwrap(), &q).unwrap().allclose(&Tensor::eye(3), 1e-9));
        // Upper triangular
        assert_eq!(r.get(&[1, 0]).unwrap(), 0.0);
        assert_eq!(r.get(&[2, 1]).unwrap(), 0.0);
        assert!((r.get(&[0, 0]).unwrap() - 14.0).abs() < 1e-9);
    }

    #[test]
    fn test_qr_degenerate_column() {
        let a = Tensor::from_rows(&[[1.0, 2.0], [1.0, 2.0]]).unwrap();
        let Qr { q, r } = qr(&a).unwrap();
        assert_eq!(r.get(&[1, 1]).unwrap(), 0.0);
        assert_eq!(q.get(&[0, 1]).unwrap(), 0.0);
        assert_eq!(q.get(&[1, 1]).unwrap(), 0.0);
        assert!(matmul(&q, &r).unwrap().allclose(&a, 1e-12));
    }

    #[test]
    fn test_eig_symmetric() {
        let a = Tensor::from_rows(&[[2.0, 1.0], [1.0, 2.0]]).unwrap();
        let pair = eig(&a).unwrap();
        assert!((pair.value - 3.0).abs() < 1e-9);
        let v = pair.vector.data();
        assert!((v[0].abs() - 0.5f64.sqrt()).abs() < 1e-6);
        assert!((v[0] - v[1]).abs() < 1e-6);
        assert!(pair.iterations <= 100);
    }

    #[test]
    fn test_eig_negative_dominant() {
        let a = Tensor::from_rows(&[[-5.0, 0.0], [0.0, 1.0]]).unwrap();
        let pair = eig(&a).unwrap();
        assert!((pair.value + 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_eig_is_deterministic() {
        let a = Tensor::from_rows(&[[4.0, 1.0], [2.0, 3.0]]).unwrap();
        assert_eq!(eig(&a).unwrap(), eig(&a).unwrap());
    }

    #[test]
    fn test_svd_leading_triplet() {
        let a = Tensor::from_rows(&[[3.0, 0.0], [0.0, 4.0], [0.0, 0.0]]).unwrap();
        let Svd { u, s, v } = svd(&a).unwrap();
        assert_eq!(u.dims(), &[3, 1]);
        assert_eq!(v.dims(), &[2, 1]);
        assert!((s.data()[0] - 4.0).abs() < 1e-6);
        let av = matmul(&a, &v).unwrap();
        assert!(av.allclose(&u.mul_scalar(s.data()[0]), 1e-6));
    }

    #[test]
    fn test_svd_truncated_deflation() {
        let a = Tensor::from_rows(&[[3.0, 0.0], [0.0, 4.0]]).unwrap();
        let svd = svd_truncated(&a, 2).unwrap();
        assert!((svd.s.data()[0] - 4.0).abs() < 1e-6);
        assert!((svd.s.data()[1] - 3.0).abs() < 1e-6);
        assert!(svd_truncated(&a, 3).is_err());
        assert!(svd_truncated(&a, 0).is_err());
    }
}
