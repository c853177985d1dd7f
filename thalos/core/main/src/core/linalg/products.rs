//! Matrix products, norms and trace.

use super::require_square;
use crate::api::error::{TensorError, TensorResult};
use crate::api::types::NormOrder;
use crate::core::shape::{next_index, Shape};
use crate::core::tensor::Tensor;

/// Matrix product `C[i, j] = sum_k A[i, k] * B[k, j]`.
///
/// Both operands need rank >= 2 and `A`'s last axis must equal `B`'s
/// second-to-last. Leading batch axes broadcast against each other.
pub fn matmul(a: &Tensor, b: &Tensor) -> TensorResult<Tensor> {
    if a.rank() < 2 || b.rank() < 2 {
        return Err(TensorError::DimensionMismatch(format!(
            "matmul requires rank >= 2 operands, got {} and {}",
            a.shape(),
            b.shape()
        )));
    }
    let (ra, rb) = (a.rank(), b.rank());
    let (m, k) = (a.dims()[ra - 2], a.dims()[ra - 1]);
    let (k2, n) = (b.dims()[rb - 2], b.dims()[rb - 1]);
    if k != k2 {
        return Err(TensorError::DimensionMismatch(format!(
            "matmul inner dimensions differ: {} vs {}",
            a.shape(),
            b.shape()
        )));
    }

    let batch_a = Shape::new(&a.dims()[..ra - 2]);
    let batch_b = Shape::new(&b.dims()[..rb - 2]);
    let batch = batch_a.broadcast_result(&batch_b).map_err(|_| {
        TensorError::DimensionMismatch(format!(
            "matmul batch dimensions do not broadcast: {} vs {}",
            a.shape(),
            b.shape()
        ))
    })?;
    let (strides_a, strides_b) = (batch_a.strides(), batch_b.strides());

    let mut out = vec![0.0; batch.size() * m * n];
    let mut index = vec![0usize; batch.rank()];
    for block in 0..batch.size() {
        let a_off = batch_a.broadcast_offset(&strides_a, &index) * m * k;
        let b_off = batch_b.broadcast_offset(&strides_b, &index) * k * n;
        let lhs = &a.data()[a_off..a_off + m * k];
        let rhs = &b.data()[b_off..b_off + k * n];
        let dst = &mut out[block * m * n..(block + 1) * m * n];
        for i in 0..m {
            for p in 0..k {
                let aip = lhs[i * k + p];
                for j in 0..n {
                    dst[i * n + j] += aip * rhs[p * n + j];
                }
            }
        }
        next_index(&mut index, batch.dims());
    }

    let mut dims = batch.dims().to_vec();
    dims.extend_from_slice(&[m, n]);
    Ok(Tensor::from_parts(out, Shape::new(dims)))
}

/// Rank-2 transpose.
pub fn transpose(a: &Tensor) -> TensorResult<Tensor> {
    a.t()
}

/// Inner product of two rank-1 tensors of equal length.
pub fn dot(a: &Tensor, b: &Tensor) -> TensorResult<f64> {
    if a.rank() != 1 || b.rank() != 1 || a.numel() != b.numel() {
        return Err(TensorError::DimensionMismatch(format!(
            "dot requires equal-length vectors, got {} and {}",
            a.shape(),
            b.shape()
        )));
    }
    Ok(a.data().iter().zip(b.data()).map(|(x, y)| x * y).sum())
}

/// Outer product of two rank-1 tensors: `[len(a), len(b)]`.
pub fn outer(a: &Tensor, b: &Tensor) -> TensorResult<Tensor> {
    if a.rank() != 1 || b.rank() != 1 {
        return Err(TensorError::DimensionMismatch(format!(
            "outer requires vectors, got {} and {}",
            a.shape(),
            b.shape()
        )));
    }
    let data = a
        .data()
        .iter()
        .flat_map(|&x| b.data().iter().map(move |&y| x * y))
        .collect();
    Ok(Tensor::from_parts(data, Shape::new([a.numel(), b.numel()])))
}

/// Entry-wise norm over all elements (Frobenius for matrices when `L2`).
pub fn norm(a: &Tensor, ord: NormOrder) -> f64 {
    let values = a.data().iter();
    match ord {
        NormOrder::L1 => values.map(|x| x.abs()).sum(),
        NormOrder::L2 => values.map(|x| x * x).sum::<f64>().sqrt(),
        NormOrder::Inf => values.fold(0.0, |acc, x| acc.max(x.abs())),
    }
}

/// Sum of the diagonal of a square matrix.
pub fn trace(a: &Tensor) -> TensorResult<f64> {
    let n = require_square(a, "trace")?;
    Ok((0..n).map(|i| a.data()[i * n + i]).sum())
}

impl Tensor {
    /// Matrix product; see [`matmul`].
    pub fn matmul(&self, other: &Tensor) -> TensorResult<Tensor> {
        matmul(self, other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(rows: &[[f64; 2]]) -> Tensor {
        Tensor::from_rows(rows).unwrap()
    }

    #[test]
    fn test_matmul_2x2() {
        let a = m(&[[1.0, 2.0], [3.0, 4.0]]);
        let b = m(&[[5.0, 6.0], [7.0, 8.0]]);
        let c = matmul(&a, &b).unwrap();
        assert_eq!(c.data(), &[19.0, 22.0, 43.0, 50.0]);
    }

    #[test]
    fn test_matmul_non_square() {
        let a = Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], [2, 3]).unwrap();
        let b = Tensor::from_vec(vec![1.0, 0.0, 0.0, 1.0, 1.0, 1.0], [3, 2]).unwrap();
        let c = a.matmul(&b).unwrap();
        assert_eq!(c.dims(), &[2, 2]);
        assert_eq!(c.data(), &[4.0, 5.0, 10.0, 11.0]);
    }

    #[test]
    fn test_matmul_dimension_mismatch() {
        let a = Tensor::zeros([2, 3]);
        let b = Tensor::zeros([2, 3]);
        assert!(matches!(matmul(&a, &b), Err(TensorError::DimensionMismatch(_))));
        let v = Tensor::zeros([3]);
        assert!(matches!(matmul(&a, &v), Err(TensorError::DimensionMismatch(_))));
    }

    #[test]
    fn test_matmul_batched_broadcast() {
        let a = Tensor::arange(0.0, 8.0, 1.0).unwrap().reshape([2, 2, 2]).unwrap();
        let eye = Tensor::eye(2);
        let c = matmul(&a, &eye).unwrap();
        assert_eq!(c, a);

        let b = Tensor::stack(&[&eye, &eye.mul_scalar(2.0)], 0).unwrap();
        let d = matmul(&a, &b).unwrap();
        assert_eq!(d.dims(), &[2, 2, 2]);
        assert_eq!(&d.data()[4..], &[8.0, 10.0, 12.0, 14.0]);
    }

    #[test]
    fn test_dot_and_outer() {
        let a = Tensor::from_slice(&[1.0, 2.0, 3.0]);
        let b = Tensor::from_slice(&[4.0, 5.0, 6.0]);
        assert_eq!(dot(&a, &b).unwrap(), 32.0);
        assert!(dot(&a, &Tensor::from_slice(&[1.0])).is_err());

        let o = outer(&a, &Tensor::from_slice(&[1.0, 10.0])).unwrap();
        assert_eq!(o.dims(), &[3, 2]);
        assert_eq!(o.data(), &[1.0, 10.0, 2.0, 20.0, 3.0, 30.0]);
    }

    #[test]
    fn test_norms() {
        let v = Tensor::from_slice(&[3.0, -4.0]);
        assert_eq!(norm(&v, NormOrder::L2), 5.0);
        assert_eq!(norm(&v, NormOrder::L1), 7.0);
        assert_eq!(norm(&v, NormOrder::Inf), 4.0);
        assert_eq!(NormOrder::from_p(f64::INFINITY), Some(NormOrder::Inf));
        assert_eq!(NormOrder::from_p(3.0), None);
    }

    #[test]
    fn test_trace() {
        assert_eq!(trace(&m(&[[1.0, 2.0], [3.0, 4.0]])).unwrap(), 5.0);
        assert!(matches!(
            trace(&Tensor::zeros([2, 3])),
            Err(TensorError::InvalidArgument(_))
        ));
    }
}
