//! Shape operations: reshape, transpose, squeeze, narrow, select, cat, broadcast.
//!
//! Every operation copies into a fresh buffer; there are no aliasing views.

use crate::api::error::{TensorError, TensorResult};
use crate::core::shape::{next_index, Shape};
use super::tensor::Tensor;

/// Split `dims` around `axis` into (product before, extent, product after).
pub(crate) fn split_at_axis(dims: &[usize], axis: usize) -> (usize, usize, usize) {
    let outer = dims[..axis].iter().product();
    let inner = dims[axis + 1..].iter().product();
    (outer, dims[axis], inner)
}

impl Tensor {
    // ==================== Reshape ====================

    /// Reinterpret the buffer with a new shape of the same size.
    pub fn reshape(&self, shape: impl Into<Shape>) -> TensorResult<Tensor> {
        let shape = shape.into();
        if shape.size() != self.numel() {
            return Err(TensorError::ShapeMismatch {
                expected: self.dims().to_vec(),
                got: shape.dims().to_vec(),
            });
        }
        Ok(Tensor::from_parts(self.data.clone(), shape))
    }

    /// Collapse to rank 1.
    pub fn flatten(&self) -> Tensor {
        Tensor::from_parts(self.data.clone(), Shape::new([self.numel()]))
    }

    // ==================== Transpose ====================

    /// Swap two axes.
    pub fn transpose(&self, dim0: i64, dim1: i64) -> TensorResult<Tensor> {
        let a = self.shape.normalize_axis(dim0)?;
        let b = self.shape.normalize_axis(dim1)?;
        if a == b {
            return Ok(self.clone());
        }
        if self.rank() == 2 {
            return Ok(self.transpose_2d());
        }

        let mut out_dims = self.dims().to_vec();
        out_dims.swap(a, b);
        let src_strides = self.shape.strides();
        let mut data = Vec::with_capacity(self.numel());

        if self.numel() > 0 {
            let mut index = vec![0usize; out_dims.len()];
            loop {
                let mut offset = 0;
                for (axis, &i) in index.iter().enumerate() {
                    let src_axis = if axis == a {
                        b
                    } else if axis == b {
                        a
                    } else {
                        axis
                    };
                    offset += i * src_strides[src_axis];
                }
                data.push(self.data[offset]);
                if !next_index(&mut index, &out_dims) {
                    break;
                }
            }
        }

        Ok(Tensor::from_parts(data, Shape::new(out_dims)))
    }

    /// Matrix transpose of a rank-2 tensor.
    pub fn t(&self) -> TensorResult<Tensor> {
        if self.rank() != 2 {
            return Err(TensorError::InvalidArgument(format!(
                "t() requires a rank-2 tensor, got rank {}",
                self.rank()
            )));
        }
        Ok(self.transpose_2d())
    }

    fn transpose_2d(&self) -> Tensor {
        let (rows, cols) = (self.dims()[0], self.dims()[1]);
        let mut data = vec![0.0; rows * cols];
        for i in 0..rows {
            for j in 0..cols {
                data[j * rows + i] = self.data[i * cols + j];
            }
        }
        Tensor::from_parts(data, Shape::new([cols, rows]))
    }

    // ==================== Unsqueeze / Squeeze ====================

    /// Insert an extent-1 axis at `dim` (which may equal the current rank).
    pub fn unsqueeze(&self, dim: i64) -> TensorResult<Tensor> {
        let rank = self.rank() as i64;
        let resolved = if dim < 0 { rank + 1 + dim } else { dim };
        if resolved < 0 || resolved > rank {
            return Err(TensorError::InvalidArgument(format!(
                "unsqueeze axis {} out of range for rank {}",
                dim, rank
            )));
        }
        let mut dims = self.dims().to_vec();
        dims.insert(resolved as usize, 1);
        self.reshape(dims)
    }

    /// Remove an extent-1 axis.
    pub fn squeeze(&self, dim: i64) -> TensorResult<Tensor> {
        let axis = self.shape.normalize_axis(dim)?;
        if self.dims()[axis] != 1 {
            return Err(TensorError::InvalidArgument(format!(
                "cannot squeeze axis {} with extent {}",
                axis,
                self.dims()[axis]
            )));
        }
        let mut dims = self.dims().to_vec();
        dims.remove(axis);
        self.reshape(dims)
    }

    // ==================== Narrow / Select ====================

    /// Take `len` consecutive positions starting at `start` along `dim`.
    pub fn narrow(&self, dim: i64, start: usize, len: usize) -> TensorResult<Tensor> {
        let axis = self.shape.normalize_axis(dim)?;
        let (outer, extent, inner) = split_at_axis(self.dims(), axis);
        if start + len > extent {
            return Err(TensorError::IndexOutOfBounds {
                dim: axis,
                index: start + len,
                size: extent,
            });
        }

        let mut data = Vec::with_capacity(outer * len * inner);
        for o in 0..outer {
            let base = o * extent * inner;
            data.extend_from_slice(&self.data[base + start * inner..base + (start + len) * inner]);
        }

        let mut dims = self.dims().to_vec();
        dims[axis] = len;
        Ok(Tensor::from_parts(data, Shape::new(dims)))
    }

    /// Select a single index along a dimension (reduces rank by one).
    pub fn select(&self, dim: i64, index: usize) -> TensorResult<Tensor> {
        let axis = self.shape.normalize_axis(dim)?;
        let extent = self.dims()[axis];
        if index >= extent {
            return Err(TensorError::IndexOutOfBounds {
                dim: axis,
                index,
                size: extent,
            });
        }
        let narrowed = self.narrow(dim, index, 1)?;
        let mut dims = self.dims().to_vec();
        dims.remove(axis);
        Ok(Tensor::from_parts(narrowed.data, Shape::new(dims)))
    }

    // ==================== Concatenation ====================

    /// Concatenate tensors along an existing axis.
    pub fn cat(tensors: &[&Tensor], dim: i64) -> TensorResult<Tensor> {
        let first = tensors.first().ok_or_else(|| {
            TensorError::InvalidArgument("cat requires at least one tensor".into())
        })?;
        let axis = first.shape.normalize_axis(dim)?;

        for t in tensors.iter().skip(1) {
            let compatible = t.rank() == first.rank()
                && t
                    .dims()
                    .iter()
                    .zip(first.dims())
                    .enumerate()
                    .all(|(i, (a, b))| i == axis || a == b);
            if !compatible {
                return Err(TensorError::shape(first.dims(), t.dims()));
            }
        }

        let (outer, _, inner) = split_at_axis(first.dims(), axis);
        let total: usize = tensors.iter().map(|t| t.dims()[axis]).sum();
        let mut data = Vec::with_capacity(outer * total * inner);
        for o in 0..outer {
            for t in tensors {
                let chunk = t.dims()[axis] * inner;
                data.extend_from_slice(&t.data[o * chunk..(o + 1) * chunk]);
            }
        }

        let mut dims = first.dims().to_vec();
        dims[axis] = total;
        Ok(Tensor::from_parts(data, Shape::new(dims)))
    }

    /// Stack equally shaped tensors along a new axis.
    pub fn stack(tensors: &[&Tensor], dim: i64) -> TensorResult<Tensor> {
        let expanded = tensors
            .iter()
            .map(|t| t.unsqueeze(dim))
            .collect::<TensorResult<Vec<_>>>()?;
        let refs: Vec<&Tensor> = expanded.iter().collect();
        Tensor::cat(&refs, dim)
    }

    // ==================== Broadcast ====================

    /// Materialize this tensor broadcast to `shape`.
    pub fn broadcast_to(&self, shape: impl Into<Shape>) -> TensorResult<Tensor> {
        let target = shape.into();
        let result = self.shape.broadcast_result(&target)?;
        if result != target {
            return Err(TensorError::shape(target.dims(), self.dims()));
        }
        self.zip_with(&Tensor::zeros(target), |x, _| x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_2x3() -> Tensor {
        Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], [2, 3]).unwrap()
    }

    #[test]
    fn test_reshape() {
        let t = sample_2x3();
        let r = t.reshape([3, 2]).unwrap();
        assert_eq!(r.dims(), &[3, 2]);
        assert_eq!(r.data(), t.data());
        assert!(matches!(
            t.reshape([4, 2]),
            Err(TensorError::ShapeMismatch { .. })
        ));
        assert_eq!(t.flatten().dims(), &[6]);
    }

    #[test]
    fn test_transpose_2d() {
        let t = sample_2x3();
        let tt = t.t().unwrap();
        assert_eq!(tt.dims(), &[3, 2]);
        assert_eq!(tt.data(), &[1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
        assert_eq!(tt.t().unwrap(), t);
        assert!(Tensor::zeros([3]).t().is_err());
    }

    #[test]
    fn test_transpose_3d() {
        let t = Tensor::arange(0.0, 24.0, 1.0).unwrap().reshape([2, 3, 4]).unwrap();
        let s = t.transpose(0, 2).unwrap();
        assert_eq!(s.dims(), &[4, 3, 2]);
        for i in 0..2 {
            for j in 0..3 {
                for k in 0..4 {
                    assert_eq!(s.get(&[k, j, i]).unwrap(), t.get(&[i, j, k]).unwrap());
                }
            }
        }
        assert_eq!(s.transpose(-1, 0).unwrap(), t);
    }

    #[test]
    fn test_unsqueeze_squeeze() {
        let t = sample_2x3();
        let u = t.unsqueeze(0).unwrap();
        assert_eq!(u.dims(), &[1, 2, 3]);
        assert_eq!(t.unsqueeze(-1).unwrap().dims(), &[2, 3, 1]);
        assert_eq!(u.squeeze(0).unwrap(), t);
        assert!(t.squeeze(0).is_err());
    }

    #[test]
    fn test_narrow_and_select() {
        let t = sample_2x3();
        let n = t.narrow(1, 1, 2).unwrap();
        assert_eq!(n.dims(), &[2, 2]);
        assert_eq!(n.data(), &[2.0, 3.0, 5.0, 6.0]);

        let row = t.select(0, 1).unwrap();
        assert_eq!(row.data(), &[4.0, 5.0, 6.0]);
        let col = t.select(1, 2).unwrap();
        assert_eq!(col.data(), &[3.0, 6.0]);

        assert!(t.narrow(1, 2, 2).is_err());
        assert!(t.select(0, 2).is_err());
    }

    #[test]
    fn test_cat() {
        let a = sample_2x3();
        let b = Tensor::from_vec(vec![7.0, 8.0], [2, 1]).unwrap();
        let c = Tensor::cat(&[&a, &b], 1).unwrap();
        assert_eq!(c.dims(), &[2, 4]);
        assert_eq!(c.data(), &[1.0, 2.0, 3.0, 7.0, 4.0, 5.0, 6.0, 8.0]);

        let rows = Tensor::cat(&[&a, &a], 0).unwrap();
        assert_eq!(rows.dims(), &[4, 3]);
        assert!(Tensor::cat(&[&a, &b], 0).is_err());
        assert!(Tensor::cat(&[], 0).is_err());
    }

    #[test]
    fn test_stack() {
        let a = Tensor::from_slice(&[1.0, 2.0]);
        let b = Tensor::from_slice(&[3.0, 4.0]);
        let s = Tensor::stack(&[&a, &b], 0).unwrap();
        assert_eq!(s.dims(), &[2, 2]);
        assert_eq!(s.data(), &[1.0, 2.0, 3.0, 4.0]);
        let s1 = Tensor::stack(&[&a, &b], 1).unwrap();
        assert_eq!(s1.data(), &[1.0, 3.0, 2.0, 4.0]);
    }

    #[test]
    fn test_broadcast_to() {
        let row = Tensor::from_slice(&[1.0, 2.0, 3.0]);
        let b = row.broadcast_to([2, 3]).unwrap();
        assert_eq!(b.data(), &[1.0, 2.0, 3.0, 1.0, 2.0, 3.0]);
        assert!(sample_2x3().broadcast_to([3]).is_err());
    }
}
