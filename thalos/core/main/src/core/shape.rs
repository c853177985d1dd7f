//! Shape, strides and broadcasting rules.

use crate::api::error::{TensorError, TensorResult};
use smallvec::SmallVec;
use std::fmt;

/// Inline storage for shapes and strides: no heap allocation up to rank 4.
pub(crate) type Dims = SmallVec<[usize; 4]>;

/// Ordered per-axis extents of a tensor.
///
/// An empty shape describes a scalar and has size 1.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct Shape(Dims);

impl Shape {
    pub fn new(dims: impl AsRef<[usize]>) -> Self {
        Shape(SmallVec::from_slice(dims.as_ref()))
    }

    pub fn scalar() -> Self {
        Shape(SmallVec::new())
    }

    /// Number of axes.
    pub fn rank(&self) -> usize {
        self.0.len()
    }

    /// Product of the extents (1 for a scalar).
    pub fn size(&self) -> usize {
        self.0.iter().product()
    }

    pub fn dims(&self) -> &[usize] {
        &self.0
    }

    pub fn dim(&self, axis: usize) -> usize {
        self.0[axis]
    }

    pub fn is_scalar(&self) -> bool {
        self.0.is_empty()
    }

    /// Row-major strides: the last axis varies fastest.
    pub fn strides(&self) -> Dims {
        let mut strides: Dims = SmallVec::from_elem(1, self.0.len());
        for i in (0..self.0.len().saturating_sub(1)).rev() {
            strides[i] = strides[i + 1] * self.0[i + 1];
        }
        strides
    }

    /// Resolve a possibly negative axis (`-1` is the last axis).
    pub fn normalize_axis(&self, axis: i64) -> TensorResult<usize> {
        let rank = self.rank() as i64;
        let resolved = if axis < 0 { rank + axis } else { axis };
        if resolved < 0 || resolved >= rank {
            return Err(TensorError::InvalidArgument(format!(
                "axis {} out of range for rank {}",
                axis, rank
            )));
        }
        Ok(resolved as usize)
    }

    /// Whether the two shapes can be broadcast together.
    pub fn is_broadcastable_with(&self, other: &Shape) -> bool {
        self.0
            .iter()
            .rev()
            .zip(other.0.iter().rev())
            .all(|(&a, &b)| a == b || a == 1 || b == 1)
    }

    /// Broadcast result of two shapes, aligned from the trailing axis.
    ///
    /// The shorter shape is left-padded with extent-1 axes and each axis
    /// takes the larger extent.
    pub fn broadcast_result(&self, other: &Shape) -> TensorResult<Shape> {
        let rank = self.rank().max(other.rank());
        let mut out: Dims = SmallVec::from_elem(1, rank);
        for i in 0..rank {
            let a = self.padded_dim(i, rank);
            let b = other.padded_dim(i, rank);
            out[i] = match (a, b) {
                (a, b) if a == b => a,
                (1, b) => b,
                (a, 1) => a,
                _ => return Err(TensorError::shape(self.dims(), other.dims())),
            };
        }
        Ok(Shape(out))
    }

    /// Extent of axis `i` after left-padding this shape to `rank` axes.
    fn padded_dim(&self, i: usize, rank: usize) -> usize {
        let pad = rank - self.rank();
        if i < pad {
            1
        } else {
            self.0[i - pad]
        }
    }

    /// Flat offset into a buffer of this shape for an index into a larger
    /// broadcast shape. Leading padded axes are skipped and extent-1 axes
    /// read position 0.
    pub(crate) fn broadcast_offset(&self, strides: &[usize], out_index: &[usize]) -> usize {
        let pad = out_index.len() - self.rank();
        let mut offset = 0;
        for (axis, (&extent, &stride)) in self.0.iter().zip(strides).enumerate() {
            if extent != 1 {
                offset += out_index[pad + axis] * stride;
            }
        }
        offset
    }
}

/// Advance a row-major multi-index by one position. Returns false after the
/// last index has been visited.
pub(crate) fn next_index(index: &mut [usize], dims: &[usize]) -> bool {
    for axis in (0..dims.len()).rev() {
        index[axis] += 1;
        if index[axis] < dims[axis] {
            return true;
        }
        index[axis] = 0;
    }
    false
}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Shape({:?})", self.0.as_slice())
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, d) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", d)?;
        }
        if self.0.len() == 1 {
            write!(f, ",")?;
        }
        write!(f, ")")
    }
}

impl From<Vec<usize>> for Shape {
    fn from(v: Vec<usize>) -> Self {
        Shape(SmallVec::from_vec(v))
    }
}

impl From<&[usize]> for Shape {
    fn from(s: &[usize]) -> Self {
        Shape::new(s)
    }
}

impl<const N: usize> From<[usize; N]> for Shape {
    fn from(a: [usize; N]) -> Self {
        Shape::new(a)
    }
}

impl From<&Shape> for Shape {
    fn from(s: &Shape) -> Self {
        s.clone()
    }
}
