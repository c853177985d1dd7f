//! Dense f64 tensor with an exclusively owned row-major buffer.

use crate::api::error::{TensorError, TensorResult};
use crate::core::random;
use crate::core::shape::Shape;
use rand::Rng;
use std::fmt;

/// Nested numeric literal used to build a tensor with an inferred shape.
///
/// Each `List` level contributes one axis; every list on the same level must
/// have the same length.
#[derive(Debug, Clone, PartialEq)]
pub enum Nested {
    Value(f64),
    List(Vec<Nested>),
}

impl From<f64> for Nested {
    fn from(v: f64) -> Self {
        Nested::Value(v)
    }
}

impl<T: Into<Nested>> From<Vec<T>> for Nested {
    fn from(v: Vec<T>) -> Self {
        Nested::List(v.into_iter().map(Into::into).collect())
    }
}

/// A multi-dimensional array of `f64` values in row-major order.
///
/// Invariant: `data.len() == shape.size()`. Every operation returns a tensor
/// with a freshly allocated buffer; inputs are never mutated.
#[derive(Clone, PartialEq)]
pub struct Tensor {
    pub(crate) data: Vec<f64>,
    pub(crate) shape: Shape,
}

impl Tensor {
    // ==================== Constructors ====================

    /// Create a tensor from a flat buffer and an explicit shape.
    pub fn from_vec(data: Vec<f64>, shape: impl Into<Shape>) -> TensorResult<Self> {
        let shape = shape.into();
        if data.len() != shape.size() {
            return Err(TensorError::ShapeMismatch {
                expected: shape.dims().to_vec(),
                got: vec![data.len()],
            });
        }
        Ok(Self { data, shape })
    }

    /// Trusted constructor for internal kernels that size their output from `shape`.
    pub(crate) fn from_parts(data: Vec<f64>, shape: Shape) -> Self {
        debug_assert_eq!(data.len(), shape.size());
        Self { data, shape }
    }

    /// Rank-1 tensor copied from a slice.
    pub fn from_slice(values: &[f64]) -> Self {
        Self::from_parts(values.to_vec(), Shape::new([values.len()]))
    }

    /// Rank-0 tensor holding one value.
    pub fn scalar(value: f64) -> Self {
        Self::from_parts(vec![value], Shape::scalar())
    }

    /// Rank-2 tensor from equally sized rows.
    pub fn from_rows<R: AsRef<[f64]>>(rows: &[R]) -> TensorResult<Self> {
        let cols = rows.first().map_or(0, |r| r.as_ref().len());
        let mut data = Vec::with_capacity(rows.len() * cols);
        for row in rows {
            let row = row.as_ref();
            if row.len() != cols {
                return Err(TensorError::shape(&[cols], &[row.len()]));
            }
            data.extend_from_slice(row);
        }
        Ok(Self::from_parts(data, Shape::new([rows.len(), cols])))
    }

    /// Build a tensor from nested lists, inferring the shape from the nesting.
    ///
    /// Ragged input fails with `ShapeMismatch`.
    pub fn from_nested(value: impl Into<Nested>) -> TensorResult<Self> {
        let value = value.into();
        let mut dims = Vec::new();
        let mut level = &value;
        while let Nested::List(items) = level {
            dims.push(items.len());
            match items.first() {
                Some(first) => level = first,
                None => break,
            }
        }
        let shape = Shape::new(&dims);
        let mut data = Vec::with_capacity(shape.size());
        Self::flatten_nested(&value, &dims, 0, &mut data)?;
        Ok(Self::from_parts(data, shape))
    }

    fn flatten_nested(
        node: &Nested,
        dims: &[usize],
        depth: usize,
        out: &mut Vec<f64>,
    ) -> TensorResult<()> {
        match node {
            Nested::Value(v) if depth == dims.len() => {
                out.push(*v);
                Ok(())
            }
            Nested::List(items) if depth < dims.len() && items.len() == dims[depth] => {
                for item in items {
                    Self::flatten_nested(item, dims, depth + 1, out)?;
                }
                Ok(())
            }
            Nested::List(items) => Err(TensorError::shape(
                &dims[depth.min(dims.len())..],
                &[items.len()],
            )),
            Nested::Value(_) => Err(TensorError::shape(&dims[depth..], &[])),
        }
    }

    /// Create a tensor filled with zeros.
    pub fn zeros(shape: impl Into<Shape>) -> Self {
        Self::full(shape, 0.0)
    }

    /// Create a tensor filled with ones.
    pub fn ones(shape: impl Into<Shape>) -> Self {
        Self::full(shape, 1.0)
    }

    /// Create a tensor filled with a specific value.
    pub fn full(shape: impl Into<Shape>, value: f64) -> Self {
        let shape = shape.into();
        Self::from_parts(vec![value; shape.size()], shape)
    }

    /// Create an `n x n` identity matrix.
    pub fn eye(n: usize) -> Self {
        let mut data = vec![0.0; n * n];
        for i in 0..n {
            data[i * n + i] = 1.0;
        }
        Self::from_parts(data, Shape::new([n, n]))
    }

    /// Alias for [`Tensor::eye`].
    pub fn identity(n: usize) -> Self {
        Self::eye(n)
    }

    /// Create an `n x n` lower triangular matrix of ones.
    pub fn tril(n: usize) -> Self {
        let mut data = vec![0.0; n * n];
        for i in 0..n {
            for j in 0..=i {
                data[i * n + j] = 1.0;
            }
        }
        Self::from_parts(data, Shape::new([n, n]))
    }

    /// Create a 1D tensor with values from start to end (exclusive).
    pub fn arange(start: f64, end: f64, step: f64) -> TensorResult<Self> {
        if step == 0.0 || !step.is_finite() {
            return Err(TensorError::InvalidArgument(format!(
                "arange step must be finite and non-zero, got {}",
                step
            )));
        }
        let n = ((end - start) / step).ceil().max(0.0) as usize;
        let data: Vec<f64> = (0..n).map(|i| start + i as f64 * step).collect();
        Ok(Self::from_parts(data, Shape::new([n])))
    }

    /// `n` evenly spaced values over `[start, end]`, both ends included.
    pub fn linspace(start: f64, end: f64, n: usize) -> Self {
        let data: Vec<f64> = match n {
            0 => Vec::new(),
            1 => vec![start],
            _ => {
                let step = (end - start) / (n - 1) as f64;
                (0..n).map(|i| start + i as f64 * step).collect()
            }
        };
        Self::from_parts(data, Shape::new([n]))
    }

    /// Standard normal samples drawn from `rng`.
    pub fn randn<R: Rng>(shape: impl Into<Shape>, rng: &mut R) -> Self {
        let shape = shape.into();
        let data = random::standard_normal_vec(shape.size(), rng);
        Self::from_parts(data, shape)
    }

    /// Uniform samples in `[0, 1)` drawn from `rng`.
    pub fn rand<R: Rng>(shape: impl Into<Shape>, rng: &mut R) -> Self {
        let shape = shape.into();
        let data: Vec<f64> = (0..shape.size()).map(|_| rng.gen::<f64>()).collect();
        Self::from_parts(data, shape)
    }

    // ==================== Properties ====================

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Per-axis extents as a slice.
    pub fn dims(&self) -> &[usize] {
        self.shape.dims()
    }

    pub fn rank(&self) -> usize {
        self.shape.rank()
    }

    /// Total number of elements.
    pub fn numel(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Row-major backing buffer.
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.data.clone()
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.data
    }

    // ==================== Element access ====================

    pub(crate) fn offset(&self, index: &[usize]) -> TensorResult<usize> {
        if index.len() != self.rank() {
            return Err(TensorError::InvalidArgument(format!(
                "index of length {} for tensor of rank {}",
                index.len(),
                self.rank()
            )));
        }
        let mut offset = 0;
        for (dim, ((&i, &extent), stride)) in index
            .iter()
            .zip(self.dims())
            .zip(self.shape.strides())
            .enumerate()
        {
            if i >= extent {
                return Err(TensorError::IndexOutOfBounds {
                    dim,
                    index: i,
                    size: extent,
                });
            }
            offset += i * stride;
        }
        Ok(offset)
    }

    /// Read the element at a multi-index.
    pub fn get(&self, index: &[usize]) -> TensorResult<f64> {
        Ok(self.data[self.offset(index)?])
    }

    /// The value of a single-element tensor.
    pub fn item(&self) -> TensorResult<f64> {
        match self.data.as_slice() {
            [v] => Ok(*v),
            _ => Err(TensorError::InvalidArgument(format!(
                "item() requires exactly one element, tensor has {}",
                self.numel()
            ))),
        }
    }

    /// Rebuild the nested-list form of this tensor.
    pub fn to_nested(&self) -> Nested {
        fn build(data: &[f64], dims: &[usize]) -> Nested {
            match dims.split_first() {
                None => Nested::Value(data[0]),
                Some((&n, rest)) => {
                    let chunk: usize = rest.iter().product();
                    Nested::List((0..n).map(|i| build(&data[i * chunk..], rest)).collect())
                }
            }
        }
        build(&self.data, self.dims())
    }

    /// True when shapes match and every element differs by at most `tol`.
    pub fn allclose(&self, other: &Tensor, tol: f64) -> bool {
        self.shape == other.shape
            && self
                .data
                .iter()
                .zip(&other.data)
                .all(|(a, b)| (a - b).abs() <= tol)
    }
}

impl fmt::Debug for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tensor(shape={}, data={:?})", self.shape, self.data)
    }
}

impl fmt::Display for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn write_level(
            f: &mut fmt::Formatter<'_>,
            data: &[f64],
            dims: &[usize],
        ) -> fmt::Result {
            match dims.split_first() {
                None => write!(f, "{:.4}", data[0]),
                Some((&n, rest)) => {
                    let chunk: usize = rest.iter().product();
                    write!(f, "[")?;
                    for i in 0..n {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write_level(f, &data[i * chunk..], rest)?;
                    }
                    write!(f, "]")
                }
            }
        }
        write_level(f, &self.data, self.dims())
    }
}
