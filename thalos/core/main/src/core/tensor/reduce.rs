//! Reductions over one axis or over the whole buffer.

use crate::api::error::TensorResult;
use crate::core::shape::Shape;
use super::tensor::Tensor;
use super::views::split_at_axis;

fn lane_sum(lane: &[f64]) -> f64 {
    lane.iter().sum()
}

fn lane_mean(lane: &[f64]) -> f64 {
    lane_sum(lane) / lane.len() as f64
}

/// Population variance (divides by `n`).
fn lane_var(lane: &[f64]) -> f64 {
    let mean = lane_mean(lane);
    lane.iter().map(|x| (x - mean) * (x - mean)).sum::<f64>() / lane.len() as f64
}

fn lane_max(lane: &[f64]) -> f64 {
    lane.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

fn lane_min(lane: &[f64]) -> f64 {
    lane.iter().copied().fold(f64::INFINITY, f64::min)
}

fn lane_argmax(lane: &[f64]) -> f64 {
    let mut best = 0usize;
    let mut max_val = f64::NEG_INFINITY;
    for (i, &v) in lane.iter().enumerate() {
        if v > max_val {
            max_val = v;
            best = i;
        }
    }
    best as f64
}

impl Tensor {
    // ==================== Whole-buffer reductions ====================

    pub fn sum_all(&self) -> f64 {
        lane_sum(&self.data)
    }

    /// Arithmetic mean of all elements (`NaN` when empty).
    pub fn mean_all(&self) -> f64 {
        lane_mean(&self.data)
    }

    /// Population standard deviation of all elements.
    pub fn std_all(&self) -> f64 {
        lane_var(&self.data).sqrt()
    }

    /// Largest element (`-inf` when empty).
    pub fn max_all(&self) -> f64 {
        lane_max(&self.data)
    }

    /// Smallest element (`+inf` when empty).
    pub fn min_all(&self) -> f64 {
        lane_min(&self.data)
    }

    // ==================== Axis reductions ====================

    /// Sum along an axis. With `keepdim` the axis stays with extent 1.
    pub fn sum(&self, axis: i64, keepdim: bool) -> TensorResult<Tensor> {
        self.reduce_axis(axis, keepdim, lane_sum)
    }

    /// Mean along an axis.
    pub fn mean(&self, axis: i64, keepdim: bool) -> TensorResult<Tensor> {
        self.reduce_axis(axis, keepdim, lane_mean)
    }

    /// Population variance along an axis.
    pub fn var(&self, axis: i64, keepdim: bool) -> TensorResult<Tensor> {
        self.reduce_axis(axis, keepdim, lane_var)
    }

    /// Population standard deviation along an axis.
    pub fn std(&self, axis: i64, keepdim: bool) -> TensorResult<Tensor> {
        self.reduce_axis(axis, keepdim, |lane| lane_var(lane).sqrt())
    }

    pub fn max(&self, axis: i64, keepdim: bool) -> TensorResult<Tensor> {
        self.reduce_axis(axis, keepdim, lane_max)
    }

    pub fn min(&self, axis: i64, keepdim: bool) -> TensorResult<Tensor> {
        self.reduce_axis(axis, keepdim, lane_min)
    }

    /// Index of the first maximum along an axis, stored as `f64`.
    pub fn argmax(&self, axis: i64) -> TensorResult<Tensor> {
        self.reduce_axis(axis, false, lane_argmax)
    }

    // ==================== Internal helpers ====================

    /// Apply `f` to every lane along `axis`, one output value per combination
    /// of the remaining indices.
    pub(crate) fn reduce_axis(
        &self,
        axis: i64,
        keepdim: bool,
        f: impl Fn(&[f64]) -> f64,
    ) -> TensorResult<Tensor> {
        let axis = self.shape.normalize_axis(axis)?;
        let (outer, extent, inner) = split_at_axis(self.dims(), axis);

        let mut data = Vec::with_capacity(outer * inner);
        let mut lane = Vec::with_capacity(extent);
        for o in 0..outer {
            let base = o * extent * inner;
            for i in 0..inner {
                lane.clear();
                lane.extend((0..extent).map(|k| self.data[base + k * inner + i]));
                data.push(f(&lane));
            }
        }

        let mut dims = self.dims().to_vec();
        if keepdim {
            dims[axis] = 1;
        } else {
            dims.remove(axis);
        }
        Ok(Tensor::from_parts(data, Shape::new(dims)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Tensor {
        Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], [2, 3]).unwrap()
    }

    #[test]
    fn test_sum_axes() {
        let t = sample();
        assert_eq!(t.sum(0, false).unwrap().data(), &[5.0, 7.0, 9.0]);
        assert_eq!(t.sum(1, false).unwrap().data(), &[6.0, 15.0]);
        assert_eq!(t.sum(-1, true).unwrap().dims(), &[2, 1]);
        assert_eq!(t.sum_all(), 21.0);
    }

    #[test]
    fn test_mean_and_std() {
        let t = sample();
        assert_eq!(t.mean(1, false).unwrap().data(), &[2.0, 5.0]);
        let std = t.std(1, false).unwrap();
        let expected = (2.0f64 / 3.0).sqrt();
        assert!((std.data()[0] - expected).abs() < 1e-12);
        assert!((std.data()[1] - expected).abs() < 1e-12);
        assert!((t.mean_all() - 3.5).abs() < 1e-12);
        assert!((t.std_all() - (35.0f64 / 12.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_min_max_argmax() {
        let t = Tensor::from_vec(vec![1.0, 3.0, 2.0, 5.0, 4.0, 6.0], [2, 3]).unwrap();
        assert_eq!(t.max(1, false).unwrap().data(), &[3.0, 6.0]);
        assert_eq!(t.min(0, false).unwrap().data(), &[1.0, 3.0, 2.0]);
        assert_eq!(t.argmax(-1).unwrap().data(), &[1.0, 2.0]);
        assert_eq!(t.max_all(), 6.0);
        assert_eq!(t.min_all(), 1.0);
    }

    #[test]
    fn test_reduce_middle_axis() {
        let t = Tensor::arange(0.0, 24.0, 1.0).unwrap().reshape([2, 3, 4]).unwrap();
        let s = t.sum(1, false).unwrap();
        assert_eq!(s.dims(), &[2, 4]);
        // 0 + 4 + 8, 1 + 5 + 9, ...
        assert_eq!(&s.data()[..4], &[12.0, 15.0, 18.0, 21.0]);
        assert_eq!(t.sum(1, true).unwrap().dims(), &[2, 1, 4]);
    }

    #[test]
    fn test_reduce_rank1_to_scalar() {
        let t = Tensor::from_slice(&[1.0, 2.0, 3.0]);
        let s = t.sum(0, false).unwrap();
        assert!(s.shape().is_scalar());
        assert_eq!(s.item().unwrap(), 6.0);
    }

    #[test]
    fn test_invalid_axis() {
        assert!(sample().sum(2, false).is_err());
    }
}
