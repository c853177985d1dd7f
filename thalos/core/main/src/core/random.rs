//! Random tensors and weight initializers.
//!
//! Every sampler takes the generator explicitly; there is no global random
//! state. Fan sizes follow the `[out, in, ...]` weight layout: for rank >= 2
//! `fan_in = dims[1] * receptive` and `fan_out = dims[0] * receptive`, where
//! `receptive` is the product of the remaining axes.

use crate::api::error::{TensorError, TensorResult};
use crate::api::types::Initializer;
use crate::core::shape::Shape;
use crate::core::tensor::Tensor;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal, StandardNormal, Uniform};

/// Deterministic generator for reproducible initialization.
pub fn seeded_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

pub(crate) fn standard_normal_vec<R: Rng>(n: usize, rng: &mut R) -> Vec<f64> {
    (0..n).map(|_| StandardNormal.sample(rng)).collect()
}

/// Samples from `N(mean, std^2)`.
pub fn normal<R: Rng>(
    shape: impl Into<Shape>,
    mean: f64,
    std: f64,
    rng: &mut R,
) -> TensorResult<Tensor> {
    let shape = shape.into();
    if !std.is_finite() || std < 0.0 {
        return Err(TensorError::InvalidArgument(format!(
            "normal requires a finite non-negative std, got {}",
            std
        )));
    }
    let dist = Normal::new(mean, std).map_err(|e| {
        TensorError::InvalidArgument(format!("normal(mean={}, std={}): {}", mean, std, e))
    })?;
    let data = (0..shape.size()).map(|_| dist.sample(rng)).collect();
    Tensor::from_vec(data, shape)
}

/// Samples from `U[low, high)`.
pub fn uniform<R: Rng>(
    shape: impl Into<Shape>,
    low: f64,
    high: f64,
    rng: &mut R,
) -> TensorResult<Tensor> {
    let shape = shape.into();
    if low >= high || !low.is_finite() || !high.is_finite() {
        return Err(TensorError::InvalidArgument(format!(
            "uniform requires finite low < high, got [{}, {})",
            low, high
        )));
    }
    let dist = Uniform::new(low, high);
    let data = (0..shape.size()).map(|_| dist.sample(rng)).collect();
    Tensor::from_vec(data, shape)
}

/// `(fan_in, fan_out)` of a weight shape.
pub fn fans(shape: &Shape) -> TensorResult<(usize, usize)> {
    let dims = shape.dims();
    let (fan_in, fan_out) = match dims {
        [] => {
            return Err(TensorError::InvalidArgument(
                "fan sizes are undefined for a scalar shape".into(),
            ))
        }
        [n] => (*n, *n),
        [out, inp, rest @ ..] => {
            let receptive: usize = rest.iter().product();
            (inp * receptive, out * receptive)
        }
    };
    if fan_in == 0 || fan_out == 0 {
        return Err(TensorError::InvalidArgument(format!(
            "zero fan for shape {}",
            shape
        )));
    }
    Ok((fan_in, fan_out))
}

/// Glorot uniform: `U[-a, a]` with `a = sqrt(6 / (fan_in + fan_out))`.
pub fn xavier_uniform<R: Rng>(shape: impl Into<Shape>, rng: &mut R) -> TensorResult<Tensor> {
    let shape = shape.into();
    let (fan_in, fan_out) = fans(&shape)?;
    let limit = (6.0 / (fan_in + fan_out) as f64).sqrt();
    uniform(shape, -limit, limit, rng)
}

/// Glorot normal: std `sqrt(2 / (fan_in + fan_out))`.
pub fn xavier_normal<R: Rng>(shape: impl Into<Shape>, rng: &mut R) -> TensorResult<Tensor> {
    let shape = shape.into();
    let (fan_in, fan_out) = fans(&shape)?;
    normal(shape, 0.0, (2.0 / (fan_in + fan_out) as f64).sqrt(), rng)
}

/// He/Kaiming uniform: `U[-a, a]` with `a = sqrt(6 / fan_in)`.
pub fn he_uniform<R: Rng>(shape: impl Into<Shape>, rng: &mut R) -> TensorResult<Tensor> {
    let shape = shape.into();
    let (fan_in, _) = fans(&shape)?;
    let limit = (6.0 / fan_in as f64).sqrt();
    uniform(shape, -limit, limit, rng)
}

/// He/Kaiming normal: std `sqrt(2 / fan_in)`.
pub fn he_normal<R: Rng>(shape: impl Into<Shape>, rng: &mut R) -> TensorResult<Tensor> {
    let shape = shape.into();
    let (fan_in, _) = fans(&shape)?;
    normal(shape, 0.0, (2.0 / fan_in as f64).sqrt(), rng)
}

impl Initializer {
    /// Draw a tensor of `shape` using this scheme.
    pub fn sample<R: Rng>(&self, shape: impl Into<Shape>, rng: &mut R) -> TensorResult<Tensor> {
        let shape = shape.into();
        match *self {
            Initializer::Zeros => Ok(Tensor::zeros(shape)),
            Initializer::Ones => Ok(Tensor::ones(shape)),
            Initializer::Normal { mean, std } => normal(shape, mean, std, rng),
            Initializer::Uniform { low, high } => uniform(shape, low, high, rng),
            Initializer::XavierUniform => xavier_uniform(shape, rng),
            Initializer::XavierNormal => xavier_normal(shape, rng),
            Initializer::HeUniform => he_uniform(shape, rng),
            Initializer::HeNormal => he_normal(shape, rng),
        }
    }
}
