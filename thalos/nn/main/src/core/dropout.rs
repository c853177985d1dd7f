//! Inverted dropout.

use crate::api::error::{NnError, NnResult};
use rand::Rng;
use thalos_core::Tensor;

/// Zeroes each element with probability `p` and scales survivors by
/// `1 / (1 - p)`.
///
/// Dropout only runs through [`Dropout::forward_train`], which takes the
/// generator explicitly. Inference paths never touch it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dropout {
    p: f64,
}

impl Dropout {
    pub fn new(p: f64) -> NnResult<Self> {
        if !(0.0..1.0).contains(&p) {
            return Err(NnError::InvalidConfig(format!(
                "Dropout probability must be in [0, 1), got {}",
                p
            )));
        }
        Ok(Self { p })
    }

    pub fn p(&self) -> f64 {
        self.p
    }

    pub fn forward_train<R: Rng + ?Sized>(&self, x: &Tensor, rng: &mut R) -> Tensor {
        if self.p == 0.0 {
            return x.clone();
        }
        let scale = 1.0 / (1.0 - self.p);
        x.map(|v| if rng.gen::<f64>() >= self.p { v * scale } else { 0.0 })
    }

    /// Identity without a generator, training dropout with one.
    pub(crate) fn apply<R: Rng + ?Sized>(&self, x: Tensor, rng: Option<&mut R>) -> Tensor {
        match rng {
            Some(rng) => self.forward_train(&x, rng),
            None => x,
        }
    }
}
