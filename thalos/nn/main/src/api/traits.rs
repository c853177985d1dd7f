//! Neural network traits

use crate::api::error::NnResult;
use crate::core::parameter::Parameter;
use thalos_core::Tensor;

/// Anything that owns learnable parameters.
///
/// Parameters are exclusively owned by their module; an external optimizer
/// reaches them through [`Module::parameters_mut`].
pub trait Module {
    fn parameters(&self) -> Vec<&Parameter>;

    fn parameters_mut(&mut self) -> Vec<&mut Parameter>;

    /// Total number of scalar parameters.
    fn parameter_count(&self) -> usize {
        self.parameters().iter().map(|p| p.numel()).sum()
    }
}

/// A module mapping one tensor to another in inference mode.
pub trait Layer: Module {
    fn forward(&self, input: &Tensor) -> NnResult<Tensor>;
}

/// A scalar loss between model outputs and targets.
pub trait Loss {
    fn forward(&self, predictions: &Tensor, targets: &Tensor) -> NnResult<f64>;
}
