mod activation;
mod ops;
mod reduce;
#[allow(clippy::module_inception)]
mod tensor;
mod views;

pub use tensor::{Nested, Tensor};
