//! Facade re-exports for thalos-core

pub use crate::api::error::*;
pub use crate::api::types::*;
pub use crate::core::linalg;
pub use crate::core::random;
pub use crate::core::shape::Shape;
pub use crate::core::tensor::{Nested, Tensor};
