//! # Thalos Core
//!
//! Dense `f64` tensors and naive linear algebra.
//!
//! This crate provides a `Tensor` type owning a row-major buffer together with
//! a validated [`Shape`], plus the numeric routines the attention layers in
//! `thalos-nn` are built from.
//!
//! ## Features
//!
//! - Element-wise arithmetic with broadcasting (IEEE semantics for division)
//! - Reshape, transpose, narrow, concatenation and axis reductions
//! - Activations, softmax and layer normalization
//! - `matmul`, `solve`, `inv`, `det`, `qr`, power-iteration `eig` and an
//!   approximate leading-component `svd`
//! - Seeded random initializers (normal, uniform, Xavier, He)
//!
//! ## Example
//!
//! ```rust
//! use thalos_core::{random, Tensor};
//!
//! let mut rng = random::seeded_rng(0);
//! let a = Tensor::randn([2, 3], &mut rng);
//! let b = Tensor::randn([3, 4], &mut rng);
//! let c = a.matmul(&b).unwrap();
//! assert_eq!(c.dims(), &[2, 4]);
//! ```

pub mod api;
mod core;
mod saf;

pub use saf::*;
