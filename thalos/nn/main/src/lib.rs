//! # Thalos Neural Network
//!
//! Attention and transformer layers built on `thalos-core` tensors.
//!
//! This crate provides:
//! - Linear, embedding, layer normalization and dropout layers
//! - Scaled dot-product and multi-head attention with causal/padding masks
//! - Post-norm transformer blocks, encoder and decoder stacks
//! - A decoder-only language model with seeded sampling
//!
//! Sequences are `[seq_len, d_model]` matrices. All randomness goes through
//! an explicitly passed generator.
//!
//! ## Example
//!
//! ```rust
//! use thalos_nn::{LanguageModel, ModelConfig, GenerationConfig};
//! use thalos_core::random::seeded_rng;
//!
//! let config = ModelConfig {
//!     vocab_size: 32,
//!     d_model: 16,
//!     num_heads: 2,
//!     num_layers: 1,
//!     d_ff: 32,
//!     max_seq_len: 16,
//!     ..ModelConfig::default()
//! };
//! let model = LanguageModel::new(config).unwrap();
//! let logits = model.forward_tokens(&[1, 5, 7]).unwrap();
//! assert_eq!(logits.dims(), &[3, 32]);
//!
//! let generation = GenerationConfig { max_new_tokens: 4, ..GenerationConfig::default() };
//! let tokens = model.generate(&[1, 5], &generation, &mut seeded_rng(0)).unwrap();
//! assert!(tokens.len() <= 6);
//! ```

pub mod api;
mod core;
mod saf;

pub use saf::*;
