//! Facade re-exports for thalos-nn

pub use crate::api::error::*;
pub use crate::api::traits::*;
pub use crate::api::types::*;
pub use crate::core::attention::{scaled_dot_product_attention, MultiHeadAttention, MASK_FILL_VALUE};
pub use crate::core::cross_attention::CrossAttentionBlock;
pub use crate::core::dropout::Dropout;
pub use crate::core::embedding::Embedding;
pub use crate::core::feed_forward::FeedForward;
pub use crate::core::kv_cache::KVCache;
pub use crate::core::layer_norm::LayerNorm;
pub use crate::core::linear::Linear;
pub use crate::core::loss::{CrossEntropyLoss, MseLoss, DEFAULT_IGNORE_INDEX};
pub use crate::core::mask::{causal_mask, causal_mask_with_offset, combine_masks, padding_mask};
pub use crate::core::model::LanguageModel;
pub use crate::core::parameter::Parameter;
pub use crate::core::positional::PositionalEncoding;
pub use crate::core::sampling::sample_next;
pub use crate::core::stack::{TransformerDecoder, TransformerEncoder};
pub use crate::core::transformer_block::TransformerBlock;
