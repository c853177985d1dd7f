pub mod attention;
pub mod config;
pub mod cross_attention;
pub mod dropout;
pub mod embedding;
pub mod feed_forward;
pub mod kv_cache;
pub mod layer_norm;
pub mod linear;
pub mod loss;
pub mod mask;
pub mod model;
pub mod parameter;
pub mod positional;
pub mod sampling;
pub mod stack;
pub mod transformer_block;
