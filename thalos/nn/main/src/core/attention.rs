//! Scaled dot-product attention and multi-head attention.
//!
//! Sequences are `[seq_len, d_model]` matrices. Masks use 1 for "may
//! attend" and 0 for "blocked" and must broadcast to the `[seq_q, seq_k]`
//! score matrix without enlarging it.

use std::time::Instant;

use crate::api::error::{NnError, NnResult};
use crate::api::traits::{Layer, Module};
use crate::api::types::AttentionOutput;
use crate::core::kv_cache::KVCache;
use crate::core::linear::Linear;
use crate::core::mask::causal_mask_with_offset;
use crate::core::parameter::Parameter;
use rand::Rng;
use thalos_core::Tensor;

/// Score assigned to masked positions before the softmax.
pub const MASK_FILL_VALUE: f64 = -1e9;

/// `softmax(Q·Kᵀ / sqrt(d_k)) · V`, returning both the output and the
/// attention weights.
///
/// `q` is `[seq_q, d_k]`, `k` is `[seq_k, d_k]`, `v` is `[seq_k, d_v]`.
/// Scores where `mask` is 0 are replaced by [`MASK_FILL_VALUE`].
pub fn scaled_dot_product_attention(
    q: &Tensor,
    k: &Tensor,
    v: &Tensor,
    mask: Option<&Tensor>,
) -> NnResult<AttentionOutput> {
    let (d_k, seq_k) = match (q.dims(), k.dims(), v.dims()) {
        ([_, dq], [sk, dk], [sv, _]) if dq == dk && sk == sv => (*dk, *sk),
        _ => {
            return Err(NnError::DimensionMismatch(format!(
                "attention expects q [s_q, d], k [s_k, d], v [s_k, d_v], got {:?}, {:?}, {:?}",
                q.dims(),
                k.dims(),
                v.dims()
            )))
        }
    };
    log::trace!("sdpa: seq_q={} seq_k={} d_k={}", q.dims()[0], seq_k, d_k);

    let scores = q.matmul(&k.t()?)?.div_scalar((d_k as f64).sqrt());
    let scores = match mask {
        Some(m) => {
            let fits = m
                .shape()
                .broadcast_result(scores.shape())
                .map_or(false, |s| s == *scores.shape());
            if !fits {
                return Err(NnError::DimensionMismatch(format!(
                    "mask {} does not broadcast to attention scores {}",
                    m.shape(),
                    scores.shape()
                )));
            }
            scores.masked_fill(m, MASK_FILL_VALUE)?
        }
        None => scores,
    };
    let weights = scores.softmax(-1)?;
    let output = weights.matmul(v)?;
    Ok(AttentionOutput { output, weights })
}

/// Multi-head attention with bias-free projections.
///
/// Q, K and V are projected to `d_model`, split into `num_heads` slices of
/// `head_dim` features, attended independently with a shared mask,
/// concatenated and projected by `w_o`.
#[derive(Debug, Clone)]
pub struct MultiHeadAttention {
    num_heads: usize,
    head_dim: usize,
    d_model: usize,

    pub w_q: Linear,
    pub w_k: Linear,
    pub w_v: Linear,
    pub w_o: Linear,
}

impl MultiHeadAttention {
    /// Fails with `DimensionMismatch` unless `num_heads` divides `d_model`.
    pub fn new<R: Rng>(d_model: usize, num_heads: usize, rng: &mut R) -> NnResult<Self> {
        if num_heads == 0 || d_model % num_heads != 0 {
            return Err(NnError::DimensionMismatch(format!(
                "d_model ({}) must be divisible by num_heads ({})",
                d_model, num_heads
            )));
        }
        Ok(Self {
            num_heads,
            head_dim: d_model / num_heads,
            d_model,
            w_q: Linear::new_no_bias(d_model, d_model, rng)?,
            w_k: Linear::new_no_bias(d_model, d_model, rng)?,
            w_v: Linear::new_no_bias(d_model, d_model, rng)?,
            w_o: Linear::new_no_bias(d_model, d_model, rng)?,
        })
    }

    pub fn num_heads(&self) -> usize {
        self.num_heads
    }

    pub fn head_dim(&self) -> usize {
        self.head_dim
    }

    pub fn d_model(&self) -> usize {
        self.d_model
    }

    /// Attention output `[seq_q, d_model]`.
    pub fn forward(
        &self,
        query: &Tensor,
        key: &Tensor,
        value: &Tensor,
        mask: Option<&Tensor>,
    ) -> NnResult<Tensor> {
        Ok(self.forward_with_weights(query, key, value, mask)?.0)
    }

    /// Attention output together with each head's `[seq_q, seq_k]` weights.
    pub fn forward_with_weights(
        &self,
        query: &Tensor,
        key: &Tensor,
        value: &Tensor,
        mask: Option<&Tensor>,
    ) -> NnResult<(Tensor, Vec<Tensor>)> {
        let _t = if log::log_enabled!(log::Level::Debug) { Some(Instant::now()) } else { None };
        let trace = log::log_enabled!(log::Level::Trace);

        let t_proj = if trace { Some(Instant::now()) } else { None };
        let q = self.w_q.forward(query)?;
        let k = self.w_k.forward(key)?;
        let v = self.w_v.forward(value)?;
        let proj_ms = t_proj.map(|t| t.elapsed().as_secs_f64() * 1000.0);

        let t_heads = if trace { Some(Instant::now()) } else { None };
        let (output, weights) = self.attend_heads(&q, &k, &v, mask)?;
        let heads_ms = t_heads.map(|t| t.elapsed().as_secs_f64() * 1000.0);

        if trace {
            log::trace!(
                "[attn] heads={} QKV={:.3}ms heads={:.3}ms",
                self.num_heads,
                proj_ms.unwrap_or(0.0),
                heads_ms.unwrap_or(0.0),
            );
        }
        if let Some(t) = _t {
            log::debug!(
                "[perf] attention::forward q={} k={} {:.3}ms",
                query.shape(),
                key.shape(),
                t.elapsed().as_secs_f64() * 1000.0
            );
        }
        Ok((output, weights))
    }

    /// Causal self-attention over `input` `[new_len, d_model]` that appends
    /// the new keys and values to `cache` at `layer_idx` and attends over
    /// the whole cached history.
    ///
    /// The caller commits the step with [`KVCache::advance`] once every
    /// layer has been updated.
    pub fn forward_with_cache(
        &self,
        input: &Tensor,
        cache: &mut KVCache,
        layer_idx: usize,
    ) -> NnResult<Tensor> {
        let _t = if log::log_enabled!(log::Level::Debug) { Some(Instant::now()) } else { None };
        if cache.d_model() != self.d_model {
            return Err(NnError::InvalidConfig(format!(
                "KVCache d_model ({}) does not match attention d_model ({})",
                cache.d_model(),
                self.d_model
            )));
        }
        let start_pos = cache.current_len();

        let q = self.w_q.forward(input)?;
        let k = self.w_k.forward(input)?;
        let v = self.w_v.forward(input)?;
        let (k_full, v_full) = cache.update(layer_idx, &k, &v)?;

        let mask = causal_mask_with_offset(q.dims()[0], start_pos)?;
        let (output, _) = self.attend_heads(&q, &k_full, &v_full, Some(&mask))?;

        if let Some(t) = _t {
            log::debug!(
                "[perf] attention::forward_with_cache layer={} start={} {} {:.3}ms",
                layer_idx,
                start_pos,
                input.shape(),
                t.elapsed().as_secs_f64() * 1000.0
            );
        }
        Ok(output)
    }

    /// Split projected Q/K/V into heads, attend each, concatenate and apply `w_o`.
    fn attend_heads(
        &self,
        q: &Tensor,
        k: &Tensor,
        v: &Tensor,
        mask: Option<&Tensor>,
    ) -> NnResult<(Tensor, Vec<Tensor>)> {
        let mut contexts = Vec::with_capacity(self.num_heads);
        let mut weights = Vec::with_capacity(self.num_heads);
        for h in 0..self.num_heads {
            let start = h * self.head_dim;
            let head = scaled_dot_product_attention(
                &q.narrow(1, start, self.head_dim)?,
                &k.narrow(1, start, self.head_dim)?,
                &v.narrow(1, start, self.head_dim)?,
                mask,
            )?;
            contexts.push(head.output);
            weights.push(head.weights);
        }
        let context = Tensor::cat(&contexts.iter().collect::<Vec<_>>(), 1)?;
        Ok((self.w_o.forward(&context)?, weights))
    }
}

impl Module for MultiHeadAttention {
    fn parameters(&self) -> Vec<&Parameter> {
        [&self.w_q, &self.w_k, &self.w_v, &self.w_o]
            .into_iter()
            .flat_map(|proj| proj.parameters())
            .collect()
    }

    fn parameters_mut(&mut self) -> Vec<&mut Parameter> {
        let mut params = self.w_q.parameters_mut();
        params.extend(self.w_k.parameters_mut());
        params.extend(self.w_v.parameters_mut());
        params.extend(self.w_o.parameters_mut());
        params
    }
}
