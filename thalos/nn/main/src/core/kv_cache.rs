//! KV cache for incremental decoding.
//!
//! Holds the projected keys and values each self-attention layer has seen
//! so far, so a decoding step only projects the new tokens.

use crate::api::error::{NnError, NnResult};
use thalos_core::Tensor;

/// Per-layer `[len, d_model]` keys and values, grown by concatenation.
#[derive(Debug, Clone)]
pub struct KVCache {
    keys: Vec<Option<Tensor>>,
    values: Vec<Option<Tensor>>,
    max_seq_len: usize,
    d_model: usize,
    current_len: usize,
}

impl KVCache {
    pub fn new(num_layers: usize, max_seq_len: usize, d_model: usize) -> Self {
        Self {
            keys: vec![None; num_layers],
            values: vec![None; num_layers],
            max_seq_len,
            d_model,
            current_len: 0,
        }
    }

    pub fn num_layers(&self) -> usize {
        self.keys.len()
    }

    pub fn max_seq_len(&self) -> usize {
        self.max_seq_len
    }

    pub fn d_model(&self) -> usize {
        self.d_model
    }

    /// Number of positions committed by [`advance`](Self::advance).
    pub fn current_len(&self) -> usize {
        self.current_len
    }

    pub fn is_empty(&self) -> bool {
        self.current_len == 0
    }

    /// Append `key`/`value` rows for `layer_idx` and return the full history.
    ///
    /// Both inputs are `[new_len, d_model]`. The layer must not already hold
    /// entries past [`current_len`](Self::current_len).
    pub fn update(
        &mut self,
        layer_idx: usize,
        key: &Tensor,
        value: &Tensor,
    ) -> NnResult<(Tensor, Tensor)> {
        if layer_idx >= self.keys.len() {
            return Err(NnError::InvalidArgument(format!(
                "layer {} out of range for a {}-layer cache",
                layer_idx,
                self.keys.len()
            )));
        }
        let new_len = match (key.dims(), value.dims()) {
            ([kl, kd], [vl, vd]) if kl == vl && *kd == self.d_model && *vd == self.d_model => *kl,
            _ => {
                return Err(NnError::DimensionMismatch(format!(
                    "cache expects [len, {}] keys and values, got {} and {}",
                    self.d_model,
                    key.shape(),
                    value.shape()
                )))
            }
        };
        let stored = self.keys[layer_idx].as_ref().map_or(0, |k| k.dims()[0]);
        if stored != self.current_len {
            return Err(NnError::InvalidArgument(format!(
                "layer {} already holds {} positions, cache is at {}",
                layer_idx, stored, self.current_len
            )));
        }
        if stored + new_len > self.max_seq_len {
            return Err(NnError::InvalidConfig(format!(
                "Sequence length exceeded: max={}, actual={}",
                self.max_seq_len,
                stored + new_len
            )));
        }

        let (k, v) = match (&self.keys[layer_idx], &self.values[layer_idx]) {
            (Some(k), Some(v)) => (Tensor::cat(&[k, key], 0)?, Tensor::cat(&[v, value], 0)?),
            _ => (key.clone(), value.clone()),
        };
        self.keys[layer_idx] = Some(k.clone());
        self.values[layer_idx] = Some(v.clone());
        Ok((k, v))
    }

    /// Commit `step` positions after every layer has been updated.
    pub fn advance(&mut self, step: usize) {
        self.current_len += step;
    }

    /// Drop all cached entries.
    pub fn clear(&mut self) {
        self.keys.iter_mut().for_each(|k| *k = None);
        self.values.iter_mut().for_each(|v| *v = None);
        self.current_len = 0;
    }
}
