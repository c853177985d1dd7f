//! Fixed sinusoidal position encoding.

use crate::api::error::{NnError, NnResult};
use crate::api::traits::{Layer, Module};
use crate::core::parameter::Parameter;
use thalos_core::Tensor;

/// Precomputed `[max_len, d_model]` table added to the first `seq_len` rows
/// of the input.
///
/// Even feature `i` holds `sin(pos / 10000^(i/d))`, odd feature `i` holds
/// `cos(pos / 10000^((i-1)/d))`. The table is a constant buffer, not a
/// parameter.
#[derive(Debug, Clone)]
pub struct PositionalEncoding {
    table: Tensor,
    pub d_model: usize,
    pub max_len: usize,
}

impl PositionalEncoding {
    pub fn new(d_model: usize, max_len: usize) -> NnResult<Self> {
        let mut data = Vec::with_capacity(max_len * d_model);
        for pos in 0..max_len {
            for i in 0..d_model {
                let exponent = (i - i % 2) as f64 / d_model as f64;
                let angle = pos as f64 / 10000f64.powf(exponent);
                data.push(if i % 2 == 0 { angle.sin() } else { angle.cos() });
            }
        }
        Ok(Self {
            table: Tensor::from_vec(data, [max_len, d_model])?,
            d_model,
            max_len,
        })
    }

    pub fn table(&self) -> &Tensor {
        &self.table
    }

    /// Add the encodings for positions `start..start + seq_len` to `x`
    /// `[seq_len, d_model]`.
    pub fn forward_from(&self, x: &Tensor, start: usize) -> NnResult<Tensor> {
        let (seq_len, d) = match x.dims() {
            [s, d] => (*s, *d),
            other => {
                return Err(NnError::DimensionMismatch(format!(
                    "PositionalEncoding expects [seq_len, {}], got {:?}",
                    self.d_model, other
                )))
            }
        };
        if d != self.d_model {
            return Err(NnError::DimensionMismatch(format!(
                "PositionalEncoding built for d_model {}, got {}",
                self.d_model, d
            )));
        }
        if start + seq_len > self.max_len {
            return Err(NnError::InvalidArgument(format!(
                "sequence length {} exceeds max_len {}",
                start + seq_len,
                self.max_len
            )));
        }
        Ok(x.add(&self.table.narrow(0, start, seq_len)?)?)
    }
}

impl Module for PositionalEncoding {
    fn parameters(&self) -> Vec<&Parameter> {
        Vec::new()
    }

    fn parameters_mut(&mut self) -> Vec<&mut Parameter> {
        Vec::new()
    }
}

impl Layer for PositionalEncoding {
    /// `x` is `[seq_len, d_model]`.
    fn forward(&self, x: &Tensor) -> NnResult<Tensor> {
        self.forward_from(x, 0)
    }
}
