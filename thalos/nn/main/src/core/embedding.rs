//! Token embedding table.

use std::time::Instant;

use crate::api::error::{NnError, NnResult};
use crate::api::traits::{Layer, Module};
use crate::core::parameter::Parameter;
use rand::Rng;
use thalos_core::{random, Tensor};

/// Embedding layer that maps token indices to dense vectors
#[derive(Debug, Clone)]
pub struct Embedding {
    /// Embedding weight matrix [num_embeddings, embedding_dim]
    pub weight: Parameter,
    pub num_embeddings: usize,
    pub embedding_dim: usize,
    /// Row kept at zero, typically the padding token.
    pub padding_idx: Option<usize>,
}

impl Embedding {
    /// Random table drawn from `N(0, 1/embedding_dim)`.
    pub fn new<R: Rng>(num_embeddings: usize, embedding_dim: usize, rng: &mut R) -> NnResult<Self> {
        Self::with_padding_idx(num_embeddings, embedding_dim, None, rng)
    }

    pub fn with_padding_idx<R: Rng>(
        num_embeddings: usize,
        embedding_dim: usize,
        padding_idx: Option<usize>,
        rng: &mut R,
    ) -> NnResult<Self> {
        if num_embeddings == 0 || embedding_dim == 0 {
            return Err(NnError::InvalidConfig(format!(
                "Embedding needs a non-empty table, got {}x{}",
                num_embeddings, embedding_dim
            )));
        }
        let std = 1.0 / (embedding_dim as f64).sqrt();
        let mut data = random::normal([num_embeddings, embedding_dim], 0.0, std, rng)?.into_vec();

        if let Some(pad) = padding_idx {
            if pad >= num_embeddings {
                return Err(NnError::InvalidConfig(format!(
                    "padding_idx {} out of range for {} embeddings",
                    pad, num_embeddings
                )));
            }
            data[pad * embedding_dim..(pad + 1) * embedding_dim].fill(0.0);
        }

        Ok(Self {
            weight: Parameter::new(
                "weight",
                Tensor::from_vec(data, [num_embeddings, embedding_dim])?,
            ),
            num_embeddings,
            embedding_dim,
            padding_idx,
        })
    }

    /// Create an embedding layer from existing weights
    pub fn from_weights(weight: Tensor) -> NnResult<Self> {
        let (num_embeddings, embedding_dim) = match weight.dims() {
            [n, d] => (*n, *d),
            other => {
                return Err(NnError::InvalidConfig(format!(
                    "Embedding weight must be 2D, got {:?}",
                    other
                )))
            }
        };

        Ok(Self {
            weight: Parameter::new("weight", weight),
            num_embeddings,
            embedding_dim,
            padding_idx: None,
        })
    }

    /// Look up a sequence of token ids: `[ids.len(), embedding_dim]`.
    pub fn forward_ids(&self, ids: &[usize]) -> NnResult<Tensor> {
        let _t = if log::log_enabled!(log::Level::Trace) { Some(Instant::now()) } else { None };

        let table = self.weight.value().data();
        let d = self.embedding_dim;
        let mut out = Vec::with_capacity(ids.len() * d);
        for &idx in ids {
            if idx >= self.num_embeddings {
                return Err(NnError::InvalidArgument(format!(
                    "Index {} out of bounds for embedding with {} entries",
                    idx, self.num_embeddings
                )));
            }
            out.extend_from_slice(&table[idx * d..(idx + 1) * d]);
        }

        let result = Tensor::from_vec(out, [ids.len(), d])?;
        if let Some(t) = _t {
            log::trace!(
                "[perf] embedding::forward {} ids -> {} {:.3}ms",
                ids.len(),
                result.shape(),
                t.elapsed().as_secs_f64() * 1000.0
            );
        }
        Ok(result)
    }
}

/// Converts a tensor of token ids to indices, rejecting negative or
/// fractional values.
pub(crate) fn ids_from_tensor(ids: &Tensor) -> NnResult<Vec<usize>> {
    ids.data()
        .iter()
        .map(|&v| {
            if v >= 0.0 && v.fract() == 0.0 && v.is_finite() {
                Ok(v as usize)
            } else {
                Err(NnError::InvalidArgument(format!("{} is not a valid token id", v)))
            }
        })
        .collect()
}

impl Module for Embedding {
    fn parameters(&self) -> Vec<&Parameter> {
        vec![&self.weight]
    }

    fn parameters_mut(&mut self) -> Vec<&mut Parameter> {
        vec![&mut self.weight]
    }
}

impl Layer for Embedding {
    /// Input shape: [...] (tensor of integer indices)
    /// Output shape: [..., embedding_dim]
    fn forward(&self, indices: &Tensor) -> NnResult<Tensor> {
        let ids = ids_from_tensor(indices)?;
        let mut dims = indices.dims().to_vec();
        dims.push(self.embedding_dim);
        Ok(self.forward_ids(&ids)?.reshape(dims)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thalos_core::random::seeded_rng;

    #[test]
    fn test_lookup_rows() {
        let weight = Tensor::from_rows(&[[0.0, 0.1], [1.0, 1.1], [2.0, 2.1]]).unwrap();
        let emb = Embedding::from_weights(weight).unwrap();
        let out = emb.forward_ids(&[2, 0, 2]).unwrap();
        assert_eq!(out.dims(), &[3, 2]);
        assert_eq!(out.data(), &[2.0, 2.1, 0.0, 0.1, 2.0, 2.1]);
    }

    #[test]
    fn test_out_of_range_id() {
        let emb = Embedding::new(4, 8, &mut seeded_rng(0)).unwrap();
        assert!(matches!(
            emb.forward_ids(&[1, 4]),
            Err(NnError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_tensor_ids_keep_shape() {
        let emb = Embedding::new(10, 4, &mut seeded_rng(0)).unwrap();
        let ids = Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], [2, 3]).unwrap();
        assert_eq!(emb.forward(&ids).unwrap().dims(), &[2, 3, 4]);
        assert!(emb.forward(&Tensor::from_slice(&[-1.0])).is_err());
        assert!(emb.forward(&Tensor::from_slice(&[1.5])).is_err());
    }

    #[test]
    fn test_padding_row_is_zero() {
        let emb = Embedding::with_padding_idx(6, 5, Some(0), &mut seeded_rng(1)).unwrap();
        let row = emb.forward_ids(&[0]).unwrap();
        assert!(row.data().iter().all(|&v| v == 0.0));
        assert!(Embedding::with_padding_idx(6, 5, Some(6), &mut seeded_rng(1)).is_err());
    }

    #[test]
    fn test_init_scale() {
        let emb = Embedding::new(400, 64, &mut seeded_rng(2)).unwrap();
        assert!((emb.weight.value().std_all() - 0.125).abs() < 0.005);
    }
}
