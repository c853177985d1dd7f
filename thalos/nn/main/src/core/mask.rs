//! Attention masks. A mask entry of 1 lets a query attend to a key, 0 blocks
//! it.

use crate::api::error::{NnError, NnResult};
use thalos_core::Tensor;

/// Lower-triangular `[n, n]` mask: position `i` sees positions `j <= i`.
pub fn causal_mask(n: usize) -> Tensor {
    Tensor::tril(n)
}

/// `[seq_len, offset + seq_len]` mask for `seq_len` new queries following
/// `offset` cached positions: query `i` sees keys `j <= offset + i`.
pub fn causal_mask_with_offset(seq_len: usize, offset: usize) -> NnResult<Tensor> {
    Ok(Tensor::tril(offset + seq_len).narrow(0, offset, seq_len)?)
}

/// `[batch, max_len]` mask with `mask[b, i] = 1` for `i < lengths[b]`.
///
/// A single row (`lengths.len() == 1`) broadcasts against `[seq_q, max_len]`
/// attention scores as a key padding mask.
pub fn padding_mask(lengths: &[usize], max_len: usize) -> NnResult<Tensor> {
    let mut data = Vec::with_capacity(lengths.len() * max_len);
    for &len in lengths {
        if len > max_len {
            return Err(NnError::InvalidArgument(format!(
                "sequence length {} exceeds max_len {}",
                len, max_len
            )));
        }
        data.extend((0..max_len).map(|i| if i < len { 1.0 } else { 0.0 }));
    }
    Ok(Tensor::from_vec(data, [lengths.len(), max_len])?)
}

/// Logical AND of two masks, broadcasting their shapes.
pub fn combine_masks(a: &Tensor, b: &Tensor) -> NnResult<Tensor> {
    let both = a.mul(b)?;
    Ok(both.map(|v| if v != 0.0 { 1.0 } else { 0.0 }))
}
