//! Next-token selection from a row of logits.

use crate::api::error::{NnError, NnResult};
use crate::api::types::GenerationConfig;
use rand::Rng;

/// Return the index of the maximum value in the logit slice.
pub(crate) fn argmax(logits: &[f64]) -> usize {
    let mut best = 0;
    let mut max_val = f64::NEG_INFINITY;
    for (i, &v) in logits.iter().enumerate() {
        if v > max_val {
            max_val = v;
            best = i;
        }
    }
    best
}

/// Keep only the top-k logits; set the rest to NEG_INFINITY.
/// Ties with the k-th value are kept. No-op when k >= logits.len().
pub(crate) fn apply_top_k(logits: &mut [f64], k: usize) {
    if k >= logits.len() {
        return;
    }
    let mut vals = logits.to_vec();
    let pivot = vals.len() - k;
    vals.select_nth_unstable_by(pivot, |a, b| a.total_cmp(b));
    let threshold = vals[pivot];
    for v in logits.iter_mut() {
        if *v < threshold {
            *v = f64::NEG_INFINITY;
        }
    }
}

/// Keep the smallest set of tokens whose cumulative probability reaches
/// `p`; mask the rest to NEG_INFINITY. No-op when p >= 1.
pub(crate) fn apply_top_p(logits: &mut [f64], p: f64) {
    if p >= 1.0 {
        return;
    }
    let probs = softmax(logits);
    let mut indices: Vec<usize> = (0..probs.len()).collect();
    indices.sort_unstable_by(|&a, &b| probs[b].total_cmp(&probs[a]));

    let mut cumsum = 0.0;
    let mut keep = vec![false; logits.len()];
    for &idx in &indices {
        cumsum += probs[idx];
        keep[idx] = true;
        if cumsum >= p {
            break;
        }
    }
    for (v, kept) in logits.iter_mut().zip(keep) {
        if !kept {
            *v = f64::NEG_INFINITY;
        }
    }
}

fn softmax(logits: &[f64]) -> Vec<f64> {
    let max_val = logits.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = logits.iter().map(|&v| (v - max_val).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Sample from the categorical distribution defined by `logits`.
pub(crate) fn sample_categorical<R: Rng + ?Sized>(logits: &[f64], rng: &mut R) -> usize {
    let probs = softmax(logits);
    let r: f64 = rng.gen();
    let mut cumsum = 0.0;
    for (i, &p) in probs.iter().enumerate() {
        cumsum += p;
        if r < cumsum {
            return i;
        }
    }
    // Rounding can leave the sum just below r; fall back to the last
    // token that still has mass.
    probs.iter().rposition(|&p| p > 0.0).unwrap_or(0)
}

/// Pick the next token: greedy at temperature 0, otherwise temperature
/// scaling, optional top-k and top-p filtering, then sampling.
pub fn sample_next<R: Rng + ?Sized>(
    logits: &[f64],
    config: &GenerationConfig,
    rng: &mut R,
) -> NnResult<usize> {
    if logits.is_empty() {
        return Err(NnError::InvalidArgument("cannot sample from empty logits".into()));
    }
    if config.temperature == 0.0 {
        return Ok(argmax(logits));
    }
    let mut scaled: Vec<f64> = logits.iter().map(|l| l / config.temperature).collect();
    // A near-zero temperature can overflow the scaled logits; that limit is greedy.
    let overflowed = scaled.iter().any(|v| v.is_nan() || *v == f64::INFINITY);
    if overflowed || !scaled.iter().any(|v| v.is_finite()) {
        return Ok(argmax(logits));
    }
    if let Some(k) = config.top_k {
        apply_top_k(&mut scaled, k);
    }
    if let Some(p) = config.top_p {
        apply_top_p(&mut scaled, p);
    }
    Ok(sample_categorical(&scaled, rng))
}

#[cfg(test)]
mod tests {
    use super::*;
    use thalos_core::random::seeded_rng;

    #[test]
    fn test_argmax() {
        assert_eq!(argmax(&[1.0, 3.0, 2.0]), 1);
        assert_eq!(argmax(&[5.0]), 0);
        assert_eq!(argmax(&[-1.0, -2.0, -0.5]), 2);
    }

    #[test]
    fn test_top_k_basic() {
        let mut logits = vec![1.0, 5.0, 3.0, 2.0, 4.0];
        apply_top_k(&mut logits, 2);
        let finite: Vec<usize> = (0..5).filter(|&i| logits[i].is_finite()).collect();
        assert_eq!(finite, vec![1, 4]);
    }

    #[test]
    fn test_top_k_larger_than_vocab() {
        let mut logits = vec![1.0, 2.0, 3.0];
        apply_top_k(&mut logits, 10);
        assert_eq!(logits, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_top_p_keeps_minimum_set() {
        let mut logits = vec![10.0, -10.0, -10.0, -10.0];
        apply_top_p(&mut logits, 0.9);
        assert!(logits[0].is_finite());
        assert!(logits[1..].iter().all(|&v| v == f64::NEG_INFINITY));
    }

    #[test]
    fn test_sample_categorical_single_choice() {
        let logits = vec![f64::NEG_INFINITY, 0.0, f64::NEG_INFINITY];
        let mut rng = seeded_rng(0);
        for _ in 0..20 {
            assert_eq!(sample_categorical(&logits, &mut rng), 1);
        }
    }

    #[test]
    fn test_sample_categorical_distribution() {
        let logits = vec![0.0; 4];
        let mut rng = seeded_rng(1);
        let mut counts = [0usize; 4];
        for _ in 0..4000 {
            counts[sample_categorical(&logits, &mut rng)] += 1;
        }
        for c in counts {
            assert!((800..1200).contains(&c), "counts {:?}", counts);
        }
    }

    #[test]
    fn test_sample_next_greedy_and_top_k() {
        let logits = [0.1, 2.0, 0.3];
        let greedy = GenerationConfig {
            temperature: 0.0,
            ..GenerationConfig::default()
        };
        assert_eq!(sample_next(&logits, &greedy, &mut seeded_rng(0)).unwrap(), 1);

        let top1 = GenerationConfig {
            top_k: Some(1),
            ..GenerationConfig::default()
        };
        let mut rng = seeded_rng(4);
        for _ in 0..10 {
            assert_eq!(sample_next(&logits, &top1, &mut rng).unwrap(), 1);
        }
        assert!(sample_next(&[], &top1, &mut rng).is_err());
    }

    #[test]
    fn test_sample_next_tiny_temperature_is_greedy() {
        let logits = [-3.0, 0.5, 2.0, -1.0];
        let config = GenerationConfig {
            temperature: 1e-310,
            ..GenerationConfig::default()
        };
        let mut rng = seeded_rng(7);
        for _ in 0..10 {
            assert_eq!(sample_next(&logits, &config, &mut rng).unwrap(), 2);
        }
    }
}
