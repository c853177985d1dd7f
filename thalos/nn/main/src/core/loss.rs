//! Loss functions over model outputs.

use crate::api::error::{NnError, NnResult};
use crate::api::traits::Loss;
use thalos_core::Tensor;

/// Target value skipped by [`CrossEntropyLoss::default`].
pub const DEFAULT_IGNORE_INDEX: i64 = -100;

/// Cross-entropy of raw logits against class ids.
///
/// Predictions are logits `[n, classes]`; targets hold `n` integer class ids.
/// Each row contributes `logsumexp(row) - row[target]`, computed with the
/// row maximum subtracted. The loss is the mean over the rows whose target
/// is not `ignore_index`, and 0 when every row is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrossEntropyLoss {
    pub ignore_index: Option<i64>,
}

impl CrossEntropyLoss {
    pub fn new(ignore_index: Option<i64>) -> Self {
        Self { ignore_index }
    }
}

impl Default for CrossEntropyLoss {
    fn default() -> Self {
        Self::new(Some(DEFAULT_IGNORE_INDEX))
    }
}

impl Loss for CrossEntropyLoss {
    fn forward(&self, predictions: &Tensor, targets: &Tensor) -> NnResult<f64> {
        let (rows, classes) = match predictions.dims() {
            [r, c] => (*r, *c),
            other => {
                return Err(NnError::DimensionMismatch(format!(
                    "cross entropy expects [n, classes] logits, got {:?}",
                    other
                )))
            }
        };
        if classes == 0 {
            return Err(NnError::InvalidArgument("cross entropy over zero classes".into()));
        }
        if targets.numel() != rows {
            return Err(NnError::DimensionMismatch(format!(
                "{} targets for {} rows of logits",
                targets.numel(),
                rows
            )));
        }

        let mut total = 0.0;
        let mut count = 0usize;
        for (row, &t) in predictions.data().chunks(classes).zip(targets.data()) {
            if t.fract() != 0.0 || !t.is_finite() {
                return Err(NnError::InvalidArgument(format!("{} is not a class id", t)));
            }
            let target = t as i64;
            if self.ignore_index == Some(target) {
                continue;
            }
            if target < 0 || target as usize >= classes {
                return Err(NnError::InvalidArgument(format!(
                    "target {} out of range for {} classes",
                    target, classes
                )));
            }
            let max = row.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            let log_sum_exp = max + row.iter().map(|&x| (x - max).exp()).sum::<f64>().ln();
            total += log_sum_exp - row[target as usize];
            count += 1;
        }
        log::trace!("cross entropy: {} of {} rows counted", count, rows);
        Ok(total / count.max(1) as f64)
    }
}

/// Mean of squared differences between equally shaped tensors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MseLoss;

impl Loss for MseLoss {
    fn forward(&self, predictions: &Tensor, targets: &Tensor) -> NnResult<f64> {
        if predictions.shape() != targets.shape() {
            return Err(NnError::DimensionMismatch(format!(
                "mse: predictions {} vs targets {}",
                predictions.shape(),
                targets.shape()
            )));
        }
        if predictions.numel() == 0 {
            return Err(NnError::InvalidArgument("mse of empty tensors".into()));
        }
        let diff = predictions.sub(targets)?;
        Ok(diff.map(|d| d * d).mean_all())
    }
}
