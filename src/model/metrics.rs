//! Binary classification metrics and calibration bins.

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub true_negative: u64,
    pub false_positive: u64,
    pub false_negative: u64,
    pub true_positive: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinaryMetrics {
    pub samples: usize,
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub auc: f64,
    pub log_loss: f64,
    pub brier: f64,
    pub confusion: ConfusionMatrix,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationBin {
    pub lo: f64,
    pub hi: f64,
    pub samples: usize,
    pub mean_predicted: f64,
    pub observed_rate: f64,
}

/// Evaluate probabilities against 0/1 labels at a 0.5 threshold.
pub fn evaluate_probs(labels: &[f64], probs: &[f64]) -> Result<BinaryMetrics> {
    if labels.len() != probs.len() {
        return Err(anyhow!(
            "label/probability length mismatch: {} vs {}",
            labels.len(),
            probs.len()
        ));
    }
    if labels.is_empty() {
        return Err(anyhow!("cannot evaluate zero samples"));
    }

    let n = labels.len();
    let mut confusion = ConfusionMatrix {
        true_negative: 0,
        false_positive: 0,
        false_negative: 0,
        true_positive: 0,
    };
    let mut log_loss = 0.0;
    let mut brier = 0.0;

    for (&label, &p) in labels.iter().zip(probs.iter()) {
        let positive = label >= 0.5;
        let predicted = p >= 0.5;
        match (positive, predicted) {
            (true, true) => confusion.true_positive += 1,
            (true, false) => confusion.false_negative += 1,
            (false, true) => confusion.false_positive += 1,
            (false, false) => confusion.true_negative += 1,
        }
        let clamped = p.clamp(1e-12, 1.0 - 1e-12);
        log_loss -= if positive {
            clamped.ln()
        } else {
            (1.0 - clamped).ln()
        };
        let target = if positive { 1.0 } else { 0.0 };
        brier += (p - target) * (p - target);
    }

    let tp = confusion.true_positive as f64;
    let fp = confusion.false_positive as f64;
    let fn_ = confusion.false_negative as f64;
    let tn = confusion.true_negative as f64;

    let accuracy = (tp + tn) / n as f64;
    let precision = if tp + fp > 0.0 { tp / (tp + fp) } else { 0.0 };
    let recall = if tp + fn_ > 0.0 { tp / (tp + fn_) } else { 0.0 };
    let f1 = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };

    Ok(BinaryMetrics {
        samples: n,
        accuracy,
        precision,
        recall,
        f1,
        auc: rank_auc(labels, probs),
        log_loss: log_loss / n as f64,
        brier: brier / n as f64,
        confusion,
    })
}

/// ROC-AUC via the rank-sum identity, with average ranks for tied scores.
/// Degenerate single-class inputs evaluate to 0.5.
fn rank_auc(labels: &[f64], probs: &[f64]) -> f64 {
    let n = labels.len();
    let n_pos = labels.iter().filter(|&&l| l >= 0.5).count();
    let n_neg = n - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return 0.5;
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| probs[a].total_cmp(&probs[b]));

    let mut ranks = vec![0.0f64; n];
    let mut i = 0;
    while i < n {
        let mut j = i;
        while j + 1 < n && probs[order[j + 1]] == probs[order[i]] {
            j += 1;
        }
        let avg_rank = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            ranks[idx] = avg_rank;
        }
        i = j + 1;
    }

    let pos_rank_sum: f64 = labels
        .iter()
        .zip(ranks.iter())
        .filter(|&(&l, _)| l >= 0.5)
        .map(|(_, &r)| r)
        .sum();
    let n_pos = n_pos as f64;
    let n_neg = n_neg as f64;
    (pos_rank_sum - n_pos * (n_pos + 1.0) / 2.0) / (n_pos * n_neg)
}

pub fn calibration_bins(labels: &[f64], probs: &[f64], n_bins: usize) -> Vec<CalibrationBin> {
    let n_bins = n_bins.max(1);
    let mut bins = Vec::with_capacity(n_bins);
    for b in 0..n_bins {
        let lo = b as f64 / n_bins as f64;
        let hi = (b + 1) as f64 / n_bins as f64;
        let mut samples = 0usize;
        let mut pred_sum = 0.0;
        let mut pos = 0usize;
        for (&label, &p) in labels.iter().zip(probs.iter()) {
            let in_bin = if b + 1 == n_bins {
                p >= lo && p <= hi
            } else {
                p >= lo && p < hi
            };
            if in_bin {
                samples += 1;
                pred_sum += p;
                if label >= 0.5 {
                    pos += 1;
                }
            }
        }
        bins.push(CalibrationBin {
            lo,
            hi,
            samples,
            mean_predicted: if samples > 0 {
                pred_sum / samples as f64
            } else {
                f64::NAN
            },
            observed_rate: if samples > 0 {
                pos as f64 / samples as f64
            } else {
                f64::NAN
            },
        });
    }
    bins
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfect_predictions_score_perfectly() {
        let labels = vec![0.0, 0.0, 1.0, 1.0];
        let probs = vec![0.1, 0.2, 0.8, 0.9];
        let m = evaluate_probs(&labels, &probs).unwrap();
        assert_eq!(m.accuracy, 1.0);
        assert_eq!(m.precision, 1.0);
        assert_eq!(m.recall, 1.0);
        assert_eq!(m.f1, 1.0);
        assert_eq!(m.auc, 1.0);
        assert!(m.brier < 0.05);
    }

    #[test]
    fn inverted_predictions_have_zero_auc() {
        let labels = vec![0.0, 0.0, 1.0, 1.0];
        let probs = vec![0.9, 0.8, 0.2, 0.1];
        let m = evaluate_probs(&labels, &probs).unwrap();
        assert_eq!(m.auc, 0.0);
    }

    #[test]
    fn tied_scores_use_average_ranks() {
        let labels = vec![0.0, 1.0, 0.0, 1.0];
        let probs = vec![0.5, 0.5, 0.5, 0.5];
        let m = evaluate_probs(&labels, &probs).unwrap();
        assert!((m.auc - 0.5).abs() < 1e-12);
    }

    #[test]
    fn single_class_auc_is_half() {
        let labels = vec![1.0, 1.0];
        let probs = vec![0.7, 0.9];
        let m = evaluate_probs(&labels, &probs).unwrap();
        assert_eq!(m.auc, 0.5);
    }

    #[test]
    fn confusion_matrix_counts_add_up() {
        let labels = vec![0.0, 1.0, 1.0, 0.0, 1.0];
        let probs = vec![0.6, 0.7, 0.3, 0.2, 0.9];
        let m = evaluate_probs(&labels, &probs).unwrap();
        let total = m.confusion.true_positive
            + m.confusion.true_negative
            + m.confusion.false_positive
            + m.confusion.false_negative;
        assert_eq!(total as usize, m.samples);
        assert_eq!(m.confusion.false_positive, 1);
        assert_eq!(m.confusion.false_negative, 1);
    }

    #[test]
    fn calibration_bins_cover_the_unit_interval() {
        let labels = vec![0.0, 1.0, 0.0, 1.0, 1.0];
        let probs = vec![0.05, 0.95, 0.45, 0.55, 1.0];
        let bins = calibration_bins(&labels, &probs, 10);
        assert_eq!(bins.len(), 10);
        let assigned: usize = bins.iter().map(|b| b.samples).sum();
        assert_eq!(assigned, 5);
        // The top bin is closed so p = 1.0 lands somewhere.
        assert!(bins[9].samples >= 1);
    }

    #[test]
    fn mismatched_lengths_are_an_error() {
        assert!(evaluate_probs(&[1.0], &[0.5, 0.5]).is_err());
        assert!(evaluate_probs(&[], &[]).is_err());
    }
}
