//! L2-regularized logistic regression fit by gradient descent on
//! standardized features.

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};

use super::{DesignMatrix, sigmoid};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LogisticConfig {
    pub l2: f64,
    pub max_iters: usize,
    pub lr_start: f64,
    /// Convergence is checked every `check_every` iterations; stop when
    /// the loss improved by less than `improvement_eps`.
    pub check_every: usize,
    pub improvement_eps: f64,
}

impl Default for LogisticConfig {
    fn default() -> Self {
        Self {
            l2: 0.01,
            max_iters: 1000,
            lr_start: 0.5,
            check_every: 20,
            improvement_eps: 1e-7,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormStats {
    pub means: Vec<f64>,
    pub stds: Vec<f64>,
}

/// Per-column mean/std. Train partition only; applied verbatim at predict
/// time so test rows are scaled by train statistics.
pub fn feature_norm_stats(rows: &[Vec<f64>]) -> Result<NormStats> {
    let n = rows.len();
    if n == 0 {
        return Err(anyhow!("cannot standardize an empty matrix"));
    }
    let cols = rows[0].len();
    let mut means = vec![0.0; cols];
    for row in rows {
        for (i, v) in row.iter().enumerate() {
            means[i] += v;
        }
    }
    for m in &mut means {
        *m /= n as f64;
    }
    let mut stds = vec![0.0; cols];
    for row in rows {
        for (i, v) in row.iter().enumerate() {
            let d = v - means[i];
            stds[i] += d * d;
        }
    }
    for s in &mut stds {
        *s = (*s / n as f64).sqrt();
        if *s < 1e-12 {
            *s = 1.0; // constant column: leave it centered, not exploded
        }
    }
    Ok(NormStats { means, stds })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticModel {
    pub config: LogisticConfig,
    pub norm: NormStats,
    pub weights: Vec<f64>,
    pub bias: f64,
    pub iterations_run: usize,
    pub final_loss: f64,
}

impl LogisticModel {
    pub fn fit(matrix: &DesignMatrix, config: LogisticConfig) -> Result<Self> {
        if matrix.is_empty() {
            return Err(anyhow!("cannot fit logistic model on empty matrix"));
        }
        let norm = feature_norm_stats(&matrix.rows)?;
        let standardized: Vec<Vec<f64>> = matrix
            .rows
            .iter()
            .map(|row| standardize(row, &norm))
            .collect();

        let n = standardized.len();
        let cols = norm.means.len();
        let mut weights = vec![0.0f64; cols];
        let mut bias = 0.0f64;
        let mut best_loss = f64::INFINITY;
        let mut iterations_run = 0;

        for iter in 0..config.max_iters {
            iterations_run = iter + 1;
            let lr = config.lr_start / (1.0 + iter as f64 * 0.003);

            let mut grad_w = vec![0.0f64; cols];
            let mut grad_b = 0.0f64;
            for (row, &label) in standardized.iter().zip(matrix.labels.iter()) {
                let pred = sigmoid(dot(row, &weights) + bias);
                let err = pred - label;
                for (g, x) in grad_w.iter_mut().zip(row.iter()) {
                    *g += err * x;
                }
                grad_b += err;
            }
            for (w, g) in weights.iter_mut().zip(grad_w.iter()) {
                *w -= lr * (g / n as f64 + config.l2 * *w);
            }
            bias -= lr * grad_b / n as f64;

            if iterations_run % config.check_every == 0 {
                let loss = log_loss(&standardized, &matrix.labels, &weights, bias);
                if best_loss - loss < config.improvement_eps {
                    best_loss = best_loss.min(loss);
                    break;
                }
                best_loss = loss;
            }
        }

        let final_loss = log_loss(&standardized, &matrix.labels, &weights, bias);
        Ok(Self {
            config,
            norm,
            weights,
            bias,
            iterations_run,
            final_loss,
        })
    }

    pub fn predict_proba(&self, row: &[f64]) -> f64 {
        let z = dot(&standardize(row, &self.norm), &self.weights) + self.bias;
        sigmoid(z)
    }

    /// Features ranked by absolute standardized weight, largest first.
    pub fn top_coefficients<'a>(&self, names: &'a [String], k: usize) -> Vec<(&'a str, f64)> {
        let mut pairs: Vec<(&str, f64)> = names
            .iter()
            .map(String::as_str)
            .zip(self.weights.iter().copied())
            .collect();
        pairs.sort_by(|a, b| b.1.abs().total_cmp(&a.1.abs()));
        pairs.truncate(k);
        pairs
    }
}

fn standardize(row: &[f64], norm: &NormStats) -> Vec<f64> {
    row.iter()
        .enumerate()
        .map(|(i, v)| (v - norm.means[i]) / norm.stds[i])
        .collect()
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

fn log_loss(rows: &[Vec<f64>], labels: &[f64], weights: &[f64], bias: f64) -> f64 {
    let mut total = 0.0;
    for (row, &label) in rows.iter().zip(labels.iter()) {
        let p = sigmoid(dot(row, weights) + bias).clamp(1e-12, 1.0 - 1e-12);
        total -= label * p.ln() + (1.0 - label) * (1.0 - p).ln();
    }
    total / rows.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn separable_matrix() -> DesignMatrix {
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for i in 0..100 {
            let x = i as f64 / 100.0;
            rows.push(vec![x, 1.0 - x]);
            labels.push(if x > 0.5 { 1.0 } else { 0.0 });
        }
        DesignMatrix { rows, labels }
    }

    #[test]
    fn learns_a_separable_problem() {
        let model = LogisticModel::fit(&separable_matrix(), LogisticConfig::default()).unwrap();
        assert!(model.predict_proba(&[0.9, 0.1]) > 0.8);
        assert!(model.predict_proba(&[0.1, 0.9]) < 0.2);
    }

    #[test]
    fn constant_column_does_not_explode() {
        let matrix = DesignMatrix {
            rows: vec![vec![1.0, 0.3], vec![1.0, 0.9], vec![1.0, 0.1], vec![1.0, 0.8]],
            labels: vec![0.0, 1.0, 0.0, 1.0],
        };
        let model = LogisticModel::fit(&matrix, LogisticConfig::default()).unwrap();
        assert!(model.weights.iter().all(|w| w.is_finite()));
    }

    #[test]
    fn top_coefficients_rank_by_magnitude() {
        let model = LogisticModel::fit(&separable_matrix(), LogisticConfig::default()).unwrap();
        let names = vec!["x".to_string(), "inv_x".to_string()];
        let top = model.top_coefficients(&names, 2);
        assert_eq!(top.len(), 2);
        assert!(top[0].1.abs() >= top[1].1.abs());
    }
}
