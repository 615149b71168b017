//! Gradient-boosted trees with a logit link: each round fits a shallow
//! regression tree to the residual y - sigmoid(F) on a row subsample.

use anyhow::{Result, anyhow};
use rand::Rng;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use super::tree::{RegressionTree, TreeConfig};
use super::{DesignMatrix, sigmoid};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BoostConfig {
    pub rounds: usize,
    pub max_depth: usize,
    pub learning_rate: f64,
    pub subsample: f64,
    pub min_samples_leaf: usize,
    pub seed: u64,
}

impl Default for BoostConfig {
    fn default() -> Self {
        Self {
            rounds: 100,
            max_depth: 8,
            learning_rate: 0.1,
            subsample: 0.8,
            min_samples_leaf: 5,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoostModel {
    pub config: BoostConfig,
    base_score: f64,
    trees: Vec<RegressionTree>,
    pub importance: Vec<f64>,
}

impl BoostModel {
    pub fn fit(matrix: &DesignMatrix, config: BoostConfig) -> Result<Self> {
        if matrix.is_empty() {
            return Err(anyhow!("cannot fit boosted model on empty matrix"));
        }
        if !(0.0..=1.0).contains(&config.subsample) || config.subsample == 0.0 {
            return Err(anyhow!("subsample must be in (0, 1]"));
        }

        let n = matrix.len();
        let n_features = matrix.rows[0].len();
        let pos_rate = (matrix.labels.iter().sum::<f64>() / n as f64).clamp(1e-6, 1.0 - 1e-6);
        let base_score = (pos_rate / (1.0 - pos_rate)).ln();

        let tree_config = TreeConfig {
            max_depth: config.max_depth,
            min_samples_split: config.min_samples_leaf * 2,
            min_samples_leaf: config.min_samples_leaf,
            feature_subsample: None,
        };

        let mut rng = StdRng::seed_from_u64(config.seed);
        let mut scores = vec![base_score; n];
        let mut residuals = vec![0.0f64; n];
        let mut trees = Vec::with_capacity(config.rounds);
        let mut importance = vec![0.0; n_features];
        let sample_size = ((n as f64 * config.subsample).round() as usize).max(1);

        for _ in 0..config.rounds {
            for i in 0..n {
                residuals[i] = matrix.labels[i] - sigmoid(scores[i]);
            }
            let indices: Vec<usize> = if sample_size == n {
                (0..n).collect()
            } else {
                (0..sample_size).map(|_| rng.gen_range(0..n)).collect()
            };

            let (tree, tree_importance) =
                RegressionTree::fit(&matrix.rows, &residuals, &indices, tree_config, &mut rng);
            for (total, part) in importance.iter_mut().zip(tree_importance.iter()) {
                *total += part;
            }
            for (score, row) in scores.iter_mut().zip(matrix.rows.iter()) {
                *score += config.learning_rate * tree.predict(row);
            }
            trees.push(tree);
        }

        let total: f64 = importance.iter().sum();
        if total > 0.0 {
            for v in &mut importance {
                *v /= total;
            }
        }

        Ok(Self {
            config,
            base_score,
            trees,
            importance,
        })
    }

    pub fn predict_proba(&self, row: &[f64]) -> f64 {
        let mut score = self.base_score;
        for tree in &self.trees {
            score += self.config.learning_rate * tree.predict(row);
        }
        sigmoid(score)
    }

    pub fn top_importance<'a>(&self, names: &'a [String], k: usize) -> Vec<(&'a str, f64)> {
        let mut pairs: Vec<(&str, f64)> = names
            .iter()
            .map(String::as_str)
            .zip(self.importance.iter().copied())
            .collect();
        pairs.sort_by(|a, b| b.1.total_cmp(&a.1));
        pairs.truncate(k);
        pairs
    }
}
