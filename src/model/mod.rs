//! Classifiers and evaluation. All three models consume a finite design
//! matrix; NaN sentinels are resolved here, by policy, before any fit.

pub mod boost;
pub mod forest;
pub mod logistic;
pub mod metrics;
pub mod tree;

use anyhow::{Result, anyhow};

use crate::features::FeatureRow;

/// How to resolve NaN sentinels left by the feature deriver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingRowPolicy {
    /// Keep only rows where every column is finite.
    DropRows,
    /// Replace NaN with the column mean computed from train rows only.
    ImputeTrainMean,
}

/// Finite design matrix plus 0/1 labels, ready to fit.
#[derive(Debug, Clone)]
pub struct DesignMatrix {
    pub rows: Vec<Vec<f64>>,
    pub labels: Vec<f64>,
}

impl DesignMatrix {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Resolve missing values for both partitions. Imputation statistics come
/// from the train partition only; the test partition never contributes.
pub fn prepare_matrices(
    train: &[FeatureRow],
    test: &[FeatureRow],
    feature_names: &[String],
    policy: MissingRowPolicy,
) -> Result<(DesignMatrix, DesignMatrix)> {
    match policy {
        MissingRowPolicy::DropRows => {
            let train = drop_rows(train);
            let test = drop_rows(test);
            if train.is_empty() {
                return Err(anyhow!("all train rows dropped by missing-value policy"));
            }
            if test.is_empty() {
                return Err(anyhow!("all test rows dropped by missing-value policy"));
            }
            Ok((train, test))
        }
        MissingRowPolicy::ImputeTrainMean => {
            let means = train_column_means(train, feature_names)?;
            Ok((impute(train, &means), impute(test, &means)))
        }
    }
}

fn drop_rows(rows: &[FeatureRow]) -> DesignMatrix {
    let mut out_rows = Vec::new();
    let mut labels = Vec::new();
    for row in rows {
        if row.values.iter().all(|v| v.is_finite()) {
            out_rows.push(row.values.clone());
            labels.push(if row.is_pass { 1.0 } else { 0.0 });
        }
    }
    DesignMatrix {
        rows: out_rows,
        labels,
    }
}

fn train_column_means(rows: &[FeatureRow], feature_names: &[String]) -> Result<Vec<f64>> {
    let cols = feature_names.len();
    let mut sums = vec![0.0f64; cols];
    let mut counts = vec![0u64; cols];
    for row in rows {
        for (i, v) in row.values.iter().enumerate() {
            if v.is_finite() {
                sums[i] += v;
                counts[i] += 1;
            }
        }
    }
    let mut means = Vec::with_capacity(cols);
    for i in 0..cols {
        if counts[i] == 0 {
            return Err(anyhow!(
                "feature '{}' has no finite train values to impute from",
                feature_names[i]
            ));
        }
        means.push(sums[i] / counts[i] as f64);
    }
    Ok(means)
}

fn impute(rows: &[FeatureRow], means: &[f64]) -> DesignMatrix {
    let mut out_rows = Vec::with_capacity(rows.len());
    let mut labels = Vec::with_capacity(rows.len());
    for row in rows {
        let values = row
            .values
            .iter()
            .enumerate()
            .map(|(i, v)| if v.is_finite() { *v } else { means[i] })
            .collect();
        out_rows.push(values);
        labels.push(if row.is_pass { 1.0 } else { 0.0 });
    }
    DesignMatrix {
        rows: out_rows,
        labels,
    }
}

pub(crate) fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}
