//! Variance-reduction regression tree. Serves double duty: leaves hold
//! label means for the forest, residual means for the booster.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TreeConfig {
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Number of candidate features per split; None means all.
    pub feature_subsample: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<Node>,
}

struct FitCtx<'a> {
    x: &'a [Vec<f64>],
    y: &'a [f64],
    config: TreeConfig,
    /// SSE reduction credited to each feature, accumulated across splits.
    importance: Vec<f64>,
}

impl RegressionTree {
    pub fn fit(
        x: &[Vec<f64>],
        y: &[f64],
        indices: &[usize],
        config: TreeConfig,
        rng: &mut StdRng,
    ) -> (Self, Vec<f64>) {
        let n_features = x.first().map(|r| r.len()).unwrap_or(0);
        let mut ctx = FitCtx {
            x,
            y,
            config,
            importance: vec![0.0; n_features],
        };
        let mut nodes = Vec::new();
        let mut idx = indices.to_vec();
        build(&mut ctx, &mut nodes, &mut idx, 0, rng);
        (Self { nodes }, ctx.importance)
    }

    pub fn predict(&self, row: &[f64]) -> f64 {
        let mut at = 0usize;
        loop {
            match &self.nodes[at] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    at = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }
}

fn build(
    ctx: &mut FitCtx<'_>,
    nodes: &mut Vec<Node>,
    indices: &mut [usize],
    depth: usize,
    rng: &mut StdRng,
) -> usize {
    let mean = mean_of(ctx.y, indices);
    let node_id = nodes.len();

    if depth >= ctx.config.max_depth
        || indices.len() < ctx.config.min_samples_split
        || is_pure(ctx.y, indices)
    {
        nodes.push(Node::Leaf { value: mean });
        return node_id;
    }

    let Some(split) = best_split(ctx, indices, rng) else {
        nodes.push(Node::Leaf { value: mean });
        return node_id;
    };
    ctx.importance[split.feature] += split.sse_reduction;

    // Placeholder, patched after both subtrees exist.
    nodes.push(Node::Leaf { value: mean });

    let feature = split.feature;
    let threshold = split.threshold;
    let mid = partition(ctx.x, indices, feature, threshold);
    let (left_idx, right_idx) = indices.split_at_mut(mid);
    let left = build(ctx, nodes, left_idx, depth + 1, rng);
    let right = build(ctx, nodes, right_idx, depth + 1, rng);

    nodes[node_id] = Node::Split {
        feature,
        threshold,
        left,
        right,
    };
    node_id
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    sse_reduction: f64,
}

fn best_split(ctx: &FitCtx<'_>, indices: &[usize], rng: &mut StdRng) -> Option<BestSplit> {
    let n_features = ctx.importance.len();
    let mut candidates: Vec<usize> = (0..n_features).collect();
    if let Some(k) = ctx.config.feature_subsample
        && k < n_features
    {
        candidates.shuffle(rng);
        candidates.truncate(k);
    }

    let total_sum: f64 = indices.iter().map(|&i| ctx.y[i]).sum();
    let total_sq: f64 = indices.iter().map(|&i| ctx.y[i] * ctx.y[i]).sum();
    let n = indices.len() as f64;
    let parent_sse = total_sq - total_sum * total_sum / n;

    let mut best: Option<BestSplit> = None;
    let min_leaf = ctx.config.min_samples_leaf;

    for &feature in &candidates {
        let mut sorted: Vec<usize> = indices.to_vec();
        sorted.sort_by(|&a, &b| ctx.x[a][feature].total_cmp(&ctx.x[b][feature]));

        let mut left_sum = 0.0;
        let mut left_sq = 0.0;
        for (pos, &i) in sorted.iter().enumerate().take(sorted.len() - 1) {
            left_sum += ctx.y[i];
            left_sq += ctx.y[i] * ctx.y[i];
            let left_n = (pos + 1) as f64;
            let right_n = n - left_n;
            if (pos + 1) < min_leaf || (sorted.len() - pos - 1) < min_leaf {
                continue;
            }
            // No split between equal feature values.
            let here = ctx.x[i][feature];
            let next = ctx.x[sorted[pos + 1]][feature];
            if here == next {
                continue;
            }

            let right_sum = total_sum - left_sum;
            let right_sq = total_sq - left_sq;
            let child_sse = (left_sq - left_sum * left_sum / left_n)
                + (right_sq - right_sum * right_sum / right_n);
            let reduction = parent_sse - child_sse;
            if reduction > best.as_ref().map(|b| b.sse_reduction).unwrap_or(1e-12) {
                best = Some(BestSplit {
                    feature,
                    threshold: (here + next) / 2.0,
                    sse_reduction: reduction,
                });
            }
        }
    }
    best
}

fn partition(x: &[Vec<f64>], indices: &mut [usize], feature: usize, threshold: f64) -> usize {
    let mut mid = 0;
    for i in 0..indices.len() {
        if x[indices[i]][feature] <= threshold {
            indices.swap(i, mid);
            mid += 1;
        }
    }
    mid
}

fn mean_of(y: &[f64], indices: &[usize]) -> f64 {
    if indices.is_empty() {
        return 0.0;
    }
    indices.iter().map(|&i| y[i]).sum::<f64>() / indices.len() as f64
}

fn is_pure(y: &[f64], indices: &[usize]) -> bool {
    let Some(&first) = indices.first() else {
        return true;
    };
    indices.iter().all(|&i| y[i] == y[first])
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn config() -> TreeConfig {
        TreeConfig {
            max_depth: 4,
            min_samples_split: 2,
            min_samples_leaf: 1,
            feature_subsample: None,
        }
    }

    #[test]
    fn splits_a_step_function() {
        let x: Vec<Vec<f64>> = (0..20).map(|i| vec![i as f64]).collect();
        let y: Vec<f64> = (0..20).map(|i| if i < 10 { 0.0 } else { 1.0 }).collect();
        let indices: Vec<usize> = (0..20).collect();
        let mut rng = StdRng::seed_from_u64(1);
        let (tree, importance) = RegressionTree::fit(&x, &y, &indices, config(), &mut rng);
        assert_eq!(tree.predict(&[3.0]), 0.0);
        assert_eq!(tree.predict(&[15.0]), 1.0);
        assert!(importance[0] > 0.0);
    }

    #[test]
    fn pure_node_is_a_leaf() {
        let x: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64]).collect();
        let y = vec![1.0; 10];
        let indices: Vec<usize> = (0..10).collect();
        let mut rng = StdRng::seed_from_u64(1);
        let (tree, importance) = RegressionTree::fit(&x, &y, &indices, config(), &mut rng);
        assert_eq!(tree.predict(&[5.0]), 1.0);
        assert_eq!(importance[0], 0.0);
    }

    #[test]
    fn min_leaf_constraint_is_honored() {
        let x: Vec<Vec<f64>> = (0..6).map(|i| vec![i as f64]).collect();
        let y = vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
        let indices: Vec<usize> = (0..6).collect();
        let mut rng = StdRng::seed_from_u64(1);
        let cfg = TreeConfig {
            min_samples_leaf: 4,
            ..config()
        };
        let (tree, _) = RegressionTree::fit(&x, &y, &indices, cfg, &mut rng);
        // No legal split exists, so the tree is a single mean leaf.
        assert!((tree.predict(&[0.0]) - 0.5).abs() < 1e-12);
    }
}
