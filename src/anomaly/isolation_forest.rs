//! Deterministic isolation forest for one-dimensional cost values

use crate::error::{CostError, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use statrs::consts::EULER_MASCHERONI;
use statrs::function::gamma::digamma;

/// Ensemble size
pub const N_ESTIMATORS: usize = 100;
/// Expected share of anomalous points
pub const CONTAMINATION: f64 = 0.2;
/// Seed fixing the ensemble across runs
pub const SEED: u64 = 42;
/// Per-tree subsample cap
const MAX_SUBSAMPLE: usize = 256;

enum Node {
    Leaf {
        size: usize,
    },
    Split {
        value: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

/// Fitted isolation forest over a single cost column
///
/// Scoring follows the usual convention: higher scores are more normal, the
/// label is -1 exactly when the decision value is negative, and the decision
/// offset is the contamination quantile of the training scores.
pub struct IsolationForest {
    trees: Vec<Node>,
    subsample: usize,
    offset: f64,
}

impl IsolationForest {
    /// Fit the forest on a cost column with the fixed hyperparameters
    /// (100 trees, contamination 0.2, seed 42)
    pub fn fit(values: &[f64]) -> Result<Self> {
        let n = values.len();
        if n < 2 {
            return Err(CostError::Degenerate(format!(
                "Isolation forest needs at least 2 observations, got {}",
                n
            )));
        }

        let subsample = n.min(MAX_SUBSAMPLE);
        let depth_limit = (subsample as f64).log2().ceil() as usize;
        let mut rng = StdRng::seed_from_u64(SEED);

        let mut trees = Vec::with_capacity(N_ESTIMATORS);
        for _ in 0..N_ESTIMATORS {
            let sample: Vec<f64> = if n > subsample {
                rand::seq::index::sample(&mut rng, n, subsample)
                    .into_iter()
                    .map(|i| values[i])
                    .collect()
            } else {
                values.to_vec()
            };
            trees.push(build_tree(sample, 0, depth_limit, &mut rng));
        }

        let mut forest = Self {
            trees,
            subsample,
            offset: 0.0,
        };
        let train_scores: Vec<f64> = values.iter().map(|&v| forest.score_sample(v)).collect();
        forest.offset = quantile(&train_scores, CONTAMINATION);

        Ok(forest)
    }

    /// Anomaly score of one value; higher = more normal, in (-1, 0)
    pub fn score_sample(&self, value: f64) -> f64 {
        let mean_depth = self
            .trees
            .iter()
            .map(|tree| path_length(tree, value, 0))
            .sum::<f64>()
            / self.trees.len() as f64;

        -(2f64.powf(-mean_depth / average_path_length(self.subsample)))
    }

    /// Score shifted so that the contamination quantile sits at zero
    pub fn decision_function(&self, value: f64) -> f64 {
        self.score_sample(value) - self.offset
    }

    /// Binary label: -1 for anomalous, +1 for normal
    pub fn predict(&self, value: f64) -> i8 {
        if self.decision_function(value) < 0.0 {
            -1
        } else {
            1
        }
    }
}

fn build_tree(values: Vec<f64>, depth: usize, depth_limit: usize, rng: &mut StdRng) -> Node {
    let size = values.len();
    if size <= 1 || depth >= depth_limit {
        return Node::Leaf { size };
    }

    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if max <= min {
        return Node::Leaf { size };
    }

    let split = rng.gen_range(min..max);
    let (left, right): (Vec<f64>, Vec<f64>) = values.into_iter().partition(|v| *v < split);

    Node::Split {
        value: split,
        left: Box::new(build_tree(left, depth + 1, depth_limit, rng)),
        right: Box::new(build_tree(right, depth + 1, depth_limit, rng)),
    }
}

fn path_length(node: &Node, value: f64, depth: usize) -> f64 {
    match node {
        Node::Leaf { size } => depth as f64 + average_path_length(*size),
        Node::Split { value: split, left, right } => {
            if value < *split {
                path_length(left, value, depth + 1)
            } else {
                path_length(right, value, depth + 1)
            }
        }
    }
}

/// Average path length of an unsuccessful BST search in a tree of `n`
/// points, the standard isolation-forest normalizer
fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            let harmonic = digamma(n) + EULER_MASCHERONI;
            2.0 * harmonic - 2.0 * (n - 1.0) / n
        }
    }
}

/// Linearly interpolated quantile, matching the percentile convention the
/// offset calculation relies on
fn quantile(values: &[f64], q: f64) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    if lower == upper {
        sorted[lower]
    } else {
        let frac = position - lower as f64;
        sorted[lower] * (1.0 - frac) + sorted[upper] * frac
    }
}
