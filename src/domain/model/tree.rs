//! Depth-limited CART classifier using Gini impurity.
//!
//! At each node a seeded random subset of features is searched; split
//! thresholds are midpoints between consecutive distinct values.

use super::{
    check_training_input, check_width, restore_state, snapshot_state, ModelSnapshot,
    TrainableModel,
};
use crate::domain::error::MltraderError;
use ndarray::{Array2, ArrayView1, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

pub const NAME: &str = "decision_tree";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeConfig {
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features searched per node; `None` means sqrt(n_features).
    pub max_features: Option<usize>,
    pub seed: u64,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: 6,
            min_samples_split: 10,
            min_samples_leaf: 5,
            max_features: None,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum Node {
    Leaf {
        /// Fraction of up labels among the node's training samples.
        up_fraction: f64,
        samples: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    fn up_fraction(&self, row: ArrayView1<f64>) -> f64 {
        match self {
            Node::Leaf { up_fraction, .. } => *up_fraction,
            Node::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                if row[*feature] <= *threshold {
                    left.up_fraction(row)
                } else {
                    right.up_fraction(row)
                }
            }
        }
    }

    fn depth(&self) -> usize {
        match self {
            Node::Leaf { .. } => 1,
            Node::Split { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct FittedTree {
    root: Node,
    n_features: usize,
    importances: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct DecisionTreeModel {
    config: TreeConfig,
    fitted: Option<FittedTree>,
}

struct Split {
    feature: usize,
    threshold: f64,
    gain: f64,
}

fn gini(ups: usize, n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let p = ups as f64 / n as f64;
    1.0 - p * p - (1.0 - p) * (1.0 - p)
}

struct Builder<'a> {
    x: &'a Array2<f64>,
    y: &'a [u8],
    config: &'a TreeConfig,
    max_features: usize,
    rng: StdRng,
    importances: Vec<f64>,
}

impl Builder<'_> {
    fn build(&mut self, indices: Vec<usize>, depth: usize) -> Node {
        let n = indices.len();
        let ups = indices.iter().filter(|&&i| self.y[i] == 1).count();
        let impurity = gini(ups, n);
        let leaf = Node::Leaf {
            up_fraction: if n == 0 { 0.5 } else { ups as f64 / n as f64 },
            samples: n,
        };

        if depth >= self.config.max_depth || n < self.config.min_samples_split || impurity < 1e-12 {
            return leaf;
        }

        let Some(split) = self.best_split(&indices, ups, impurity) else {
            return leaf;
        };
        self.importances[split.feature] += split.gain * n as f64;

        let (left, right): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| self.x[[i, split.feature]] <= split.threshold);

        Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left: Box::new(self.build(left, depth + 1)),
            right: Box::new(self.build(right, depth + 1)),
        }
    }

    /// Sorted sweep over each candidate feature; O(n log n) per feature.
    fn best_split(&mut self, indices: &[usize], ups: usize, impurity: f64) -> Option<Split> {
        let mut features: Vec<usize> = (0..self.x.ncols()).collect();
        features.shuffle(&mut self.rng);
        features.truncate(self.max_features);

        let n = indices.len();
        let min_leaf = self.config.min_samples_leaf.max(1);
        let mut best: Option<Split> = None;

        for feature in features {
            let mut sorted: Vec<(f64, u8)> = indices
                .iter()
                .map(|&i| (self.x[[i, feature]], self.y[i]))
                .collect();
            sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut left_ups = 0;
            for k in 1..n {
                left_ups += usize::from(sorted[k - 1].1);
                let (lo, hi) = (sorted[k - 1].0, sorted[k].0);
                if lo == hi || !lo.is_finite() || !hi.is_finite() {
                    continue;
                }
                if k < min_leaf || n - k < min_leaf {
                    continue;
                }
                let weighted = (k as f64 * gini(left_ups, k)
                    + (n - k) as f64 * gini(ups - left_ups, n - k))
                    / n as f64;
                let gain = impurity - weighted;
                if gain > best.as_ref().map_or(0.0, |b| b.gain) {
                    best = Some(Split {
                        feature,
                        threshold: (lo + hi) / 2.0,
                        gain,
                    });
                }
            }
        }
        best
    }
}

impl DecisionTreeModel {
    pub fn new(seed: u64) -> Self {
        Self::with_config(TreeConfig {
            seed,
            ..Default::default()
        })
    }

    pub fn with_config(config: TreeConfig) -> Self {
        Self {
            config,
            fitted: None,
        }
    }

    /// Normalized total impurity decrease per feature; empty until fitted.
    pub fn feature_importances(&self) -> &[f64] {
        self.fitted
            .as_ref()
            .map(|f| f.importances.as_slice())
            .unwrap_or(&[])
    }

    pub fn depth(&self) -> usize {
        self.fitted.as_ref().map_or(0, |f| f.root.depth())
    }

    fn fitted(&self, x: &Array2<f64>) -> Result<&FittedTree, MltraderError> {
        let fitted = self.fitted.as_ref().ok_or_else(|| MltraderError::InvalidState {
            model: NAME.to_string(),
        })?;
        check_width(NAME, x, fitted.n_features)?;
        Ok(fitted)
    }
}

impl TrainableModel for DecisionTreeModel {
    fn name(&self) -> &str {
        NAME
    }

    fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    fn fit(&mut self, x: &Array2<f64>, y: &[u8]) -> Result<(), MltraderError> {
        check_training_input(NAME, x, y)?;
        let n_features = x.ncols();
        let max_features = self
            .config
            .max_features
            .unwrap_or_else(|| (n_features as f64).sqrt().ceil() as usize)
            .clamp(1, n_features);

        let mut builder = Builder {
            x,
            y,
            config: &self.config,
            max_features,
            rng: StdRng::seed_from_u64(self.config.seed),
            importances: vec![0.0; n_features],
        };
        let root = builder.build((0..x.nrows()).collect(), 0);

        let mut importances = builder.importances;
        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            importances.iter_mut().for_each(|v| *v /= total);
        }

        self.fitted = Some(FittedTree {
            root,
            n_features,
            importances,
        });
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Vec<u8>, MltraderError> {
        let fitted = self.fitted(x)?;
        Ok(x.axis_iter(Axis(0))
            .map(|row| u8::from(fitted.root.up_fraction(row) > 0.5))
            .collect())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>, MltraderError> {
        let fitted = self.fitted(x)?;
        let mut out = Array2::zeros((x.nrows(), 2));
        for (i, row) in x.axis_iter(Axis(0)).enumerate() {
            let p = fitted.root.up_fraction(row);
            out[[i, 0]] = 1.0 - p;
            out[[i, 1]] = p;
        }
        Ok(out)
    }

    fn snapshot(&self) -> Result<ModelSnapshot, MltraderError> {
        let fitted = self.fitted.as_ref().ok_or_else(|| MltraderError::InvalidState {
            model: NAME.to_string(),
        })?;
        snapshot_state(NAME, None, fitted)
    }

    fn restore(&mut self, snapshot: ModelSnapshot) -> Result<(), MltraderError> {
        let (_, fitted): (_, FittedTree) = restore_state(NAME, snapshot)?;
        self.fitted = Some(fitted);
        Ok(())
    }
}
