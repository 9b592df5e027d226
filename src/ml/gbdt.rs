//! Multiclass gradient-boosted regression trees.
//!
//! Softmax (multinomial deviance) boosting: each stage fits one regression
//! tree per class to the negative gradient, with Newton-step leaf values.
//! Fitting is fully deterministic for a given input order.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Hyperparameters of the ensemble.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoostingParams {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub learning_rate: f64,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
}

impl Default for BoostingParams {
    fn default() -> Self {
        Self {
            n_estimators: 200,
            max_depth: 5,
            learning_rate: 0.1,
            min_samples_split: 2,
            min_samples_leaf: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

/// A CART regression tree (squared-error splits).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<Node>,
}

struct TreeContext<'a> {
    x: &'a [Vec<f64>],
    targets: &'a [f64],
    params: &'a BoostingParams,
    leaf_value: &'a dyn Fn(&[usize]) -> f64,
}

struct Split {
    feature: usize,
    threshold: f64,
    gain: f64,
}

impl RegressionTree {
    fn fit(ctx: &TreeContext<'_>) -> Self {
        let mut tree = Self { nodes: Vec::new() };
        let all: Vec<usize> = (0..ctx.x.len()).collect();
        tree.grow(ctx, all, 0);
        tree
    }

    fn grow(&mut self, ctx: &TreeContext<'_>, indices: Vec<usize>, depth: usize) -> usize {
        let id = self.nodes.len();
        self.nodes.push(Node::Leaf { value: 0.0 });

        if depth < ctx.params.max_depth && indices.len() >= ctx.params.min_samples_split {
            if let Some(split) = best_split(ctx, &indices) {
                let (left, right): (Vec<usize>, Vec<usize>) = indices
                    .iter()
                    .partition(|&&i| ctx.x[i][split.feature] <= split.threshold);
                let left = self.grow(ctx, left, depth + 1);
                let right = self.grow(ctx, right, depth + 1);
                self.nodes[id] = Node::Split {
                    feature: split.feature,
                    threshold: split.threshold,
                    left,
                    right,
                };
                return id;
            }
        }

        self.nodes[id] = Node::Leaf {
            value: (ctx.leaf_value)(&indices),
        };
        id
    }

    /// Predict the value for one row. The row must be as wide as the
    /// training rows.
    pub(crate) fn predict(&self, row: &[f64]) -> f64 {
        let mut id = 0;
        loop {
            match &self.nodes[id] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    id = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

/// Best squared-error split of `indices`, if any improves on the parent.
fn best_split(ctx: &TreeContext<'_>, indices: &[usize]) -> Option<Split> {
    let n = indices.len();
    let min_leaf = ctx.params.min_samples_leaf.max(1);
    let total: f64 = indices.iter().map(|&i| ctx.targets[i]).sum();
    let parent_score = total * total / n as f64;
    let n_features = ctx.x.first().map_or(0, Vec::len);

    let mut best: Option<Split> = None;
    let mut order: Vec<(f64, f64)> = Vec::with_capacity(n);

    for feature in 0..n_features {
        order.clear();
        order.extend(indices.iter().map(|&i| (ctx.x[i][feature], ctx.targets[i])));
        order.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut left_sum = 0.0;
        for pos in 1..n {
            left_sum += order[pos - 1].1;
            let (lo, hi) = (order[pos - 1].0, order[pos].0);
            if lo >= hi || pos < min_leaf || n - pos < min_leaf {
                continue;
            }
            let right_sum = total - left_sum;
            let score =
                left_sum * left_sum / pos as f64 + right_sum * right_sum / (n - pos) as f64;
            let gain = score - parent_score;
            if gain > 1e-12 && best.as_ref().map_or(true, |b| gain > b.gain) {
                let mid = lo + (hi - lo) / 2.0;
                let threshold = if mid < hi { mid } else { lo };
                best = Some(Split {
                    feature,
                    threshold,
                    gain,
                });
            }
        }
    }

    best
}

/// A fitted gradient-boosted ensemble.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoostedTrees {
    params: BoostingParams,
    n_features: usize,
    /// Initial raw score per class (log prior)
    init: Vec<f64>,
    /// `stages[m][k]` is the tree for class `k` at stage `m`
    stages: Vec<Vec<RegressionTree>>,
}

impl GradientBoostedTrees {
    /// Fit an ensemble on rows `x` with class indices `y` in `0..n_classes`.
    ///
    /// Fails when there are no rows, the rows are ragged, or fewer than two
    /// distinct classes occur in `y`.
    pub fn fit(
        x: &[Vec<f64>],
        y: &[usize],
        n_classes: usize,
        params: &BoostingParams,
    ) -> Result<Self> {
        if x.is_empty() {
            return Err(Error::Training("no training rows".to_string()));
        }
        if x.len() != y.len() {
            return Err(Error::Training(format!(
                "{} rows but {} labels",
                x.len(),
                y.len()
            )));
        }
        let n_features = x[0].len();
        if x.iter().any(|row| row.len() != n_features) {
            return Err(Error::Training("ragged feature rows".to_string()));
        }
        if let Some(bad) = y.iter().find(|&&c| c >= n_classes) {
            return Err(Error::Training(format!("class index {} out of range", bad)));
        }

        let mut counts = vec![0usize; n_classes];
        for &c in y {
            counts[c] += 1;
        }
        if counts.iter().filter(|&&c| c > 0).count() < 2 {
            return Err(Error::Training(
                "training data contains a single class".to_string(),
            ));
        }

        let n = x.len();
        let init: Vec<f64> = counts
            .iter()
            .map(|&c| (c as f64 / n as f64).max(1e-12).ln())
            .collect();
        let mut scores = vec![init.clone(); n];
        let mut stages = Vec::with_capacity(params.n_estimators);
        let k = n_classes as f64;

        for stage_index in 0..params.n_estimators {
            let probs: Vec<Vec<f64>> = scores.iter().map(|s| softmax(s)).collect();
            let mut stage = Vec::with_capacity(n_classes);

            for class in 0..n_classes {
                let residuals: Vec<f64> = (0..n)
                    .map(|i| f64::from(u8::from(y[i] == class)) - probs[i][class])
                    .collect();
                let leaf_value = |idx: &[usize]| {
                    let num: f64 = idx.iter().map(|&i| residuals[i]).sum();
                    let den: f64 = idx
                        .iter()
                        .map(|&i| residuals[i].abs() * (1.0 - residuals[i].abs()))
                        .sum();
                    if den.abs() < 1e-150 {
                        0.0
                    } else {
                        (k - 1.0) / k * num / den
                    }
                };
                let ctx = TreeContext {
                    x,
                    targets: &residuals,
                    params,
                    leaf_value: &leaf_value,
                };
                stage.push(RegressionTree::fit(&ctx));
            }

            for (class, tree) in stage.iter().enumerate() {
                for (row, score) in x.iter().zip(scores.iter_mut()) {
                    score[class] += params.learning_rate * tree.predict(row);
                }
            }
            stages.push(stage);

            if (stage_index + 1) % 50 == 0 {
                log::debug!("boosting stage {}/{}", stage_index + 1, params.n_estimators);
            }
        }

        Ok(Self {
            params: params.clone(),
            n_features,
            init,
            stages,
        })
    }

    /// Hyperparameters the ensemble was fitted with.
    pub fn params(&self) -> &BoostingParams {
        &self.params
    }

    /// Number of input features.
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Number of classes.
    pub fn n_classes(&self) -> usize {
        self.init.len()
    }

    fn check_width(&self, row: &[f64]) -> Result<()> {
        if row.len() != self.n_features {
            return Err(Error::Schema(format!(
                "expected {} features, got {}",
                self.n_features,
                row.len()
            )));
        }
        Ok(())
    }

    fn scores(&self, row: &[f64]) -> Vec<f64> {
        let mut scores = self.init.clone();
        for stage in &self.stages {
            for (score, tree) in scores.iter_mut().zip(stage) {
                *score += self.params.learning_rate * tree.predict(row);
            }
        }
        scores
    }

    /// Raw per-class scores for one row.
    pub fn decision_function(&self, row: &[f64]) -> Result<Vec<f64>> {
        self.check_width(row)?;
        Ok(self.scores(row))
    }

    /// Class probabilities for one row.
    pub fn predict_proba(&self, row: &[f64]) -> Result<Vec<f64>> {
        self.decision_function(row).map(|scores| softmax(&scores))
    }

    /// Most probable class index for each row.
    pub fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<usize>> {
        rows.iter()
            .map(|row| self.decision_function(row).map(|scores| argmax(&scores)))
            .collect()
    }
}

fn softmax(scores: &[f64]) -> Vec<f64> {
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = scores.iter().map(|s| (s - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Index of the largest value; the first one wins ties.
fn argmax(values: &[f64]) -> usize {
    values
        .iter()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |(bi, bv), (i, &v)| {
            if v > bv {
                (i, v)
            } else {
                (bi, bv)
            }
        })
        .0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_params() -> BoostingParams {
        BoostingParams {
            n_estimators: 20,
            ..BoostingParams::default()
        }
    }

    /// Three classes separated by the first feature.
    fn banded_data() -> (Vec<Vec<f64>>, Vec<usize>) {
        let mut x = Vec::new();
        let mut y = Vec::new();
        for i in 0..30 {
            let v = i as f64;
            x.push(vec![v, (i % 3) as f64]);
            y.push(if v < 10.0 {
                0
            } else if v < 20.0 {
                1
            } else {
                2
            });
        }
        (x, y)
    }

    #[test]
    fn test_fit_separable_classes() {
        let (x, y) = banded_data();
        let model = GradientBoostedTrees::fit(&x, &y, 3, &small_params()).unwrap();

        assert_eq!(model.n_classes(), 3);
        assert_eq!(model.n_features(), 2);
        assert_eq!(model.predict(&x).unwrap(), y);
        assert_eq!(model.predict(&[vec![25.5, 0.0]]).unwrap(), vec![2]);

        let proba = model.predict_proba(&[3.0, 1.0]).unwrap();
        assert!((proba.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(proba[0] > 0.5);
    }

    #[test]
    fn test_fit_is_deterministic() {
        let (x, y) = banded_data();
        let a = GradientBoostedTrees::fit(&x, &y, 3, &small_params()).unwrap();
        let b = GradientBoostedTrees::fit(&x, &y, 3, &small_params()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_fit_rejects_degenerate_input() {
        let params = small_params();
        assert!(matches!(
            GradientBoostedTrees::fit(&[], &[], 2, &params),
            Err(Error::Training(_))
        ));
        let x = vec![vec![1.0], vec![2.0]];
        assert!(matches!(
            GradientBoostedTrees::fit(&x, &[0, 0], 2, &params),
            Err(Error::Training(_))
        ));
        assert!(matches!(
            GradientBoostedTrees::fit(&[vec![1.0], vec![2.0, 3.0]], &[0, 1], 2, &params),
            Err(Error::Training(_))
        ));
    }

    #[test]
    fn test_predict_checks_width() {
        let (x, y) = banded_data();
        let model = GradientBoostedTrees::fit(&x, &y, 3, &small_params()).unwrap();
        assert!(matches!(
            model.predict(&[vec![1.0]]),
            Err(Error::Schema(_))
        ));
        assert!(matches!(model.decision_function(&[1.0]), Err(Error::Schema(_))));
        assert!(matches!(model.predict_proba(&[]), Err(Error::Schema(_))));
        assert!(matches!(
            model.predict_proba(&[1.0, 2.0, 3.0]),
            Err(Error::Schema(_))
        ));
    }

    #[test]
    fn test_tree_depth_limit() {
        let (x, y) = banded_data();
        let params = BoostingParams {
            n_estimators: 1,
            max_depth: 1,
            ..BoostingParams::default()
        };
        let model = GradientBoostedTrees::fit(&x, &y, 3, &params).unwrap();
        assert!(model.stages[0].iter().all(|t| t.node_count() <= 3));
    }

    #[test]
    fn test_model_serde_roundtrip() {
        let (x, y) = banded_data();
        let model = GradientBoostedTrees::fit(&x, &y, 3, &small_params()).unwrap();
        let json = serde_json::to_string(&model).unwrap();
        let restored: GradientBoostedTrees = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.predict(&x).unwrap(), y);
    }
}
