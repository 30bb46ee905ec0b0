use std::cmp::Ordering;

use dpe_ml_core::{check_fit_input, FeatureMatrix, Float, MatrixError, MatrixResult, Regressor};
use serde::{Deserialize, Serialize};

/// A node in a regression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "T: Float")]
enum TreeNode<T: Float> {
    /// Internal node: rows with `x[feature_idx] <= threshold` go left.
    Split {
        feature_idx: usize,
        threshold: T,
        left: Box<TreeNode<T>>,
        right: Box<TreeNode<T>>,
    },
    /// Leaf: predicted value (or additive weight, for boosted trees).
    Leaf { value: T },
}

/// Growth limits and regularisation shared by every tree learner.
///
/// Trees are grown from per-row gradients and hessians. With `g = -y`,
/// `h = 1` and no regularisation the split gain is the CART variance
/// reduction and the leaf value is the mean target, so the same grower
/// serves plain regression trees, forests and boosting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GrowthParams {
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Minimum hessian sum required in each child.
    pub min_child_weight: f64,
    /// L2 penalty on leaf weights.
    pub reg_lambda: f64,
    /// L1 penalty on leaf weights.
    pub reg_alpha: f64,
}

impl Default for GrowthParams {
    fn default() -> Self {
        GrowthParams {
            max_depth: 6,
            min_samples_split: 2,
            min_samples_leaf: 1,
            min_child_weight: 0.0,
            reg_lambda: 0.0,
            reg_alpha: 0.0,
        }
    }
}

impl GrowthParams {
    fn soft_threshold(&self, g: f64) -> f64 {
        if g > self.reg_alpha {
            g - self.reg_alpha
        } else if g < -self.reg_alpha {
            g + self.reg_alpha
        } else {
            0.0
        }
    }

    fn score(&self, g: f64, h: f64) -> f64 {
        let denom = h + self.reg_lambda;
        if denom <= 0.0 {
            return 0.0;
        }
        let t = self.soft_threshold(g);
        t * t / denom
    }

    fn leaf_weight(&self, g: f64, h: f64) -> f64 {
        let denom = h + self.reg_lambda;
        if denom <= 0.0 {
            return 0.0;
        }
        -self.soft_threshold(g) / denom
    }
}

/// Gradient statistics a tree is grown from.
pub(crate) struct GrowInput<'a, T: Float> {
    pub x: &'a FeatureMatrix<T>,
    pub grad: &'a [f64],
    pub hess: &'a [f64],
    /// Candidate features (column positions in `x`).
    pub features: &'a [usize],
    pub params: &'a GrowthParams,
}

struct BestSplit<T> {
    gain: f64,
    feature: usize,
    threshold: T,
}

/// A fitted tree plus the column count it expects at prediction time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "T: Float")]
pub struct RegressionTree<T: Float> {
    root: TreeNode<T>,
    n_features: usize,
}

impl<T: Float> RegressionTree<T> {
    /// Grow a tree on the given rows (duplicates allowed, e.g. bootstrap draws).
    pub(crate) fn grow(input: &GrowInput<'_, T>, rows: Vec<usize>) -> Self {
        RegressionTree {
            root: build(input, rows, 0),
            n_features: input.x.n_cols(),
        }
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Number of leaves.
    pub fn n_leaves(&self) -> usize {
        fn count<T: Float>(node: &TreeNode<T>) -> usize {
            match node {
                TreeNode::Leaf { .. } => 1,
                TreeNode::Split { left, right, .. } => count(left) + count(right),
            }
        }
        count(&self.root)
    }

    /// Depth of the deepest leaf (a single leaf has depth 0).
    pub fn depth(&self) -> usize {
        fn depth<T: Float>(node: &TreeNode<T>) -> usize {
            match node {
                TreeNode::Leaf { .. } => 0,
                TreeNode::Split { left, right, .. } => 1 + depth(left).max(depth(right)),
            }
        }
        depth(&self.root)
    }

    pub fn predict_row(&self, row: &[T]) -> T {
        let mut node = &self.root;
        loop {
            match node {
                TreeNode::Leaf { value } => return *value,
                TreeNode::Split { feature_idx, threshold, left, right } => {
                    node = if row[*feature_idx] <= *threshold { left } else { right };
                }
            }
        }
    }

    pub fn check_input(&self, x: &FeatureMatrix<T>) -> MatrixResult<()> {
        if x.n_cols() != self.n_features {
            return Err(MatrixError::ShapeMismatch {
                expected: vec![self.n_features],
                got: vec![x.n_cols()],
            });
        }
        Ok(())
    }
}

fn build<T: Float>(input: &GrowInput<'_, T>, rows: Vec<usize>, depth: usize) -> TreeNode<T> {
    let params = input.params;
    let g_sum: f64 = rows.iter().map(|&i| input.grad[i]).sum();
    let h_sum: f64 = rows.iter().map(|&i| input.hess[i]).sum();
    let leaf = TreeNode::Leaf {
        value: T::from_f64(params.leaf_weight(g_sum, h_sum)),
    };

    if depth >= params.max_depth || rows.len() < params.min_samples_split.max(2) {
        return leaf;
    }

    let best = match find_best_split(input, &rows, g_sum, h_sum) {
        Some(b) if b.gain > 0.0 => b,
        _ => return leaf,
    };

    let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
        .into_iter()
        .partition(|&i| input.x.row(i)[best.feature] <= best.threshold);
    if left_rows.is_empty() || right_rows.is_empty() {
        return leaf;
    }

    TreeNode::Split {
        feature_idx: best.feature,
        threshold: best.threshold,
        left: Box::new(build(input, left_rows, depth + 1)),
        right: Box::new(build(input, right_rows, depth + 1)),
    }
}

/// Exact greedy split search: sort the node's rows on each candidate
/// feature and scan prefix sums of gradients and hessians.
fn find_best_split<T: Float>(
    input: &GrowInput<'_, T>,
    rows: &[usize],
    g_sum: f64,
    h_sum: f64,
) -> Option<BestSplit<T>> {
    let params = input.params;
    let parent = params.score(g_sum, h_sum);
    let min_leaf = params.min_samples_leaf.max(1);
    let mut best: Option<BestSplit<T>> = None;

    let mut order: Vec<(T, usize)> = Vec::with_capacity(rows.len());
    for &f in input.features {
        order.clear();
        order.extend(rows.iter().map(|&i| (input.x.row(i)[f], i)));
        order.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));

        let mut gl = 0.0;
        let mut hl = 0.0;
        for k in 0..order.len() - 1 {
            let i = order[k].1;
            gl += input.grad[i];
            hl += input.hess[i];

            let (lo, hi) = (order[k].0, order[k + 1].0);
            if !(lo < hi) {
                continue;
            }
            let n_left = k + 1;
            if n_left < min_leaf || order.len() - n_left < min_leaf {
                continue;
            }
            let (gr, hr) = (g_sum - gl, h_sum - hl);
            if hl < params.min_child_weight || hr < params.min_child_weight {
                continue;
            }

            let gain = 0.5 * (params.score(gl, hl) + params.score(gr, hr) - parent);
            if best.as_ref().map_or(true, |b| gain > b.gain) {
                let mid = (lo + hi) / T::TWO;
                let threshold = if mid < hi { mid } else { lo };
                best = Some(BestSplit { gain, feature: f, threshold });
            }
        }
    }
    best
}

/// Decision Tree Regressor using CART (squared error criterion).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "T: Float")]
pub struct DecisionTreeRegressor<T: Float> {
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    tree: Option<RegressionTree<T>>,
}

impl<T: Float> DecisionTreeRegressor<T> {
    pub fn new(max_depth: usize, min_samples_split: usize, min_samples_leaf: usize) -> Self {
        DecisionTreeRegressor {
            max_depth,
            min_samples_split,
            min_samples_leaf,
            tree: None,
        }
    }

    pub(crate) fn growth_params(&self) -> GrowthParams {
        GrowthParams {
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            min_samples_leaf: self.min_samples_leaf,
            ..GrowthParams::default()
        }
    }

    pub fn tree(&self) -> Option<&RegressionTree<T>> {
        self.tree.as_ref()
    }
}

/// Negated targets and unit hessians, so leaves predict the mean target.
pub(crate) fn squared_error_stats<T: Float>(y: &[T]) -> (Vec<f64>, Vec<f64>) {
    (y.iter().map(|v| -v.to_f64()).collect(), vec![1.0; y.len()])
}

impl<T: Float> Regressor<T> for DecisionTreeRegressor<T> {
    fn fit(&mut self, x: &FeatureMatrix<T>, y: &[T]) -> MatrixResult<()> {
        check_fit_input(x, y)?;
        if self.max_depth == 0 {
            return Err(MatrixError::invalid_parameter("max_depth", "must be at least 1"));
        }
        let (grad, hess) = squared_error_stats(y);
        let params = self.growth_params();
        let features: Vec<usize> = (0..x.n_cols()).collect();
        let input = GrowInput { x, grad: &grad, hess: &hess, features: &features, params: &params };
        self.tree = Some(RegressionTree::grow(&input, (0..x.n_rows()).collect()));
        Ok(())
    }

    fn predict(&self, x: &FeatureMatrix<T>) -> MatrixResult<Vec<T>> {
        let tree = self.tree.as_ref().ok_or(MatrixError::NotFitted("DecisionTreeRegressor"))?;
        tree.check_input(x)?;
        Ok(x.rows().map(|r| tree.predict_row(r)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_decision_tree_regressor() {
        let x: FeatureMatrix<f64> =
            FeatureMatrix::from_rows(&[vec![1.0], vec![2.0], vec![3.0], vec![4.0]]).unwrap();
        let y = [2.0, 4.0, 6.0, 8.0];

        let mut tree = DecisionTreeRegressor::new(10, 2, 1);
        tree.fit(&x, &y).unwrap();
        let pred = tree.predict(&x).unwrap();

        for i in 0..4 {
            assert_abs_diff_eq!(pred[i], y[i], epsilon = 1e-12);
        }
    }

    #[test]
    fn test_depth_limit_and_mean_leaf() {
        let x: FeatureMatrix<f64> =
            FeatureMatrix::from_rows(&[vec![0.0], vec![1.0], vec![10.0], vec![11.0]]).unwrap();
        let y = [1.0, 3.0, 10.0, 14.0];

        let mut stump = DecisionTreeRegressor::new(1, 2, 1);
        stump.fit(&x, &y).unwrap();
        let tree = stump.tree().unwrap();
        assert_eq!(tree.depth(), 1);
        assert_eq!(tree.n_leaves(), 2);

        let pred = stump.predict(&x).unwrap();
        assert_abs_diff_eq!(pred[0], 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(pred[3], 12.0, epsilon = 1e-12);
    }

    #[test]
    fn test_constant_target_is_single_leaf() {
        let x: FeatureMatrix<f64> =
            FeatureMatrix::from_rows(&[vec![0.0], vec![1.0], vec![2.0]]).unwrap();
        let mut tree = DecisionTreeRegressor::new(5, 2, 1);
        tree.fit(&x, &[7.0, 7.0, 7.0]).unwrap();
        assert_eq!(tree.tree().unwrap().n_leaves(), 1);
    }

    #[test]
    fn test_regularised_leaf_weight() {
        let params = GrowthParams { reg_lambda: 1.0, reg_alpha: 0.5, ..GrowthParams::default() };
        // G = -4, H = 3: soft threshold -> -3.5, weight = 3.5 / 4
        assert_abs_diff_eq!(params.leaf_weight(-4.0, 3.0), 0.875, epsilon = 1e-12);
        assert_eq!(params.leaf_weight(0.3, 3.0), 0.0);
    }

    #[test]
    fn test_predict_errors() {
        let x: FeatureMatrix<f64> = FeatureMatrix::from_rows(&[vec![1.0, 2.0]]).unwrap();
        let tree: DecisionTreeRegressor<f64> = DecisionTreeRegressor::new(3, 2, 1);
        assert_eq!(tree.predict(&x), Err(MatrixError::NotFitted("DecisionTreeRegressor")));

        let mut fitted = DecisionTreeRegressor::new(3, 2, 1);
        fitted.fit(&x, &[1.0]).unwrap();
        let wide: FeatureMatrix<f64> = FeatureMatrix::from_rows(&[vec![1.0, 2.0, 3.0]]).unwrap();
        assert!(matches!(fitted.predict(&wide), Err(MatrixError::ShapeMismatch { .. })));
    }
}
