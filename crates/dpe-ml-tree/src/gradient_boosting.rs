use dpe_ml_core::{check_fit_input, FeatureMatrix, Float, MatrixError, MatrixResult, Regressor};
use rand::rngs::StdRng;
use rand::seq::index;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::decision_tree::{GrowInput, GrowthParams, RegressionTree};

/// Hyperparameters of the boosted regressor. Defaults follow the usual
/// XGBoost regressor defaults.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoostingParams {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub learning_rate: f64,
    /// Share of rows sampled (without replacement) for each tree.
    pub subsample: f64,
    /// Share of columns sampled for each tree.
    pub colsample_bytree: f64,
    pub reg_lambda: f64,
    pub reg_alpha: f64,
    pub min_child_weight: f64,
    pub seed: u64,
}

impl Default for BoostingParams {
    fn default() -> Self {
        BoostingParams {
            n_estimators: 100,
            max_depth: 6,
            learning_rate: 0.3,
            subsample: 1.0,
            colsample_bytree: 1.0,
            reg_lambda: 1.0,
            reg_alpha: 0.0,
            min_child_weight: 1.0,
            seed: 42,
        }
    }
}

impl BoostingParams {
    pub fn new(n_estimators: usize, learning_rate: f64) -> Self {
        BoostingParams {
            n_estimators,
            learning_rate,
            ..BoostingParams::default()
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Reject configurations the booster cannot train with.
    pub fn validate(&self) -> MatrixResult<()> {
        fn unit_interval(name: &str, v: f64) -> MatrixResult<()> {
            if v.is_finite() && v > 0.0 && v <= 1.0 {
                Ok(())
            } else {
                Err(MatrixError::invalid_parameter(name, format!("{} is not in (0, 1]", v)))
            }
        }
        fn non_negative(name: &str, v: f64) -> MatrixResult<()> {
            if v.is_finite() && v >= 0.0 {
                Ok(())
            } else {
                Err(MatrixError::invalid_parameter(name, format!("{} is not a finite value >= 0", v)))
            }
        }

        if self.n_estimators == 0 {
            return Err(MatrixError::invalid_parameter("n_estimators", "must be at least 1"));
        }
        if self.max_depth == 0 {
            return Err(MatrixError::invalid_parameter("max_depth", "must be at least 1"));
        }
        unit_interval("learning_rate", self.learning_rate)?;
        unit_interval("subsample", self.subsample)?;
        unit_interval("colsample_bytree", self.colsample_bytree)?;
        non_negative("reg_lambda", self.reg_lambda)?;
        non_negative("reg_alpha", self.reg_alpha)?;
        non_negative("min_child_weight", self.min_child_weight)
    }

    fn growth(&self) -> GrowthParams {
        GrowthParams {
            max_depth: self.max_depth,
            min_samples_split: 2,
            min_samples_leaf: 1,
            min_child_weight: self.min_child_weight,
            reg_lambda: self.reg_lambda,
            reg_alpha: self.reg_alpha,
        }
    }
}

/// Gradient Boosted Trees for Regression (squared error).
///
/// Starts from the mean target and adds, each round, a tree fit to the
/// gradient `ŷ - y` with unit hessians. Leaf weights are
/// `-T_α(G) / (H + λ)`, shrunk by the learning rate. Rows and columns are
/// subsampled per tree from a seeded RNG.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "T: Float")]
pub struct GradientBoostingRegressor<T: Float> {
    pub params: BoostingParams,
    trees: Vec<RegressionTree<T>>,
    base_score: T,
}

impl<T: Float> GradientBoostingRegressor<T> {
    pub fn new(params: BoostingParams) -> Self {
        GradientBoostingRegressor {
            params,
            trees: Vec::new(),
            base_score: T::ZERO,
        }
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn base_score(&self) -> T {
        self.base_score
    }

    /// Unfitted copy with the same hyperparameters.
    pub fn unfitted(&self) -> Self {
        Self::new(self.params)
    }
}

impl<T: Float> Regressor<T> for GradientBoostingRegressor<T> {
    fn fit(&mut self, x: &FeatureMatrix<T>, y: &[T]) -> MatrixResult<()> {
        check_fit_input(x, y)?;
        self.params.validate()?;

        let n = x.n_rows();
        let p = x.n_cols();
        let params = self.params;
        let growth = params.growth();
        let n_rows = ((n as f64 * params.subsample).round() as usize).clamp(1, n);
        let n_cols = ((p as f64 * params.colsample_bytree).round() as usize).clamp(1, p);

        let targets: Vec<f64> = y.iter().map(|v| v.to_f64()).collect();
        let base = targets.iter().sum::<f64>() / n as f64;
        if !base.is_finite() {
            return Err(MatrixError::InvalidOperation("target contains non-finite values".into()));
        }

        let mut rng = StdRng::seed_from_u64(params.seed);
        let mut predictions = vec![base; n];
        let hess = vec![1.0; n];
        let mut trees = Vec::with_capacity(params.n_estimators);

        for _ in 0..params.n_estimators {
            let grad: Vec<f64> = predictions.iter().zip(&targets).map(|(p, t)| p - t).collect();

            let rows = if n_rows < n {
                index::sample(&mut rng, n, n_rows).into_vec()
            } else {
                (0..n).collect()
            };
            let mut features = if n_cols < p {
                index::sample(&mut rng, p, n_cols).into_vec()
            } else {
                (0..p).collect()
            };
            features.sort_unstable();

            let input = GrowInput { x, grad: &grad, hess: &hess, features: &features, params: &growth };
            let tree = RegressionTree::grow(&input, rows);

            for (pred, row) in predictions.iter_mut().zip(x.rows()) {
                *pred += params.learning_rate * tree.predict_row(row).to_f64();
            }
            trees.push(tree);
        }

        self.base_score = T::from_f64(base);
        self.trees = trees;
        Ok(())
    }

    fn predict(&self, x: &FeatureMatrix<T>) -> MatrixResult<Vec<T>> {
        let first = self.trees.first().ok_or(MatrixError::NotFitted("GradientBoostingRegressor"))?;
        first.check_input(x)?;

        let eta = self.params.learning_rate;
        Ok(x
            .rows()
            .map(|row| {
                let boost: f64 = self.trees.iter().map(|t| t.predict_row(row).to_f64()).sum();
                T::from_f64(self.base_score.to_f64() + eta * boost)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear() -> (FeatureMatrix<f64>, Vec<f64>) {
        let rows: Vec<Vec<f64>> = (1..=10).map(|i| vec![i as f64]).collect();
        let y: Vec<f64> = (1..=10).map(|i| 2.0 * i as f64 + 1.0).collect();
        (FeatureMatrix::from_rows(&rows).unwrap(), y)
    }

    #[test]
    fn test_gradient_boosting_regressor() {
        let (x, y) = linear();
        let mut model = GradientBoostingRegressor::new(BoostingParams::new(50, 0.1).with_max_depth(3));
        model.fit(&x, &y).unwrap();
        assert_eq!(model.n_trees(), 50);

        let pred = model.predict(&x).unwrap();
        for i in 0..10 {
            assert!(
                (pred[i] - y[i]).abs() < 2.0,
                "prediction {} != expected {} at index {}",
                pred[i],
                y[i],
                i
            );
        }
    }

    #[test]
    fn test_boosting_reduces_training_error() {
        let (x, y) = linear();
        let mse = |pred: &[f64]| -> f64 {
            pred.iter().zip(&y).map(|(p, t)| (p - t) * (p - t)).sum::<f64>() / y.len() as f64
        };

        let mut short = GradientBoostingRegressor::new(BoostingParams::new(5, 0.1));
        let mut long = GradientBoostingRegressor::new(BoostingParams::new(80, 0.1));
        short.fit(&x, &y).unwrap();
        long.fit(&x, &y).unwrap();

        assert!(mse(&long.predict(&x).unwrap()) < mse(&short.predict(&x).unwrap()));
    }

    #[test]
    fn test_subsampling_is_seeded() {
        let (x, y) = linear();
        let params = BoostingParams {
            subsample: 0.7,
            colsample_bytree: 0.8,
            ..BoostingParams::new(20, 0.2)
        };
        let mut a = GradientBoostingRegressor::new(params);
        let mut b = a.unfitted();
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a.predict(&x).unwrap(), b.predict(&x).unwrap());
    }

    #[test]
    fn test_invalid_parameters_fail_fit() {
        let (x, y) = linear();
        for params in [
            BoostingParams::new(0, 0.1),
            BoostingParams::new(10, 0.0),
            BoostingParams { subsample: 1.5, ..BoostingParams::default() },
            BoostingParams { reg_alpha: -1.0, ..BoostingParams::default() },
            BoostingParams::default().with_max_depth(0),
        ] {
            let mut model: GradientBoostingRegressor<f64> = GradientBoostingRegressor::new(params);
            assert!(
                matches!(model.fit(&x, &y), Err(MatrixError::InvalidParameter { .. })),
                "{:?} should be rejected",
                params
            );
        }
    }
}
