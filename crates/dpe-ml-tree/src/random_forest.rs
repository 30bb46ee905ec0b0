use dpe_ml_core::{check_fit_input, FeatureMatrix, Float, MatrixError, MatrixResult, Regressor};
use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::decision_tree::{squared_error_stats, GrowInput, GrowthParams, RegressionTree};

/// Random Forest Regressor: bagged CART trees averaged together.
///
/// Trees are grown in parallel; tree `t` draws from its own RNG seeded with
/// `seed + t`, so fits are reproducible regardless of thread scheduling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "T: Float")]
pub struct RandomForestRegressor<T: Float> {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Share of features each tree may split on (at least one).
    pub max_features_ratio: f64,
    pub bootstrap: bool,
    pub seed: Option<u64>,
    trees: Vec<RegressionTree<T>>,
}

impl<T: Float> RandomForestRegressor<T> {
    pub fn new(n_estimators: usize, max_depth: usize, max_features_ratio: f64) -> Self {
        RandomForestRegressor {
            n_estimators,
            max_depth,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features_ratio,
            bootstrap: true,
            seed: Some(42),
            trees: Vec::new(),
        }
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Unfitted copy with the same hyperparameters.
    pub fn unfitted(&self) -> Self {
        RandomForestRegressor {
            n_estimators: self.n_estimators,
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            min_samples_leaf: self.min_samples_leaf,
            max_features_ratio: self.max_features_ratio,
            bootstrap: self.bootstrap,
            seed: self.seed,
            trees: Vec::new(),
        }
    }

    fn validate(&self) -> MatrixResult<()> {
        if self.n_estimators == 0 {
            return Err(MatrixError::invalid_parameter("n_estimators", "must be at least 1"));
        }
        if self.max_depth == 0 {
            return Err(MatrixError::invalid_parameter("max_depth", "must be at least 1"));
        }
        if !(self.max_features_ratio > 0.0 && self.max_features_ratio <= 1.0) {
            return Err(MatrixError::invalid_parameter("max_features_ratio", "must be in (0, 1]"));
        }
        Ok(())
    }
}

impl<T: Float> Regressor<T> for RandomForestRegressor<T> {
    fn fit(&mut self, x: &FeatureMatrix<T>, y: &[T]) -> MatrixResult<()> {
        check_fit_input(x, y)?;
        self.validate()?;

        let n = x.n_rows();
        let p = x.n_cols();
        let max_features = ((p as f64 * self.max_features_ratio).ceil() as usize).clamp(1, p);
        let base_seed = self.seed.unwrap_or_else(rand::random);

        let (grad, hess) = squared_error_stats(y);
        let params = GrowthParams {
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            min_samples_leaf: self.min_samples_leaf,
            ..GrowthParams::default()
        };
        let bootstrap = self.bootstrap;

        self.trees = (0..self.n_estimators)
            .into_par_iter()
            .map(|t| {
                let mut rng = StdRng::seed_from_u64(base_seed.wrapping_add(t as u64));
                let rows: Vec<usize> = if bootstrap {
                    (0..n).map(|_| rng.gen_range(0..n)).collect()
                } else {
                    (0..n).collect()
                };
                let mut features = if max_features < p {
                    index::sample(&mut rng, p, max_features).into_vec()
                } else {
                    (0..p).collect()
                };
                features.sort_unstable();

                let input = GrowInput { x, grad: &grad, hess: &hess, features: &features, params: &params };
                RegressionTree::grow(&input, rows)
            })
            .collect();
        Ok(())
    }

    fn predict(&self, x: &FeatureMatrix<T>) -> MatrixResult<Vec<T>> {
        let first = self.trees.first().ok_or(MatrixError::NotFitted("RandomForestRegressor"))?;
        first.check_input(x)?;

        let k = T::from_usize(self.trees.len());
        Ok(x
            .rows()
            .map(|row| {
                let sum: T = self.trees.iter().map(|tree| tree.predict_row(row)).sum();
                sum / k
            })
            .collect())
    }
}
