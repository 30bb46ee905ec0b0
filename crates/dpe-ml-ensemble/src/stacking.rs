use dpe_ml_core::{check_fit_input, FeatureMatrix, Float, MatrixError, MatrixResult, Regressor};
use dpe_ml_model_selection::KFold;
use dpe_ml_tree::{BoostingParams, GradientBoostingRegressor, RandomForestRegressor};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Level-0 learner of a stacking ensemble.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", bound = "T: Float")]
pub enum BaseLearner<T: Float> {
    RandomForest(RandomForestRegressor<T>),
    GradientBoosting(GradientBoostingRegressor<T>),
}

impl<T: Float> BaseLearner<T> {
    pub fn name(&self) -> &'static str {
        match self {
            BaseLearner::RandomForest(_) => "random_forest",
            BaseLearner::GradientBoosting(_) => "gradient_boosting",
        }
    }

    pub fn unfitted(&self) -> Self {
        match self {
            BaseLearner::RandomForest(m) => BaseLearner::RandomForest(m.unfitted()),
            BaseLearner::GradientBoosting(m) => BaseLearner::GradientBoosting(m.unfitted()),
        }
    }
}

impl<T: Float> Regressor<T> for BaseLearner<T> {
    fn fit(&mut self, x: &FeatureMatrix<T>, y: &[T]) -> MatrixResult<()> {
        match self {
            BaseLearner::RandomForest(m) => m.fit(x, y),
            BaseLearner::GradientBoosting(m) => m.fit(x, y),
        }
    }

    fn predict(&self, x: &FeatureMatrix<T>) -> MatrixResult<Vec<T>> {
        match self {
            BaseLearner::RandomForest(m) => m.predict(x),
            BaseLearner::GradientBoosting(m) => m.predict(x),
        }
    }
}

/// Predict every training row with a model that never saw it.
///
/// For each fold a fresh model from `make` is fit on the other folds and
/// predicts the held-out rows.
pub fn out_of_fold_predictions<T, R, F>(
    make: F,
    x: &FeatureMatrix<T>,
    y: &[T],
    kfold: &KFold,
) -> MatrixResult<Vec<T>>
where
    T: Float,
    R: Regressor<T>,
    F: Fn() -> R,
{
    check_fit_input(x, y)?;
    let mut oof = vec![T::ZERO; x.n_rows()];
    for fold in kfold.split(x.n_rows())? {
        let x_train = x.select_rows(&fold.train)?;
        let y_train: Vec<T> = fold.train.iter().map(|&r| y[r]).collect();

        let mut model = make();
        model.fit(&x_train, &y_train)?;
        let pred = model.predict(&x.select_rows(&fold.test)?)?;
        for (&row, p) in fold.test.iter().zip(pred) {
            oof[row] = p;
        }
    }
    Ok(oof)
}

/// Two-level stacking regressor.
///
/// The meta-learner trains on out-of-fold predictions of the base learners.
/// Afterwards each base learner is refit on the full training data, and those
/// refits feed the meta-learner at prediction time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "T: Float")]
pub struct StackingRegressor<T: Float> {
    base: Vec<BaseLearner<T>>,
    meta: GradientBoostingRegressor<T>,
    pub n_folds: usize,
    fitted: bool,
}

impl<T: Float> StackingRegressor<T> {
    pub fn new(base: Vec<BaseLearner<T>>, meta: GradientBoostingRegressor<T>, n_folds: usize) -> Self {
        StackingRegressor {
            base,
            meta,
            n_folds,
            fitted: false,
        }
    }

    /// Random forest (50 trees, depth 10) and boosting (100 rounds, rate 0.1)
    /// under a boosting meta-learner (50 rounds, rate 0.1).
    pub fn energy_default(n_folds: usize) -> Self {
        let forest = RandomForestRegressor::new(50, 10, 1.0);
        let boosting = GradientBoostingRegressor::new(BoostingParams::new(100, 0.1));
        let meta = GradientBoostingRegressor::new(BoostingParams::new(50, 0.1));
        Self::new(
            vec![BaseLearner::RandomForest(forest), BaseLearner::GradientBoosting(boosting)],
            meta,
            n_folds,
        )
    }

    pub fn unfitted(&self) -> Self {
        Self::new(
            self.base.iter().map(BaseLearner::unfitted).collect(),
            self.meta.unfitted(),
            self.n_folds,
        )
    }

    pub fn base_learners(&self) -> &[BaseLearner<T>] {
        &self.base
    }

    pub fn meta_learner(&self) -> &GradientBoostingRegressor<T> {
        &self.meta
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted
    }

    fn meta_columns(&self) -> Vec<String> {
        self.base
            .iter()
            .enumerate()
            .map(|(i, b)| format!("{}_{}", b.name(), i))
            .collect()
    }
}

impl<T: Float> Regressor<T> for StackingRegressor<T> {
    fn fit(&mut self, x: &FeatureMatrix<T>, y: &[T]) -> MatrixResult<()> {
        check_fit_input(x, y)?;
        if self.base.is_empty() {
            return Err(MatrixError::invalid_parameter("base", "at least one base learner is required"));
        }
        let kfold = KFold::new(self.n_folds);
        info!(
            base_learners = self.base.len(),
            folds = self.n_folds,
            rows = x.n_rows(),
            "fitting stacking ensemble"
        );

        let fitted: Vec<(Vec<T>, BaseLearner<T>)> = self
            .base
            .par_iter()
            .map(|learner| -> MatrixResult<(Vec<T>, BaseLearner<T>)> {
                let oof = out_of_fold_predictions(|| learner.unfitted(), x, y, &kfold)?;
                let mut full = learner.unfitted();
                full.fit(x, y)?;
                debug!(learner = learner.name(), "base learner fitted");
                Ok((oof, full))
            })
            .collect::<MatrixResult<_>>()?;

        let (oof, refits): (Vec<Vec<T>>, Vec<BaseLearner<T>>) = fitted.into_iter().unzip();
        let meta_x = FeatureMatrix::from_columns(&oof, self.meta_columns())?;
        let mut meta = self.meta.unfitted();
        meta.fit(&meta_x, y)?;

        self.base = refits;
        self.meta = meta;
        self.fitted = true;
        Ok(())
    }

    fn predict(&self, x: &FeatureMatrix<T>) -> MatrixResult<Vec<T>> {
        if !self.fitted {
            return Err(MatrixError::NotFitted("StackingRegressor"));
        }
        let columns = self
            .base
            .par_iter()
            .map(|learner| learner.predict(x))
            .collect::<MatrixResult<Vec<_>>>()?;
        let meta_x = FeatureMatrix::from_columns(&columns, self.meta_columns())?;
        self.meta.predict(&meta_x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dpe_ml_metrics::r2_score;
    use dpe_ml_preprocessing::train_test_split;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::collections::HashMap;

    const UNSEEN: f64 = -1.0;

    /// Remembers training rows by their id column and returns `UNSEEN` for
    /// any row it was not fit on.
    #[derive(Default)]
    struct Memorizer {
        seen: HashMap<u64, f64>,
    }

    impl Regressor<f64> for Memorizer {
        fn fit(&mut self, x: &FeatureMatrix<f64>, y: &[f64]) -> MatrixResult<()> {
            self.seen = x.rows().zip(y).map(|(r, &t)| (r[0].to_bits(), t)).collect();
            Ok(())
        }

        fn predict(&self, x: &FeatureMatrix<f64>) -> MatrixResult<Vec<f64>> {
            Ok(x.rows().map(|r| *self.seen.get(&r[0].to_bits()).unwrap_or(&UNSEEN)).collect())
        }
    }

    fn linear_data(n: usize, seed: u64) -> (FeatureMatrix<f64>, Vec<f64>) {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut rows = Vec::with_capacity(n);
        let mut y = Vec::with_capacity(n);
        for _ in 0..n {
            let x1: f64 = rng.gen_range(-1.0..1.0);
            let x2: f64 = rng.gen_range(-1.0..1.0);
            let noise: f64 = rng.gen_range(-0.1..0.1);
            rows.push(vec![x1, x2]);
            y.push(3.0 * x1 - 2.0 * x2 + noise);
        }
        (FeatureMatrix::from_rows(&rows).unwrap(), y)
    }

    #[test]
    fn test_meta_features_are_out_of_fold() {
        let rows: Vec<Vec<f64>> = (0..23).map(|i| vec![i as f64, 1.0]).collect();
        let x = FeatureMatrix::from_rows(&rows).unwrap();
        let y: Vec<f64> = (0..23).map(|i| 10.0 + i as f64).collect();

        let oof = out_of_fold_predictions(Memorizer::default, &x, &y, &KFold::new(5)).unwrap();
        assert_eq!(oof.len(), 23);
        assert!(oof.iter().all(|&p| p == UNSEEN), "a row was predicted by a model fit on it");

        // the same model in-sample recalls every row
        let mut full = Memorizer::default();
        full.fit(&x, &y).unwrap();
        assert_eq!(full.predict(&x).unwrap(), y);
    }

    #[test]
    fn test_stacking_on_linear_target() {
        let (x, y) = linear_data(300, 7);
        let (x_train, x_test, y_train, y_test) = train_test_split(&x, &y, 0.2, Some(42)).unwrap();

        let mut model = StackingRegressor::energy_default(5);
        model.fit(&x_train, &y_train).unwrap();
        assert!(model.is_fitted());

        let pred = model.predict(&x_test).unwrap();
        let r2 = r2_score(&y_test, &pred).unwrap();
        assert!(r2 > 0.8, "test R² {} too low", r2);
    }

    #[test]
    fn test_unfitted_clone_and_errors() {
        let (x, y) = linear_data(40, 1);
        let mut model = StackingRegressor::energy_default(3);
        assert_eq!(model.predict(&x), Err(MatrixError::NotFitted("StackingRegressor")));

        model.fit(&x, &y).unwrap();
        let fresh = model.unfitted();
        assert!(!fresh.is_fitted());
        assert_eq!(fresh.base_learners().len(), 2);
        assert_eq!(fresh.base_learners()[0].name(), "random_forest");

        let narrow: FeatureMatrix<f64> = FeatureMatrix::from_rows(&[vec![0.5]]).unwrap();
        assert!(matches!(model.predict(&narrow), Err(MatrixError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_too_few_rows_for_folds() {
        let (x, y) = linear_data(3, 2);
        let mut model = StackingRegressor::energy_default(5);
        assert!(matches!(model.fit(&x, &y), Err(MatrixError::InvalidParameter { .. })));
    }
}
