use dpe_ml_core::{check_fit_input, FeatureMatrix, Float, MatrixResult, Regressor};
use dpe_ml_metrics::{mae, r2_score};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::kfold::KFold;

/// Per-fold and mean scores of a cross-validation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CvReport {
    pub r2_per_fold: Vec<f64>,
    pub mae_per_fold: Vec<f64>,
    pub mean_r2: f64,
    pub mean_mae: f64,
}

impl CvReport {
    fn from_folds(r2_per_fold: Vec<f64>, mae_per_fold: Vec<f64>) -> Self {
        let mean = |v: &[f64]| v.iter().sum::<f64>() / v.len() as f64;
        CvReport {
            mean_r2: mean(&r2_per_fold),
            mean_mae: mean(&mae_per_fold),
            r2_per_fold,
            mae_per_fold,
        }
    }
}

/// Score a model with k-fold cross-validation.
///
/// `make` builds a fresh, unfitted model for every fold, so no fold sees a
/// model trained on its own held-out rows.
pub fn cross_validate<T, R, F>(
    make: F,
    x: &FeatureMatrix<T>,
    y: &[T],
    kfold: &KFold,
) -> MatrixResult<CvReport>
where
    T: Float,
    R: Regressor<T>,
    F: Fn() -> R,
{
    check_fit_input(x, y)?;
    let folds = kfold.split(x.n_rows())?;

    let mut r2s = Vec::with_capacity(folds.len());
    let mut maes = Vec::with_capacity(folds.len());
    for (i, fold) in folds.iter().enumerate() {
        let x_train = x.select_rows(&fold.train)?;
        let x_test = x.select_rows(&fold.test)?;
        let y_train: Vec<T> = fold.train.iter().map(|&r| y[r]).collect();
        let y_test: Vec<T> = fold.test.iter().map(|&r| y[r]).collect();

        let mut model = make();
        model.fit(&x_train, &y_train)?;
        let pred = model.predict(&x_test)?;

        let r2 = r2_score(&y_test, &pred)?;
        let err = mae(&y_test, &pred)?;
        debug!(fold = i, r2, mae = err, "cross-validation fold scored");
        r2s.push(r2);
        maes.push(err);
    }

    Ok(CvReport::from_folds(r2s, maes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use dpe_ml_core::MatrixError;

    /// Predicts the training mean.
    struct MeanModel(Option<f64>);

    impl Regressor<f64> for MeanModel {
        fn fit(&mut self, _x: &FeatureMatrix<f64>, y: &[f64]) -> MatrixResult<()> {
            self.0 = Some(y.iter().sum::<f64>() / y.len() as f64);
            Ok(())
        }

        fn predict(&self, x: &FeatureMatrix<f64>) -> MatrixResult<Vec<f64>> {
            let m = self.0.ok_or(MatrixError::NotFitted("MeanModel"))?;
            Ok(vec![m; x.n_rows()])
        }
    }

    #[test]
    fn test_cross_validate_mean_model() {
        let rows: Vec<Vec<f64>> = (0..6).map(|i| vec![i as f64]).collect();
        let x = FeatureMatrix::from_rows(&rows).unwrap();
        let y = vec![1.0, 1.0, 3.0, 3.0, 5.0, 5.0];

        let report = cross_validate(|| MeanModel(None), &x, &y, &KFold::new(3)).unwrap();
        assert_eq!(report.r2_per_fold.len(), 3);
        // fold 0 holds out [1, 1] and trains on mean 4
        assert_abs_diff_eq!(report.mae_per_fold[0], 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(report.mae_per_fold[1], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(report.mean_mae, (3.0 + 0.0 + 3.0) / 3.0, epsilon = 1e-12);
        // constant held-out targets score 0
        assert_eq!(report.mean_r2, 0.0);
    }

    #[test]
    fn test_cross_validate_rejects_misaligned_target() {
        let x: FeatureMatrix<f64> = FeatureMatrix::from_rows(&[vec![1.0], vec![2.0], vec![3.0]]).unwrap();
        let err = cross_validate(|| MeanModel(None), &x, &[1.0, 2.0], &KFold::new(3)).unwrap_err();
        assert!(matches!(err, MatrixError::ShapeMismatch { .. }));
    }
}
