use std::fs;
use std::path::Path;

use dpe_ml_core::{FeatureMatrix, MatrixError, MatrixResult};
use tracing::info;

use crate::csv_io::{read_matrix, read_target, write_matrix, write_target};
use crate::error::{IoError, IoResult};

pub const X_TRAIN_FILE: &str = "X_train.csv";
pub const X_TEST_FILE: &str = "X_test.csv";
pub const Y_TRAIN_FILE: &str = "y_train.csv";
pub const Y_TEST_FILE: &str = "y_test.csv";

/// The four aligned arrays a training run consumes.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureBundle {
    pub x_train: FeatureMatrix<f64>,
    pub x_test: FeatureMatrix<f64>,
    pub y_train: Vec<f64>,
    pub y_test: Vec<f64>,
}

impl FeatureBundle {
    pub fn new(
        x_train: FeatureMatrix<f64>,
        x_test: FeatureMatrix<f64>,
        y_train: Vec<f64>,
        y_test: Vec<f64>,
    ) -> MatrixResult<Self> {
        let bundle = FeatureBundle {
            x_train,
            x_test,
            y_train,
            y_test,
        };
        bundle.validate()?;
        Ok(bundle)
    }

    /// Rows align with targets and both splits share one column order.
    pub fn validate(&self) -> MatrixResult<()> {
        for (x, y) in [(&self.x_train, &self.y_train), (&self.x_test, &self.y_test)] {
            if x.n_rows() != y.len() {
                return Err(MatrixError::ShapeMismatch {
                    expected: vec![x.n_rows()],
                    got: vec![y.len()],
                });
            }
        }
        self.x_train.ensure_same_columns(&self.x_test)
    }

    /// Load `X_train.csv`, `X_test.csv`, `y_train.csv` and `y_test.csv`
    /// from `dir`.
    pub fn load<P: AsRef<Path>>(dir: P) -> IoResult<Self> {
        let dir = dir.as_ref();
        let bundle = FeatureBundle::new(
            read_matrix(dir.join(X_TRAIN_FILE))?,
            read_matrix(dir.join(X_TEST_FILE))?,
            read_target(dir.join(Y_TRAIN_FILE))?,
            read_target(dir.join(Y_TEST_FILE))?,
        )?;
        info!(
            dir = %dir.display(),
            train_rows = bundle.x_train.n_rows(),
            test_rows = bundle.x_test.n_rows(),
            features = bundle.x_train.n_cols(),
            "loaded feature bundle"
        );
        Ok(bundle)
    }

    pub fn save<P: AsRef<Path>>(&self, dir: P, target: &str) -> IoResult<()> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).map_err(|e| IoError::io(dir, e))?;
        write_matrix(dir.join(X_TRAIN_FILE), &self.x_train)?;
        write_matrix(dir.join(X_TEST_FILE), &self.x_test)?;
        write_target(dir.join(Y_TRAIN_FILE), target, &self.y_train)?;
        write_target(dir.join(Y_TEST_FILE), target, &self.y_test)?;
        info!(dir = %dir.display(), "wrote feature bundle");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bundle() -> FeatureBundle {
        let names = vec!["a".to_string(), "b".to_string()];
        FeatureBundle::new(
            FeatureMatrix::from_rows_named(&[vec![1.0, 2.0], vec![3.0, 4.0]], names.clone()).unwrap(),
            FeatureMatrix::from_rows_named(&[vec![5.0, 6.0]], names).unwrap(),
            vec![0.1, 0.2],
            vec![0.3],
        )
        .unwrap()
    }

    #[test]
    fn test_bundle_save_and_load() {
        let dir = std::env::temp_dir().join("dpe-ml-io-bundle");
        let original = bundle();
        original.save(&dir, "consommation_energie").unwrap();
        assert_eq!(FeatureBundle::load(&dir).unwrap(), original);
    }

    #[test]
    fn test_bundle_rejects_misaligned_splits() {
        let b = bundle();
        let err = FeatureBundle::new(b.x_train.clone(), b.x_test.clone(), vec![0.1], b.y_test.clone());
        assert!(matches!(err, Err(MatrixError::ShapeMismatch { .. })));

        let renamed = FeatureMatrix::from_rows_named(&[vec![5.0, 6.0]], vec!["a".into(), "c".into()]).unwrap();
        let err = FeatureBundle::new(b.x_train, renamed, b.y_train, b.y_test);
        assert!(matches!(err, Err(MatrixError::MissingColumn(_))));
    }

    #[test]
    fn test_missing_bundle_file() {
        let dir = std::env::temp_dir().join("dpe-ml-io-bundle-missing");
        let _ = fs::remove_dir_all(&dir);
        assert!(FeatureBundle::load(&dir).is_err());
    }
}
