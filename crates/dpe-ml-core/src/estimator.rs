use crate::dtype::Float;
use crate::error::{MatrixError, MatrixResult};
use crate::matrix::FeatureMatrix;

/// Trait for supervised regressors.
///
/// `fit` consumes a training matrix and an aligned target; `predict` returns
/// one value per row of `x`. Implementors must be `Send + Sync` so ensembles
/// can fit independent learners in parallel.
pub trait Regressor<T: Float>: Send + Sync {
    fn fit(&mut self, x: &FeatureMatrix<T>, y: &[T]) -> MatrixResult<()>;
    fn predict(&self, x: &FeatureMatrix<T>) -> MatrixResult<Vec<T>>;
}

/// Validate a `(x, y)` training pair before fitting.
pub fn check_fit_input<T: Float>(x: &FeatureMatrix<T>, y: &[T]) -> MatrixResult<()> {
    if x.n_rows() == 0 || x.n_cols() == 0 {
        return Err(MatrixError::EmptyMatrix);
    }
    if x.n_rows() != y.len() {
        return Err(MatrixError::ShapeMismatch {
            expected: vec![x.n_rows()],
            got: vec![y.len()],
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_fit_input() {
        let x: FeatureMatrix<f64> = FeatureMatrix::from_rows(&[vec![1.0], vec![2.0]]).unwrap();
        assert!(check_fit_input(&x, &[1.0, 2.0]).is_ok());
        assert!(matches!(
            check_fit_input(&x, &[1.0]),
            Err(MatrixError::ShapeMismatch { .. })
        ));
    }
}
