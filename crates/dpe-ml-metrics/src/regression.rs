use std::fmt;

use dpe_ml_core::{Float, MatrixError, MatrixResult};
use serde::{Deserialize, Serialize};

fn check_pair<T: Float>(y_true: &[T], y_pred: &[T]) -> MatrixResult<()> {
    if y_true.len() != y_pred.len() {
        return Err(MatrixError::ShapeMismatch {
            expected: vec![y_true.len()],
            got: vec![y_pred.len()],
        });
    }
    if y_true.is_empty() {
        return Err(MatrixError::EmptyMatrix);
    }
    Ok(())
}

/// Mean Squared Error.
pub fn mse<T: Float>(y_true: &[T], y_pred: &[T]) -> MatrixResult<f64> {
    check_pair(y_true, y_pred)?;
    let sum: f64 = y_true
        .iter()
        .zip(y_pred)
        .map(|(&t, &p)| {
            let d = (t - p).to_f64();
            d * d
        })
        .sum();
    Ok(sum / y_true.len() as f64)
}

/// Root Mean Squared Error.
pub fn rmse<T: Float>(y_true: &[T], y_pred: &[T]) -> MatrixResult<f64> {
    Ok(mse(y_true, y_pred)?.sqrt())
}

/// Mean Absolute Error.
pub fn mae<T: Float>(y_true: &[T], y_pred: &[T]) -> MatrixResult<f64> {
    check_pair(y_true, y_pred)?;
    let sum: f64 = y_true
        .iter()
        .zip(y_pred)
        .map(|(&t, &p)| (t - p).to_f64().abs())
        .sum();
    Ok(sum / y_true.len() as f64)
}

/// R² (coefficient of determination). A constant target scores 0.
pub fn r2_score<T: Float>(y_true: &[T], y_pred: &[T]) -> MatrixResult<f64> {
    check_pair(y_true, y_pred)?;
    let n = y_true.len() as f64;
    let mean_true: f64 = y_true.iter().map(|v| v.to_f64()).sum::<f64>() / n;

    let ss_res: f64 = y_true
        .iter()
        .zip(y_pred)
        .map(|(&t, &p)| {
            let d = t.to_f64() - p.to_f64();
            d * d
        })
        .sum();
    let ss_tot: f64 = y_true
        .iter()
        .map(|&t| {
            let d = t.to_f64() - mean_true;
            d * d
        })
        .sum();

    if ss_tot < 1e-15 {
        return Ok(0.0);
    }
    Ok(1.0 - ss_res / ss_tot)
}

/// Test-split error summary printed for each trained model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionReport {
    pub rmse: f64,
    pub r2: f64,
    pub mae: f64,
}

impl fmt::Display for RegressionReport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "RMSE: {:.4}, R²: {:.4}, MAE: {:.4}", self.rmse, self.r2, self.mae)
    }
}

/// Compute RMSE, R² and MAE in one pass over the inputs.
pub fn evaluate<T: Float>(y_true: &[T], y_pred: &[T]) -> MatrixResult<RegressionReport> {
    Ok(RegressionReport {
        rmse: rmse(y_true, y_pred)?,
        r2: r2_score(y_true, y_pred)?,
        mae: mae(y_true, y_pred)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_mse() {
        let y_true = [1.0, 2.0, 3.0];
        let y_pred = [1.0, 2.0, 5.0];
        assert_abs_diff_eq!(mse(&y_true, &y_pred).unwrap(), 4.0 / 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(rmse(&y_true, &y_pred).unwrap(), (4.0f64 / 3.0).sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_r2_perfect() {
        let y = [1.0, 2.0, 3.0, 4.0];
        assert_abs_diff_eq!(r2_score(&y, &y).unwrap(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_r2_mean_predictor_is_zero() {
        let y = [1.0, 2.0, 3.0, 4.0];
        let mean = [2.5; 4];
        assert_abs_diff_eq!(r2_score(&y, &mean).unwrap(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_mae() {
        let y_true = [1.0, 2.0, 3.0];
        let y_pred = [1.5, 2.5, 3.5];
        assert_abs_diff_eq!(mae(&y_true, &y_pred).unwrap(), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_evaluate() {
        let y_true = [0.0, 1.0, 2.0, 3.0];
        let y_pred = [0.0, 1.0, 2.0, 1.0];
        let report = evaluate(&y_true, &y_pred).unwrap();
        assert_abs_diff_eq!(report.rmse, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(report.mae, 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(report.r2, 1.0 - 4.0 / 5.0, epsilon = 1e-12);
        assert!(report.to_string().starts_with("RMSE: 1.0000"));
    }

    #[test]
    fn test_length_mismatch() {
        let err = mse(&[1.0, 2.0], &[1.0]).unwrap_err();
        assert_eq!(err, MatrixError::ShapeMismatch { expected: vec![2], got: vec![1] });
        let empty: [f64; 0] = [];
        assert_eq!(mae(&empty, &empty), Err(MatrixError::EmptyMatrix));
    }
}
