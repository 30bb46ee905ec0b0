use dpe_ml_core::{check_fit_input, FeatureMatrix, Float, MatrixError, MatrixResult};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// The four aligned arrays a training run consumes.
pub type SplitBundle<T> = (FeatureMatrix<T>, FeatureMatrix<T>, Vec<T>, Vec<T>);

/// Shuffle rows and split into training and test sets.
///
/// Returns `(X_train, X_test, y_train, y_test)`. The test share is
/// `round(n * test_ratio)` rows.
pub fn train_test_split<T: Float>(
    x: &FeatureMatrix<T>,
    y: &[T],
    test_ratio: f64,
    seed: Option<u64>,
) -> MatrixResult<SplitBundle<T>> {
    check_fit_input(x, y)?;
    if !(0.0..1.0).contains(&test_ratio) {
        return Err(MatrixError::invalid_parameter("test_ratio", "must be in [0, 1)"));
    }

    let n = x.n_rows();
    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };
    indices.shuffle(&mut rng);

    let test_size = (n as f64 * test_ratio).round() as usize;
    let (test_idx, train_idx) = indices.split_at(test_size);

    Ok((
        x.select_rows(train_idx)?,
        x.select_rows(test_idx)?,
        train_idx.iter().map(|&i| y[i]).collect(),
        test_idx.iter().map(|&i| y[i]).collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_train_test_split() {
        let rows: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64, (i * 2) as f64]).collect();
        let x = FeatureMatrix::from_rows(&rows).unwrap();
        let y: Vec<f64> = (0..10).map(|i| i as f64).collect();

        let (x_train, x_test, y_train, y_test) = train_test_split(&x, &y, 0.2, Some(42)).unwrap();

        assert_eq!(x_train.n_rows(), 8);
        assert_eq!(x_test.n_rows(), 2);
        assert_eq!(y_train.len(), 8);
        assert_eq!(y_test.len(), 2);
        assert_eq!(x_train.columns(), x_test.columns());
        // rows stay aligned with their targets
        for (row, &t) in x_train.rows().zip(&y_train) {
            assert_eq!(row[0], t);
        }
    }

    #[test]
    fn test_split_is_seeded() {
        let rows: Vec<Vec<f64>> = (0..30).map(|i| vec![i as f64]).collect();
        let x = FeatureMatrix::from_rows(&rows).unwrap();
        let y: Vec<f64> = (0..30).map(|i| i as f64).collect();
        let a = train_test_split(&x, &y, 0.2, Some(7)).unwrap();
        let b = train_test_split(&x, &y, 0.2, Some(7)).unwrap();
        assert_eq!(a.3, b.3);
    }
}
