use dpe_ml_core::{FeatureMatrix, Float, MatrixError, MatrixResult};
use serde::{Deserialize, Serialize};

/// Replaces missing (NaN) values with the column mean of the present values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "T: Float")]
pub struct MeanImputer<T: Float> {
    pub fill: Option<Vec<T>>,
}

impl<T: Float> Default for MeanImputer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Float> MeanImputer<T> {
    pub fn new() -> Self {
        MeanImputer { fill: None }
    }

    /// Column means ignoring NaN. An all-missing column fills with zero.
    pub fn fit(&mut self, x: &FeatureMatrix<T>) -> MatrixResult<()> {
        let p = x.n_cols();
        let mut sums = vec![T::ZERO; p];
        let mut counts = vec![0usize; p];
        for row in x.rows() {
            for (j, &v) in row.iter().enumerate() {
                if !v.is_nan() {
                    sums[j] += v;
                    counts[j] += 1;
                }
            }
        }
        let fill = sums
            .into_iter()
            .zip(counts)
            .map(|(s, c)| if c == 0 { T::ZERO } else { s / T::from_usize(c) })
            .collect();
        self.fill = Some(fill);
        Ok(())
    }

    pub fn transform(&self, x: &FeatureMatrix<T>) -> MatrixResult<FeatureMatrix<T>> {
        let fill = self.fill.as_ref().ok_or(MatrixError::NotFitted("MeanImputer"))?;
        if fill.len() != x.n_cols() {
            return Err(MatrixError::ShapeMismatch {
                expected: vec![fill.len()],
                got: vec![x.n_cols()],
            });
        }
        Ok(x.map_columns(|j, v| if v.is_nan() { fill[j] } else { v }))
    }

    pub fn fit_transform(&mut self, x: &FeatureMatrix<T>) -> MatrixResult<FeatureMatrix<T>> {
        self.fit(x)?;
        self.transform(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_imputer() {
        let x: FeatureMatrix<f64> = FeatureMatrix::from_rows(&[
            vec![1.0, f64::NAN, f64::NAN],
            vec![f64::NAN, 4.0, f64::NAN],
            vec![3.0, 8.0, f64::NAN],
        ])
        .unwrap();

        let mut imputer = MeanImputer::new();
        let filled = imputer.fit_transform(&x).unwrap();

        assert_eq!(filled.column(0).unwrap(), vec![1.0, 2.0, 3.0]);
        assert_eq!(filled.column(1).unwrap(), vec![6.0, 4.0, 8.0]);
        assert_eq!(filled.column(2).unwrap(), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_transform_before_fit() {
        let x: FeatureMatrix<f64> = FeatureMatrix::from_rows(&[vec![1.0]]).unwrap();
        let imputer: MeanImputer<f64> = MeanImputer::new();
        assert_eq!(imputer.transform(&x), Err(MatrixError::NotFitted("MeanImputer")));
    }
}
