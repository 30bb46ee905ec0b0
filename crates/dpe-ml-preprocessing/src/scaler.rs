use dpe_ml_core::{FeatureMatrix, Float, MatrixError, MatrixResult};
use serde::{Deserialize, Serialize};

/// Per-feature `(mean, scale)` pairs fit on a training split.
///
/// The stats are immutable once fit; applying them to another split only
/// borrows them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "T: Float")]
pub struct ScalingStats<T: Float> {
    pub columns: Vec<String>,
    pub mean: Vec<T>,
    pub scale: Vec<T>,
}

impl<T: Float> ScalingStats<T> {
    /// Standardize `x` with these stats: `(x - mean) / scale`.
    pub fn transform(&self, x: &FeatureMatrix<T>) -> MatrixResult<FeatureMatrix<T>> {
        if x.n_cols() != self.columns.len() {
            return Err(MatrixError::ShapeMismatch {
                expected: vec![self.columns.len()],
                got: vec![x.n_cols()],
            });
        }
        if let Some((id, _)) = self.columns.iter().zip(x.columns()).find(|(a, b)| a != b) {
            return Err(MatrixError::MissingColumn(id.clone()));
        }
        Ok(x.map_columns(|j, v| (v - self.mean[j]) / self.scale[j]))
    }
}

/// Standardize features by removing the mean and scaling to unit variance.
///
/// Zero-variance columns keep a scale of one, so they are only centered.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardScaler;

impl StandardScaler {
    pub fn new() -> Self {
        StandardScaler
    }

    /// Compute mean and population std from training data.
    pub fn fit<T: Float>(&self, x: &FeatureMatrix<T>) -> MatrixResult<ScalingStats<T>> {
        if x.n_rows() == 0 {
            return Err(MatrixError::EmptyMatrix);
        }
        let mean = x.column_means();
        let scale = x
            .column_variances()
            .into_iter()
            .map(|v| {
                let s = v.sqrt();
                if s.abs() < T::EPSILON { T::ONE } else { s }
            })
            .collect();
        Ok(ScalingStats {
            columns: x.columns().to_vec(),
            mean,
            scale,
        })
    }

    /// Fit on `x` and return the scaled matrix together with the stats.
    pub fn fit_transform<T: Float>(
        &self,
        x: &FeatureMatrix<T>,
    ) -> MatrixResult<(FeatureMatrix<T>, ScalingStats<T>)> {
        let stats = self.fit(x)?;
        let scaled = stats.transform(x)?;
        Ok((scaled, stats))
    }

    /// Transform another split with stats fit elsewhere.
    pub fn transform<T: Float>(
        &self,
        x: &FeatureMatrix<T>,
        stats: &ScalingStats<T>,
    ) -> MatrixResult<FeatureMatrix<T>> {
        stats.transform(x)
    }
}

/// Per-column `[min, max]` ranges for min-max normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "T: Float")]
pub struct MinMaxStats<T: Float> {
    pub columns: Vec<String>,
    pub min: Vec<T>,
    pub max: Vec<T>,
}

/// Scale selected columns to the [0, 1] range.
#[derive(Debug, Clone, Copy, Default)]
pub struct MinMaxScaler;

impl MinMaxScaler {
    pub fn new() -> Self {
        MinMaxScaler
    }

    /// Record min and max of each named column.
    pub fn fit<T: Float>(&self, x: &FeatureMatrix<T>, ids: &[String]) -> MatrixResult<MinMaxStats<T>> {
        let mut min = Vec::with_capacity(ids.len());
        let mut max = Vec::with_capacity(ids.len());
        for id in ids {
            let col = x.column(x.column_index(id)?)?;
            let lo = col.iter().copied().fold(T::INFINITY, T::min);
            let hi = col.iter().copied().fold(-T::INFINITY, T::max);
            min.push(lo);
            max.push(hi);
        }
        Ok(MinMaxStats {
            columns: ids.to_vec(),
            min,
            max,
        })
    }

    /// Rescale the fitted columns; other columns pass through untouched.
    /// Constant columns map to zero.
    pub fn transform<T: Float>(
        &self,
        x: &FeatureMatrix<T>,
        stats: &MinMaxStats<T>,
    ) -> MatrixResult<FeatureMatrix<T>> {
        let mut ranges: Vec<Option<(T, T)>> = vec![None; x.n_cols()];
        for (k, id) in stats.columns.iter().enumerate() {
            let j = x.column_index(id)?;
            let span = stats.max[k] - stats.min[k];
            let span = if span.abs() < T::EPSILON { T::ONE } else { span };
            ranges[j] = Some((stats.min[k], span));
        }
        Ok(x.map_columns(|j, v| match ranges[j] {
            Some((lo, span)) => (v - lo) / span,
            None => v,
        }))
    }

    pub fn fit_transform<T: Float>(
        &self,
        x: &FeatureMatrix<T>,
        ids: &[String],
    ) -> MatrixResult<(FeatureMatrix<T>, MinMaxStats<T>)> {
        let stats = self.fit(x, ids)?;
        let scaled = self.transform(x, &stats)?;
        Ok((scaled, stats))
    }
}
