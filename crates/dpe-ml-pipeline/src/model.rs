use std::path::Path;

use dpe_ml_core::{FeatureMatrix, Regressor};
use dpe_ml_ensemble::StackingRegressor;
use dpe_ml_io::{load_json, save_json};
use dpe_ml_preprocessing::{DropList, ScalingStats};
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, PipelineResult};

/// The fitted ensemble with the preprocessing state it was trained behind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedModel {
    pub stats: ScalingStats<f64>,
    pub correlation_drop: DropList,
    pub variance_drop: DropList,
    pub ensemble: StackingRegressor<f64>,
}

impl TrainedModel {
    /// Scale and prune an unscaled feature matrix the way training data was.
    pub fn transform(&self, x: &FeatureMatrix<f64>) -> PipelineResult<FeatureMatrix<f64>> {
        let scaled = self.stats.transform(x)?;
        let pruned = self.correlation_drop.apply(&scaled)?;
        Ok(self.variance_drop.apply(&pruned)?)
    }

    /// Predict from unscaled features.
    pub fn predict_raw(&self, x: &FeatureMatrix<f64>) -> PipelineResult<Vec<f64>> {
        Ok(self.ensemble.predict(&self.transform(x)?)?)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> PipelineResult<()> {
        let path = path.as_ref();
        save_json(self, path).map_err(|source| PipelineError::PersistenceFailure {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load<P: AsRef<Path>>(path: P) -> PipelineResult<Self> {
        Ok(load_json(path)?)
    }
}
