//! # dpe-ml
//!
//! Predicts per-building energy consumption from energy-performance
//! diagnostics (DPE).
//!
//! ## Modules
//!
//! - **core**: `FeatureMatrix` with column ids, the `Float` trait, the `Regressor` seam
//! - **preprocessing**: StandardScaler, MinMaxScaler, correlation and variance pruning, imputation, label encoding, splitting
//! - **tree**: regression trees, Random Forest, Gradient Boosting
//! - **metrics**: MSE, RMSE, MAE, R²
//! - **model_selection**: k-fold cross-validation and TPE hyperparameter search
//! - **ensemble**: stacking with out-of-fold meta-features
//! - **io**: CSV feature bundles and the JSON model store
//! - **pipeline**: dataset preparation and the end-to-end training run

/// Feature matrix, numeric trait and estimator trait.
pub use dpe_ml_core as core;

/// Scaling, pruning, imputation, encoding, splitting.
pub use dpe_ml_preprocessing as preprocessing;

/// Tree-based regressors.
pub use dpe_ml_tree as tree;

/// Regression metrics.
pub use dpe_ml_metrics as metrics;

/// Cross-validation and hyperparameter search.
pub use dpe_ml_model_selection as model_selection;

/// Stacking ensemble.
pub use dpe_ml_ensemble as ensemble;

/// CSV and model persistence.
pub use dpe_ml_io as io;

/// Preparation and training runs.
pub use dpe_ml_pipeline as pipeline;

/// Convenience prelude.
pub mod prelude {
    pub use dpe_ml_core::{FeatureMatrix, Float, MatrixError, MatrixResult, Regressor};
    pub use dpe_ml_ensemble::StackingRegressor;
    pub use dpe_ml_io::FeatureBundle;
    pub use dpe_ml_metrics::{evaluate, RegressionReport};
    pub use dpe_ml_pipeline::{DatasetPreparer, PipelineConfig, PipelineError, TrainedModel, TrainingPipeline};
    pub use dpe_ml_preprocessing::{CorrelationPruner, PrunePolicy, StandardScaler, VariancePruner};
    pub use dpe_ml_tree::{BoostingParams, GradientBoostingRegressor, RandomForestRegressor};
}
