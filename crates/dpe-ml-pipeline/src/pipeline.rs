use std::fmt;
use std::path::{Path, PathBuf};

use dpe_ml_core::{FeatureMatrix, MatrixError, MatrixResult, Regressor};
use dpe_ml_ensemble::StackingRegressor;
use dpe_ml_io::FeatureBundle;
use dpe_ml_metrics::{evaluate, mse, RegressionReport};
use dpe_ml_model_selection::{
    cross_validate, Configuration, CvReport, KFold, Objective, SearchEngine, SearchSpace, TpeSampler, TrialHistory,
};
use dpe_ml_preprocessing::{CorrelationPruner, DropList, ScalingStats, StandardScaler, VariancePruner};
use dpe_ml_tree::{BoostingParams, GradientBoostingRegressor};
use tracing::info;

use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::model::TrainedModel;

/// Scaled and pruned train/test matrices plus the state that produced them.
#[derive(Debug, Clone)]
pub struct PreparedFeatures {
    pub x_train: FeatureMatrix<f64>,
    pub x_test: FeatureMatrix<f64>,
    pub stats: ScalingStats<f64>,
    pub correlation_drop: DropList,
    pub variance_drop: DropList,
}

/// Fit the scaler and both pruners on the training split and apply them to
/// both splits.
pub fn prepare_features(bundle: &FeatureBundle, config: &PipelineConfig) -> PipelineResult<PreparedFeatures> {
    bundle.validate()?;

    let scaler = StandardScaler::new();
    let (train, stats) = scaler.fit_transform(&bundle.x_train)?;
    let test = scaler.transform(&bundle.x_test, &stats)?;

    let correlation_drop = CorrelationPruner::new(config.correlation_threshold, config.prune_policy).fit(&train);
    let train = correlation_drop.apply(&train)?;
    let test = correlation_drop.apply(&test)?;
    info!(dropped = correlation_drop.len(), columns = ?correlation_drop.columns(), "dropped highly correlated features");

    let variance_drop = VariancePruner::new(config.variance_floor).fit(&train);
    let x_train = variance_drop.apply(&train)?;
    let x_test = variance_drop.apply(&test)?;
    info!(dropped = variance_drop.len(), columns = ?variance_drop.columns(), "dropped low-variance features");

    x_train.ensure_same_columns(&x_test)?;
    Ok(PreparedFeatures {
        x_train,
        x_test,
        stats,
        correlation_drop,
        variance_drop,
    })
}

/// Build boosting hyperparameters from a sampled configuration. Keys not in
/// the configuration keep their defaults.
pub fn boosting_params(config: &Configuration, seed: u64) -> MatrixResult<BoostingParams> {
    let mut params = BoostingParams::default().with_seed(seed);
    for (name, value) in config {
        let positive = |v: f64| -> MatrixResult<usize> {
            if v >= 1.0 {
                Ok(v as usize)
            } else {
                Err(MatrixError::invalid_parameter(name, format!("{} must be at least 1", v)))
            }
        };
        match name.as_str() {
            "n_estimators" => params.n_estimators = positive(value.as_f64())?,
            "max_depth" => params.max_depth = positive(value.as_f64())?,
            "learning_rate" => params.learning_rate = value.as_f64(),
            "subsample" => params.subsample = value.as_f64(),
            "colsample_bytree" => params.colsample_bytree = value.as_f64(),
            "reg_lambda" => params.reg_lambda = value.as_f64(),
            "reg_alpha" => params.reg_alpha = value.as_f64(),
            "min_child_weight" => params.min_child_weight = value.as_f64(),
            _ => return Err(MatrixError::invalid_parameter(name, "not a boosting hyperparameter")),
        }
    }
    params.validate()?;
    Ok(params)
}

/// Scores a boosting configuration by test-split mean squared error.
pub struct BoostingObjective<'a> {
    features: &'a PreparedFeatures,
    y_train: &'a [f64],
    y_test: &'a [f64],
    seed: u64,
    trial: usize,
}

impl<'a> BoostingObjective<'a> {
    pub fn new(features: &'a PreparedFeatures, y_train: &'a [f64], y_test: &'a [f64], seed: u64) -> Self {
        BoostingObjective {
            features,
            y_train,
            y_test,
            seed,
            trial: 0,
        }
    }

    fn score(&self, config: &Configuration) -> MatrixResult<f64> {
        let mut model = GradientBoostingRegressor::new(boosting_params(config, self.seed)?);
        model.fit(&self.features.x_train, self.y_train)?;
        mse(self.y_test, &model.predict(&self.features.x_test)?)
    }
}

impl Objective for BoostingObjective<'_> {
    type Error = PipelineError;

    fn evaluate(&mut self, config: &Configuration) -> PipelineResult<f64> {
        let trial = self.trial;
        self.trial += 1;
        self.score(config).map_err(|e| PipelineError::TrialFailure {
            trial,
            reason: e.to_string(),
        })
    }
}

/// Best configuration of a finished search.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub best_config: Configuration,
    pub best_mse: f64,
    pub history: TrialHistory,
}

/// Everything a training run reports.
#[derive(Debug, Clone)]
pub struct TrainingReport {
    pub dropped_correlated: Vec<String>,
    pub dropped_low_variance: Vec<String>,
    pub n_features: usize,
    pub search: SearchOutcome,
    pub boosting: RegressionReport,
    pub stacking: RegressionReport,
    pub cross_validation: CvReport,
    pub model_path: Option<PathBuf>,
}

impl fmt::Display for TrainingReport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Dropped {} highly correlated features.", self.dropped_correlated.len())?;
        writeln!(f, "Dropped {} low-variance features.", self.dropped_low_variance.len())?;
        let best: Vec<String> = self
            .search
            .best_config
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        writeln!(f, "Best hyperparameters ({} trials, MSE {:.6}): {}", self.search.history.len(), self.search.best_mse, best.join(", "))?;
        writeln!(f, "Boosting RMSE: {:.4}", self.boosting.rmse)?;
        writeln!(f, "Boosting R² Score: {:.4}", self.boosting.r2)?;
        writeln!(f, "Boosting MAE: {:.4}", self.boosting.mae)?;
        writeln!(f, "Stacking RMSE: {:.4}", self.stacking.rmse)?;
        writeln!(f, "Stacking R² Score: {:.4}", self.stacking.r2)?;
        writeln!(f, "Stacking MAE: {:.4}", self.stacking.mae)?;
        writeln!(f, "Mean R² Score (Cross-Validation): {:.4}", self.cross_validation.mean_r2)?;
        write!(f, "Mean MAE Score (Cross-Validation): {:.4}", self.cross_validation.mean_mae)?;
        if let Some(path) = &self.model_path {
            write!(f, "\nModel saved to {}", path.display())?;
        }
        Ok(())
    }
}

/// Scale, prune, search, train, stack, evaluate and persist.
#[derive(Debug, Clone, Default)]
pub struct TrainingPipeline {
    config: PipelineConfig,
}

impl TrainingPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        TrainingPipeline { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Search boosting hyperparameters against the test split.
    pub fn search(&self, features: &PreparedFeatures, y_train: &[f64], y_test: &[f64]) -> PipelineResult<SearchOutcome> {
        let sampler = TpeSampler::new(self.config.search_seed).with_n_startup(self.config.n_startup_trials);
        let mut engine = SearchEngine::new(SearchSpace::boosting(), sampler, self.config.n_trials);
        let mut objective = BoostingObjective::new(features, y_train, y_test, self.config.model_seed);
        let history = engine.run(&mut objective, TrialHistory::new());

        let (best_config, best_mse) = match history.best() {
            Some(best) => (best.config.clone(), best.score),
            None => return Err(PipelineError::SearchExhausted { trials: history.len() }),
        };
        Ok(SearchOutcome {
            best_config,
            best_mse,
            history,
        })
    }

    /// Run every stage on an in-memory bundle.
    pub fn fit(&self, bundle: &FeatureBundle) -> PipelineResult<(TrainedModel, TrainingReport)> {
        let features = prepare_features(bundle, &self.config)?;
        let (x_train, x_test) = (&features.x_train, &features.x_test);
        let (y_train, y_test) = (bundle.y_train.as_slice(), bundle.y_test.as_slice());

        let search = self.search(&features, y_train, y_test)?;
        info!(mse = search.best_mse, config = ?search.best_config, "best hyperparameters found");

        let mut boosting = GradientBoostingRegressor::new(boosting_params(&search.best_config, self.config.model_seed)?);
        boosting.fit(x_train, y_train)?;
        let boosting_report = evaluate(y_test, &boosting.predict(x_test)?)?;
        info!(%boosting_report, "boosting model evaluated");

        let mut stacking = StackingRegressor::energy_default(self.config.stacking_folds);
        stacking.fit(x_train, y_train)?;
        let stacking_report = evaluate(y_test, &stacking.predict(x_test)?)?;
        info!(%stacking_report, "stacking ensemble evaluated");

        let cross_validation = cross_validate(|| stacking.unfitted(), x_train, y_train, &KFold::new(self.config.cv_folds))?;
        info!(r2 = cross_validation.mean_r2, mae = cross_validation.mean_mae, "cross-validation finished");

        let report = TrainingReport {
            dropped_correlated: features.correlation_drop.columns().to_vec(),
            dropped_low_variance: features.variance_drop.columns().to_vec(),
            n_features: x_train.n_cols(),
            search,
            boosting: boosting_report,
            stacking: stacking_report,
            cross_validation,
            model_path: None,
        };
        let model = TrainedModel {
            stats: features.stats,
            correlation_drop: features.correlation_drop,
            variance_drop: features.variance_drop,
            ensemble: stacking,
        };
        Ok((model, report))
    }

    /// Load the bundle under `root`, train, and write the model under `root`.
    pub fn run<P: AsRef<Path>>(&self, root: P) -> PipelineResult<TrainingReport> {
        let root = root.as_ref();
        let bundle = FeatureBundle::load(self.config.processed_path(root))?;
        let (model, mut report) = self.fit(&bundle)?;

        let path = self.config.model_path(root);
        model.save(&path)?;
        report.model_path = Some(path);
        Ok(report)
    }
}
