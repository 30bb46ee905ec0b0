use std::path::PathBuf;

use dpe_ml_core::MatrixError;
use dpe_ml_io::IoError;
use thiserror::Error;

/// Failures of a preparation or training run.
///
/// Only `TrialFailure` is absorbed (by the hyperparameter search); every other
/// variant ends the run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch { expected: Vec<usize>, got: Vec<usize> },

    #[error("Missing column `{0}`")]
    MissingColumn(String),

    #[error("Trial {trial} failed: {reason}")]
    TrialFailure { trial: usize, reason: String },

    #[error("Cannot write model to {path}: {source}")]
    PersistenceFailure {
        path: PathBuf,
        #[source]
        source: IoError,
    },

    #[error("Hyperparameter search finished {trials} trials without a successful one")]
    SearchExhausted { trials: usize },

    #[error("Data error: {0}")]
    Data(#[source] IoError),

    #[error("Model error: {0}")]
    Model(#[source] MatrixError),

    #[error("Invalid configuration {path}: {reason}")]
    Config { path: PathBuf, reason: String },
}

impl From<MatrixError> for PipelineError {
    fn from(e: MatrixError) -> Self {
        match e {
            MatrixError::ShapeMismatch { expected, got } => PipelineError::ShapeMismatch { expected, got },
            MatrixError::MissingColumn(id) => PipelineError::MissingColumn(id),
            other => PipelineError::Model(other),
        }
    }
}

impl From<IoError> for PipelineError {
    fn from(e: IoError) -> Self {
        match e {
            IoError::Matrix(inner) => inner.into(),
            other => PipelineError::Data(other),
        }
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;
