pub mod dtype;
pub mod error;
pub mod estimator;
pub mod matrix;

pub use dtype::Float;
pub use error::{MatrixError, MatrixResult};
pub use estimator::{check_fit_input, Regressor};
pub use matrix::{default_column_ids, FeatureMatrix};
