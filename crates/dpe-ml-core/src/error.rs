use thiserror::Error;

/// Core error type for matrix operations and model fitting.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MatrixError {
    #[error("Shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        got: Vec<usize>,
    },

    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("Index out of bounds: index {index} for axis {axis} with size {size}")]
    IndexOutOfBounds {
        index: usize,
        axis: usize,
        size: usize,
    },

    #[error("Invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("{0} is not fitted")]
    NotFitted(&'static str),

    #[error("Empty matrix")]
    EmptyMatrix,

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

impl MatrixError {
    pub fn invalid_parameter(name: &str, reason: impl Into<String>) -> Self {
        MatrixError::InvalidParameter {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

pub type MatrixResult<T> = Result<T, MatrixError>;
