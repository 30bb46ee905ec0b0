pub mod config;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod prepare;

pub use config::PipelineConfig;
pub use error::{PipelineError, PipelineResult};
pub use model::TrainedModel;
pub use pipeline::*;
pub use prepare::{DatasetPreparer, PreparedDataset};
