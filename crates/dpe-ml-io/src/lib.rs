pub mod bundle;
pub mod csv_io;
pub mod error;
pub mod model_store;

pub use bundle::FeatureBundle;
pub use csv_io::*;
pub use error::{IoError, IoResult};
pub use model_store::{load_json, save_json};
