pub mod cross_val;
pub mod kfold;
pub mod search;

pub use cross_val::*;
pub use kfold::*;
pub use search::*;
