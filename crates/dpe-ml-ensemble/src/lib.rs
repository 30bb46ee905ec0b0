pub mod stacking;

pub use stacking::*;
