pub mod scaler;
pub mod pruning;
pub mod imputer;
pub mod encoder;
pub mod split;

pub use scaler::*;
pub use pruning::*;
pub use imputer::*;
pub use encoder::*;
pub use split::*;
