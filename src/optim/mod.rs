pub mod adam;
pub mod rmsprop;
pub mod optimizer;

pub use adam::Adam;
pub use optimizer::{Optimizer, OptimizerKind};
pub use rmsprop::RmsProp;
