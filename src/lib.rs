pub mod error;
pub mod math;
pub mod activation;
pub mod layers;
pub mod network;
pub mod optim;
pub mod gan;
pub mod io;
pub mod train;

// Convenience re-exports
pub use error::{Result, WganError};
pub use math::matrix::Matrix;
pub use activation::activation::ActivationFunction;
pub use network::network::Network;
pub use optim::optimizer::{Optimizer, OptimizerKind};
pub use gan::{ConditionalWgan, Critic, Generator, GradientPenalty, Interpolation, Task, TaskKind};
pub use io::data::Dataset;
pub use train::{Trainer, TrainConfig, TrainingReport};
