pub mod history;
pub mod sampler;
pub mod stats;
pub mod train_config;
pub mod trainer;

pub use history::LossHistory;
pub use sampler::{BatchSampler, UniformSampler};
pub use stats::IterationStats;
pub use train_config::TrainConfig;
pub use trainer::{Trainer, TrainerState, TrainingReport};
