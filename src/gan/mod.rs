pub mod clipping;
pub mod critic;
pub mod generator;
pub mod image_task;
pub mod layout;
pub mod loss;
pub mod model;
pub mod penalty;
pub mod task;
pub mod vector_task;

pub use clipping::WeightClipping;
pub use critic::Critic;
pub use generator::Generator;
pub use image_task::ImageTask;
pub use layout::ConditionLayout;
pub use model::{ConditionalWgan, CriticUpdate, GeneratorUpdate};
pub use penalty::{GradientPenalty, Interpolation, PenaltyTerm};
pub use task::{Task, TaskKind};
pub use vector_task::VectorTask;
