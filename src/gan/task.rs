use std::str::FromStr;

use rand::rngs::StdRng;
use serde::{Serialize, Deserialize};

use crate::error::WganError;
use crate::gan::critic::Critic;
use crate::gan::generator::Generator;
use crate::gan::image_task::ImageTask;
use crate::gan::vector_task::VectorTask;

/// Architecture strategy for one application domain.
///
/// The trainer never looks past this trait: both domains share the same
/// orchestration, losses and penalty.
pub trait Task {
    fn name(&self) -> &'static str;

    fn condition_dims(&self) -> usize;

    fn target_shape(&self) -> Vec<usize>;

    fn target_dims(&self) -> usize {
        self.target_shape().iter().product()
    }

    fn build_generator(&self, noise_dims: usize, rng: &mut StdRng) -> Generator;

    fn build_critic(&self, rng: &mut StdRng) -> Critic;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Four-vector in, four-vector out, dense networks.
    #[default]
    Vector,
    /// One-hot label in, 28×28×1 image out, convolutional networks.
    Image,
}

impl TaskKind {
    pub fn build(self) -> Box<dyn Task> {
        match self {
            TaskKind::Vector => Box::new(VectorTask::default()),
            TaskKind::Image => Box::new(ImageTask::default()),
        }
    }
}

impl FromStr for TaskKind {
    type Err = WganError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "vector" => Ok(TaskKind::Vector),
            "image" => Ok(TaskKind::Image),
            other => Err(WganError::Configuration(format!("unknown task '{other}'"))),
        }
    }
}
