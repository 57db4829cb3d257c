use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Deserialize};

use crate::error::{Result, WganError};
use crate::network::network::Network;
use crate::network::trace::Gradients;
use crate::optim::adam::Adam;
use crate::optim::rmsprop::RmsProp;

/// First-order update rules a network can be trained with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptimizerKind {
    Adam,
    #[serde(rename = "RMSprop")]
    RmsProp,
}

impl FromStr for OptimizerKind {
    type Err = WganError;

    fn from_str(name: &str) -> Result<Self> {
        match name {
            "Adam" => Ok(OptimizerKind::Adam),
            "RMSprop" => Ok(OptimizerKind::RmsProp),
            other => Err(WganError::Configuration(format!(
                "unknown optimizer '{other}', expected \"Adam\" or \"RMSprop\""
            ))),
        }
    }
}

impl fmt::Display for OptimizerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptimizerKind::Adam => write!(f, "Adam"),
            OptimizerKind::RmsProp => write!(f, "RMSprop"),
        }
    }
}

/// Optimizer instance owned by exactly one network.
#[derive(Debug, Clone)]
pub enum Optimizer {
    Adam(Adam),
    RmsProp(RmsProp),
}

impl Optimizer {
    pub fn new(kind: OptimizerKind, learning_rate: f64) -> Optimizer {
        match kind {
            OptimizerKind::Adam => Optimizer::Adam(Adam::new(learning_rate)),
            OptimizerKind::RmsProp => Optimizer::RmsProp(RmsProp::new(learning_rate)),
        }
    }

    pub fn kind(&self) -> OptimizerKind {
        match self {
            Optimizer::Adam(_) => OptimizerKind::Adam,
            Optimizer::RmsProp(_) => OptimizerKind::RmsProp,
        }
    }

    pub fn learning_rate(&self) -> f64 {
        match self {
            Optimizer::Adam(a) => a.learning_rate,
            Optimizer::RmsProp(r) => r.learning_rate,
        }
    }

    /// Applies one update to every parameter of `network`.
    pub fn step(&mut self, network: &mut Network, grads: &Gradients) -> Result<()> {
        let params = network.parameters_mut();
        if params.len() != grads.len()
            || params.iter().zip(grads.tensors.iter()).any(|(p, g)| p.shape() != g.shape())
        {
            return Err(WganError::Shape(
                "gradient layout does not match the network parameters".into(),
            ));
        }
        match self {
            Optimizer::Adam(a) => a.step(params, &grads.tensors),
            Optimizer::RmsProp(r) => r.step(params, &grads.tensors),
        }
        Ok(())
    }
}
