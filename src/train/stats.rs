use serde::{Serialize, Deserialize};

/// Per-iteration statistics emitted by `Trainer`.
///
/// When a progress channel is attached, the trainer sends one value at the
/// end of every completed iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationStats {
    /// 0-based global iteration, `epoch * batches_per_epoch + batch`.
    pub iteration: usize,
    pub epoch: usize,
    /// Mean of this iteration's critic losses.
    pub critic_loss: f64,
    pub generator_loss: f64,
    pub wasserstein_estimate: f64,
    /// Wall-clock duration of this iteration in milliseconds.
    pub elapsed_ms: u64,
}
