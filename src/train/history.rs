/// Append-only loss records of a run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LossHistory {
    /// One entry per critic step.
    pub critic_losses: Vec<f64>,
    /// One entry per iteration.
    pub generator_losses: Vec<f64>,
    /// One entry per iteration.
    pub wass_estimates: Vec<f64>,
}

impl LossHistory {
    pub fn new() -> LossHistory {
        LossHistory::default()
    }

    pub fn critic_columns(&self) -> Vec<(&'static str, &[f64])> {
        vec![("Critic Loss", self.critic_losses.as_slice())]
    }

    pub fn generator_columns(&self) -> Vec<(&'static str, &[f64])> {
        vec![
            ("Generator Loss", self.generator_losses.as_slice()),
            ("Wasserstein Estimates", self.wass_estimates.as_slice()),
        ]
    }
}
