use serde::{Serialize, Deserialize};

use crate::gan::layout::ConditionLayout;
use crate::math::matrix::Matrix;
use crate::network::network::Network;
use crate::network::trace::Trace;

/// Scores (condition, target) pairs with one unbounded real number each.
///
/// The last layer has no activation; scores are potentials, not probabilities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Critic {
    pub network: Network,
    pub layout: ConditionLayout,
}

impl Critic {
    pub fn new(network: Network, layout: ConditionLayout) -> Critic {
        assert_eq!(network.input_width(), layout.input_width(), "critic input width");
        assert_eq!(network.output_width(), 1, "critic must produce one score per example");
        Critic { network, layout }
    }

    /// Inference-mode scores, `rows × 1`.
    pub fn score(&self, condition: &Matrix, target: &Matrix) -> Matrix {
        self.network.predict(&self.layout.join(condition, target))
    }

    /// Training-mode forward pass.
    pub fn forward(&self, condition: &Matrix, target: &Matrix) -> Trace {
        self.network.forward(&self.layout.join(condition, target))
    }

    /// ∂(Σ grad_scores ⊙ score)/∂target for a recorded pass. Reads the
    /// critic's parameters without producing gradients for them.
    pub fn target_gradient(&self, trace: &Trace, grad_scores: &Matrix) -> Matrix {
        let back = self.network.backward(trace, grad_scores, false);
        self.layout.target_part(&back.input_grad)
    }
}
