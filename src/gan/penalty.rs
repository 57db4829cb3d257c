use log::warn;
use rand::distributions::{Distribution, Uniform};
use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Serialize, Deserialize};

use crate::gan::critic::Critic;
use crate::math::matrix::Matrix;
use crate::network::trace::Gradients;

/// Distribution of the per-example interpolation coefficient `t`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Interpolation {
    /// `t ~ N(0, 1)`; may extrapolate beyond the real/fake segment.
    #[default]
    #[serde(rename = "normal")]
    StandardNormal,
    /// `t ~ U[0, 1)`, the textbook WGAN-GP choice.
    #[serde(rename = "uniform")]
    Uniform,
}

impl Interpolation {
    pub fn sample_coefficients<R: Rng>(&self, rows: usize, rng: &mut R) -> Vec<f64> {
        match self {
            Interpolation::StandardNormal => (0..rows).map(|_| Distribution::<f64>::sample(&StandardNormal, rng)).collect(),
            Interpolation::Uniform => {
                let dist = Uniform::new(0.0, 1.0);
                (0..rows).map(|_| dist.sample(rng)).collect()
            }
        }
    }
}

/// `t ⊙ (fake - real) + real`, one coefficient per row.
pub fn interpolate(real: &Matrix, fake: &Matrix, t: &[f64]) -> Matrix {
    (fake.clone() - real.clone()).scale_rows(t) + real.clone()
}

/// Penalty value together with its gradient w.r.t. the critic parameters.
#[derive(Debug, Clone)]
pub struct PenaltyTerm {
    pub value: f64,
    pub grads: Gradients,
}

/// `mean((‖∂score/∂y‖ - 1)²)` evaluated at interpolated targets.
#[derive(Debug, Clone)]
pub struct GradientPenalty {
    pub weight: f64,
    pub interpolation: Interpolation,
}

impl GradientPenalty {
    pub fn new(weight: f64, interpolation: Interpolation) -> GradientPenalty {
        if interpolation == Interpolation::StandardNormal {
            warn!("gradient penalty interpolates with t ~ N(0, 1); set interpolation to \"uniform\" for t ~ U[0, 1)");
        }
        GradientPenalty { weight, interpolation }
    }

    /// Draws coefficients, interpolates between `real` and `fake` and
    /// evaluates the (unweighted) penalty there.
    pub fn evaluate<R: Rng>(&self, critic: &Critic, condition: &Matrix, real: &Matrix, fake: &Matrix, rng: &mut R) -> PenaltyTerm {
        let t = self.interpolation.sample_coefficients(real.rows, rng);
        self.at(critic, condition, &interpolate(real, fake, &t))
    }

    /// Unweighted penalty at fixed targets.
    ///
    /// The norm is taken over the target part of the critic input only. Rows
    /// whose gradient vanishes contribute the subgradient 0.
    pub fn at(&self, critic: &Critic, condition: &Matrix, target: &Matrix) -> PenaltyTerm {
        let rows = target.rows;
        let trace = critic.forward(condition, target);
        let backprop = critic.network.backward(&trace, &Matrix::filled(rows, 1, 1.0), false);
        let grad = critic.layout.target_part(&backprop.input_grad);
        let norms = grad.row_norms();

        let value = norms.iter().map(|n| (n - 1.0).powi(2)).sum::<f64>() / rows as f64;
        let factors: Vec<f64> = norms.iter()
            .map(|&n| if n > 0.0 { 2.0 * (n - 1.0) / (n * rows as f64) } else { 0.0 })
            .collect();
        let adjoint = critic.layout.embed_target(&grad.scale_rows(&factors));

        let grads = critic.network.double_backward(&trace, &backprop, &adjoint).grads;
        PenaltyTerm { value, grads }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::activation::ActivationFunction;
    use crate::gan::layout::ConditionLayout;
    use crate::layers::{Dense, Layer};
    use crate::network::network::Network;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn smooth_critic(rng: &mut StdRng) -> Critic {
        let layout = ConditionLayout::Columns { condition_dims: 2, target_dims: 3 };
        let network = Network::new(vec![
            Layer::Dense(Dense::new(6, 5, ActivationFunction::Tanh, rng)),
            Layer::Dense(Dense::new(1, 6, ActivationFunction::Identity, rng)),
        ]);
        Critic::new(network, layout)
    }

    #[test]
    fn identical_samples_pin_the_interpolation() {
        let mut rng = StdRng::seed_from_u64(30);
        let critic = smooth_critic(&mut rng);
        let x = Matrix::glorot_uniform(4, 2, 1, 1, &mut rng);
        let y = Matrix::glorot_uniform(4, 3, 1, 1, &mut rng);
        for interpolation in [Interpolation::StandardNormal, Interpolation::Uniform] {
            let t = interpolation.sample_coefficients(4, &mut rng);
            assert_eq!(interpolate(&y, &y, &t), y);
            let penalty = GradientPenalty::new(10.0, interpolation);
            let sampled = penalty.evaluate(&critic, &x, &y, &y, &mut rng);
            assert_eq!(sampled.value, penalty.at(&critic, &x, &y).value);
        }
    }

    #[test]
    fn uniform_coefficients_stay_in_unit_interval() {
        let mut rng = StdRng::seed_from_u64(31);
        let t = Interpolation::Uniform.sample_coefficients(200, &mut rng);
        assert!(t.iter().all(|v| (0.0..1.0).contains(v)));
    }

    #[test]
    fn parameter_gradient_matches_finite_differences() {
        let mut rng = StdRng::seed_from_u64(32);
        let mut critic = smooth_critic(&mut rng);
        let x = Matrix::glorot_uniform(3, 2, 1, 1, &mut rng);
        let y = Matrix::glorot_uniform(3, 3, 1, 1, &mut rng);
        let penalty = GradientPenalty::new(1.0, Interpolation::Uniform);
        let analytic = penalty.at(&critic, &x, &y).grads;

        let h = 1e-6;
        for (p, (r, c)) in [(0, (1, 2)), (1, (0, 4)), (2, (3, 0)), (3, (0, 0))] {
            let original = critic.network.parameters()[p].data[r][c];
            critic.network.parameters_mut()[p].data[r][c] = original + h;
            let up = penalty.at(&critic, &x, &y).value;
            critic.network.parameters_mut()[p].data[r][c] = original - h;
            let down = penalty.at(&critic, &x, &y).value;
            critic.network.parameters_mut()[p].data[r][c] = original;
            let fd = (up - down) / (2.0 * h);
            let got = analytic.tensors[p].data[r][c];
            assert!((fd - got).abs() < 1e-6 * (1.0 + fd.abs()), "param {p}: {fd} vs {got}");
        }
    }

    #[test]
    fn zero_gradient_rows_use_zero_subgradient() {
        let mut rng = StdRng::seed_from_u64(33);
        let mut critic = smooth_critic(&mut rng);
        for param in critic.network.parameters_mut() {
            *param = Matrix::zeros(param.rows, param.cols);
        }
        let x = Matrix::zeros(2, 2);
        let y = Matrix::zeros(2, 3);
        let term = GradientPenalty::new(1.0, Interpolation::Uniform).at(&critic, &x, &y);
        assert_eq!(term.value, 1.0);
        assert!(term.grads.is_finite());
        assert_eq!(term.grads.global_norm(), 0.0);
    }
}
