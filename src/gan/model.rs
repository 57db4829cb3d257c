use log::{debug, warn};
use rand::Rng;

use crate::error::{Result, WganError};
use crate::gan::clipping::WeightClipping;
use crate::gan::critic::Critic;
use crate::gan::generator::Generator;
use crate::gan::loss::{critic_loss, critic_loss_grad, generator_loss, generator_loss_grad, wasserstein_estimate};
use crate::gan::penalty::GradientPenalty;
use crate::math::matrix::Matrix;
use crate::network::network::Network;
use crate::network::trace::Gradients;
use crate::optim::optimizer::Optimizer;

/// Loss and parameter gradients of one critic step, not yet applied.
#[derive(Debug, Clone)]
pub struct CriticUpdate {
    /// Wasserstein critic loss plus the weighted penalty.
    pub loss: f64,
    /// Unweighted gradient penalty.
    pub penalty: f64,
    pub gradients: Gradients,
}

#[derive(Debug, Clone)]
pub struct GeneratorUpdate {
    pub loss: f64,
    pub gradients: Gradients,
}

/// A generator, a critic and the optimizer owned by each.
///
/// Computing an update only reads the networks; applying it mutates exactly
/// the network it belongs to.
#[derive(Debug, Clone)]
pub struct ConditionalWgan {
    generator: Generator,
    critic: Critic,
    generator_optimizer: Optimizer,
    critic_optimizer: Optimizer,
    penalty: GradientPenalty,
    clipping: Option<WeightClipping>,
}

impl ConditionalWgan {
    pub fn new(
        generator: Generator,
        critic: Critic,
        generator_optimizer: Optimizer,
        critic_optimizer: Optimizer,
        penalty: GradientPenalty,
        clipping: Option<WeightClipping>,
    ) -> ConditionalWgan {
        assert_eq!(
            generator.network.output_width(),
            critic.layout.target_dims(),
            "generator output must match the critic's target width"
        );
        if clipping.is_some() && penalty.weight > 0.0 {
            warn!("weight clipping and the gradient penalty are both active");
        }
        ConditionalWgan { generator, critic, generator_optimizer, critic_optimizer, penalty, clipping }
    }

    pub fn generator(&self) -> &Generator {
        &self.generator
    }

    pub fn critic(&self) -> &Critic {
        &self.critic
    }

    pub fn penalty(&self) -> &GradientPenalty {
        &self.penalty
    }

    /// Inference-mode samples for `condition`.
    pub fn make_generator_predictions(&self, condition: &Matrix, noise: &Matrix) -> Matrix {
        self.generator.generate(condition, noise)
    }

    /// Critic loss with gradient penalty on one batch of real pairs.
    pub fn critic_update<R: Rng>(&self, condition: &Matrix, real: &Matrix, rng: &mut R) -> CriticUpdate {
        let noise = self.generator.sample_noise(condition.rows, rng);
        let fake = self.generator.generate(condition, &noise);

        let real_trace = self.critic.forward(condition, real);
        let fake_trace = self.critic.forward(condition, &fake);
        let (grad_real, grad_fake) = critic_loss_grad(&real_trace.output, &fake_trace.output);
        let wasserstein = critic_loss(&real_trace.output, &fake_trace.output);

        let network = &self.critic.network;
        let mut gradients = network.backward(&real_trace, &grad_real, true).grads
            .unwrap_or_else(|| Gradients::zeros_like(&network.parameters()));
        if let Some(g) = network.backward(&fake_trace, &grad_fake, true).grads {
            gradients.add_assign(&g);
        }

        let penalty = self.penalty.evaluate(&self.critic, condition, real, &fake, rng);
        gradients.add_assign(&penalty.grads.scale(self.penalty.weight));

        CriticUpdate {
            loss: wasserstein + self.penalty.weight * penalty.value,
            penalty: penalty.value,
            gradients,
        }
    }

    /// Applies a critic update, then clips the critic's weights if enabled.
    pub fn apply_critic_update(&mut self, update: &CriticUpdate) -> Result<()> {
        ensure_finite("critic", update.loss, &update.gradients)?;
        self.critic_optimizer.step(&mut self.critic.network, &update.gradients)?;
        if let Some(clipping) = &self.clipping {
            clipping.apply(&mut self.critic.network);
        }
        debug!(
            "critic step: loss {:.6}, penalty {:.6}, grad norm {:.6}",
            update.loss,
            update.penalty,
            update.gradients.global_norm()
        );
        Ok(())
    }

    /// Generator loss on one batch of conditions, back-propagated through a
    /// read-only critic pass.
    pub fn generator_update<R: Rng>(&self, condition: &Matrix, rng: &mut R) -> GeneratorUpdate {
        let noise = self.generator.sample_noise(condition.rows, rng);
        let generator_trace = self.generator.forward(condition, &noise);
        let critic_trace = self.critic.forward(condition, &generator_trace.output);

        let loss = generator_loss(&critic_trace.output);
        let grad_fake = self.critic.target_gradient(&critic_trace, &generator_loss_grad(&critic_trace.output));
        let network = &self.generator.network;
        let gradients = network.backward(&generator_trace, &grad_fake, true).grads
            .unwrap_or_else(|| Gradients::zeros_like(&network.parameters()));

        GeneratorUpdate { loss, gradients }
    }

    pub fn apply_generator_update(&mut self, update: &GeneratorUpdate) -> Result<()> {
        ensure_finite("generator", update.loss, &update.gradients)?;
        self.generator_optimizer.step(&mut self.generator.network, &update.gradients)?;
        debug!(
            "generator step: loss {:.6}, grad norm {:.6}",
            update.loss,
            update.gradients.global_norm()
        );
        Ok(())
    }

    /// `-critic_loss(real, fake)` with both networks in inference mode and
    /// fresh noise.
    pub fn wasserstein_estimate<R: Rng>(&self, condition: &Matrix, real: &Matrix, rng: &mut R) -> f64 {
        let noise = self.generator.sample_noise(condition.rows, rng);
        let fake = self.generator.generate(condition, &noise);
        wasserstein_estimate(
            &self.critic.score(condition, real),
            &self.critic.score(condition, &fake),
        )
    }

    /// Overwrites the generator's weights, e.g. from a checkpoint.
    pub fn restore_generator(&mut self, network: &Network) -> Result<()> {
        self.generator.network.copy_parameters_from(network)
    }

    pub fn restore_critic(&mut self, network: &Network) -> Result<()> {
        self.critic.network.copy_parameters_from(network)
    }
}

fn ensure_finite(network: &'static str, loss: f64, gradients: &Gradients) -> Result<()> {
    if !loss.is_finite() {
        return Err(WganError::NumericalInstability { network, detail: format!("loss is {loss}") });
    }
    if !gradients.is_finite() {
        return Err(WganError::NumericalInstability {
            network,
            detail: "non-finite parameter gradient".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gan::penalty::Interpolation;
    use crate::gan::task::Task;
    use crate::gan::vector_task::VectorTask;
    use crate::optim::optimizer::OptimizerKind;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn small_model(rng: &mut StdRng, clipping: Option<WeightClipping>) -> ConditionalWgan {
        let task = VectorTask { hidden_width: 8, hidden_layers: 2, ..VectorTask::default() };
        ConditionalWgan::new(
            task.build_generator(3, rng),
            task.build_critic(rng),
            Optimizer::new(OptimizerKind::Adam, 1e-3),
            Optimizer::new(OptimizerKind::RmsProp, 1e-3),
            GradientPenalty::new(10.0, Interpolation::Uniform),
            clipping,
        )
    }

    fn batch(rng: &mut StdRng) -> (Matrix, Matrix) {
        (Matrix::glorot_uniform(4, 4, 1, 1, rng), Matrix::glorot_uniform(4, 4, 1, 1, rng))
    }

    #[test]
    fn critic_step_only_moves_the_critic() {
        let mut rng = StdRng::seed_from_u64(50);
        let mut model = small_model(&mut rng, None);
        let (x, y) = batch(&mut rng);
        let generator_before = model.generator().network.clone();
        let critic_before = model.critic().network.clone();

        let update = model.critic_update(&x, &y, &mut rng);
        assert!(update.loss.is_finite());
        model.apply_critic_update(&update).unwrap();

        assert_eq!(model.generator().network.parameters(), generator_before.parameters());
        assert_ne!(model.critic().network.parameters(), critic_before.parameters());
    }

    #[test]
    fn generator_step_only_moves_the_generator() {
        let mut rng = StdRng::seed_from_u64(51);
        let mut model = small_model(&mut rng, None);
        let (x, _) = batch(&mut rng);
        let critic_before = model.critic().network.clone();

        let update = model.generator_update(&x, &mut rng);
        model.apply_generator_update(&update).unwrap();

        assert_eq!(model.critic().network.parameters(), critic_before.parameters());
    }

    #[test]
    fn non_finite_loss_is_rejected_without_update() {
        let mut rng = StdRng::seed_from_u64(52);
        let mut model = small_model(&mut rng, None);
        let (x, y) = batch(&mut rng);
        let mut update = model.critic_update(&x, &y, &mut rng);
        update.loss = f64::NAN;
        let before = model.critic().network.clone();
        assert!(matches!(
            model.apply_critic_update(&update),
            Err(WganError::NumericalInstability { network: "critic", .. })
        ));
        assert_eq!(model.critic().network.parameters(), before.parameters());
    }

    #[test]
    fn non_finite_gradient_is_rejected_without_update() {
        let mut rng = StdRng::seed_from_u64(54);
        let mut model = small_model(&mut rng, None);
        let (x, _) = batch(&mut rng);
        let mut update = model.generator_update(&x, &mut rng);
        assert!(update.loss.is_finite());
        update.gradients.tensors[0].data[0][0] = f64::INFINITY;
        let before = model.generator().network.clone();
        let err = model.apply_generator_update(&update).unwrap_err();
        assert!(matches!(
            err,
            WganError::NumericalInstability { network: "generator", ref detail } if detail.contains("gradient")
        ));
        assert_eq!(model.generator().network.parameters(), before.parameters());
    }

    #[test]
    fn clipping_runs_after_critic_steps() {
        let mut rng = StdRng::seed_from_u64(53);
        let mut model = small_model(&mut rng, Some(WeightClipping::new(0.005)));
        let (x, y) = batch(&mut rng);
        let update = model.critic_update(&x, &y, &mut rng);
        model.apply_critic_update(&update).unwrap();
        assert!(model.critic().network.parameters().iter().all(|p| p.max_abs() <= 0.005));
    }
}
