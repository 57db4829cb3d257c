use rand::rngs::StdRng;

use crate::activation::activation::ActivationFunction;
use crate::gan::critic::Critic;
use crate::gan::generator::Generator;
use crate::gan::layout::ConditionLayout;
use crate::gan::task::Task;
use crate::layers::{Dense, Layer};
use crate::network::network::Network;

/// Dense generator and critic for fixed-width vector pairs.
#[derive(Debug, Clone)]
pub struct VectorTask {
    pub condition_dims: usize,
    pub target_dims: usize,
    pub hidden_width: usize,
    pub hidden_layers: usize,
}

impl Default for VectorTask {
    fn default() -> Self {
        VectorTask {
            condition_dims: 4,
            target_dims: 4,
            hidden_width: 512,
            hidden_layers: 5,
        }
    }
}

impl VectorTask {
    /// `hidden_layers` ReLU layers of `hidden_width`, then a linear head.
    fn dense_stack(&self, input: usize, output: usize, rng: &mut StdRng) -> Network {
        let mut layers = Vec::with_capacity(self.hidden_layers + 1);
        let mut width = input;
        for _ in 0..self.hidden_layers {
            layers.push(Layer::Dense(Dense::new(self.hidden_width, width, ActivationFunction::ReLU, rng)));
            width = self.hidden_width;
        }
        layers.push(Layer::Dense(Dense::new(output, width, ActivationFunction::Identity, rng)));
        Network::new(layers)
    }
}

impl Task for VectorTask {
    fn name(&self) -> &'static str {
        "vector"
    }

    fn condition_dims(&self) -> usize {
        self.condition_dims
    }

    fn target_shape(&self) -> Vec<usize> {
        vec![self.target_dims]
    }

    fn build_generator(&self, noise_dims: usize, rng: &mut StdRng) -> Generator {
        let network = self.dense_stack(self.condition_dims + noise_dims, self.target_dims, rng);
        Generator::new(network, self.condition_dims, noise_dims, self.target_shape())
    }

    fn build_critic(&self, rng: &mut StdRng) -> Critic {
        let layout = ConditionLayout::Columns {
            condition_dims: self.condition_dims,
            target_dims: self.target_dims,
        };
        Critic::new(self.dense_stack(layout.input_width(), 1, rng), layout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::matrix::Matrix;
    use rand::SeedableRng;

    #[test]
    fn default_architecture_matches_five_wide_layers() {
        let mut rng = StdRng::seed_from_u64(20);
        let task = VectorTask::default();
        let generator = task.build_generator(10, &mut rng);
        assert_eq!(generator.network.layers.len(), 6);
        assert_eq!(generator.network.input_width(), 14);
        let critic = task.build_critic(&mut rng);
        assert_eq!(critic.network.input_width(), 8);
        let x = Matrix::zeros(3, 4);
        let y = generator.generate(&x, &generator.sample_noise(3, &mut rng));
        assert_eq!(y.shape(), (3, 4));
        assert_eq!(critic.score(&x, &y).shape(), (3, 1));
    }
}
