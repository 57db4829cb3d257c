use rand::rngs::StdRng;

use crate::activation::activation::ActivationFunction;
use crate::gan::critic::Critic;
use crate::gan::generator::Generator;
use crate::gan::layout::ConditionLayout;
use crate::gan::task::Task;
use crate::layers::{Branch, Conv2d, ConvTranspose2d, Dense, Layer, Padding};
use crate::network::network::Network;

const KERNEL: usize = 5;

/// Convolutional generator and critic for label-conditioned images.
#[derive(Debug, Clone)]
pub struct ImageTask {
    pub classes: usize,
    pub height: usize,
    pub width: usize,
    pub channels: usize,
    /// Filters of the two upsampling blocks before the output layer.
    pub generator_filters: [usize; 2],
    /// Filters of the four strided critic blocks.
    pub critic_filters: [usize; 4],
}

impl Default for ImageTask {
    fn default() -> Self {
        ImageTask {
            classes: 10,
            height: 28,
            width: 28,
            channels: 1,
            generator_filters: [256, 128],
            critic_filters: [64, 128, 256, 512],
        }
    }
}

impl ImageTask {
    fn layout(&self) -> ConditionLayout {
        ConditionLayout::Channels {
            height: self.height,
            width: self.width,
            channels: self.channels,
            condition_dims: self.classes,
        }
    }
}

impl Task for ImageTask {
    fn name(&self) -> &'static str {
        "image"
    }

    fn condition_dims(&self) -> usize {
        self.classes
    }

    fn target_shape(&self) -> Vec<usize> {
        vec![self.height, self.width, self.channels]
    }

    fn build_generator(&self, noise_dims: usize, rng: &mut StdRng) -> Generator {
        assert!(self.height % 4 == 0 && self.width % 4 == 0, "image sides must be divisible by 4");
        let relu = ActivationFunction::ReLU;
        let label_embedding = Network::new(vec![
            Layer::Dense(Dense::new(10, self.classes, relu, rng)),
            Layer::Dense(Dense::new(32, 10, relu, rng)),
        ]);
        let noise_embedding = Network::new(vec![
            Layer::Dense(Dense::new(noise_dims, noise_dims, relu, rng)),
            Layer::Dense(Dense::new(noise_dims, noise_dims, relu, rng)),
        ]);

        let (h, w) = (self.height / 4, self.width / 4);
        let [wide, narrow] = self.generator_filters;
        let seed = (h, w, wide);
        let first = ConvTranspose2d::new(seed, wide, KERNEL, 1, false, ActivationFunction::leaky(), rng);
        let second = ConvTranspose2d::new(first.output_shape(), narrow, KERNEL, 2, false, ActivationFunction::leaky(), rng);
        let output = ConvTranspose2d::new(second.output_shape(), self.channels, KERNEL, 2, false, ActivationFunction::Tanh, rng);

        let network = Network::new(vec![
            Layer::Branch(Branch::new(vec![
                (self.classes, label_embedding),
                (noise_dims, noise_embedding),
            ])),
            Layer::Dense(Dense::new(h * w * wide, 32 + noise_dims, relu, rng)),
            Layer::ConvTranspose2d(first),
            Layer::ConvTranspose2d(second),
            Layer::ConvTranspose2d(output),
        ]);
        Generator::new(network, self.classes, noise_dims, self.target_shape())
    }

    fn build_critic(&self, rng: &mut StdRng) -> Critic {
        let layout = self.layout();
        let mut shape = (self.height, self.width, self.channels + self.classes);
        let mut layers = Vec::with_capacity(self.critic_filters.len() + 1);
        for filters in self.critic_filters {
            let conv = Conv2d::new(shape, filters, KERNEL, 2, Padding::Same, true, ActivationFunction::leaky(), rng);
            shape = conv.output_shape();
            layers.push(Layer::Conv2d(conv));
        }
        // collapse whatever spatial extent remains into one score
        assert_eq!(shape.0, shape.1, "critic expects square feature maps");
        let head = Conv2d::new(shape, 1, shape.0, 1, Padding::Valid, true, ActivationFunction::Identity, rng);
        layers.push(Layer::Conv2d(head));
        Critic::new(Network::new(layers), layout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn small_variant_shapes() {
        let task = ImageTask {
            classes: 3,
            height: 8,
            width: 8,
            channels: 1,
            generator_filters: [4, 2],
            critic_filters: [2, 2, 2, 2],
        };
        let mut rng = StdRng::seed_from_u64(21);
        let generator = task.build_generator(5, &mut rng);
        assert_eq!(generator.network.output_width(), 64);
        let critic = task.build_critic(&mut rng);
        assert_eq!(critic.network.input_width(), 8 * 8 * 4);
        assert_eq!(critic.network.output_width(), 1);
    }
}
