use rand::distributions::{Distribution, Uniform};
use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::math::matrix::Matrix;
use crate::network::network::Network;
use crate::network::trace::Trace;

/// Maps a condition and a noise vector to a synthetic target sample.
///
/// The network always receives `[condition | noise]`; architectures that
/// treat the two differently split them internally (see `Branch`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Generator {
    pub network: Network,
    pub condition_dims: usize,
    pub noise_dims: usize,
    pub target_shape: Vec<usize>,
}

impl Generator {
    pub fn new(network: Network, condition_dims: usize, noise_dims: usize, target_shape: Vec<usize>) -> Generator {
        assert_eq!(network.input_width(), condition_dims + noise_dims, "generator input width");
        assert_eq!(network.output_width(), target_shape.iter().product::<usize>(), "generator output width");
        Generator { network, condition_dims, noise_dims, target_shape }
    }

    /// Draws a fresh `rows × noise_dims` noise batch from U[0, 1).
    pub fn sample_noise<R: Rng>(&self, rows: usize, rng: &mut R) -> Matrix {
        let dist = Uniform::new(0.0, 1.0);
        Matrix::from_data(
            (0..rows)
                .map(|_| (0..self.noise_dims).map(|_| dist.sample(rng)).collect())
                .collect()
        )
    }

    fn input(&self, condition: &Matrix, noise: &Matrix) -> Matrix {
        assert_eq!(condition.cols, self.condition_dims, "condition width");
        assert_eq!(noise.cols, self.noise_dims, "noise width");
        Matrix::concat_cols(&[condition, noise])
    }

    /// Inference-mode generation.
    pub fn generate(&self, condition: &Matrix, noise: &Matrix) -> Matrix {
        self.network.predict(&self.input(condition, noise))
    }

    /// Training-mode generation; the trace feeds the generator's own update.
    pub fn forward(&self, condition: &Matrix, noise: &Matrix) -> Trace {
        self.network.forward(&self.input(condition, noise))
    }
}
