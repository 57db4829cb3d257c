use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::{activation::activation::ActivationFunction, math::matrix::Matrix};
use crate::layers::linear::LinearLayer;

/// Fully-connected layer: `a = σ(h·W + b)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dense {
    pub size: usize,
    pub input_size: usize,
    pub weights: Matrix,
    pub biases: Matrix,
    pub activator: ActivationFunction
}

impl Dense {
    pub fn new<R: Rng>(size: usize, input_size: usize, activation: ActivationFunction, rng: &mut R) -> Dense {
        Dense {
            size,
            input_size,
            weights: Matrix::glorot_uniform(input_size, size, input_size, size, rng),
            biases: Matrix::zeros(1, size),
            activator: activation
        }
    }

    pub fn parameters(&self) -> Vec<&Matrix> {
        vec![&self.weights, &self.biases]
    }

    pub fn parameters_mut(&mut self) -> Vec<&mut Matrix> {
        vec![&mut self.weights, &mut self.biases]
    }
}

impl LinearLayer for Dense {
    fn activator(&self) -> &ActivationFunction {
        &self.activator
    }

    fn has_bias(&self) -> bool {
        true
    }

    fn apply(&self, input: &Matrix) -> Matrix {
        input.matmul(&self.weights)
    }

    fn apply_transpose(&self, delta: &Matrix) -> Matrix {
        delta.matmul_transposed(&self.weights)
    }

    fn kernel_gradient(&self, input: &Matrix, delta: &Matrix) -> Matrix {
        input.transposed_matmul(delta)
    }

    fn bias_gradient(&self, delta: &Matrix) -> Matrix {
        delta.column_sums()
    }

    fn add_bias(&self, z: &mut Matrix) {
        for row in z.data.iter_mut() {
            for (v, b) in row.iter_mut().zip(self.biases.data[0].iter()) {
                *v += b;
            }
        }
    }

    fn bias_shape(&self) -> (usize, usize) {
        (1, self.size)
    }
}
