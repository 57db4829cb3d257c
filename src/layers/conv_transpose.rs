use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::{activation::activation::ActivationFunction, math::matrix::Matrix};
use crate::layers::conv::{add_channel_bias, channel_sums, ConvGeometry, Padding};
use crate::layers::linear::LinearLayer;

/// Transposed 2-D convolution ("deconvolution") with `same` padding.
///
/// Implemented as the adjoint of a strided correlation whose input is this
/// layer's output: an `(h, w, c_in)` input becomes `(h·s, w·s, filters)`.
/// `geometry` describes that underlying correlation, so its *input* is this
/// layer's output and vice versa.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvTranspose2d {
    pub geometry: ConvGeometry,
    pub kernel: Matrix,
    pub biases: Option<Matrix>,
    pub activator: ActivationFunction,
}

impl ConvTranspose2d {
    pub fn new<R: Rng>(
        input: (usize, usize, usize),
        filters: usize,
        kernel: usize,
        stride: usize,
        use_bias: bool,
        activation: ActivationFunction,
        rng: &mut R,
    ) -> ConvTranspose2d {
        let (height, width, channels) = input;
        let geometry = ConvGeometry::new(
            (height * stride, width * stride, filters),
            channels,
            kernel,
            stride,
            Padding::Same,
        );
        debug_assert_eq!((geometry.out_height, geometry.out_width), (height, width));
        let field = kernel * kernel;
        ConvTranspose2d {
            kernel: Matrix::glorot_uniform(
                geometry.kernel_rows(),
                channels,
                field * channels,
                field * filters,
                rng,
            ),
            biases: use_bias.then(|| Matrix::zeros(1, filters)),
            geometry,
            activator: activation,
        }
    }

    pub fn input_shape(&self) -> (usize, usize, usize) {
        (self.geometry.out_height, self.geometry.out_width, self.geometry.out_channels)
    }

    pub fn output_shape(&self) -> (usize, usize, usize) {
        (self.geometry.in_height, self.geometry.in_width, self.geometry.in_channels)
    }

    pub fn parameters(&self) -> Vec<&Matrix> {
        std::iter::once(&self.kernel).chain(self.biases.iter()).collect()
    }

    pub fn parameters_mut(&mut self) -> Vec<&mut Matrix> {
        std::iter::once(&mut self.kernel).chain(self.biases.iter_mut()).collect()
    }
}

impl LinearLayer for ConvTranspose2d {
    fn activator(&self) -> &ActivationFunction {
        &self.activator
    }

    fn has_bias(&self) -> bool {
        self.biases.is_some()
    }

    fn apply(&self, input: &Matrix) -> Matrix {
        self.geometry.correlate_transpose(input, &self.kernel)
    }

    fn apply_transpose(&self, delta: &Matrix) -> Matrix {
        self.geometry.correlate(delta, &self.kernel)
    }

    fn kernel_gradient(&self, input: &Matrix, delta: &Matrix) -> Matrix {
        // ⟨Cᵀ·h, δ⟩ = ⟨C·δ, h⟩
        self.geometry.kernel_gradient(delta, input)
    }

    fn bias_gradient(&self, delta: &Matrix) -> Matrix {
        channel_sums(delta, self.geometry.in_channels)
    }

    fn add_bias(&self, z: &mut Matrix) {
        if let Some(bias) = &self.biases {
            add_channel_bias(z, bias);
        }
    }

    fn bias_shape(&self) -> (usize, usize) {
        (1, self.geometry.in_channels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn upsamples_by_stride() {
        let mut rng = StdRng::seed_from_u64(5);
        let layer = ConvTranspose2d::new((7, 7, 4), 2, 5, 2, false, ActivationFunction::leaky(), &mut rng);
        assert_eq!(layer.output_shape(), (14, 14, 2));
        let (out, _) = layer.forward(&Matrix::filled(3, 7 * 7 * 4, 0.5));
        assert_eq!(out.shape(), (3, 14 * 14 * 2));
    }

    #[test]
    fn gradients_match_finite_differences() {
        let mut rng = StdRng::seed_from_u64(6);
        let layer = ConvTranspose2d::new((3, 3, 2), 2, 3, 2, true, ActivationFunction::Tanh, &mut rng);
        let x = Matrix::glorot_uniform(2, 3 * 3 * 2, 1, 1, &mut rng);
        let (out, z) = layer.forward(&x);
        let back = layer.backward(&x, &z, &Matrix::filled(out.rows, out.cols, 1.0), true);
        let h = 1e-6;
        let mut plus = x.clone();
        plus.data[1][4] += h;
        let mut minus = x.clone();
        minus.data[1][4] -= h;
        let fd = (layer.forward(&plus).0.sum() - layer.forward(&minus).0.sum()) / (2.0 * h);
        assert!((fd - back.input_grad.data[1][4]).abs() < 1e-6);

        let grads = back.param_grads.expect("requested");
        let mut bumped = layer.clone();
        bumped.kernel.data[5][1] += h;
        let mut lowered = layer.clone();
        lowered.kernel.data[5][1] -= h;
        let fd = (bumped.forward(&x).0.sum() - lowered.forward(&x).0.sum()) / (2.0 * h);
        assert!((fd - grads[0].data[5][1]).abs() < 1e-6);
    }
}
