use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::{activation::activation::ActivationFunction, math::matrix::Matrix};
use crate::layers::linear::LinearLayer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Padding {
    /// Output spatial size is `ceil(input / stride)`; padding split with the
    /// smaller half before the image.
    Same,
    /// No padding.
    Valid,
}

/// Spatial bookkeeping for a 2-D cross-correlation over NHWC rows.
///
/// Kernels are stored as a matrix with `kernel * kernel * in_channels` rows
/// (row index `(ky * kernel + kx) * in_channels + ci`) and `out_channels`
/// columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvGeometry {
    pub in_height: usize,
    pub in_width: usize,
    pub in_channels: usize,
    pub out_height: usize,
    pub out_width: usize,
    pub out_channels: usize,
    pub kernel: usize,
    pub stride: usize,
    pub pad_top: usize,
    pub pad_left: usize,
}

impl ConvGeometry {
    pub fn new(
        input: (usize, usize, usize),
        out_channels: usize,
        kernel: usize,
        stride: usize,
        padding: Padding,
    ) -> ConvGeometry {
        let (in_height, in_width, in_channels) = input;
        assert!(stride > 0 && kernel > 0, "kernel and stride must be positive");
        let (out_height, pad_top) = Self::axis(in_height, kernel, stride, padding);
        let (out_width, pad_left) = Self::axis(in_width, kernel, stride, padding);
        ConvGeometry {
            in_height,
            in_width,
            in_channels,
            out_height,
            out_width,
            out_channels,
            kernel,
            stride,
            pad_top,
            pad_left,
        }
    }

    fn axis(size: usize, kernel: usize, stride: usize, padding: Padding) -> (usize, usize) {
        match padding {
            Padding::Same => {
                let out = size.div_ceil(stride);
                let pad_total = ((out - 1) * stride + kernel).saturating_sub(size);
                (out, pad_total / 2)
            }
            Padding::Valid => {
                assert!(size >= kernel, "valid convolution needs input >= kernel");
                ((size - kernel) / stride + 1, 0)
            }
        }
    }

    pub fn input_len(&self) -> usize {
        self.in_height * self.in_width * self.in_channels
    }

    pub fn output_len(&self) -> usize {
        self.out_height * self.out_width * self.out_channels
    }

    pub fn kernel_rows(&self) -> usize {
        self.kernel * self.kernel * self.in_channels
    }

    /// Calls `visit(out_offset, in_offset, kernel_row)` for every
    /// (output position, kernel tap) pair that lands inside the input.
    fn for_each_tap<F: FnMut(usize, usize, usize)>(&self, mut visit: F) {
        for oy in 0..self.out_height {
            for ox in 0..self.out_width {
                let out_offset = (oy * self.out_width + ox) * self.out_channels;
                for ky in 0..self.kernel {
                    let iy = (oy * self.stride + ky) as isize - self.pad_top as isize;
                    if iy < 0 || iy >= self.in_height as isize {
                        continue;
                    }
                    for kx in 0..self.kernel {
                        let ix = (ox * self.stride + kx) as isize - self.pad_left as isize;
                        if ix < 0 || ix >= self.in_width as isize {
                            continue;
                        }
                        let in_offset = (iy as usize * self.in_width + ix as usize) * self.in_channels;
                        let kernel_row = (ky * self.kernel + kx) * self.in_channels;
                        visit(out_offset, in_offset, kernel_row);
                    }
                }
            }
        }
    }

    pub fn correlate(&self, input: &Matrix, kernel: &Matrix) -> Matrix {
        assert_eq!(input.cols, self.input_len(), "convolution input width");
        let mut out = Matrix::zeros(input.rows, self.output_len());
        for (x, y) in input.data.iter().zip(out.data.iter_mut()) {
            self.for_each_tap(|o, i, k| {
                for ci in 0..self.in_channels {
                    let xv = x[i + ci];
                    if xv == 0.0 {
                        continue;
                    }
                    let weights = &kernel.data[k + ci];
                    for (acc, w) in y[o..o + self.out_channels].iter_mut().zip(weights.iter()) {
                        *acc += xv * w;
                    }
                }
            });
        }
        out
    }

    /// Adjoint of `correlate` with respect to its input.
    pub fn correlate_transpose(&self, grad: &Matrix, kernel: &Matrix) -> Matrix {
        assert_eq!(grad.cols, self.output_len(), "convolution output width");
        let mut out = Matrix::zeros(grad.rows, self.input_len());
        for (dy, dx) in grad.data.iter().zip(out.data.iter_mut()) {
            self.for_each_tap(|o, i, k| {
                let g = &dy[o..o + self.out_channels];
                for ci in 0..self.in_channels {
                    let weights = &kernel.data[k + ci];
                    dx[i + ci] += g.iter().zip(weights.iter()).map(|(a, b)| a * b).sum::<f64>();
                }
            });
        }
        out
    }

    /// ∂⟨correlate(input, K), grad⟩/∂K
    pub fn kernel_gradient(&self, input: &Matrix, grad: &Matrix) -> Matrix {
        let mut dk = Matrix::zeros(self.kernel_rows(), self.out_channels);
        for (x, dy) in input.data.iter().zip(grad.data.iter()) {
            self.for_each_tap(|o, i, k| {
                let g = &dy[o..o + self.out_channels];
                for ci in 0..self.in_channels {
                    let xv = x[i + ci];
                    if xv == 0.0 {
                        continue;
                    }
                    for (acc, gv) in dk.data[k + ci].iter_mut().zip(g.iter()) {
                        *acc += xv * gv;
                    }
                }
            });
        }
        dk
    }
}

/// Adds a per-channel bias to every spatial position of NHWC rows.
pub(crate) fn add_channel_bias(z: &mut Matrix, bias: &Matrix) {
    let channels = bias.cols;
    for row in z.data.iter_mut() {
        for pixel in row.chunks_mut(channels) {
            for (v, b) in pixel.iter_mut().zip(bias.data[0].iter()) {
                *v += b;
            }
        }
    }
}

/// Sums NHWC rows per channel into a `1 × channels` matrix.
pub(crate) fn channel_sums(delta: &Matrix, channels: usize) -> Matrix {
    let mut res = Matrix::zeros(1, channels);
    for row in &delta.data {
        for pixel in row.chunks(channels) {
            for (acc, v) in res.data[0].iter_mut().zip(pixel.iter()) {
                *acc += v;
            }
        }
    }
    res
}

/// Strided 2-D convolution layer (cross-correlation, NHWC).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conv2d {
    pub geometry: ConvGeometry,
    pub kernel: Matrix,
    pub biases: Option<Matrix>,
    pub activator: ActivationFunction,
}

impl Conv2d {
    #[allow(clippy::too_many_arguments)]
    pub fn new<R: Rng>(
        input: (usize, usize, usize),
        filters: usize,
        kernel: usize,
        stride: usize,
        padding: Padding,
        use_bias: bool,
        activation: ActivationFunction,
        rng: &mut R,
    ) -> Conv2d {
        let geometry = ConvGeometry::new(input, filters, kernel, stride, padding);
        let field = kernel * kernel;
        Conv2d {
            kernel: Matrix::glorot_uniform(
                geometry.kernel_rows(),
                filters,
                field * geometry.in_channels,
                field * filters,
                rng,
            ),
            biases: use_bias.then(|| Matrix::zeros(1, filters)),
            geometry,
            activator: activation,
        }
    }

    pub fn output_shape(&self) -> (usize, usize, usize) {
        (self.geometry.out_height, self.geometry.out_width, self.geometry.out_channels)
    }

    pub fn parameters(&self) -> Vec<&Matrix> {
        std::iter::once(&self.kernel).chain(self.biases.iter()).collect()
    }

    pub fn parameters_mut(&mut self) -> Vec<&mut Matrix> {
        std::iter::once(&mut self.kernel).chain(self.biases.iter_mut()).collect()
    }
}

impl LinearLayer for Conv2d {
    fn activator(&self) -> &ActivationFunction {
        &self.activator
    }

    fn has_bias(&self) -> bool {
        self.biases.is_some()
    }

    fn apply(&self, input: &Matrix) -> Matrix {
        self.geometry.correlate(input, &self.kernel)
    }

    fn apply_transpose(&self, delta: &Matrix) -> Matrix {
        self.geometry.correlate_transpose(delta, &self.kernel)
    }

    fn kernel_gradient(&self, input: &Matrix, delta: &Matrix) -> Matrix {
        self.geometry.kernel_gradient(input, delta)
    }

    fn bias_gradient(&self, delta: &Matrix) -> Matrix {
        channel_sums(delta, self.geometry.out_channels)
    }

    fn add_bias(&self, z: &mut Matrix) {
        if let Some(bias) = &self.biases {
            add_channel_bias(z, bias);
        }
    }

    fn bias_shape(&self) -> (usize, usize) {
        (1, self.geometry.out_channels)
    }
}
