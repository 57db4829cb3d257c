use std::io::Write;
use std::path::Path;

use serde::{Serialize, Deserialize};

use crate::error::{Result, WganError};
use crate::layers::layer::Layer;
use crate::math::matrix::Matrix;
use crate::network::trace::{Backprop, DoubleBackprop, Gradients, Trace};

/// A feed-forward stack of layers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Network {
    pub layers: Vec<Layer>,
}

impl Network {
    pub fn new(layers: Vec<Layer>) -> Network {
        for pair in layers.windows(2) {
            assert_eq!(
                pair[0].output_width(),
                pair[1].input_width(),
                "consecutive layers must agree on width"
            );
        }
        Network { layers }
    }

    pub fn input_width(&self) -> usize {
        self.layers.first().map_or(0, Layer::input_width)
    }

    pub fn output_width(&self) -> usize {
        self.layers.last().map_or(0, Layer::output_width)
    }

    /// Training-mode forward pass; records what back-propagation needs.
    pub fn forward(&self, input: &Matrix) -> Trace {
        let mut current = input.clone();
        let mut layers = Vec::with_capacity(self.layers.len());
        for layer in &self.layers {
            let (out, trace) = layer.forward(&current);
            layers.push(trace);
            current = out;
        }
        Trace { layers, output: current }
    }

    /// Inference-mode forward pass; records nothing and cannot mutate.
    pub fn predict(&self, input: &Matrix) -> Matrix {
        self.layers.iter().fold(input.clone(), |current, layer| layer.predict(&current))
    }

    /// Back-propagates `grad_out` (∂L/∂output) through the recorded trace.
    /// Parameter gradients are only accumulated when `with_params` is set.
    pub fn backward(&self, trace: &Trace, grad_out: &Matrix, with_params: bool) -> Backprop {
        let mut delta = grad_out.clone();
        let mut per_layer: Vec<Option<Vec<Matrix>>> = Vec::with_capacity(self.layers.len());
        let mut records = Vec::with_capacity(self.layers.len());

        for (layer, layer_trace) in self.layers.iter().zip(trace.layers.iter()).rev() {
            let (input_grad, grads, record) = layer.backward(layer_trace, &delta, with_params);
            per_layer.push(grads);
            records.push(record);
            delta = input_grad;
        }
        per_layer.reverse();
        records.reverse();

        let grads = with_params.then(|| Gradients::new(
            per_layer.into_iter().flatten().flatten().collect()
        ));
        Backprop { input_grad: delta, grads, layers: records }
    }

    /// Differentiates a penalty `P(input_grad)` with respect to the
    /// parameters, given `adjoint = ∂P/∂input_grad`.
    ///
    /// The first sweep walks the layers input-to-output, pulling the adjoint
    /// through each layer's backward map. The second sweep back-propagates
    /// whatever curvature terms the activations produced through the forward
    /// graph; it is skipped entirely for piecewise-linear networks.
    pub fn double_backward(&self, trace: &Trace, backprop: &Backprop, adjoint: &Matrix) -> DoubleBackprop {
        let mut per_layer = Vec::with_capacity(self.layers.len());
        let mut curvature = Vec::with_capacity(self.layers.len());
        let mut current = adjoint.clone();

        for ((layer, layer_trace), record) in self.layers.iter()
            .zip(trace.layers.iter())
            .zip(backprop.layers.iter())
        {
            let (grads, output_adjoint, input_adjoint) = layer.double_backward(layer_trace, record, &current);
            per_layer.push(grads);
            curvature.push(input_adjoint);
            current = output_adjoint;
        }

        // ∂P/∂(output of layer i), carried backwards
        let mut carried: Option<Matrix> = None;
        for (i, layer) in self.layers.iter().enumerate().rev() {
            if let Some(upstream) = carried.take() {
                let (input_grad, grads, _) = layer.backward(&trace.layers[i], &upstream, true);
                for (acc, g) in per_layer[i].iter_mut().zip(grads.into_iter().flatten()) {
                    acc.add_assign(&g);
                }
                carried = Some(input_grad);
            }
            carried = match (carried, curvature[i].take()) {
                (Some(mut a), Some(c)) => {
                    a.add_assign(&c);
                    Some(a)
                }
                (a, c) => a.or(c),
            };
        }

        DoubleBackprop {
            grads: Gradients::new(per_layer.into_iter().flatten().collect()),
            output_grad_adjoint: current,
            input_adjoint: carried,
        }
    }

    pub fn parameters(&self) -> Vec<&Matrix> {
        self.layers.iter().flat_map(Layer::parameters).collect()
    }

    pub fn parameters_mut(&mut self) -> Vec<&mut Matrix> {
        self.layers.iter_mut().flat_map(Layer::parameters_mut).collect()
    }

    pub fn parameter_count(&self) -> usize {
        self.parameters().iter().map(|p| p.rows * p.cols).sum()
    }

    /// Copies every parameter tensor from `other`, which must have the same
    /// parameter layout.
    pub fn copy_parameters_from(&mut self, other: &Network) -> Result<()> {
        let source = other.parameters();
        let mut target = self.parameters_mut();
        if source.len() != target.len() {
            return Err(WganError::Shape(format!(
                "expected {} parameter tensors, found {}",
                target.len(),
                source.len()
            )));
        }
        for (i, (dst, src)) in target.iter().zip(source.iter()).enumerate() {
            if dst.shape() != src.shape() {
                return Err(WganError::Shape(format!(
                    "parameter {i}: expected {:?}, found {:?}",
                    dst.shape(),
                    src.shape()
                )));
            }
        }
        for (dst, src) in target.iter_mut().zip(source) {
            **dst = src.clone();
        }
        Ok(())
    }

    /// Serializes the network (architecture and weights) to a pretty-printed JSON file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let persistence = |detail: String| WganError::Persistence { path: path.to_path_buf(), detail };
        let file = std::fs::File::create(path).map_err(|e| persistence(e.to_string()))?;
        let mut writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self).map_err(|e| persistence(e.to_string()))?;
        writer.flush().map_err(|e| persistence(e.to_string()))
    }

    /// Deserializes a network from a JSON file previously written by `save_json`.
    pub fn load_json(path: &Path) -> Result<Network> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        serde_json::from_reader(reader)
            .map_err(|e| WganError::Data(format!("{}: {e}", path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::activation::ActivationFunction;
    use crate::layers::{Branch, Conv2d, ConvTranspose2d, Dense, Padding};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    /// P = Σ_rows (‖∂S/∂x‖² ) where S = Σ output, taken at input x.
    fn penalty(net: &Network, x: &Matrix) -> f64 {
        let trace = net.forward(x);
        let ones = Matrix::filled(x.rows, net.output_width(), 1.0);
        let g = net.backward(&trace, &ones, false).input_grad;
        g.hadamard(&g).sum()
    }

    fn check_double_backward(mut net: Network, x: Matrix) {
        let trace = net.forward(&x);
        let ones = Matrix::filled(x.rows, net.output_width(), 1.0);
        let back = net.backward(&trace, &ones, false);
        // ∂P/∂g = 2g
        let adjoint = back.input_grad.scale(2.0);
        let analytic = net.double_backward(&trace, &back, &adjoint).grads;

        let h = 1e-5;
        let count = net.parameters().len();
        for p in 0..count {
            let (rows, cols) = net.parameters()[p].shape();
            for (r, c) in [(0, 0), (rows / 2, cols / 2), (rows - 1, cols - 1)] {
                let original = net.parameters()[p].data[r][c];
                net.parameters_mut()[p].data[r][c] = original + h;
                let up = penalty(&net, &x);
                net.parameters_mut()[p].data[r][c] = original - h;
                let down = penalty(&net, &x);
                net.parameters_mut()[p].data[r][c] = original;
                let fd = (up - down) / (2.0 * h);
                let got = analytic.tensors[p].data[r][c];
                assert!(
                    (fd - got).abs() < 1e-5 * (1.0 + fd.abs()),
                    "param {p} [{r},{c}]: finite difference {fd} vs analytic {got}"
                );
            }
        }
    }

    #[test]
    fn double_backward_dense_smooth() {
        let mut rng = StdRng::seed_from_u64(10);
        let net = Network::new(vec![
            Layer::Dense(Dense::new(5, 3, ActivationFunction::Tanh, &mut rng)),
            Layer::Dense(Dense::new(4, 5, ActivationFunction::Sigmoid, &mut rng)),
            Layer::Dense(Dense::new(1, 4, ActivationFunction::Identity, &mut rng)),
        ]);
        let x = Matrix::glorot_uniform(3, 3, 1, 1, &mut rng);
        check_double_backward(net, x);
    }

    #[test]
    fn double_backward_dense_relu() {
        let mut rng = StdRng::seed_from_u64(11);
        let net = Network::new(vec![
            Layer::Dense(Dense::new(6, 4, ActivationFunction::ReLU, &mut rng)),
            Layer::Dense(Dense::new(6, 6, ActivationFunction::ReLU, &mut rng)),
            Layer::Dense(Dense::new(1, 6, ActivationFunction::Identity, &mut rng)),
        ]);
        let x = Matrix::glorot_uniform(2, 4, 1, 1, &mut rng);
        check_double_backward(net, x);
    }

    #[test]
    fn double_backward_convolutional() {
        let mut rng = StdRng::seed_from_u64(12);
        let conv = Conv2d::new((4, 4, 2), 3, 3, 2, Padding::Same, true, ActivationFunction::Tanh, &mut rng);
        let up = ConvTranspose2d::new((2, 2, 3), 2, 3, 2, false, ActivationFunction::Tanh, &mut rng);
        let head = Conv2d::new((4, 4, 2), 1, 4, 1, Padding::Valid, true, ActivationFunction::Identity, &mut rng);
        let net = Network::new(vec![
            Layer::Conv2d(conv),
            Layer::ConvTranspose2d(up),
            Layer::Conv2d(head),
        ]);
        let x = Matrix::glorot_uniform(2, 32, 1, 1, &mut rng);
        check_double_backward(net, x);
    }

    #[test]
    fn double_backward_through_branch() {
        let mut rng = StdRng::seed_from_u64(13);
        let left = Network::new(vec![Layer::Dense(Dense::new(3, 2, ActivationFunction::Tanh, &mut rng))]);
        let right = Network::new(vec![Layer::Dense(Dense::new(2, 3, ActivationFunction::Sigmoid, &mut rng))]);
        let net = Network::new(vec![
            Layer::Branch(Branch::new(vec![(2, left), (3, right)])),
            Layer::Dense(Dense::new(1, 5, ActivationFunction::Identity, &mut rng)),
        ]);
        let x = Matrix::glorot_uniform(2, 5, 1, 1, &mut rng);
        check_double_backward(net, x);
    }

    #[test]
    fn predict_matches_forward() {
        let mut rng = StdRng::seed_from_u64(14);
        let net = Network::new(vec![
            Layer::Dense(Dense::new(4, 2, ActivationFunction::leaky(), &mut rng)),
            Layer::Dense(Dense::new(2, 4, ActivationFunction::Identity, &mut rng)),
        ]);
        let x = Matrix::glorot_uniform(3, 2, 1, 1, &mut rng);
        assert_eq!(net.predict(&x), net.forward(&x).output);
    }

    #[test]
    fn copy_parameters_rejects_other_layouts() {
        let mut rng = StdRng::seed_from_u64(15);
        let mut a = Network::new(vec![Layer::Dense(Dense::new(2, 2, ActivationFunction::ReLU, &mut rng))]);
        let b = Network::new(vec![Layer::Dense(Dense::new(3, 2, ActivationFunction::ReLU, &mut rng))]);
        assert!(matches!(a.copy_parameters_from(&b), Err(WganError::Shape(_))));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn save_reports_a_failed_flush() {
        let mut rng = StdRng::seed_from_u64(16);
        let net = Network::new(vec![Layer::Dense(Dense::new(2, 2, ActivationFunction::ReLU, &mut rng))]);
        assert!(matches!(
            net.save_json(Path::new("/dev/full")),
            Err(WganError::Persistence { .. })
        ));
    }
}
