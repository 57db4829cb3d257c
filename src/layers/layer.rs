use serde::{Serialize, Deserialize};

use crate::math::matrix::Matrix;
use crate::layers::branch::Branch;
use crate::layers::conv::Conv2d;
use crate::layers::conv_transpose::ConvTranspose2d;
use crate::layers::dense::Dense;
use crate::layers::linear::LinearLayer;
use crate::network::trace::{LayerBackprop, LayerTrace};

/// One stage of a `Network`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Layer {
    Dense(Dense),
    Conv2d(Conv2d),
    ConvTranspose2d(ConvTranspose2d),
    Branch(Branch),
}

impl Layer {
    fn as_linear(&self) -> Option<&dyn LinearLayer> {
        match self {
            Layer::Dense(l) => Some(l as &dyn LinearLayer),
            Layer::Conv2d(l) => Some(l as &dyn LinearLayer),
            Layer::ConvTranspose2d(l) => Some(l as &dyn LinearLayer),
            Layer::Branch(_) => None,
        }
    }

    pub fn input_width(&self) -> usize {
        match self {
            Layer::Dense(l) => l.input_size,
            Layer::Conv2d(l) => l.geometry.input_len(),
            Layer::ConvTranspose2d(l) => l.geometry.output_len(),
            Layer::Branch(b) => b.input_width(),
        }
    }

    pub fn output_width(&self) -> usize {
        match self {
            Layer::Dense(l) => l.size,
            Layer::Conv2d(l) => l.geometry.output_len(),
            Layer::ConvTranspose2d(l) => l.geometry.input_len(),
            Layer::Branch(b) => b.output_width(),
        }
    }

    pub fn parameters(&self) -> Vec<&Matrix> {
        match self {
            Layer::Dense(l) => l.parameters(),
            Layer::Conv2d(l) => l.parameters(),
            Layer::ConvTranspose2d(l) => l.parameters(),
            Layer::Branch(b) => b.parameters(),
        }
    }

    pub fn parameters_mut(&mut self) -> Vec<&mut Matrix> {
        match self {
            Layer::Dense(l) => l.parameters_mut(),
            Layer::Conv2d(l) => l.parameters_mut(),
            Layer::ConvTranspose2d(l) => l.parameters_mut(),
            Layer::Branch(b) => b.parameters_mut(),
        }
    }

    pub fn forward(&self, input: &Matrix) -> (Matrix, LayerTrace) {
        match (self, self.as_linear()) {
            (_, Some(linear)) => {
                let (a, z) = linear.forward(input);
                (a, LayerTrace::Linear { input: input.clone(), pre_activation: z })
            }
            (Layer::Branch(b), None) => {
                let (out, traces) = b.forward(input);
                (out, LayerTrace::Branch(traces))
            }
            _ => unreachable!("every non-branch layer is linear"),
        }
    }

    pub fn predict(&self, input: &Matrix) -> Matrix {
        match (self, self.as_linear()) {
            (_, Some(linear)) => linear.forward(input).0,
            (Layer::Branch(b), None) => b.predict(input),
            _ => unreachable!("every non-branch layer is linear"),
        }
    }

    /// Returns `(input_grad, param_grads, record)`.
    pub fn backward(
        &self,
        trace: &LayerTrace,
        grad_out: &Matrix,
        with_params: bool,
    ) -> (Matrix, Option<Vec<Matrix>>, LayerBackprop) {
        match (self, trace) {
            (Layer::Branch(b), LayerTrace::Branch(traces)) => {
                let (input_grad, grads, backprops) = b.backward(traces, grad_out, with_params);
                (input_grad, grads, LayerBackprop::Branch(backprops))
            }
            (layer, LayerTrace::Linear { input, pre_activation }) => {
                let linear = layer.as_linear().expect("linear trace recorded by a linear layer");
                let back = linear.backward(input, pre_activation, grad_out, with_params);
                let record = LayerBackprop::Linear { grad_out: grad_out.clone(), delta: back.delta };
                (back.input_grad, back.param_grads, record)
            }
            _ => panic!("trace does not belong to this layer"),
        }
    }

    /// Returns `(param_grads, output_grad_adjoint, input_adjoint)`.
    pub fn double_backward(
        &self,
        trace: &LayerTrace,
        record: &LayerBackprop,
        adjoint: &Matrix,
    ) -> (Vec<Matrix>, Matrix, Option<Matrix>) {
        match (self, trace, record) {
            (Layer::Branch(b), LayerTrace::Branch(traces), LayerBackprop::Branch(backprops)) => {
                b.double_backward(traces, backprops, adjoint)
            }
            (
                layer,
                LayerTrace::Linear { input, pre_activation },
                LayerBackprop::Linear { grad_out, delta },
            ) => {
                let linear = layer.as_linear().expect("linear trace recorded by a linear layer");
                let res = linear.double_backward(input, pre_activation, grad_out, delta, adjoint);
                (res.param_grads, res.output_grad_adjoint, res.input_adjoint)
            }
            _ => panic!("trace does not belong to this layer"),
        }
    }
}
