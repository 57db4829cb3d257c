use serde::{Serialize, Deserialize};

use crate::math::matrix::Matrix;
use crate::network::network::Network;
use crate::network::trace::{Backprop, DoubleBackprop, Trace};

/// One input slice of a `Branch` and the sub-network applied to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchSegment {
    pub width: usize,
    pub network: Network,
}

/// Splits its input columns into consecutive segments, runs a separate
/// sub-network on each and concatenates the results.
///
/// Lets a generator embed the condition and the noise through their own
/// dense stacks before merging them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Branch {
    pub segments: Vec<BranchSegment>,
}

impl Branch {
    pub fn new(segments: Vec<(usize, Network)>) -> Branch {
        Branch {
            segments: segments.into_iter()
                .map(|(width, network)| BranchSegment { width, network })
                .collect(),
        }
    }

    pub fn input_width(&self) -> usize {
        self.segments.iter().map(|s| s.width).sum()
    }

    pub fn output_width(&self) -> usize {
        self.segments.iter().map(|s| s.network.output_width()).sum()
    }

    fn split(&self, input: &Matrix) -> Vec<Matrix> {
        assert_eq!(input.cols, self.input_width(), "branch input width");
        let mut start = 0;
        self.segments.iter()
            .map(|s| {
                let part = input.columns(start, start + s.width);
                start += s.width;
                part
            })
            .collect()
    }

    fn split_outputs(&self, grad: &Matrix) -> Vec<Matrix> {
        let mut start = 0;
        self.segments.iter()
            .map(|s| {
                let width = s.network.output_width();
                let part = grad.columns(start, start + width);
                start += width;
                part
            })
            .collect()
    }

    pub fn forward(&self, input: &Matrix) -> (Matrix, Vec<Trace>) {
        let traces: Vec<Trace> = self.segments.iter()
            .zip(self.split(input))
            .map(|(s, part)| s.network.forward(&part))
            .collect();
        let outputs: Vec<&Matrix> = traces.iter().map(|t| &t.output).collect();
        (Matrix::concat_cols(&outputs), traces)
    }

    pub fn predict(&self, input: &Matrix) -> Matrix {
        let outputs: Vec<Matrix> = self.segments.iter()
            .zip(self.split(input))
            .map(|(s, part)| s.network.predict(&part))
            .collect();
        Matrix::concat_cols(&outputs.iter().collect::<Vec<_>>())
    }

    pub fn backward(&self, traces: &[Trace], grad_out: &Matrix, with_params: bool) -> (Matrix, Option<Vec<Matrix>>, Vec<Backprop>) {
        let backprops: Vec<Backprop> = self.segments.iter()
            .zip(traces.iter())
            .zip(self.split_outputs(grad_out))
            .map(|((s, trace), g)| s.network.backward(trace, &g, with_params))
            .collect();
        let input_grads: Vec<&Matrix> = backprops.iter().map(|b| &b.input_grad).collect();
        let input_grad = Matrix::concat_cols(&input_grads);
        let grads = with_params.then(|| {
            backprops.iter()
                .flat_map(|b| b.grads.iter().flat_map(|g| g.tensors.iter().cloned()))
                .collect()
        });
        (input_grad, grads, backprops)
    }

    pub fn double_backward(&self, traces: &[Trace], backprops: &[Backprop], adjoint: &Matrix) -> (Vec<Matrix>, Matrix, Option<Matrix>) {
        let parts: Vec<DoubleBackprop> = self.segments.iter()
            .zip(traces.iter().zip(backprops.iter()))
            .zip(self.split(adjoint))
            .map(|((s, (trace, back)), adj)| s.network.double_backward(trace, back, &adj))
            .collect();

        let grads = parts.iter().flat_map(|p| p.grads.tensors.iter().cloned()).collect();
        let output_adjoints: Vec<&Matrix> = parts.iter().map(|p| &p.output_grad_adjoint).collect();
        let output_grad_adjoint = Matrix::concat_cols(&output_adjoints);

        let input_adjoint = if parts.iter().any(|p| p.input_adjoint.is_some()) {
            let filled: Vec<Matrix> = parts.iter()
                .zip(self.segments.iter())
                .map(|(p, s)| p.input_adjoint.clone()
                    .unwrap_or_else(|| Matrix::zeros(adjoint.rows, s.width)))
                .collect();
            Some(Matrix::concat_cols(&filled.iter().collect::<Vec<_>>()))
        } else {
            None
        };

        (grads, output_grad_adjoint, input_adjoint)
    }

    pub fn parameters(&self) -> Vec<&Matrix> {
        self.segments.iter().flat_map(|s| s.network.parameters()).collect()
    }

    pub fn parameters_mut(&mut self) -> Vec<&mut Matrix> {
        self.segments.iter_mut().flat_map(|s| s.network.parameters_mut()).collect()
    }
}
