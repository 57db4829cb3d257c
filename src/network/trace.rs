use crate::math::matrix::Matrix;

/// Activations recorded by a training-mode forward pass.
///
/// A trace belongs to the forward call that produced it; it is never shared
/// between the generator and the critic.
#[derive(Debug, Clone)]
pub struct Trace {
    pub layers: Vec<LayerTrace>,
    pub output: Matrix,
}

#[derive(Debug, Clone)]
pub enum LayerTrace {
    Linear { input: Matrix, pre_activation: Matrix },
    Branch(Vec<Trace>),
}

/// Output of a backward pass, keeping the per-layer gradients the
/// second-order pass needs.
#[derive(Debug, Clone)]
pub struct Backprop {
    pub input_grad: Matrix,
    pub grads: Option<Gradients>,
    pub layers: Vec<LayerBackprop>,
}

#[derive(Debug, Clone)]
pub enum LayerBackprop {
    Linear { grad_out: Matrix, delta: Matrix },
    Branch(Vec<Backprop>),
}

/// Derivatives of a penalty on a network's input gradient.
#[derive(Debug, Clone)]
pub struct DoubleBackprop {
    pub grads: Gradients,
    /// ∂P/∂(gradient seeded at the network output).
    pub output_grad_adjoint: Matrix,
    /// ∂P/∂input through activation curvature; `None` when it vanishes.
    pub input_adjoint: Option<Matrix>,
}

/// Parameter gradients, one tensor per entry of `Network::parameters()`.
#[derive(Debug, Clone, PartialEq)]
pub struct Gradients {
    pub tensors: Vec<Matrix>,
}

impl Gradients {
    pub fn new(tensors: Vec<Matrix>) -> Gradients {
        Gradients { tensors }
    }

    pub fn zeros_like(params: &[&Matrix]) -> Gradients {
        Gradients {
            tensors: params.iter().map(|p| Matrix::zeros(p.rows, p.cols)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }

    pub fn add_assign(&mut self, other: &Gradients) {
        assert_eq!(self.tensors.len(), other.tensors.len(), "gradient layouts differ");
        for (a, b) in self.tensors.iter_mut().zip(other.tensors.iter()) {
            a.add_assign(b);
        }
    }

    pub fn scale(&self, factor: f64) -> Gradients {
        Gradients {
            tensors: self.tensors.iter().map(|t| t.scale(factor)).collect(),
        }
    }

    pub fn is_finite(&self) -> bool {
        self.tensors.iter().all(Matrix::is_finite)
    }

    pub fn global_norm(&self) -> f64 {
        self.tensors.iter()
            .flat_map(|t| t.data.iter().flat_map(|row| row.iter()))
            .map(|x| x * x)
            .sum::<f64>()
            .sqrt()
    }
}
