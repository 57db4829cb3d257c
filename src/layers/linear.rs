use crate::{activation::activation::ActivationFunction, math::matrix::Matrix};

/// Result of back-propagating through one layer.
pub struct LayerBackward {
    /// ∂L/∂input
    pub input_grad: Matrix,
    /// δ = ∂L/∂z, the gradient at the pre-activation.
    pub delta: Matrix,
    /// Parameter gradients in `parameters()` order, if requested.
    pub param_grads: Option<Vec<Matrix>>,
}

/// Result of differentiating a penalty `P(∂L/∂input)` back through one layer.
pub struct LayerDoubleBackward {
    /// ∂P/∂θ in `parameters()` order.
    pub param_grads: Vec<Matrix>,
    /// ∂P/∂(gradient arriving at this layer's output).
    pub output_grad_adjoint: Matrix,
    /// ∂P/∂input through the curvature of the activation; `None` when zero.
    pub input_adjoint: Option<Matrix>,
}

/// A layer computing `a = σ(A·h + b)` where `A` is linear in both the input
/// `h` and the kernel.
///
/// Implementors only describe the linear map; forward, backward and the
/// second-order pass used by the gradient penalty are shared.
pub trait LinearLayer {
    fn activator(&self) -> &ActivationFunction;

    fn has_bias(&self) -> bool;

    /// `A·h`, without bias.
    fn apply(&self, input: &Matrix) -> Matrix;

    /// `Aᵀ·δ`
    fn apply_transpose(&self, delta: &Matrix) -> Matrix;

    /// ∂⟨A·input, delta⟩/∂kernel
    fn kernel_gradient(&self, input: &Matrix, delta: &Matrix) -> Matrix;

    /// ∂⟨b, delta⟩/∂b, summed over the batch (and spatial positions).
    fn bias_gradient(&self, delta: &Matrix) -> Matrix;

    fn add_bias(&self, z: &mut Matrix);

    fn bias_shape(&self) -> (usize, usize);

    /// Returns `(activation, pre_activation)`.
    fn forward(&self, input: &Matrix) -> (Matrix, Matrix) {
        let mut z = self.apply(input);
        self.add_bias(&mut z);
        let act = self.activator();
        let a = z.map(|x| act.function(x));
        (a, z)
    }

    fn backward(
        &self,
        input: &Matrix,
        pre_activation: &Matrix,
        grad_out: &Matrix,
        with_params: bool,
    ) -> LayerBackward {
        let act = self.activator();
        // δ = error ⊙ σ'(z)
        let delta = grad_out.hadamard(&pre_activation.map(|x| act.derivative(x)));
        let input_grad = self.apply_transpose(&delta);
        let param_grads = with_params.then(|| self.collect_grads(
            self.kernel_gradient(input, &delta),
            self.bias_gradient(&delta),
        ));
        LayerBackward { input_grad, delta, param_grads }
    }

    /// Given `adjoint = ∂P/∂(input_grad)` from a previous `backward` call with
    /// `grad_out` / `delta`, returns the penalty's derivatives.
    ///
    /// `input_grad = Aᵀ·(g ⊙ σ'(z))` is bilinear in the kernel and δ, so the
    /// kernel term reuses `kernel_gradient` with the adjoint as input.
    fn double_backward(
        &self,
        input: &Matrix,
        pre_activation: &Matrix,
        grad_out: &Matrix,
        delta: &Matrix,
        adjoint: &Matrix,
    ) -> LayerDoubleBackward {
        let act = self.activator();
        let mut kernel_grad = self.kernel_gradient(adjoint, delta);
        let (bias_rows, bias_cols) = self.bias_shape();
        let mut bias_grad = Matrix::zeros(bias_rows, bias_cols);

        let delta_adjoint = self.apply(adjoint);
        let output_grad_adjoint =
            delta_adjoint.hadamard(&pre_activation.map(|x| act.derivative(x)));

        let input_adjoint = if act.is_piecewise_linear() {
            None
        } else {
            let curvature = pre_activation.map(|x| act.second_derivative(x));
            let dz = delta_adjoint.hadamard(grad_out).hadamard(&curvature);
            kernel_grad.add_assign(&self.kernel_gradient(input, &dz));
            if self.has_bias() {
                bias_grad.add_assign(&self.bias_gradient(&dz));
            }
            Some(self.apply_transpose(&dz))
        };

        LayerDoubleBackward {
            param_grads: self.collect_grads(kernel_grad, bias_grad),
            output_grad_adjoint,
            input_adjoint,
        }
    }

    fn collect_grads(&self, kernel: Matrix, bias: Matrix) -> Vec<Matrix> {
        if self.has_bias() {
            vec![kernel, bias]
        } else {
            vec![kernel]
        }
    }
}
