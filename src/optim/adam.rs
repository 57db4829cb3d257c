use crate::math::matrix::Matrix;

/// Adam with bias correction folded into the step size.
#[derive(Debug, Clone)]
pub struct Adam {
    pub learning_rate: f64,
    pub beta1: f64,
    pub beta2: f64,
    pub epsilon: f64,
    beta1_t: f64,
    beta2_t: f64,
    iterations: u64,
    m: Vec<Matrix>,
    v: Vec<Matrix>,
}

impl Adam {
    pub fn new(learning_rate: f64) -> Adam {
        Adam::with_hyperparameters(learning_rate, 0.9, 0.999, 1e-7)
    }

    pub fn with_hyperparameters(learning_rate: f64, beta1: f64, beta2: f64, epsilon: f64) -> Adam {
        Adam {
            learning_rate,
            beta1,
            beta2,
            epsilon,
            beta1_t: 1.0,
            beta2_t: 1.0,
            iterations: 0,
            m: Vec::new(),
            v: Vec::new(),
        }
    }

    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    /// Applies one update. Moment buffers are created on the first call and
    /// kept for the lifetime of the optimizer.
    pub fn step(&mut self, params: Vec<&mut Matrix>, grads: &[Matrix]) {
        if self.m.is_empty() {
            self.m = grads.iter().map(|g| Matrix::zeros(g.rows, g.cols)).collect();
            self.v = self.m.clone();
        }

        self.iterations += 1;
        self.beta1_t *= self.beta1;
        self.beta2_t *= self.beta2;
        let step_size = self.learning_rate * (1.0 - self.beta2_t).sqrt() / (1.0 - self.beta1_t);
        let (b1, b2, eps) = (self.beta1, self.beta2, self.epsilon);

        for (((param, grad), m), v) in params.into_iter()
            .zip(grads.iter())
            .zip(self.m.iter_mut())
            .zip(self.v.iter_mut())
        {
            for (((p_row, g_row), m_row), v_row) in param.data.iter_mut()
                .zip(grad.data.iter())
                .zip(m.data.iter_mut())
                .zip(v.data.iter_mut())
            {
                for (((p, g), m), v) in p_row.iter_mut()
                    .zip(g_row.iter())
                    .zip(m_row.iter_mut())
                    .zip(v_row.iter_mut())
                {
                    *m = b1 * *m + (1.0 - b1) * g;
                    *v = b2 * *v + (1.0 - b2) * g * g;
                    *p -= step_size * *m / (v.sqrt() + eps);
                }
            }
        }
    }
}
