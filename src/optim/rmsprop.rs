use crate::math::matrix::Matrix;

/// RMSprop without momentum.
#[derive(Debug, Clone)]
pub struct RmsProp {
    pub learning_rate: f64,
    pub rho: f64,
    pub epsilon: f64,
    mean_square: Vec<Matrix>,
}

impl RmsProp {
    pub fn new(learning_rate: f64) -> RmsProp {
        RmsProp::with_hyperparameters(learning_rate, 0.9, 1e-7)
    }

    pub fn with_hyperparameters(learning_rate: f64, rho: f64, epsilon: f64) -> RmsProp {
        RmsProp { learning_rate, rho, epsilon, mean_square: Vec::new() }
    }

    pub fn step(&mut self, params: Vec<&mut Matrix>, grads: &[Matrix]) {
        if self.mean_square.is_empty() {
            self.mean_square = grads.iter().map(|g| Matrix::zeros(g.rows, g.cols)).collect();
        }
        let (lr, rho, eps) = (self.learning_rate, self.rho, self.epsilon);

        for ((param, grad), ms) in params.into_iter().zip(grads.iter()).zip(self.mean_square.iter_mut()) {
            for ((p_row, g_row), s_row) in param.data.iter_mut().zip(grad.data.iter()).zip(ms.data.iter_mut()) {
                for ((p, g), s) in p_row.iter_mut().zip(g_row.iter()).zip(s_row.iter_mut()) {
                    *s = rho * *s + (1.0 - rho) * g * g;
                    *p -= lr * g / (s.sqrt() + eps);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_step_is_normalized() {
        let mut opt = RmsProp::new(0.001);
        let mut w = Matrix::from_data(vec![vec![0.0]]);
        opt.step(vec![&mut w], &[Matrix::from_data(vec![vec![4.0]])]);
        // s = 0.1 * 16 → step = lr * 4 / sqrt(1.6)
        let expected = -0.001 * 4.0 / 1.6_f64.sqrt();
        assert!((w.data[0][0] - expected).abs() < 1e-9);
    }
}
