//! Wasserstein objectives on critic scores.
//!
//! Scores are `rows × 1` matrices. Each loss has a matching `*_grad`
//! returning ∂loss/∂score, which seeds back-propagation through the critic.

use crate::math::matrix::Matrix;

/// `-(mean(real) - mean(fake))`. Minimizing it widens the gap between the
/// critic's scores on real and generated pairs.
pub fn critic_loss(real_scores: &Matrix, fake_scores: &Matrix) -> f64 {
    -(real_scores.mean() - fake_scores.mean())
}

/// Returns `(∂L/∂real_scores, ∂L/∂fake_scores)`.
pub fn critic_loss_grad(real_scores: &Matrix, fake_scores: &Matrix) -> (Matrix, Matrix) {
    (
        Matrix::filled(real_scores.rows, 1, -1.0 / real_scores.rows as f64),
        Matrix::filled(fake_scores.rows, 1, 1.0 / fake_scores.rows as f64),
    )
}

/// `-mean(fake)`.
pub fn generator_loss(fake_scores: &Matrix) -> f64 {
    -fake_scores.mean()
}

pub fn generator_loss_grad(fake_scores: &Matrix) -> Matrix {
    Matrix::filled(fake_scores.rows, 1, -1.0 / fake_scores.rows as f64)
}

/// Estimate of the Wasserstein-1 distance between the real and the
/// generated conditional distributions.
pub fn wasserstein_estimate(real_scores: &Matrix, fake_scores: &Matrix) -> f64 {
    -critic_loss(real_scores, fake_scores)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scores(values: &[f64]) -> Matrix {
        Matrix::from_data(values.iter().map(|&v| vec![v]).collect())
    }

    #[test]
    fn critic_loss_is_antisymmetric() {
        let a = scores(&[0.5, -1.25, 3.0]);
        let b = scores(&[2.0, 0.0, -0.75]);
        assert_eq!(critic_loss(&a, &b), -critic_loss(&b, &a));
        assert_eq!(critic_loss(&a, &a), 0.0);
    }

    #[test]
    fn estimate_is_negated_critic_loss() {
        let real = scores(&[1.0, 2.0]);
        let fake = scores(&[-1.0, 0.5]);
        assert_eq!(wasserstein_estimate(&real, &fake), -critic_loss(&real, &fake));
        assert_eq!(wasserstein_estimate(&real, &fake), 1.75);
    }

    #[test]
    fn gradients_are_uniform_per_example() {
        let real = scores(&[1.0, 2.0, 3.0, 4.0]);
        let fake = scores(&[0.0, 0.0, 0.0, 0.0]);
        let (g_real, g_fake) = critic_loss_grad(&real, &fake);
        assert_eq!(g_real, Matrix::filled(4, 1, -0.25));
        assert_eq!(g_fake, Matrix::filled(4, 1, 0.25));
        assert_eq!(generator_loss(&real), -2.5);
        assert_eq!(generator_loss_grad(&real), Matrix::filled(4, 1, -0.25));
    }
}
