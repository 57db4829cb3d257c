use serde::{Serialize, Deserialize};
use std::f64::consts::E;

/// Slope used by `LeakyReLU` layers unless configured otherwise.
pub const DEFAULT_LEAKY_SLOPE: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ActivationFunction {
    Identity,
    ReLU,
    LeakyReLU { alpha: f64 },
    Sigmoid,
    Tanh,
}

impl ActivationFunction {
    pub fn leaky() -> ActivationFunction {
        ActivationFunction::LeakyReLU { alpha: DEFAULT_LEAKY_SLOPE }
    }

    pub fn function(&self, x: f64) -> f64 {
        match self {
            ActivationFunction::Identity => x,
            // NaN must reach the loss, not be rectified away
            ActivationFunction::ReLU => if x > 0.0 || x.is_nan() { x } else { 0.0 },
            ActivationFunction::LeakyReLU { alpha } => if x > 0.0 || x.is_nan() { x } else { alpha * x },
            ActivationFunction::Sigmoid => 1.0 / (1.0 + E.powf(-x)),
            ActivationFunction::Tanh => x.tanh(),
        }
    }

    /// Element-wise derivative σ'(z), evaluated at the pre-activation.
    pub fn derivative(&self, x: f64) -> f64 {
        match self {
            ActivationFunction::Identity => 1.0,
            _ if x.is_nan() => x,
            ActivationFunction::ReLU => if x > 0.0 { 1.0 } else { 0.0 },
            ActivationFunction::LeakyReLU { alpha } => if x > 0.0 { 1.0 } else { *alpha },
            ActivationFunction::Sigmoid => {
                let fx = self.function(x);
                fx * (1.0 - fx)
            }
            ActivationFunction::Tanh => {
                let t = x.tanh();
                1.0 - t * t
            }
        }
    }

    /// Element-wise second derivative σ''(z).
    ///
    /// Needed when differentiating through an input gradient (gradient
    /// penalty). Piecewise-linear activations return 0 everywhere, which is
    /// exact away from the kink.
    pub fn second_derivative(&self, x: f64) -> f64 {
        match self {
            ActivationFunction::Identity
            | ActivationFunction::ReLU
            | ActivationFunction::LeakyReLU { .. } => 0.0,
            ActivationFunction::Sigmoid => {
                let fx = self.function(x);
                fx * (1.0 - fx) * (1.0 - 2.0 * fx)
            }
            ActivationFunction::Tanh => {
                let t = x.tanh();
                -2.0 * t * (1.0 - t * t)
            }
        }
    }

    pub fn is_piecewise_linear(&self) -> bool {
        matches!(
            self,
            ActivationFunction::Identity
                | ActivationFunction::ReLU
                | ActivationFunction::LeakyReLU { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [ActivationFunction; 5] = [
        ActivationFunction::Identity,
        ActivationFunction::ReLU,
        ActivationFunction::LeakyReLU { alpha: 0.3 },
        ActivationFunction::Sigmoid,
        ActivationFunction::Tanh,
    ];

    #[test]
    fn derivatives_match_finite_differences() {
        let h = 1e-5;
        for act in ALL {
            for &x in &[-1.7, -0.4, 0.3, 2.2] {
                let fd = (act.function(x + h) - act.function(x - h)) / (2.0 * h);
                assert!((fd - act.derivative(x)).abs() < 1e-6, "{act:?} at {x}");
                let fd2 = (act.derivative(x + h) - act.derivative(x - h)) / (2.0 * h);
                assert!((fd2 - act.second_derivative(x)).abs() < 1e-5, "{act:?}'' at {x}");
            }
        }
    }

    #[test]
    fn tanh_is_bounded() {
        let act = ActivationFunction::Tanh;
        assert!(act.function(50.0) <= 1.0);
        assert!(act.function(-50.0) >= -1.0);
        assert!(!act.is_piecewise_linear());
        assert!(ActivationFunction::leaky().is_piecewise_linear());
    }

    #[test]
    fn rectifiers_propagate_nan() {
        for act in [ActivationFunction::ReLU, ActivationFunction::leaky()] {
            assert!(act.function(f64::NAN).is_nan(), "{act:?}");
            assert!(act.derivative(f64::NAN).is_nan(), "{act:?}");
            assert_eq!(act.function(-2.0), act.derivative(-2.0) * -2.0);
        }
    }
}
