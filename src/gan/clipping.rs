use serde::{Serialize, Deserialize};

use crate::network::network::Network;

/// Clamps every critic parameter into `[-clip_value, clip_value]` after
/// each critic update.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightClipping {
    pub clip_value: f64,
}

impl WeightClipping {
    pub fn new(clip_value: f64) -> WeightClipping {
        WeightClipping { clip_value: clip_value.abs() }
    }

    pub fn apply(&self, network: &mut Network) {
        for param in network.parameters_mut() {
            param.clamp_in_place(-self.clip_value, self.clip_value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::activation::ActivationFunction;
    use crate::layers::{Dense, Layer};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn clipping_is_bounded_and_idempotent() {
        let mut rng = StdRng::seed_from_u64(40);
        let mut net = Network::new(vec![
            Layer::Dense(Dense::new(16, 3, ActivationFunction::ReLU, &mut rng)),
            Layer::Dense(Dense::new(1, 16, ActivationFunction::Identity, &mut rng)),
        ]);
        net.parameters_mut()[1].data[0][3] = 4.0;
        let clip = WeightClipping::new(0.01);
        clip.apply(&mut net);
        assert!(net.parameters().iter().all(|p| p.max_abs() <= 0.01));
        let once = net.clone();
        clip.apply(&mut net);
        assert_eq!(net.parameters(), once.parameters());
    }
}
