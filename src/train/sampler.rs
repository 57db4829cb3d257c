use rand::rngs::StdRng;
use rand::seq::index;

use crate::error::{Result, WganError};

/// Chooses which examples make up the next batch.
pub trait BatchSampler {
    /// Returns `batch_size` indices into a dataset of `available` examples.
    fn sample(&mut self, available: usize, batch_size: usize, rng: &mut StdRng) -> Result<Vec<usize>>;
}

/// Distinct indices within a batch, independent draws across batches.
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformSampler;

impl BatchSampler for UniformSampler {
    fn sample(&mut self, available: usize, batch_size: usize, rng: &mut StdRng) -> Result<Vec<usize>> {
        if batch_size > available {
            return Err(WganError::InsufficientData { batch_size, available });
        }
        Ok(index::sample(rng, available, batch_size).into_vec())
    }
}
