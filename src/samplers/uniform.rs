//! Uniform random sampler drawing minimal samples without replacement.

use crate::core::Sampler;
use crate::types::DataMatrix;
use crate::utils::UniformRandomGenerator;

/// Uniform random sampler drawing minimal samples without replacement.
pub struct UniformRandomSampler {
    rng: UniformRandomGenerator,
}

impl UniformRandomSampler {
    /// Reproducible sampler.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: UniformRandomGenerator::from_seed(seed),
        }
    }
}

impl Sampler for UniformRandomSampler {
    fn sample(
        &mut self,
        data: &DataMatrix,
        sample_size: usize,
        out_indices: &mut [usize],
    ) -> bool {
        let n = data.nrows();
        if sample_size == 0 || sample_size > n || out_indices.len() < sample_size {
            return false;
        }

        self.rng.gen_unique(&mut out_indices[..sample_size], 0, n - 1);
        true
    }

    fn update(&mut self, _sample: &[usize], _sample_size: usize, _iteration: usize, _hint: f64) {
        // No adaptive state.
    }
}
