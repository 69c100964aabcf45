//! Seeded random choices and distance-derived selection weights

use rand::{Rng, SeedableRng, rngs::StdRng};

/// Seeded random selector for reproducible stochastic choices
#[derive(Debug, Clone)]
pub struct RandomSelector {
    rng: StdRng,
}

impl RandomSelector {
    /// Create a deterministic random selector
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Returns true with probability `p`
    ///
    /// `p <= 0` never succeeds and `p >= 1` always does, without consuming randomness.
    pub fn chance(&mut self, p: f64) -> bool {
        if p <= 0.0 {
            return false;
        }
        if p >= 1.0 {
            return true;
        }
        self.rng.random::<f64>() < p
    }

    /// Uniform index in `0..len`, or `None` for an empty range
    pub fn uniform_index(&mut self, len: usize) -> Option<usize> {
        (len > 0).then(|| self.rng.random_range(0..len))
    }

    /// Generic weighted random selection
    ///
    /// Returns index into weights array using cumulative distribution. Falls
    /// back to a uniform choice when the weights carry no mass.
    pub fn weighted_choice(&mut self, weights: &[f64]) -> Option<usize> {
        if weights.is_empty() {
            return None;
        }

        let total: f64 = weights.iter().sum();
        if total <= 0.0 || !total.is_finite() {
            return self.uniform_index(weights.len());
        }

        let mut rand_val = self.rng.random::<f64>() * total;
        for (i, &weight) in weights.iter().enumerate() {
            rand_val -= weight;
            if rand_val <= 0.0 && weight > 0.0 {
                return Some(i);
            }
        }

        // Rounding can leave a sliver of mass past the end; give it to the last weighted entry
        weights.iter().rposition(|&w| w > 0.0)
    }
}

/// Normalized weights that favour small distances
///
/// Each distance is weighted by how far it lies below the largest distance,
/// so the worst candidate gets zero weight. When every distance is equal the
/// weights are uniform.
pub fn deviation_from_max_weights(distances: &[f32]) -> Vec<f64> {
    let Some(max) = distances.iter().copied().map(f64::from).reduce(f64::max) else {
        return Vec::new();
    };

    let deviations: Vec<f64> = distances
        .iter()
        .map(|&d| (f64::from(d) - max).abs())
        .collect();
    let total: f64 = deviations.iter().sum();

    if total <= 0.0 || !total.is_finite() {
        let uniform = 1.0 / distances.len() as f64;
        return vec![uniform; distances.len()];
    }

    deviations.iter().map(|d| d / total).collect()
}
