//! Tile selection among nearest-neighbour candidates

use crate::algorithm::index::Neighbor;
use crate::math::probability::{RandomSelector, deviation_from_max_weights};

/// How a cell's tile is picked from its search hits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionPolicy {
    /// Always the closest tile
    Nearest,
    /// Uniformly among the `k` closest tiles
    UniformTopK(usize),
    /// Among the `k + 1` closest tiles, weighted by distance below the worst
    WeightedTopK(usize),
}

impl SelectionPolicy {
    /// Policy for `best_k` candidates; `best_k <= 1` selects the nearest tile
    pub const fn from_config(best_k: usize, uniform_k: bool) -> Self {
        match (best_k, uniform_k) {
            (0 | 1, _) => Self::Nearest,
            (k, true) => Self::UniformTopK(k),
            (k, false) => Self::WeightedTopK(k),
        }
    }

    /// Number of search hits the policy consumes
    ///
    /// The weighted policy queries one extra hit, which acts as the zero
    /// weight reference and can never be chosen unless all distances tie.
    pub const fn neighbors_needed(&self) -> usize {
        match *self {
            Self::Nearest => 1,
            Self::UniformTopK(k) => k,
            Self::WeightedTopK(k) => k + 1,
        }
    }
}

/// Tile id chosen from `neighbors` (nearest first), or `None` when there are none
pub fn resolve_selection(
    policy: SelectionPolicy,
    neighbors: &[Neighbor],
    selector: &mut RandomSelector,
) -> Option<usize> {
    match policy {
        SelectionPolicy::Nearest => neighbors.first().map(|n| n.id),
        SelectionPolicy::UniformTopK(_) => {
            let pick = selector.uniform_index(neighbors.len())?;
            neighbors.get(pick).map(|n| n.id)
        }
        SelectionPolicy::WeightedTopK(_) => {
            let distances: Vec<f32> = neighbors.iter().map(|n| n.distance).collect();
            let weights = deviation_from_max_weights(&distances);
            let pick = selector.weighted_choice(&weights)?;
            neighbors.get(pick).map(|n| n.id)
        }
    }
}
