//! Per-cell temporal stabilization across the frames of one session
//!
//! A cell only takes a new tile when the new match is clearly better than the
//! last one recorded for it: `distance < last_distance * threshold`. The
//! recorded distance is updated on every frame whether or not the write
//! happened, so a cell drifting slowly away from its tile eventually switches.

/// Last match distance and accepted tile of every cell
#[derive(Debug, Clone)]
pub struct StabilizationState {
    last_distance: Vec<f32>,
    last_tile: Vec<Option<usize>>,
    threshold: f32,
}

impl StabilizationState {
    /// Fresh state for `cells` cells; every first write is accepted
    pub fn new(cells: usize, threshold: f32) -> Self {
        Self {
            last_distance: vec![f32::INFINITY; cells],
            last_tile: vec![None; cells],
            threshold,
        }
    }

    /// Forget all history, resizing to `cells`
    pub fn reset(&mut self, cells: usize) {
        self.last_distance.clear();
        self.last_distance.resize(cells, f32::INFINITY);
        self.last_tile.clear();
        self.last_tile.resize(cells, None);
    }

    /// Number of tracked cells
    pub fn cell_count(&self) -> usize {
        self.last_distance.len()
    }

    /// Ratio a new distance must beat
    pub const fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Whether a match at `distance` may replace the content of `cell`
    pub fn accepts(&self, cell: usize, distance: f32) -> bool {
        self.last_distance
            .get(cell)
            .is_none_or(|&last| last.is_infinite() || distance < last * self.threshold)
    }

    /// Remember the queried distance of `cell`
    pub fn record_distance(&mut self, cell: usize, distance: f32) {
        if let Some(last) = self.last_distance.get_mut(cell) {
            *last = distance;
        }
    }

    /// Remember the tile written to `cell`
    pub fn record_tile(&mut self, cell: usize, tile: usize) {
        if let Some(last) = self.last_tile.get_mut(cell) {
            *last = Some(tile);
        }
    }

    /// Tile most recently written to `cell`
    pub fn previous_tile(&self, cell: usize) -> Option<usize> {
        self.last_tile.get(cell).copied().flatten()
    }

    /// Distance most recently recorded for `cell`
    pub fn last_distance(&self, cell: usize) -> Option<f32> {
        self.last_distance.get(cell).copied()
    }
}
