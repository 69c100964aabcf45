//! Mosaic rendering: per-cell search, selection, stabilization and compositing
//!
//! Cell queries are independent and run in parallel. Selection, random
//! overrides and writes are then applied sequentially in partition order, so
//! a given seed always produces the same mosaic.

use crate::algorithm::builder::Codebook;
use crate::algorithm::index::Neighbor;
use crate::algorithm::selection::{SelectionPolicy, resolve_selection};
use crate::algorithm::stabilization::StabilizationState;
use crate::analysis::vectorize::vectorize;
use crate::io::configuration::{DEFAULT_SEED, DEFAULT_STABILIZATION_THRESHOLD};
use crate::io::error::{MosaicError, Result, dimension_mismatch, invalid_parameter};
use crate::io::image::Raster;
use crate::math::interpolation::blend;
use crate::math::probability::RandomSelector;
use crate::spatial::{GridCell, Partition, partition};
use bitvec::prelude::*;
use log::debug;
use ndarray::{Array3, s};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Parameters controlling tile assignment and compositing
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MosaicConfig {
    /// Keep a cell's tile across frames unless a clearly better match appears
    pub use_stabilization: bool,
    /// Fraction of the previous distance a new match must beat, in (0, 1]
    pub stabilization_threshold: f32,
    /// Probability that a cell gets a uniformly random tile, in [0, 1]
    pub randomness: f64,
    /// Number of nearest tiles to choose among
    pub best_k: usize,
    /// Choose uniformly among the best tiles instead of by distance
    pub uniform_k: bool,
    /// Weight of the original image blended over the mosaic, in [0, 1]
    pub opacity: f64,
    /// Crop the output to the region covered by cells
    pub trim: bool,
    /// Seed of the selection randomness
    pub seed: u64,
}

impl Default for MosaicConfig {
    fn default() -> Self {
        Self {
            use_stabilization: false,
            stabilization_threshold: DEFAULT_STABILIZATION_THRESHOLD,
            randomness: 0.0,
            best_k: 1,
            uniform_k: true,
            opacity: 0.0,
            trim: true,
            seed: DEFAULT_SEED,
        }
    }
}

impl MosaicConfig {
    /// Validate all parameters
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `stabilization_threshold` is outside (0, 1]
    /// - `randomness` or `opacity` is outside [0, 1]
    /// - `best_k` is zero
    pub fn validate(&self) -> Result<()> {
        if !(self.stabilization_threshold > 0.0 && self.stabilization_threshold <= 1.0) {
            return Err(invalid_parameter(
                "stabilization_threshold",
                &self.stabilization_threshold,
                &"must be in (0, 1]",
            ));
        }
        if !(0.0..=1.0).contains(&self.randomness) {
            return Err(invalid_parameter(
                "randomness",
                &self.randomness,
                &"must be in [0, 1]",
            ));
        }
        if !(0.0..=1.0).contains(&self.opacity) {
            return Err(invalid_parameter(
                "opacity",
                &self.opacity,
                &"must be in [0, 1]",
            ));
        }
        if self.best_k == 0 {
            return Err(invalid_parameter(
                "best_k",
                &self.best_k,
                &"must be at least 1",
            ));
        }
        Ok(())
    }

    /// Selection policy implied by `best_k` and `uniform_k`
    pub const fn policy(&self) -> SelectionPolicy {
        SelectionPolicy::from_config(self.best_k, self.uniform_k)
    }
}

/// A cell that could not be filled
#[derive(Debug)]
pub struct CellFailure {
    /// Cell position in partition order
    pub ordinal: usize,
    /// Cell origin as (row, col)
    pub origin: [usize; 2],
    /// What went wrong
    pub error: MosaicError,
}

/// What happened to each cell of one render
#[derive(Debug, Default)]
pub struct RenderReport {
    /// Cells in the partition
    pub cells: usize,
    /// Cells that received a tile, by ordinal
    pub written: BitVec,
    /// Cells whose tile was drawn at random
    pub random_cells: usize,
    /// Cells where stabilization kept the previous content
    pub suppressed: usize,
    /// Cells left blank after an error
    pub failures: Vec<CellFailure>,
    /// Time spent on each cell, by ordinal
    pub cell_timings: Vec<Duration>,
}

impl RenderReport {
    /// Number of cells that received a tile
    pub fn written_count(&self) -> usize {
        self.written.count_ones()
    }

    /// Mean time per cell
    pub fn mean_cell_time(&self) -> Option<Duration> {
        if self.cell_timings.is_empty() {
            return None;
        }
        let total: f64 = self.cell_timings.iter().map(Duration::as_secs_f64).sum();
        Some(Duration::from_secs_f64(
            total / self.cell_timings.len() as f64,
        ))
    }

    /// Population standard deviation of the time per cell
    pub fn stddev_cell_time(&self) -> Option<Duration> {
        let mean = self.mean_cell_time()?.as_secs_f64();
        let variance = self
            .cell_timings
            .iter()
            .map(|t| (t.as_secs_f64() - mean).powi(2))
            .sum::<f64>()
            / self.cell_timings.len() as f64;
        Some(Duration::from_secs_f64(variance.sqrt()))
    }
}

/// Output of one render
#[derive(Debug)]
pub struct Rendered {
    /// Final image after blending and trimming
    pub mosaic: Raster,
    /// Cells the target was divided into
    pub partition: Partition,
    /// Per-cell outcome
    pub report: RenderReport,
}

/// Renders a sequence of frames against one codebook
///
/// Stabilization history and the random stream carry over between frames and
/// are cleared by [`MosaicSession::reset`] or when the frame size changes.
pub struct MosaicSession<'a> {
    codebook: &'a Codebook,
    config: MosaicConfig,
    selector: RandomSelector,
    stabilization: StabilizationState,
    frame_dims: Option<(usize, usize)>,
    frames: usize,
}

impl<'a> MosaicSession<'a> {
    /// Start a session
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the codebook is empty
    pub fn new(codebook: &'a Codebook, config: MosaicConfig) -> Result<Self> {
        config.validate()?;
        if codebook.is_empty() {
            return Err(MosaicError::EmptyCodebook { candidates: 0 });
        }
        Ok(Self {
            codebook,
            selector: RandomSelector::new(config.seed),
            stabilization: StabilizationState::new(0, config.stabilization_threshold),
            config,
            frame_dims: None,
            frames: 0,
        })
    }

    /// Settings of this session
    pub const fn config(&self) -> &MosaicConfig {
        &self.config
    }

    /// Frames rendered since the session started or was reset
    pub const fn frames_rendered(&self) -> usize {
        self.frames
    }

    /// Stabilization history
    pub const fn stabilization(&self) -> &StabilizationState {
        &self.stabilization
    }

    /// Clear stabilization history and restart the random stream
    pub fn reset(&mut self) {
        self.selector = RandomSelector::new(self.config.seed);
        self.stabilization.reset(0);
        self.frame_dims = None;
        self.frames = 0;
    }

    /// Render one target frame
    ///
    /// Cells that fail are recorded in the report and left blank.
    ///
    /// # Errors
    ///
    /// Returns an error if the target's channel count differs from the codebook's
    pub fn render(&mut self, target: &Raster) -> Result<Rendered> {
        let (height, width, channels) = target.dim();
        if channels != self.codebook.channels() {
            return Err(dimension_mismatch(
                "target channels",
                self.codebook.channels(),
                channels,
            ));
        }

        let cells = partition(height, width, self.codebook.tile_shape());
        if self.frame_dims != Some((height, width)) {
            if self.frame_dims.is_some() {
                debug!("Frame size changed to {height}x{width}, resetting stabilization");
            }
            self.stabilization.reset(cells.len());
            self.frame_dims = Some((height, width));
        }

        let policy = self.config.policy();
        let queries = self.query_cells(target, &cells, policy.neighbors_needed());

        let mut mosaic = Array3::<u8>::zeros((height, width, channels));
        let mut report = RenderReport {
            cells: cells.len(),
            written: bitvec![0; cells.len()],
            cell_timings: Vec::with_capacity(cells.len()),
            ..RenderReport::default()
        };

        for (cell, (result, query_time)) in cells.cells().iter().zip(queries) {
            let start = Instant::now();
            if let Err(error) = self.apply_cell(cell, result, policy, &mut mosaic, &mut report) {
                report.failures.push(CellFailure {
                    ordinal: cell.ordinal,
                    origin: cell.origin(),
                    error,
                });
            }
            report.cell_timings.push(query_time + start.elapsed());
        }

        if self.config.opacity > 0.0 {
            mosaic = blend(target.view(), mosaic.view(), self.config.opacity)
                .ok_or_else(|| dimension_mismatch("blend", target.len(), mosaic.len()))?;
        }

        if self.config.trim {
            if let Some(bounds) = cells.covered_bounds() {
                mosaic = mosaic
                    .slice(s![
                        bounds.min[0]..=bounds.max[0],
                        bounds.min[1]..=bounds.max[1],
                        ..
                    ])
                    .to_owned();
            }
        }

        self.frames += 1;
        debug!(
            "Rendered frame {}: {}/{} cells written, {} suppressed, {} random, {} failed",
            self.frames,
            report.written_count(),
            report.cells,
            report.suppressed,
            report.random_cells,
            report.failures.len()
        );

        Ok(Rendered {
            mosaic,
            partition: cells,
            report,
        })
    }

    fn query_cells(
        &self,
        target: &Raster,
        cells: &Partition,
        k: usize,
    ) -> Vec<(Result<Vec<Neighbor>>, Duration)> {
        let vector_shape = self.codebook.vector_shape();
        let index = self.codebook.index();
        cells
            .cells()
            .par_iter()
            .map(|cell| {
                let start = Instant::now();
                let region = target.slice(s![cell.row_span(), cell.col_span(), ..]);
                let hits = vectorize(region, vector_shape).and_then(|v| index.search(&v, k));
                (hits, start.elapsed())
            })
            .collect()
    }

    fn apply_cell(
        &mut self,
        cell: &GridCell,
        hits: Result<Vec<Neighbor>>,
        policy: SelectionPolicy,
        mosaic: &mut Raster,
        report: &mut RenderReport,
    ) -> Result<()> {
        let hits = hits?;
        let nearest = hits.first().ok_or(MosaicError::EmptyCodebook { candidates: 0 })?;

        // A random pick is written unconditionally; stabilization only gates search results
        let tile_id = if self.selector.chance(self.config.randomness) {
            report.random_cells += 1;
            if self.config.use_stabilization {
                self.stabilization
                    .record_distance(cell.ordinal, nearest.distance);
            }
            self.selector.uniform_index(self.codebook.len())
        } else {
            let choice = resolve_selection(policy, &hits, &mut self.selector);
            if self.config.use_stabilization {
                let accepted = self.stabilization.accepts(cell.ordinal, nearest.distance);
                self.stabilization
                    .record_distance(cell.ordinal, nearest.distance);
                if accepted {
                    choice
                } else {
                    report.suppressed += 1;
                    self.stabilization.previous_tile(cell.ordinal)
                }
            } else {
                choice
            }
        };

        let Some(tile_id) = tile_id else {
            return Ok(());
        };

        let tile = self.codebook.tile(tile_id)?;
        let expected = (cell.shape.height, cell.shape.width, mosaic.dim().2);
        if tile.dim() != expected {
            return Err(dimension_mismatch(
                "tile bitmap",
                expected.0 * expected.1 * expected.2,
                tile.len(),
            ));
        }

        mosaic
            .slice_mut(s![cell.row_span(), cell.col_span(), ..])
            .assign(tile);
        report.written.set(cell.ordinal, true);
        if self.config.use_stabilization {
            self.stabilization.record_tile(cell.ordinal, tile_id);
        }
        Ok(())
    }
}

/// Render a single image with a fresh session
///
/// # Errors
///
/// Returns an error if the configuration is invalid, the codebook is empty or
/// the target's channel count differs from the codebook's
pub fn mosaicify(target: &Raster, codebook: &Codebook, config: MosaicConfig) -> Result<Rendered> {
    MosaicSession::new(codebook, config)?.render(target)
}
