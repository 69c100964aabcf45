//! Flattened-pixel feature vectors for codebook tiles and target cells
//!
//! A region is resized by area averaging to the vector shape and flattened
//! row-major. Codebook tiles and target cells must go through the same
//! [`VectorShape`] or nearest-neighbour distances become meaningless.

use crate::io::error::{Result, dimension_mismatch, invalid_parameter};
use crate::math::interpolation::resize_area;
use crate::spatial::CellShape;
use ndarray::ArrayView3;

/// Shape a region is resampled to before flattening
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VectorShape {
    /// Rows after resampling
    pub height: usize,
    /// Columns after resampling
    pub width: usize,
    /// Samples per pixel
    pub channels: usize,
}

impl VectorShape {
    /// Derive the vector shape of a tile scaled by `factor`
    ///
    /// Each side is `round(side * factor)`, never less than one pixel, so the
    /// dimensionality is close to `height * width * channels * factor²`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The tile shape has a zero side
    /// - `channels` is zero
    /// - `factor` is not a positive finite number
    pub fn for_tile(tile: CellShape, channels: usize, factor: f64) -> Result<Self> {
        if tile.is_degenerate() {
            return Err(invalid_parameter(
                "tile_shape",
                &format!("{}x{}", tile.height, tile.width),
                &"tile sides must be positive",
            ));
        }
        if channels == 0 {
            return Err(invalid_parameter(
                "channels",
                &channels,
                &"must be positive",
            ));
        }
        if !factor.is_finite() || factor <= 0.0 {
            return Err(invalid_parameter(
                "vectorization_factor",
                &factor,
                &"must be a positive finite number",
            ));
        }

        Ok(Self {
            height: scaled_side(tile.height, factor),
            width: scaled_side(tile.width, factor),
            channels,
        })
    }

    /// Length of every vector produced with this shape
    pub const fn dimensionality(&self) -> usize {
        self.height * self.width * self.channels
    }
}

fn scaled_side(side: usize, factor: f64) -> usize {
    ((side as f64 * factor).round() as usize).max(1)
}

/// Resize `region` to `shape` and flatten it into a feature vector
///
/// # Errors
///
/// Returns an error if:
/// - The region's channel count differs from the shape's
/// - The region has no pixels
/// - The region cannot be resampled
pub fn vectorize(region: ArrayView3<'_, u8>, shape: VectorShape) -> Result<Vec<f32>> {
    let (height, width, channels) = region.dim();
    if channels != shape.channels {
        return Err(dimension_mismatch(
            "region channels",
            shape.channels,
            channels,
        ));
    }
    if height == 0 || width == 0 {
        return Err(invalid_parameter(
            "region",
            &format!("{height}x{width}"),
            &"cannot vectorize an empty region",
        ));
    }

    let resized = resize_area(region, shape.height, shape.width)?;
    // Standard layout iterates in row-major order
    Ok(resized.iter().map(|&v| f32::from(v)).collect())
}
