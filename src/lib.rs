//! Photo mosaic construction from a library of tile images
//!
//! A target image is cut into a grid of equal cells and every cell is replaced
//! by the codebook image whose downsampled pixels are closest to it. Codebooks
//! are built once per tile shape and cached on disk; frame sequences keep
//! their tiles stable from frame to frame.

/// Codebook building, nearest-neighbour search, tile assignment and multi-scale precomputation
pub mod algorithm;
/// Feature extraction from image regions
pub mod analysis;
/// Input/output operations and error handling
pub mod io;
/// Mathematical utilities for resampling and probability
pub mod math;
/// Partitioning of images into mosaic cells
pub mod spatial;

pub use algorithm::builder::{Codebook, CodebookBuilder, IndexConfig};
pub use algorithm::executor::{MosaicConfig, MosaicSession, mosaicify};
pub use io::error::{MosaicError, Result};
