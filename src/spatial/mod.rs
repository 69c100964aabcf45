//! Spatial layout of the mosaic
//!
//! This module contains the grid partitioner that cuts a target image into
//! equally sized cells and the bounding box used when trimming the output.

/// Grid partitioning of target images into cells
pub mod grid;

pub use grid::{BoundingBox, CellShape, GridCell, Partition, partition};
