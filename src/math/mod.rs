//! Mathematical utilities for resampling and stochastic selection

/// Area-averaging resize and linear blending of rasters
pub mod interpolation;
/// Seeded random choices and selection weights
pub mod probability;
