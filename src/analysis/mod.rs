//! Feature extraction from image regions

/// Flattened-pixel vectorization of tiles and target cells
pub mod vectorize;
