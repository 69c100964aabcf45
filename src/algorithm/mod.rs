/// Codebook construction from candidate images
pub mod builder;
/// Persistent cache of built codebooks
pub mod cache;
/// Mosaic rendering and frame sessions
pub mod executor;
/// Nearest-neighbour search over tile vectors
pub mod index;
/// Multi-scale codebook and mosaic precomputation
pub mod scales;
/// Tile selection policies
pub mod selection;
/// Temporal stabilization of cell assignments
pub mod stabilization;
