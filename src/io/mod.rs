//! Input/output operations and configuration

/// Command-line interface definitions
pub mod cli;
/// Configuration defaults and JSON loading
pub mod configuration;
/// Frame sequence encoders
pub mod encoder;
/// Error types and handling
pub mod error;
/// Face detection collaborator
pub mod faces;
/// Raster loading and export
pub mod image;
/// Progress bars
pub mod progress;
