//! Runtime configuration defaults and JSON configuration loading

use crate::io::error::{MosaicError, Result, WithPath};
use serde::de::DeserializeOwned;
use std::path::Path;

// Codebook indexing
/// Concurrent decode-and-vectorize workers during codebook indexing
pub const DEFAULT_WORKERS: usize = 5;
/// Channels kept per pixel when none is requested
pub const DEFAULT_CHANNELS: usize = 3;
/// Multiplier applied to the tile shape before vectorization
pub const DEFAULT_VECTORIZATION_FACTOR: f64 = 1.0;
/// Relative tolerance for matching a codebook image's aspect ratio
pub const DEFAULT_ASPECT_TOLERANCE: f64 = 1e-3;
/// File extensions considered codebook candidates (compared case-insensitively)
pub const CODEBOOK_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

// Index cache
/// Directory holding persisted codebook indexes
pub const DEFAULT_CACHE_DIR: &str = "cache";
/// Extension of persisted cache records
pub const CACHE_EXTENSION: &str = "json";

// Tile geometry
/// Tile height multiplier applied to the scale
pub const DEFAULT_HEIGHT_ASPECT: f64 = 4.0;
/// Tile width multiplier applied to the scale
pub const DEFAULT_WIDTH_ASPECT: f64 = 3.0;
/// Smallest scale precomputed by default
pub const DEFAULT_MIN_SCALE: usize = 5;
/// Largest scale precomputed by default
pub const DEFAULT_MAX_SCALE: usize = 15;

// Tile assignment
/// Fraction of the previous distance a candidate must beat to replace a stabilized cell
pub const DEFAULT_STABILIZATION_THRESHOLD: f32 = 0.95;
/// Stabilization threshold used when precomputing mosaics across scales
pub const SCALE_STABILIZATION_THRESHOLD: f32 = 0.85;
/// Fixed seed for reproducible renders
pub const DEFAULT_SEED: u64 = 42;

// Output settings
/// Placeholder replaced by the target's file stem in output patterns
pub const NAME_PLACEHOLDER: &str = "{name}";
/// Placeholder replaced by the tile scale in output patterns
pub const SCALE_PLACEHOLDER: &str = "{scale}";
/// Frames per second of encoded frame sequences
pub const DEFAULT_FPS: u32 = 3;
/// Minimum frame delay that viewers reliably support (in milliseconds)
pub const VIEWER_MIN_FRAME_DELAY_MS: u32 = 20;

// Progress bar display settings
/// Width of progress bars in characters
pub const PROGRESS_BAR_WIDTH: u16 = 40;

/// Load a JSON configuration file into `T`
///
/// Missing fields fall back to the type's serde defaults.
///
/// # Errors
///
/// Returns an error if the file cannot be read or does not decode into `T`
pub fn load_json_config<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = std::fs::read_to_string(path).with_path(path, "read configuration")?;
    serde_json::from_str(&contents).map_err(|e| MosaicError::Format {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Expand `{name}` and `{scale}` placeholders in an output path pattern
pub fn format_output_path(pattern: &str, name: &str, scale: Option<usize>) -> String {
    let named = pattern.replace(NAME_PLACEHOLDER, name);
    match scale {
        Some(scale) => named.replace(SCALE_PLACEHOLDER, &scale.to_string()),
        None => named,
    }
}
