//! Error types and context management for mosaic operations

use std::fmt;
use std::path::{Path, PathBuf};

/// Main error type for all mosaic operations
#[derive(Debug)]
pub enum MosaicError {
    /// Failed to load an image from the filesystem
    ImageLoad {
        /// Path to the image file
        path: PathBuf,
        /// Underlying image loading error
        source: image::ImageError,
    },

    /// Parameter validation failed
    InvalidParameter {
        /// Name of the invalid parameter
        parameter: &'static str,
        /// Provided value that failed validation
        value: String,
        /// Explanation of why the value is invalid
        reason: String,
    },

    /// No codebook image survived discovery and filtering
    EmptyCodebook {
        /// Number of candidate images that were examined
        candidates: usize,
    },

    /// A vector or raster did not have the size the receiver was built for
    DimensionMismatch {
        /// What was being compared
        context: &'static str,
        /// Size the receiver expects
        expected: usize,
        /// Size that was provided
        actual: usize,
    },

    /// Tile id exceeds the codebook
    InvalidTileIndex {
        /// The invalid tile id
        index: usize,
        /// Number of tiles in the codebook
        max_tiles: usize,
    },

    /// Failed to save an image to disk
    ImageExport {
        /// Path where export was attempted
        path: PathBuf,
        /// Underlying image export error
        source: image::ImageError,
    },

    /// General file system operation failure
    FileSystem {
        /// Path involved in the operation
        path: PathBuf,
        /// Description of the operation that failed
        operation: &'static str,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// A cache record, configuration file or encoded output could not be decoded or validated
    Format {
        /// File that failed to decode
        path: PathBuf,
        /// Description of the failure
        reason: String,
    },

    /// The worker pool for codebook indexing could not be created
    WorkerPool {
        /// Description of the failure
        reason: String,
    },

    /// A raster could not be resampled
    Resize {
        /// Description of the failure
        reason: String,
    },
}

impl fmt::Display for MosaicError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ImageLoad { path, source } => {
                write!(f, "Failed to load image '{}': {source}", path.display())
            }
            Self::InvalidParameter {
                parameter,
                value,
                reason,
            } => {
                write!(f, "Invalid parameter '{parameter}' = '{value}': {reason}")
            }
            Self::EmptyCodebook { candidates } => {
                write!(
                    f,
                    "Codebook is empty after filtering {candidates} candidate images"
                )
            }
            Self::DimensionMismatch {
                context,
                expected,
                actual,
            } => {
                write!(
                    f,
                    "Dimension mismatch in {context}: expected {expected}, got {actual}"
                )
            }
            Self::InvalidTileIndex { index, max_tiles } => {
                write!(f, "Tile index {index} is out of bounds (tiles: {max_tiles})")
            }
            Self::ImageExport { path, source } => {
                write!(
                    f,
                    "Failed to export image to '{}': {source}",
                    path.display()
                )
            }
            Self::FileSystem {
                path,
                operation,
                source,
            } => {
                write!(
                    f,
                    "File system error during {operation} on '{}': {source}",
                    path.display()
                )
            }
            Self::Format { path, reason } => {
                write!(f, "Unreadable file '{}': {reason}", path.display())
            }
            Self::WorkerPool { reason } => {
                write!(f, "Failed to start worker pool: {reason}")
            }
            Self::Resize { reason } => {
                write!(f, "Failed to resample image: {reason}")
            }
        }
    }
}

impl std::error::Error for MosaicError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ImageLoad { source, .. } | Self::ImageExport { source, .. } => Some(source),
            Self::FileSystem { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Convenience type alias for mosaic results
pub type Result<T> = std::result::Result<T, MosaicError>;

/// Attaches the offending path to file system errors
pub trait WithPath<T> {
    /// Convert an I/O failure into a [`MosaicError::FileSystem`] naming `path`
    ///
    /// # Errors
    ///
    /// Propagates the original error with the path and operation applied
    fn with_path(self, path: &Path, operation: &'static str) -> Result<T>;
}

impl<T> WithPath<T> for std::result::Result<T, std::io::Error> {
    fn with_path(self, path: &Path, operation: &'static str) -> Result<T> {
        self.map_err(|source| MosaicError::FileSystem {
            path: path.to_path_buf(),
            operation,
            source,
        })
    }
}

impl From<image::ImageError> for MosaicError {
    fn from(err: image::ImageError) -> Self {
        Self::ImageLoad {
            path: PathBuf::from("<unknown>"),
            source: err,
        }
    }
}

impl From<std::io::Error> for MosaicError {
    fn from(err: std::io::Error) -> Self {
        Self::FileSystem {
            path: PathBuf::from("<unknown>"),
            operation: "unknown",
            source: err,
        }
    }
}

/// Create an invalid parameter error
pub fn invalid_parameter(
    parameter: &'static str,
    value: &impl ToString,
    reason: &impl ToString,
) -> MosaicError {
    MosaicError::InvalidParameter {
        parameter,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Create a dimension mismatch error
pub const fn dimension_mismatch(
    context: &'static str,
    expected: usize,
    actual: usize,
) -> MosaicError {
    MosaicError::DimensionMismatch {
        context,
        expected,
        actual,
    }
}
