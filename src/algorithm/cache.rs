//! Persistent cache of built codebooks keyed by a content fingerprint
//!
//! A record holds the raw vector matrix, the accepted image metadata and the
//! tile bitmaps. The search structure itself is never persisted; it is rebuilt
//! from the matrix on load.

use crate::algorithm::builder::TileImage;
use crate::analysis::vectorize::VectorShape;
use crate::io::configuration::CACHE_EXTENSION;
use crate::io::error::{MosaicError, Result, WithPath};
use crate::spatial::CellShape;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Everything that determines the content of a built codebook
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildParameters {
    /// Candidate image paths, sorted
    pub paths: Vec<PathBuf>,
    /// Tile height in pixels
    pub height: usize,
    /// Tile width in pixels
    pub width: usize,
    /// Samples per pixel
    pub channels: usize,
    /// Whether images without a detected face were rejected
    pub detect_faces: bool,
    /// Vectorization scale factor
    pub vectorization_factor: f64,
    /// Required image aspect ratio (height / width), if filtered
    pub aspect_ratio: Option<f64>,
    /// Relative tolerance of the aspect filter
    pub aspect_tolerance: f64,
}

impl BuildParameters {
    /// Create parameters for `paths`, sorting them so listing order does not matter
    pub fn new(mut paths: Vec<PathBuf>, height: usize, width: usize, channels: usize) -> Self {
        paths.sort();
        Self {
            paths,
            height,
            width,
            channels,
            detect_faces: false,
            vectorization_factor: 1.0,
            aspect_ratio: None,
            aspect_tolerance: 0.0,
        }
    }

    /// Content digest identifying these parameters
    pub fn fingerprint(&self) -> Fingerprint {
        let mut hasher = blake3::Hasher::new();
        for path in &self.paths {
            hasher.update(path.to_string_lossy().as_bytes());
            hasher.update(&[0]);
        }
        hasher.update(&(self.height as u64).to_le_bytes());
        hasher.update(&(self.width as u64).to_le_bytes());
        hasher.update(&(self.channels as u64).to_le_bytes());
        hasher.update(&[u8::from(self.detect_faces)]);
        hasher.update(&self.vectorization_factor.to_le_bytes());
        match self.aspect_ratio {
            Some(ratio) => {
                hasher.update(&[1]);
                hasher.update(&ratio.to_le_bytes());
            }
            None => {
                hasher.update(&[0]);
            }
        }
        hasher.update(&self.aspect_tolerance.to_le_bytes());
        Fingerprint(hasher.finalize().to_hex().to_string())
    }
}

/// Hex digest naming a cache record
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Hex representation
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Serialized form of a built codebook
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheRecord {
    /// Digest of `parameters` at write time
    pub fingerprint: Fingerprint,
    /// Parameters the codebook was built with
    pub parameters: BuildParameters,
    /// Components per vector
    pub dimensions: usize,
    /// Row-major vector matrix, one row per accepted image
    pub matrix: Vec<f32>,
    /// Accepted image metadata, aligned with matrix rows
    pub images: Vec<TileImage>,
    /// Tile bitmaps as raw (height, width, channels) samples
    pub tiles: Vec<Vec<u8>>,
}

impl CacheRecord {
    /// Check that the record belongs to `expected` and is internally consistent
    ///
    /// # Errors
    ///
    /// Returns a description of the first inconsistency found
    pub fn validate(&self, expected: &BuildParameters) -> std::result::Result<(), String> {
        if self.fingerprint != expected.fingerprint() {
            return Err("fingerprint does not match".to_string());
        }
        if self.parameters != *expected {
            return Err("stored parameters do not match".to_string());
        }
        let tile_shape = CellShape::new(expected.height, expected.width);
        let dimensions =
            VectorShape::for_tile(tile_shape, expected.channels, expected.vectorization_factor)
                .map_err(|e| e.to_string())?
                .dimensionality();
        if self.dimensions != dimensions {
            return Err(format!(
                "vectors have {} components, expected {dimensions}",
                self.dimensions
            ));
        }
        let rows = self.images.len();
        if self.dimensions == 0 || self.matrix.len() != self.dimensions * rows {
            return Err(format!(
                "matrix holds {} values, expected {} rows of {}",
                self.matrix.len(),
                rows,
                self.dimensions
            ));
        }
        if self.tiles.len() != rows {
            return Err(format!(
                "{} tile bitmaps for {rows} images",
                self.tiles.len()
            ));
        }
        let tile_len = expected.height * expected.width * expected.channels;
        if self.tiles.iter().any(|tile| tile.len() != tile_len) {
            return Err(format!("tile bitmap size differs from {tile_len}"));
        }
        Ok(())
    }
}

/// Cache effectiveness counters
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Records loaded and validated
    pub hits: usize,
    /// Lookups with no usable record
    pub misses: usize,
    /// Records present but unreadable or invalid
    pub read_failures: usize,
    /// Records that could not be persisted
    pub write_failures: usize,
}

/// Directory of `<fingerprint>.json` codebook records
///
/// Read and write failures never fail a build; they are logged, counted and
/// treated as a miss.
#[derive(Debug)]
pub struct IndexCache {
    directory: PathBuf,
    /// Cache performance statistics
    pub stats: CacheStats,
}

impl IndexCache {
    /// Use `directory` for records; it is created on first write
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            stats: CacheStats::default(),
        }
    }

    /// Directory holding the records
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// File a record with `fingerprint` is stored in
    pub fn path_for(&self, fingerprint: &Fingerprint) -> PathBuf {
        self.directory
            .join(format!("{fingerprint}.{CACHE_EXTENSION}"))
    }

    /// Every record file in the cache directory, sorted
    ///
    /// A missing directory holds no records.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory exists but cannot be listed
    pub fn list_records(&self) -> Result<Vec<PathBuf>> {
        if !self.directory.exists() {
            return Ok(Vec::new());
        }
        let mut records = Vec::new();
        for entry in std::fs::read_dir(&self.directory).with_path(&self.directory, "list cache")? {
            let path = entry.with_path(&self.directory, "list cache")?.path();
            if path.extension().is_some_and(|ext| ext == CACHE_EXTENSION) {
                records.push(path);
            }
        }
        records.sort();
        Ok(records)
    }

    /// Load the validated record for `parameters`, if one exists
    pub fn load(&mut self, parameters: &BuildParameters) -> Option<CacheRecord> {
        let path = self.path_for(&parameters.fingerprint());
        if !path.exists() {
            self.stats.misses += 1;
            debug!("No cached codebook at {}", path.display());
            return None;
        }

        let record = read_record(&path).and_then(|record| {
            record
                .validate(parameters)
                .map(|()| record)
                .map_err(|reason| MosaicError::Format {
                    path: path.clone(),
                    reason,
                })
        });

        match record {
            Ok(record) => {
                self.stats.hits += 1;
                debug!("Loaded cached codebook from {}", path.display());
                Some(record)
            }
            Err(e) => {
                self.stats.read_failures += 1;
                self.stats.misses += 1;
                warn!("Ignoring cached codebook: {e}");
                None
            }
        }
    }

    /// Persist `record` atomically; returns whether it was written
    pub fn store(&mut self, record: &CacheRecord) -> bool {
        let path = self.path_for(&record.fingerprint);
        match write_record(&self.directory, &path, record) {
            Ok(()) => {
                debug!("Stored codebook in {}", path.display());
                true
            }
            Err(e) => {
                self.stats.write_failures += 1;
                warn!("Could not cache codebook: {e}");
                false
            }
        }
    }
}

fn read_record(path: &Path) -> Result<CacheRecord> {
    let file = File::open(path).with_path(path, "open cache record")?;
    serde_json::from_reader(BufReader::new(file)).map_err(|e| MosaicError::Format {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

fn write_record(directory: &Path, path: &Path, record: &CacheRecord) -> Result<()> {
    std::fs::create_dir_all(directory).with_path(directory, "create cache directory")?;

    // Same directory as the target: persist is a rename
    let mut temp = NamedTempFile::new_in(directory).with_path(directory, "create temporary file")?;
    {
        let mut writer = BufWriter::new(&mut temp);
        serde_json::to_writer(&mut writer, record).map_err(|e| MosaicError::Format {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        writer.flush().with_path(path, "write cache record")?;
    }
    temp.persist(path)
        .map_err(|e| e.error)
        .with_path(path, "persist cache record")?;
    Ok(())
}
