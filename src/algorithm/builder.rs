//! Codebook construction from a directory of candidate images
//!
//! Candidates are decoded, filtered by aspect ratio and optionally by face
//! presence, vectorized and resized into tile bitmaps on a bounded worker
//! pool. Results are cached by fingerprint so repeated runs over the same
//! library skip decoding entirely.

use crate::algorithm::cache::{BuildParameters, CacheRecord, IndexCache};
use crate::algorithm::index::CodebookIndex;
use crate::analysis::vectorize::{VectorShape, vectorize};
use crate::io::configuration::{
    CODEBOOK_EXTENSIONS, DEFAULT_ASPECT_TOLERANCE, DEFAULT_CACHE_DIR, DEFAULT_CHANNELS,
    DEFAULT_HEIGHT_ASPECT, DEFAULT_VECTORIZATION_FACTOR, DEFAULT_WIDTH_ASPECT, DEFAULT_WORKERS,
};
use crate::io::error::{MosaicError, Result, WithPath, dimension_mismatch, invalid_parameter};
use crate::io::faces::FaceDetector;
use crate::io::image::{Raster, load_raster};
use crate::math::interpolation::resize_area;
use crate::spatial::CellShape;
use indicatif::ProgressBar;
use log::{debug, info, warn};
use ndarray::Array3;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Metadata of an accepted codebook image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileImage {
    /// Source file
    pub path: PathBuf,
    /// Decoded height in pixels
    pub height: usize,
    /// Decoded width in pixels
    pub width: usize,
    /// Height over width
    pub aspect_ratio: f64,
    /// Face filter verdict, when the filter ran
    pub has_face: Option<bool>,
}

/// Searchable tile library for one tile shape
///
/// Index ids, image metadata and bitmaps share positions.
#[derive(Debug, Clone)]
pub struct Codebook {
    index: CodebookIndex,
    images: Vec<TileImage>,
    tiles: Vec<Raster>,
    tile_shape: CellShape,
    vector_shape: VectorShape,
}

impl Codebook {
    /// Build a codebook from decoded images held in memory
    ///
    /// Each raster is vectorized at `vector_shape` and resized to `tile_shape`
    /// for its bitmap.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No rasters are given
    /// - A raster's channel count differs from `vector_shape`
    /// - A raster cannot be resampled
    pub fn from_rasters(
        entries: Vec<(TileImage, Raster)>,
        tile_shape: CellShape,
        vector_shape: VectorShape,
    ) -> Result<Self> {
        if entries.is_empty() {
            return Err(MosaicError::EmptyCodebook { candidates: 0 });
        }
        let mut index = CodebookIndex::new(vector_shape.dimensionality())?;
        let mut images = Vec::with_capacity(entries.len());
        let mut tiles = Vec::with_capacity(entries.len());

        for (image, raster) in entries {
            index.add(&vectorize(raster.view(), vector_shape)?)?;
            tiles.push(resize_area(
                raster.view(),
                tile_shape.height,
                tile_shape.width,
            )?);
            images.push(image);
        }

        Ok(Self {
            index,
            images,
            tiles,
            tile_shape,
            vector_shape,
        })
    }

    /// Restore a codebook from a validated cache record
    ///
    /// The index is rebuilt by re-adding every stored vector.
    ///
    /// # Errors
    ///
    /// Returns an error if the record's sizes disagree with the given shapes
    pub fn from_record(
        record: CacheRecord,
        tile_shape: CellShape,
        vector_shape: VectorShape,
    ) -> Result<Self> {
        if record.dimensions != vector_shape.dimensionality() {
            return Err(dimension_mismatch(
                "cached vectors",
                vector_shape.dimensionality(),
                record.dimensions,
            ));
        }
        let mut index = CodebookIndex::new(record.dimensions)?;
        index.add_matrix(&record.matrix)?;

        let tile_dims = (tile_shape.height, tile_shape.width, vector_shape.channels);
        let tiles = record
            .tiles
            .into_iter()
            .map(|samples| {
                let actual = samples.len();
                Array3::from_shape_vec(tile_dims, samples).map_err(|_shape| {
                    dimension_mismatch("cached tile", tile_dims.0 * tile_dims.1 * tile_dims.2, actual)
                })
            })
            .collect::<Result<Vec<_>>>()?;

        if tiles.len() != index.len() || record.images.len() != index.len() {
            return Err(dimension_mismatch(
                "cached tiles",
                index.len(),
                tiles.len().min(record.images.len()),
            ));
        }

        Ok(Self {
            index,
            images: record.images,
            tiles,
            tile_shape,
            vector_shape,
        })
    }

    /// Serializable form of this codebook under `parameters`
    pub fn to_record(&self, parameters: BuildParameters) -> CacheRecord {
        CacheRecord {
            fingerprint: parameters.fingerprint(),
            parameters,
            dimensions: self.index.dimensions(),
            matrix: self.index.matrix().to_vec(),
            images: self.images.clone(),
            tiles: self
                .tiles
                .iter()
                .map(|tile| tile.iter().copied().collect())
                .collect(),
        }
    }

    /// Nearest-neighbour index over tile vectors
    pub const fn index(&self) -> &CodebookIndex {
        &self.index
    }

    /// Accepted image metadata in id order
    pub fn images(&self) -> &[TileImage] {
        &self.images
    }

    /// Tile bitmaps in id order
    pub fn tiles(&self) -> &[Raster] {
        &self.tiles
    }

    /// Bitmap of the tile with `id`
    ///
    /// # Errors
    ///
    /// Returns an error if `id` is not in the codebook
    pub fn tile(&self, id: usize) -> Result<&Raster> {
        self.tiles.get(id).ok_or(MosaicError::InvalidTileIndex {
            index: id,
            max_tiles: self.tiles.len(),
        })
    }

    /// Number of tiles
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    /// Whether the codebook has no tiles
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Pixel shape of every tile bitmap
    pub const fn tile_shape(&self) -> CellShape {
        self.tile_shape
    }

    /// Shape regions are resampled to before search
    pub const fn vector_shape(&self) -> VectorShape {
        self.vector_shape
    }

    /// Samples per pixel
    pub const fn channels(&self) -> usize {
        self.vector_shape.channels
    }
}

/// Settings for building one codebook
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Pixel shape of the tiles
    pub tile_shape: CellShape,
    /// Samples per pixel (1, 3 or 4)
    pub channels: usize,
    /// Required image aspect ratio (height / width); `None` accepts every image
    pub aspect_ratio: Option<f64>,
    /// Relative tolerance of the aspect ratio match
    pub aspect_tolerance: f64,
    /// Scale applied to the tile shape before vectorization
    pub vectorization_factor: f64,
    /// Reject images without a detected face
    pub detect_faces: bool,
    /// Decode-and-vectorize workers
    pub workers: usize,
    /// Read and write the persistent cache
    pub caching: bool,
    /// Directory of cache records
    pub cache_dir: PathBuf,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self::new(
            DEFAULT_HEIGHT_ASPECT.round() as usize,
            DEFAULT_WIDTH_ASPECT.round() as usize,
        )
    }
}

impl IndexConfig {
    /// Settings for tiles of `height` x `width` pixels with default options
    pub fn new(height: usize, width: usize) -> Self {
        Self {
            tile_shape: CellShape::new(height, width),
            channels: DEFAULT_CHANNELS,
            aspect_ratio: None,
            aspect_tolerance: DEFAULT_ASPECT_TOLERANCE,
            vectorization_factor: DEFAULT_VECTORIZATION_FACTOR,
            detect_faces: false,
            workers: DEFAULT_WORKERS,
            caching: true,
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
        }
    }

    /// Validate all settings
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - A tile dimension is zero
    /// - `channels` is not 1, 3 or 4
    /// - The aspect ratio is not a positive finite number
    /// - The aspect tolerance is negative or not finite
    /// - The vectorization factor is not a positive finite number
    /// - `workers` is zero
    pub fn validate(&self) -> Result<()> {
        if self.tile_shape.is_degenerate() {
            return Err(invalid_parameter(
                "tile_shape",
                &format!("{}x{}", self.tile_shape.height, self.tile_shape.width),
                &"tile sides must be positive",
            ));
        }
        if !matches!(self.channels, 1 | 3 | 4) {
            return Err(invalid_parameter(
                "channels",
                &self.channels,
                &"must be 1, 3 or 4",
            ));
        }
        if let Some(ratio) = self.aspect_ratio {
            if !ratio.is_finite() || ratio <= 0.0 {
                return Err(invalid_parameter(
                    "aspect_ratio",
                    &ratio,
                    &"must be a positive finite number",
                ));
            }
        }
        if !self.aspect_tolerance.is_finite() || self.aspect_tolerance < 0.0 {
            return Err(invalid_parameter(
                "aspect_tolerance",
                &self.aspect_tolerance,
                &"must be a non-negative finite number",
            ));
        }
        if !self.vectorization_factor.is_finite() || self.vectorization_factor <= 0.0 {
            return Err(invalid_parameter(
                "vectorization_factor",
                &self.vectorization_factor,
                &"must be a positive finite number",
            ));
        }
        if self.workers == 0 {
            return Err(invalid_parameter(
                "workers",
                &self.workers,
                &"must be at least 1",
            ));
        }
        Ok(())
    }

    /// Vector shape derived from the tile shape and vectorization factor
    ///
    /// # Errors
    ///
    /// Returns an error if the settings are invalid
    pub fn vector_shape(&self) -> Result<VectorShape> {
        VectorShape::for_tile(self.tile_shape, self.channels, self.vectorization_factor)
    }

    /// Cache parameters for building from `paths`
    pub fn parameters(&self, paths: Vec<PathBuf>) -> BuildParameters {
        BuildParameters {
            detect_faces: self.detect_faces,
            vectorization_factor: self.vectorization_factor,
            aspect_ratio: self.aspect_ratio,
            aspect_tolerance: self.aspect_tolerance,
            ..BuildParameters::new(
                paths,
                self.tile_shape.height,
                self.tile_shape.width,
                self.channels,
            )
        }
    }

    /// Whether an image of `ratio` (height / width) passes the aspect filter
    pub fn accepts_aspect(&self, ratio: f64) -> bool {
        self.aspect_ratio.is_none_or(|desired| {
            (ratio - desired).abs() <= self.aspect_tolerance * desired
        })
    }
}

/// Outcome counts of a codebook build
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildStats {
    /// Candidate files examined
    pub candidates: usize,
    /// Images in the codebook
    pub accepted: usize,
    /// Rejected by the aspect filter
    pub rejected_aspect: usize,
    /// Rejected by the face filter
    pub rejected_no_face: usize,
    /// Skipped after a decode or vectorization failure
    pub skipped: usize,
    /// Whether the codebook came from the cache
    pub from_cache: bool,
    /// Wall time of the build
    pub elapsed: Duration,
}

enum CandidateOutcome {
    Accepted {
        image: TileImage,
        vector: Vec<f32>,
        tile: Raster,
    },
    WrongAspect,
    NoFace,
    Failed(MosaicError),
}

/// Files in `directory` with a codebook image extension, sorted
///
/// # Errors
///
/// Returns an error if the directory cannot be listed
pub fn discover_candidates(directory: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(directory).with_path(directory, "list codebook")? {
        let path = entry.with_path(directory, "list codebook")?.path();
        let matches = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                CODEBOOK_EXTENSIONS
                    .iter()
                    .any(|known| known.eq_ignore_ascii_case(ext))
            });
        if matches && path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

/// Builds codebooks according to an [`IndexConfig`]
pub struct CodebookBuilder<'a> {
    config: IndexConfig,
    face_detector: Option<&'a dyn FaceDetector>,
    progress: Option<ProgressBar>,
}

impl<'a> CodebookBuilder<'a> {
    /// Create a builder without face detection or progress reporting
    pub const fn new(config: IndexConfig) -> Self {
        Self {
            config,
            face_detector: None,
            progress: None,
        }
    }

    /// Use `detector` for the face filter
    #[must_use]
    pub fn with_face_detector(mut self, detector: &'a dyn FaceDetector) -> Self {
        self.face_detector = Some(detector);
        self
    }

    /// Advance `bar` once per processed candidate
    #[must_use]
    pub fn with_progress(mut self, bar: ProgressBar) -> Self {
        self.progress = Some(bar);
        self
    }

    /// Settings this builder uses
    pub const fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Discover candidates in `directory` and build from them
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be listed or the build fails
    pub fn build_from_dir(&self, directory: &Path) -> Result<(Codebook, BuildStats)> {
        let paths = discover_candidates(directory)?;
        self.build(&paths)
    }

    /// Build a codebook from `paths`, consulting the cache first
    ///
    /// Unreadable candidates are skipped and counted.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The configuration is invalid
    /// - The face filter is enabled without a detector
    /// - The worker pool cannot be started
    /// - No candidate survives filtering
    pub fn build(&self, paths: &[PathBuf]) -> Result<(Codebook, BuildStats)> {
        self.config.validate()?;
        if self.config.detect_faces && self.face_detector.is_none() {
            return Err(invalid_parameter(
                "detect_faces",
                &true,
                &"face filtering requires a face detector",
            ));
        }

        let start = Instant::now();
        let tile_shape = self.config.tile_shape;
        let vector_shape = self.config.vector_shape()?;
        let parameters = self.config.parameters(paths.to_vec());
        let mut stats = BuildStats {
            candidates: parameters.paths.len(),
            ..BuildStats::default()
        };

        let mut cache = self
            .config
            .caching
            .then(|| IndexCache::new(&self.config.cache_dir));

        let cached = cache
            .as_mut()
            .and_then(|cache| cache.load(&parameters))
            .and_then(|record| match Codebook::from_record(record, tile_shape, vector_shape) {
                Ok(codebook) => Some(codebook),
                Err(e) => {
                    warn!("Ignoring cached codebook: {e}");
                    None
                }
            });

        if let Some(codebook) = cached {
            stats.accepted = codebook.len();
            stats.from_cache = true;
            stats.elapsed = start.elapsed();
            if let Some(bar) = &self.progress {
                bar.finish();
            }
            info!(
                "Loaded cached codebook: {} images, {:.2} seconds",
                stats.accepted,
                stats.elapsed.as_secs_f64()
            );
            return Ok((codebook, stats));
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.workers)
            .build()
            .map_err(|e| MosaicError::WorkerPool {
                reason: e.to_string(),
            })?;

        let outcomes: Vec<CandidateOutcome> = pool.install(|| {
            parameters
                .paths
                .par_iter()
                .map(|path| {
                    let outcome = self.process_candidate(path, vector_shape);
                    if let Some(bar) = &self.progress {
                        bar.inc(1);
                    }
                    outcome
                })
                .collect()
        });
        if let Some(bar) = &self.progress {
            bar.finish();
        }

        let mut index = CodebookIndex::new(vector_shape.dimensionality())?;
        let mut images = Vec::new();
        let mut tiles = Vec::new();
        for (path, outcome) in parameters.paths.iter().zip(outcomes) {
            match outcome {
                CandidateOutcome::Accepted {
                    image,
                    vector,
                    tile,
                } => {
                    index.add(&vector)?;
                    images.push(image);
                    tiles.push(tile);
                }
                CandidateOutcome::WrongAspect => stats.rejected_aspect += 1,
                CandidateOutcome::NoFace => stats.rejected_no_face += 1,
                CandidateOutcome::Failed(e) => {
                    stats.skipped += 1;
                    warn!("Skipping {}: {e}", path.display());
                }
            }
        }

        if index.is_empty() {
            return Err(MosaicError::EmptyCodebook {
                candidates: stats.candidates,
            });
        }

        let codebook = Codebook {
            index,
            images,
            tiles,
            tile_shape,
            vector_shape,
        };
        stats.accepted = codebook.len();
        stats.elapsed = start.elapsed();

        if let Some(cache) = cache.as_mut() {
            cache.store(&codebook.to_record(parameters));
        }

        info!(
            "Indexing: {} images, {:.2} seconds",
            stats.accepted,
            stats.elapsed.as_secs_f64()
        );
        debug!(
            "Rejected {} by aspect, {} without faces, skipped {}",
            stats.rejected_aspect, stats.rejected_no_face, stats.skipped
        );

        Ok((codebook, stats))
    }

    fn process_candidate(&self, path: &Path, vector_shape: VectorShape) -> CandidateOutcome {
        let raster = match load_raster(path, self.config.channels) {
            Ok(raster) => raster,
            Err(e) => return CandidateOutcome::Failed(e),
        };
        let (height, width, _) = raster.dim();
        if height == 0 || width == 0 {
            return CandidateOutcome::Failed(invalid_parameter(
                "image",
                &path.display(),
                &"image has no pixels",
            ));
        }

        let aspect_ratio = height as f64 / width as f64;
        if !self.config.accepts_aspect(aspect_ratio) {
            return CandidateOutcome::WrongAspect;
        }

        let has_face = match (self.config.detect_faces, self.face_detector) {
            (true, Some(detector)) => {
                let present = detector.is_face_present(&raster);
                if !present {
                    return CandidateOutcome::NoFace;
                }
                Some(present)
            }
            _ => None,
        };

        let vector = match vectorize(raster.view(), vector_shape) {
            Ok(vector) => vector,
            Err(e) => return CandidateOutcome::Failed(e),
        };
        let tile = match resize_area(
            raster.view(),
            self.config.tile_shape.height,
            self.config.tile_shape.width,
        ) {
            Ok(tile) => tile,
            Err(e) => return CandidateOutcome::Failed(e),
        };

        CandidateOutcome::Accepted {
            image: TileImage {
                path: path.to_path_buf(),
                height,
                width,
                aspect_ratio,
                has_face,
            },
            vector,
            tile,
        }
    }
}
