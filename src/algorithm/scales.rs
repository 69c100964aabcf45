//! Codebooks and mosaics precomputed over a range of tile scales

use crate::algorithm::builder::{BuildStats, Codebook, CodebookBuilder, IndexConfig};
use crate::algorithm::executor::{MosaicConfig, MosaicSession, Rendered};
use crate::io::configuration::{
    DEFAULT_HEIGHT_ASPECT, DEFAULT_MAX_SCALE, DEFAULT_MIN_SCALE, DEFAULT_WIDTH_ASPECT,
    SCALE_STABILIZATION_THRESHOLD,
};
use crate::io::error::{Result, invalid_parameter};
use crate::io::faces::FaceDetector;
use crate::io::image::Raster;
use crate::io::progress::ProgressManager;
use crate::spatial::CellShape;
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Inclusive range of integer scales and the tile aspect multipliers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScaleRangeConfig {
    /// Smallest scale
    pub min_scale: usize,
    /// Largest scale
    pub max_scale: usize,
    /// Tile height per unit of scale
    pub height_aspect: f64,
    /// Tile width per unit of scale
    pub width_aspect: f64,
}

impl Default for ScaleRangeConfig {
    fn default() -> Self {
        Self {
            min_scale: DEFAULT_MIN_SCALE,
            max_scale: DEFAULT_MAX_SCALE,
            height_aspect: DEFAULT_HEIGHT_ASPECT,
            width_aspect: DEFAULT_WIDTH_ASPECT,
        }
    }
}

impl ScaleRangeConfig {
    /// Validate the range and multipliers
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `min_scale` is zero or greater than `max_scale`
    /// - An aspect multiplier is not a positive finite number
    pub fn validate(&self) -> Result<()> {
        if self.min_scale == 0 {
            return Err(invalid_parameter(
                "min_scale",
                &self.min_scale,
                &"must be at least 1",
            ));
        }
        if self.min_scale > self.max_scale {
            return Err(invalid_parameter(
                "max_scale",
                &self.max_scale,
                &format!("must not be below min_scale ({})", self.min_scale),
            ));
        }
        for (name, value) in [
            ("height_aspect", self.height_aspect),
            ("width_aspect", self.width_aspect),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(invalid_parameter(
                    name,
                    &value,
                    &"must be a positive finite number",
                ));
            }
        }
        Ok(())
    }

    /// Tile shape at `scale`: each aspect multiplier times the scale, rounded
    pub fn tile_shape(&self, scale: usize) -> CellShape {
        tile_shape_for(scale, self.height_aspect, self.width_aspect)
    }

    /// Aspect ratio (height / width) codebook images must have
    pub fn aspect_ratio(&self) -> f64 {
        self.height_aspect / self.width_aspect
    }

    /// Every scale in the range, ascending
    pub fn scales(&self) -> impl Iterator<Item = usize> {
        self.min_scale..=self.max_scale
    }
}

/// Tile shape for `scale` with the given aspect multipliers
pub fn tile_shape_for(scale: usize, height_aspect: f64, width_aspect: f64) -> CellShape {
    CellShape::new(
        (height_aspect * scale as f64).round() as usize,
        (width_aspect * scale as f64).round() as usize,
    )
}

/// Results for one scale
#[derive(Debug)]
pub struct ScaleEntry {
    /// Codebook built for the scale's tile shape
    pub codebook: Arc<Codebook>,
    /// How the codebook was built
    pub stats: BuildStats,
    /// Mosaic of the precompute target, when one was given
    pub rendered: Option<Rendered>,
}

/// Scale-keyed codebooks and mosaics
#[derive(Debug, Default)]
pub struct ScaleSet {
    entries: BTreeMap<usize, ScaleEntry>,
}

impl ScaleSet {
    /// Codebook for `scale`, if it was computed
    pub fn codebook(&self, scale: usize) -> Option<&Arc<Codebook>> {
        self.entries.get(&scale).map(|entry| &entry.codebook)
    }

    /// Precomputed mosaic for `scale`, if any
    pub fn mosaic(&self, scale: usize) -> Option<&Raster> {
        self.entries
            .get(&scale)
            .and_then(|entry| entry.rendered.as_ref())
            .map(|rendered| &rendered.mosaic)
    }

    /// Full entry for `scale`
    pub fn entry(&self, scale: usize) -> Option<&ScaleEntry> {
        self.entries.get(&scale)
    }

    /// Computed scales, ascending
    pub fn scales(&self) -> Vec<usize> {
        self.entries.keys().copied().collect()
    }

    /// Number of computed scales
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no scale was computed
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in ascending scale order
    pub fn iter(&self) -> impl Iterator<Item = (usize, &ScaleEntry)> {
        self.entries.iter().map(|(&scale, entry)| (scale, entry))
    }
}

/// Builds a codebook per scale and optionally renders a target at each
pub struct MultiScaleEngine<'a> {
    range: ScaleRangeConfig,
    index: IndexConfig,
    mosaic: MosaicConfig,
    face_detector: Option<&'a dyn FaceDetector>,
}

impl<'a> MultiScaleEngine<'a> {
    /// Create an engine
    ///
    /// `index` supplies every build setting except the tile shape and aspect
    /// filter, which are derived per scale. Precomputed mosaics always use
    /// stabilization; its threshold defaults to 0.85 for this engine.
    pub fn new(range: ScaleRangeConfig, index: IndexConfig, mosaic: MosaicConfig) -> Self {
        Self {
            range,
            index,
            mosaic: MosaicConfig {
                use_stabilization: true,
                ..mosaic
            },
            face_detector: None,
        }
    }

    /// Mosaic settings with the multi-scale stabilization threshold applied
    pub fn default_mosaic_config() -> MosaicConfig {
        MosaicConfig {
            use_stabilization: true,
            stabilization_threshold: SCALE_STABILIZATION_THRESHOLD,
            ..MosaicConfig::default()
        }
    }

    /// Use `detector` for the face filter of every build
    #[must_use]
    pub fn with_face_detector(mut self, detector: &'a dyn FaceDetector) -> Self {
        self.face_detector = Some(detector);
        self
    }

    /// Build settings for `scale`
    pub fn index_config(&self, scale: usize) -> IndexConfig {
        IndexConfig {
            tile_shape: self.range.tile_shape(scale),
            aspect_ratio: Some(self.range.aspect_ratio()),
            ..self.index.clone()
        }
    }

    /// Build every scale's codebook from `paths` and render `target` at each
    ///
    /// Each scale renders with its own fresh stabilization state.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or any scale fails to
    /// build or render
    pub fn precompute(
        &self,
        paths: &[PathBuf],
        target: Option<&Raster>,
        mut progress: Option<&mut ProgressManager>,
    ) -> Result<ScaleSet> {
        self.range.validate()?;
        self.mosaic.validate()?;

        let mut set = ScaleSet::default();
        for scale in self.range.scales() {
            let config = self.index_config(scale);
            info!(
                "Indexing scale={scale} ({}x{} tiles)",
                config.tile_shape.height, config.tile_shape.width
            );

            let mut builder = CodebookBuilder::new(config);
            if let Some(detector) = self.face_detector {
                builder = builder.with_face_detector(detector);
            }
            if let Some(manager) = progress.as_deref_mut() {
                builder = builder.with_progress(manager.stage(&format!("scale {scale}"), paths.len()));
            }

            let (codebook, stats) = builder.build(paths)?;
            let rendered = target
                .map(|image| MosaicSession::new(&codebook, self.mosaic)?.render(image))
                .transpose()?;

            set.entries.insert(
                scale,
                ScaleEntry {
                    codebook: Arc::new(codebook),
                    stats,
                    rendered,
                },
            );
        }

        Ok(set)
    }
}
