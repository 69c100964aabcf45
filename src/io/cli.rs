//! Command-line interface for rendering images, frame sequences and scale sweeps

use crate::algorithm::builder::{
    BuildStats, Codebook, CodebookBuilder, IndexConfig, discover_candidates,
};
use crate::algorithm::executor::{MosaicConfig, MosaicSession, Rendered};
use crate::algorithm::scales::{MultiScaleEngine, ScaleRangeConfig, tile_shape_for};
use crate::io::configuration::{
    DEFAULT_FPS, DEFAULT_HEIGHT_ASPECT, DEFAULT_MAX_SCALE, DEFAULT_MIN_SCALE,
    DEFAULT_WIDTH_ASPECT, SCALE_STABILIZATION_THRESHOLD, format_output_path, load_json_config,
};
use crate::io::encoder::{FrameEncoder, GifFrameEncoder};
use crate::io::error::{Result, invalid_parameter};
use crate::io::image::{load_raster, save_raster};
use crate::io::progress::ProgressManager;
use clap::{Args, Parser, Subcommand};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "tessellate")]
#[command(author, version, about = "Build photo mosaics from a library of images")]
/// Command-line arguments for the mosaic tool
pub struct Cli {
    /// Operation to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available operations
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Render one target image as a mosaic
    Image(ImageArgs),
    /// Render a directory of frames into an animated GIF
    Frames(FramesArgs),
    /// Precompute mosaics of one target over a range of scales
    Scales(ScalesArgs),
}

/// Options shared by every operation
#[derive(Args, Debug, Clone)]
// CLI tools commonly need multiple boolean flags for various features and user preferences
#[allow(clippy::struct_excessive_bools)]
pub struct SharedArgs {
    /// Directory of codebook images
    #[arg(short, long, value_name = "DIR")]
    pub codebook_dir: PathBuf,

    /// Output path; `{name}` and `{scale}` are replaced by the target stem and scale
    #[arg(short, long, value_name = "PATTERN")]
    pub output: String,

    /// Tile height per unit of scale
    #[arg(long, default_value_t = DEFAULT_HEIGHT_ASPECT)]
    pub height_aspect: f64,

    /// Tile width per unit of scale
    #[arg(long, default_value_t = DEFAULT_WIDTH_ASPECT)]
    pub width_aspect: f64,

    /// Scale applied to tiles before vectorization
    #[arg(long)]
    pub vectorization_factor: Option<f64>,

    /// Probability that a cell gets a random tile
    #[arg(long)]
    pub randomness: Option<f64>,

    /// Weight of the original image blended over the mosaic
    #[arg(long)]
    pub opacity: Option<f64>,

    /// Choose among this many nearest tiles
    #[arg(short = 'k', long)]
    pub best_k: Option<usize>,

    /// Weight the best tiles by distance instead of choosing uniformly
    #[arg(long)]
    pub weighted_k: bool,

    /// Keep only codebook images with a detected face
    #[arg(long)]
    pub detect_faces: bool,

    /// Fraction of the previous distance a new tile must beat
    #[arg(long)]
    pub stabilization_threshold: Option<f32>,

    /// Keep the uncovered margin instead of cropping to the cells
    #[arg(long)]
    pub no_trim: bool,

    /// Decode-and-vectorize workers during indexing
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Directory of cached codebooks
    #[arg(long, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Neither read nor write cached codebooks
    #[arg(long)]
    pub no_cache: bool,

    /// Random seed for reproducible renders
    #[arg(short, long)]
    pub seed: Option<u64>,

    /// Suppress progress output
    #[arg(short, long)]
    pub quiet: bool,

    /// JSON file with `mosaic` and `index` settings; flags take precedence
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// Arguments of the `image` operation
#[derive(Args, Debug, Clone)]
pub struct ImageArgs {
    /// Image to render
    #[arg(value_name = "TARGET")]
    pub target: PathBuf,

    /// Tile size multiplier
    #[arg(long)]
    pub scale: usize,

    /// Options shared by every operation
    #[command(flatten)]
    pub shared: SharedArgs,
}

/// Arguments of the `frames` operation
#[derive(Args, Debug, Clone)]
pub struct FramesArgs {
    /// Directory of frames, rendered in file name order
    #[arg(value_name = "FRAMES_DIR")]
    pub frames_dir: PathBuf,

    /// Tile size multiplier
    #[arg(long)]
    pub scale: usize,

    /// Frames per second of the output
    #[arg(long, default_value_t = DEFAULT_FPS)]
    pub fps: u32,

    /// Stop after this many frames
    #[arg(long)]
    pub max_frames: Option<usize>,

    /// Render frames in reverse name order
    #[arg(long)]
    pub reverse: bool,

    /// Options shared by every operation
    #[command(flatten)]
    pub shared: SharedArgs,
}

/// Arguments of the `scales` operation
#[derive(Args, Debug, Clone)]
pub struct ScalesArgs {
    /// Image to render at every scale
    #[arg(value_name = "TARGET")]
    pub target: PathBuf,

    /// Smallest scale
    #[arg(long, default_value_t = DEFAULT_MIN_SCALE)]
    pub min_scale: usize,

    /// Largest scale
    #[arg(long, default_value_t = DEFAULT_MAX_SCALE)]
    pub max_scale: usize,

    /// Options shared by every operation
    #[command(flatten)]
    pub shared: SharedArgs,
}

impl Cli {
    /// Options of the selected operation
    pub const fn shared(&self) -> &SharedArgs {
        match &self.command {
            Command::Image(args) => &args.shared,
            Command::Frames(args) => &args.shared,
            Command::Scales(args) => &args.shared,
        }
    }

    /// Check if progress should be displayed
    pub const fn should_show_progress(&self) -> bool {
        !self.shared().quiet
    }
}

/// Settings loadable from a JSON file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Tile assignment settings
    pub mosaic: MosaicConfig,
    /// Codebook build settings
    pub index: IndexConfig,
}

impl SharedArgs {
    /// Settings from the config file (or defaults) with flags applied on top
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or decoded
    pub fn settings(&self) -> Result<Settings> {
        let mut settings = match &self.config {
            Some(path) => load_json_config(path)?,
            None => Settings::default(),
        };
        self.apply(&mut settings);
        Ok(settings)
    }

    fn apply(&self, settings: &mut Settings) {
        let mosaic = &mut settings.mosaic;
        if let Some(randomness) = self.randomness {
            mosaic.randomness = randomness;
        }
        if let Some(opacity) = self.opacity {
            mosaic.opacity = opacity;
        }
        if let Some(best_k) = self.best_k {
            mosaic.best_k = best_k;
        }
        if self.weighted_k {
            mosaic.uniform_k = false;
        }
        if let Some(threshold) = self.stabilization_threshold {
            mosaic.stabilization_threshold = threshold;
        }
        if self.no_trim {
            mosaic.trim = false;
        }
        if let Some(seed) = self.seed {
            mosaic.seed = seed;
        }

        let index = &mut settings.index;
        if let Some(factor) = self.vectorization_factor {
            index.vectorization_factor = factor;
        }
        if self.detect_faces {
            index.detect_faces = true;
        }
        if let Some(workers) = self.workers {
            index.workers = workers;
        }
        if let Some(dir) = &self.cache_dir {
            index.cache_dir.clone_from(dir);
        }
        if self.no_cache {
            index.caching = false;
        }
    }

    /// Build settings for tiles at `scale`, filtered to the aspect multipliers' ratio
    pub fn index_config(&self, base: &IndexConfig, scale: usize) -> IndexConfig {
        IndexConfig {
            tile_shape: tile_shape_for(scale, self.height_aspect, self.width_aspect),
            aspect_ratio: Some(self.height_aspect / self.width_aspect),
            ..base.clone()
        }
    }
}

/// Runs the selected operation with progress tracking
pub struct MosaicRunner {
    cli: Cli,
    progress_manager: Option<ProgressManager>,
}

impl MosaicRunner {
    /// Create a runner for the parsed arguments
    pub fn new(cli: Cli) -> Self {
        let progress_manager = cli.should_show_progress().then(ProgressManager::new);

        Self {
            cli,
            progress_manager,
        }
    }

    /// Run the selected operation
    ///
    /// # Errors
    ///
    /// Returns an error if settings are invalid, the codebook cannot be built,
    /// or an input or output file cannot be processed
    pub fn run(&mut self) -> Result<()> {
        let command = self.cli.command.clone();
        let result = match &command {
            Command::Image(args) => self.run_image(args),
            Command::Frames(args) => self.run_frames(args),
            Command::Scales(args) => self.run_scales(args),
        };

        if let Some(pm) = &self.progress_manager {
            pm.finish();
        }
        result
    }

    fn build_codebook(
        &mut self,
        config: IndexConfig,
        codebook_dir: &Path,
    ) -> Result<(Codebook, BuildStats)> {
        let paths = discover_candidates(codebook_dir)?;
        info!(
            "Images={}, candidates={}, tiles={}x{}, aspect_ratio={:.4}, vectorization={}",
            codebook_dir.display(),
            paths.len(),
            config.tile_shape.height,
            config.tile_shape.width,
            config.aspect_ratio.unwrap_or_default(),
            config.vectorization_factor
        );

        let mut builder = CodebookBuilder::new(config);
        if let Some(pm) = self.progress_manager.as_mut() {
            builder = builder.with_progress(pm.stage("indexing", paths.len()));
        }
        builder.build(&paths)
    }

    fn run_image(&mut self, args: &ImageArgs) -> Result<()> {
        let settings = args.shared.settings()?;
        let config = args.shared.index_config(&settings.index, args.scale);
        let channels = config.channels;
        let (codebook, _) = self.build_codebook(config, &args.shared.codebook_dir)?;

        let target = load_raster(&args.target, channels)?;
        let start = Instant::now();
        let mut session = MosaicSession::new(&codebook, settings.mosaic)?;
        let rendered = session.render(&target)?;
        log_render(&rendered, start);

        let output = format_output_path(
            &args.shared.output,
            &file_stem(&args.target),
            Some(args.scale),
        );
        save_raster(&rendered.mosaic, Path::new(&output))?;
        info!("Saved mosaic to {output}");
        Ok(())
    }

    fn run_frames(&mut self, args: &FramesArgs) -> Result<()> {
        let settings = args.shared.settings()?;
        let config = args.shared.index_config(&settings.index, args.scale);
        let channels = config.channels;
        let (codebook, _) = self.build_codebook(config, &args.shared.codebook_dir)?;

        let mut frames = discover_candidates(&args.frames_dir)?;
        if args.reverse {
            frames.reverse();
        }
        if let Some(limit) = args.max_frames {
            frames.truncate(limit);
        }
        if frames.is_empty() {
            return Err(invalid_parameter(
                "frames_dir",
                &args.frames_dir.display(),
                &"contains no frames",
            ));
        }

        let output = format_output_path(
            &args.shared.output,
            &file_stem(&args.frames_dir),
            Some(args.scale),
        );
        let bar = self
            .progress_manager
            .as_mut()
            .map(|pm| pm.stage("rendering", frames.len()));

        let mosaic = MosaicConfig {
            use_stabilization: true,
            ..settings.mosaic
        };
        let mut session = MosaicSession::new(&codebook, mosaic)?;
        let mut encoder: Option<GifFrameEncoder> = None;
        let start = Instant::now();

        for frame_path in &frames {
            let frame = load_raster(frame_path, channels)?;
            let rendered = session.render(&frame)?;
            if !rendered.report.failures.is_empty() {
                warn!(
                    "{}: {} cells failed",
                    frame_path.display(),
                    rendered.report.failures.len()
                );
            }

            if encoder.is_none() {
                encoder = Some(GifFrameEncoder::open(
                    Path::new(&output),
                    args.fps,
                    rendered.mosaic.dim(),
                )?);
            }
            if let Some(sink) = encoder.as_mut() {
                sink.write(&rendered.mosaic)?;
            }

            if let Some(bar) = &bar {
                bar.inc(1);
            }
        }

        if let Some(sink) = encoder {
            sink.close()?;
        }
        if let Some(bar) = bar {
            bar.finish();
        }
        info!(
            "Rendered {} frames in {:.2} seconds to {output}",
            session.frames_rendered(),
            start.elapsed().as_secs_f64()
        );
        Ok(())
    }

    fn run_scales(&mut self, args: &ScalesArgs) -> Result<()> {
        let settings = args.shared.settings()?;
        let range = ScaleRangeConfig {
            min_scale: args.min_scale,
            max_scale: args.max_scale,
            height_aspect: args.shared.height_aspect,
            width_aspect: args.shared.width_aspect,
        };
        let mut mosaic = settings.mosaic;
        if args.shared.stabilization_threshold.is_none() && args.shared.config.is_none() {
            mosaic.stabilization_threshold = SCALE_STABILIZATION_THRESHOLD;
        }

        let paths = discover_candidates(&args.shared.codebook_dir)?;
        let target = load_raster(&args.target, settings.index.channels)?;
        let engine = MultiScaleEngine::new(range, settings.index, mosaic);
        let set = engine.precompute(&paths, Some(&target), self.progress_manager.as_mut())?;

        let name = file_stem(&args.target);
        for (scale, entry) in set.iter() {
            if let Some(rendered) = &entry.rendered {
                let output = format_output_path(&args.shared.output, &name, Some(scale));
                save_raster(&rendered.mosaic, Path::new(&output))?;
                info!("Saved scale {scale} to {output}");
            }
        }
        Ok(())
    }
}

fn log_render(rendered: &Rendered, start: Instant) {
    let report = &rendered.report;
    info!(
        "Mosaic: {}/{} cells in {:.2} seconds (mean {:.4}s, stddev {:.4}s per cell)",
        report.written_count(),
        report.cells,
        start.elapsed().as_secs_f64(),
        report.mean_cell_time().unwrap_or_default().as_secs_f64(),
        report.stddev_cell_time().unwrap_or_default().as_secs_f64()
    );
    for failure in &report.failures {
        warn!(
            "Cell {} at {:?} left blank: {}",
            failure.ordinal, failure.origin, failure.error
        );
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .unwrap_or_default()
        .to_string_lossy()
        .into_owned()
}
