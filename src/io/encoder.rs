//! Frame encoders for mosaic sequences

use crate::io::configuration::VIEWER_MIN_FRAME_DELAY_MS;
use crate::io::error::{MosaicError, Result, WithPath, dimension_mismatch, invalid_parameter};
use crate::io::image::{Raster, raster_to_rgba};
use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, Frame};
use std::fs::File;
use std::io::{BufWriter, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Sink for a fixed-shape sequence of frames
pub trait FrameEncoder: Sized {
    /// Create the output at `path` for frames of `shape` = (height, width, channels)
    ///
    /// # Errors
    ///
    /// Returns an error if the output cannot be created or the parameters are invalid
    fn open(path: &Path, fps: u32, shape: (usize, usize, usize)) -> Result<Self>;

    /// Append one frame
    ///
    /// # Errors
    ///
    /// Returns an error if the frame shape differs from the opened shape or encoding fails
    fn write(&mut self, frame: &Raster) -> Result<()>;

    /// Finish the output
    ///
    /// # Errors
    ///
    /// Returns an error if no frame was written or the output could not be completed
    fn close(self) -> Result<()>;
}

/// Final byte of every complete GIF stream
pub const GIF_TRAILER: u8 = 0x3B;

/// Animated GIF encoder that loops forever
pub struct GifFrameEncoder {
    encoder: GifEncoder<BufWriter<File>>,
    path: PathBuf,
    shape: (usize, usize, usize),
    delay: Delay,
    frames: usize,
}

/// Per-frame delay for `fps`, never shorter than viewers can display
pub fn frame_delay_ms(fps: u32) -> u32 {
    (1000 / fps.max(1)).max(VIEWER_MIN_FRAME_DELAY_MS)
}

impl GifFrameEncoder {
    /// Number of frames written so far
    pub const fn frame_count(&self) -> usize {
        self.frames
    }
}

impl FrameEncoder for GifFrameEncoder {
    fn open(path: &Path, fps: u32, shape: (usize, usize, usize)) -> Result<Self> {
        if fps == 0 {
            return Err(invalid_parameter("fps", &fps, &"must be positive"));
        }
        if shape.0 == 0 || shape.1 == 0 {
            return Err(invalid_parameter(
                "frame_shape",
                &format!("{}x{}", shape.0, shape.1),
                &"frames must have pixels",
            ));
        }

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_path(parent, "create directory")?;
            }
        }
        let file = File::create(path).with_path(path, "create file")?;

        let mut encoder = GifEncoder::new(BufWriter::new(file));
        encoder
            .set_repeat(Repeat::Infinite)
            .map_err(|e| MosaicError::ImageExport {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(Self {
            encoder,
            path: path.to_path_buf(),
            shape,
            delay: Delay::from_numer_denom_ms(frame_delay_ms(fps), 1),
            frames: 0,
        })
    }

    fn write(&mut self, frame: &Raster) -> Result<()> {
        let (height, width, channels) = frame.dim();
        if (height, width) != (self.shape.0, self.shape.1) {
            return Err(dimension_mismatch(
                "frame pixels",
                self.shape.0 * self.shape.1,
                height * width,
            ));
        }
        if channels != self.shape.2 {
            return Err(dimension_mismatch("frame channels", self.shape.2, channels));
        }

        let rgba = raster_to_rgba(frame)?;
        self.encoder
            .encode_frame(Frame::from_parts(rgba, 0, 0, self.delay))
            .map_err(|e| MosaicError::ImageExport {
                path: self.path.clone(),
                source: e,
            })?;
        self.frames += 1;
        Ok(())
    }

    fn close(self) -> Result<()> {
        if self.frames == 0 {
            return Err(invalid_parameter(
                "frames",
                &self.path.display(),
                &"no frames were written",
            ));
        }
        let Self { encoder, path, .. } = self;
        // Drop writes the trailer and flushes but swallows any error
        drop(encoder);
        verify_gif_trailer(&path)
    }
}

/// Check that the file at `path` ends with the GIF trailer
///
/// # Errors
///
/// Returns an error if:
/// - The file cannot be read
/// - The last byte is not the trailer
pub fn verify_gif_trailer(path: &Path) -> Result<()> {
    let mut file = File::open(path).with_path(path, "open file")?;
    let mut last = [0u8; 1];
    file.seek(SeekFrom::End(-1)).with_path(path, "seek file")?;
    file.read_exact(&mut last).with_path(path, "read file")?;
    if last != [GIF_TRAILER] {
        return Err(MosaicError::Format {
            path: path.to_path_buf(),
            reason: "GIF trailer missing".to_string(),
        });
    }
    Ok(())
}
