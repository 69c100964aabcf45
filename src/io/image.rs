//! Raster loading and export between image files and `ndarray` buffers

use crate::io::error::{MosaicError, Result, dimension_mismatch, invalid_parameter};
use fast_image_resize::PixelType;
use fast_image_resize::images::Image;
use image::{DynamicImage, GrayImage, RgbImage, RgbaImage};
use ndarray::{Array3, ArrayView3};
use std::path::Path;

/// Pixel buffer laid out as (height, width, channels), row-major
pub type Raster = Array3<u8>;

/// Convert a decoded image into a raster with `channels` samples per pixel
///
/// Supported channel counts are 1 (luma), 3 (RGB) and 4 (RGBA).
///
/// # Errors
///
/// Returns an error if the channel count is unsupported
pub fn raster_from_image(img: &DynamicImage, channels: usize) -> Result<Raster> {
    let (width, height) = (img.width() as usize, img.height() as usize);
    let samples = match channels {
        1 => img.to_luma8().into_raw(),
        3 => img.to_rgb8().into_raw(),
        4 => img.to_rgba8().into_raw(),
        _ => {
            return Err(invalid_parameter(
                "channels",
                &channels,
                &"must be 1, 3 or 4",
            ));
        }
    };

    let actual = samples.len();
    Array3::from_shape_vec((height, width, channels), samples)
        .map_err(|_shape| dimension_mismatch("decoded image", height * width * channels, actual))
}

/// Decode the image at `path` into a raster with `channels` samples per pixel
///
/// # Errors
///
/// Returns an error if:
/// - The file cannot be opened or decoded
/// - The channel count is unsupported
pub fn load_raster(path: &Path, channels: usize) -> Result<Raster> {
    let img = image::open(path).map_err(|e| MosaicError::ImageLoad {
        path: path.to_path_buf(),
        source: e,
    })?;
    raster_from_image(&img, channels)
}

/// Convert a raster back into a dynamic image
///
/// # Errors
///
/// Returns an error if the channel count is unsupported
pub fn raster_to_image(raster: &Raster) -> Result<DynamicImage> {
    let (height, width, channels) = raster.dim();
    let samples: Vec<u8> = raster.iter().copied().collect();
    let (w, h) = (width as u32, height as u32);
    let expected = height * width * channels;

    let img = match channels {
        1 => GrayImage::from_raw(w, h, samples).map(DynamicImage::ImageLuma8),
        3 => RgbImage::from_raw(w, h, samples).map(DynamicImage::ImageRgb8),
        4 => RgbaImage::from_raw(w, h, samples).map(DynamicImage::ImageRgba8),
        _ => {
            return Err(invalid_parameter(
                "channels",
                &channels,
                &"must be 1, 3 or 4",
            ));
        }
    };

    img.ok_or_else(|| dimension_mismatch("raster export", expected, raster.len()))
}

/// Convert a raster into an RGBA buffer, as required by frame encoders
///
/// # Errors
///
/// Returns an error if the channel count is unsupported
pub fn raster_to_rgba(raster: &Raster) -> Result<RgbaImage> {
    Ok(raster_to_image(raster)?.to_rgba8())
}

/// Resizer pixel layout for `channels` 8-bit samples per pixel
///
/// # Errors
///
/// Returns an error if the channel count is not between 1 and 4
pub fn pixel_type(channels: usize) -> Result<PixelType> {
    match channels {
        1 => Ok(PixelType::U8),
        2 => Ok(PixelType::U8x2),
        3 => Ok(PixelType::U8x3),
        4 => Ok(PixelType::U8x4),
        _ => Err(invalid_parameter(
            "channels",
            &channels,
            &"must be between 1 and 4",
        )),
    }
}

/// Copy a raster view into an owned resizer image
///
/// # Errors
///
/// Returns an error if the channel count is unsupported
pub fn raster_to_buffer(raster: ArrayView3<'_, u8>) -> Result<Image<'static>> {
    let (height, width, channels) = raster.dim();
    let samples: Vec<u8> = raster.iter().copied().collect();
    Image::from_vec_u8(width as u32, height as u32, samples, pixel_type(channels)?).map_err(|e| {
        MosaicError::Resize {
            reason: e.to_string(),
        }
    })
}

/// Take the samples of a resizer image as a raster with `channels` samples per pixel
///
/// # Errors
///
/// Returns an error if the image holds a different number of samples
pub fn raster_from_buffer(buffer: Image<'_>, channels: usize) -> Result<Raster> {
    let (height, width) = (buffer.height() as usize, buffer.width() as usize);
    let samples = buffer.into_vec();
    let actual = samples.len();
    Array3::from_shape_vec((height, width, channels), samples)
        .map_err(|_shape| dimension_mismatch("resized image", height * width * channels, actual))
}

/// Save a raster to `output_path`, creating parent directories as needed
///
/// The format is chosen from the file extension.
///
/// # Errors
///
/// Returns an error if:
/// - The raster has zero pixels
/// - The channel count is unsupported
/// - The parent directory cannot be created
/// - The image cannot be saved to the specified path
pub fn save_raster(raster: &Raster, output_path: &Path) -> Result<()> {
    if raster.is_empty() {
        return Err(invalid_parameter(
            "raster",
            &format!("{:?}", raster.dim()),
            &"cannot export an image without pixels",
        ));
    }

    let img = raster_to_image(raster)?;

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| MosaicError::FileSystem {
                path: parent.to_path_buf(),
                operation: "create directory",
                source: e,
            })?;
        }
    }

    img.save(output_path)
        .map_err(|e| MosaicError::ImageExport {
            path: output_path.to_path_buf(),
            source: e,
        })?;

    Ok(())
}
