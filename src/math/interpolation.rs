//! Box-filter resampling and linear blending of rasters
//!
//! Resizing runs a box convolution, so a downsized pixel is the average of the
//! source pixels it covers.

use crate::io::error::{MosaicError, Result};
use crate::io::image::{Raster, raster_from_buffer, raster_to_buffer};
use fast_image_resize::images::Image;
use fast_image_resize::{FilterType, ResizeAlg, ResizeOptions, Resizer};
use ndarray::{Array3, ArrayView3};
use num_traits::clamp;

/// Resize `src` (height, width, channels) to `out_height` x `out_width` with a box filter
///
/// Samples are treated independently, alpha included. An empty source or
/// empty target size yields an all-zero result of the requested shape.
///
/// # Errors
///
/// Returns an error if:
/// - The channel count is not between 1 and 4
/// - The resizer rejects the buffers
pub fn resize_area(src: ArrayView3<'_, u8>, out_height: usize, out_width: usize) -> Result<Raster> {
    let (in_height, in_width, channels) = src.dim();
    if in_height == 0 || in_width == 0 || out_height == 0 || out_width == 0 || channels == 0 {
        return Ok(Array3::zeros((out_height, out_width, channels)));
    }
    if (in_height, in_width) == (out_height, out_width) {
        return Ok(src.to_owned());
    }

    let source = raster_to_buffer(src)?;
    let mut resized = Image::new(out_width as u32, out_height as u32, source.pixel_type());
    let options = ResizeOptions::default()
        .resize_alg(ResizeAlg::Convolution(FilterType::Box))
        .use_alpha(false);
    Resizer::new()
        .resize(&source, &mut resized, &options)
        .map_err(|e| MosaicError::Resize {
            reason: e.to_string(),
        })?;

    raster_from_buffer(resized, channels)
}

/// Weighted blend `weight * overlay + (1 - weight) * base`, rounded to 8-bit
///
/// `weight` is clamped to `[0, 1]`; rasters of different shapes return `None`.
pub fn blend(
    overlay: ArrayView3<'_, u8>,
    base: ArrayView3<'_, u8>,
    weight: f64,
) -> Option<Array3<u8>> {
    if overlay.dim() != base.dim() {
        return None;
    }

    let weight = clamp(weight, 0.0, 1.0) as f32;
    let mut out = Array3::<u8>::zeros(base.dim());
    ndarray::Zip::from(&mut out)
        .and(&overlay)
        .and(&base)
        .for_each(|o, &top, &bottom| {
            *o = to_u8(weight.mul_add(f32::from(top), (1.0 - weight) * f32::from(bottom)));
        });

    Some(out)
}

fn to_u8(value: f32) -> u8 {
    clamp(value.round(), 0.0, 255.0) as u8
}
