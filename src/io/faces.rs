//! Face detection collaborator used by the codebook face filter
//!
//! No detector ships with the crate. Callers pass an implementation into
//! [`CodebookBuilder`](crate::algorithm::builder::CodebookBuilder) explicitly.

use crate::io::image::Raster;

/// Axis-aligned face bounding box in pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FaceRegion {
    /// Left column
    pub x: usize,
    /// Top row
    pub y: usize,
    /// Box width in pixels
    pub width: usize,
    /// Box height in pixels
    pub height: usize,
}

impl FaceRegion {
    /// Pixel area of the box
    pub const fn area(&self) -> usize {
        self.width * self.height
    }
}

/// Detects faces in decoded images
///
/// Implementations are shared across indexing workers.
pub trait FaceDetector: Send + Sync {
    /// All face regions found in `image`
    fn detect(&self, image: &Raster) -> Vec<FaceRegion>;

    /// Whether at least one face is present
    fn is_face_present(&self, image: &Raster) -> bool {
        !self.detect(image).is_empty()
    }
}
