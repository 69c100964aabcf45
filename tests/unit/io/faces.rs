//! Tests for the face detector interface

#[cfg(test)]
mod tests {
    use ndarray::Array3;
    use tessellate::io::faces::{FaceDetector, FaceRegion};
    use tessellate::io::image::Raster;

    /// Reports a face wherever the top-left pixel is bright
    struct BrightCornerDetector;

    impl FaceDetector for BrightCornerDetector {
        fn detect(&self, image: &Raster) -> Vec<FaceRegion> {
            if image.get([0, 0, 0]).is_some_and(|&v| v > 128) {
                vec![FaceRegion {
                    x: 0,
                    y: 0,
                    width: 2,
                    height: 2,
                }]
            } else {
                Vec::new()
            }
        }
    }

    // Tests the default presence check follows detection
    #[test]
    fn test_is_face_present_default() {
        let bright = Array3::<u8>::from_elem((4, 4, 3), 200);
        let dark = Array3::<u8>::zeros((4, 4, 3));

        assert!(BrightCornerDetector.is_face_present(&bright));
        assert!(!BrightCornerDetector.is_face_present(&dark));
    }

    // Tests region areas
    #[test]
    fn test_face_region_area() {
        let region = FaceRegion {
            x: 1,
            y: 1,
            width: 3,
            height: 4,
        };

        assert_eq!(region.area(), 12);
    }
}
