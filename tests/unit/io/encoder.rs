//! Tests for the animated GIF frame encoder

#[cfg(test)]
mod tests {
    use ndarray::Array3;
    use std::fs;
    use tessellate::io::configuration::VIEWER_MIN_FRAME_DELAY_MS;
    use tessellate::io::encoder::{
        FrameEncoder, GIF_TRAILER, GifFrameEncoder, frame_delay_ms, verify_gif_trailer,
    };
    use tessellate::io::error::MosaicError;

    // Tests frames are written to a GIF file
    // Verified by skipping the frame write
    #[test]
    fn test_gif_encoder_writes_frames() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("out/frames.gif");

        let mut encoder = GifFrameEncoder::open(&path, 3, (6, 8, 3)).expect("open");
        encoder
            .write(&Array3::<u8>::from_elem((6, 8, 3), 40))
            .expect("first frame");
        encoder
            .write(&Array3::<u8>::from_elem((6, 8, 3), 220))
            .expect("second frame");
        assert_eq!(encoder.frame_count(), 2);
        encoder.close().expect("close");

        let bytes = fs::read(&path).expect("read gif");
        assert!(bytes.starts_with(b"GIF89a"));
        assert_eq!(bytes.last(), Some(&GIF_TRAILER));

        let decoded = ::image::open(&path).expect("decode gif");
        assert_eq!((decoded.width(), decoded.height()), (8, 6));
    }

    // Tests a stream cut before its trailer is reported
    // Verified by accepting any non-empty file
    #[test]
    fn test_truncated_gif_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("cut.gif");
        let mut encoder = GifFrameEncoder::open(&path, 3, (6, 8, 3)).expect("open");
        encoder
            .write(&Array3::<u8>::from_elem((6, 8, 3), 90))
            .expect("frame");
        encoder.close().expect("close");
        assert!(verify_gif_trailer(&path).is_ok());

        let mut bytes = fs::read(&path).expect("read gif");
        bytes.pop();
        fs::write(&path, &bytes).expect("truncate");

        assert!(matches!(
            verify_gif_trailer(&path),
            Err(MosaicError::Format { .. })
        ));
    }

    // Tests frames of another shape are rejected
    #[test]
    fn test_gif_encoder_rejects_shape_change() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut encoder =
            GifFrameEncoder::open(&dir.path().join("a.gif"), 3, (6, 8, 3)).expect("open");

        let result = encoder.write(&Array3::<u8>::zeros((8, 6, 3)));

        assert!(matches!(result, Err(MosaicError::DimensionMismatch { .. })));
    }

    // Tests closing without frames is an error
    #[test]
    fn test_gif_encoder_close_without_frames() {
        let dir = tempfile::tempdir().expect("tempdir");
        let encoder =
            GifFrameEncoder::open(&dir.path().join("b.gif"), 3, (6, 8, 3)).expect("open");

        assert!(encoder.close().is_err());
    }

    // Tests invalid open parameters
    #[test]
    fn test_gif_encoder_open_rejects_invalid() {
        let dir = tempfile::tempdir().expect("tempdir");

        assert!(GifFrameEncoder::open(&dir.path().join("c.gif"), 0, (6, 8, 3)).is_err());
        assert!(GifFrameEncoder::open(&dir.path().join("d.gif"), 3, (0, 8, 3)).is_err());
    }

    // Tests the delay floor for high frame rates
    #[test]
    fn test_frame_delay_ms() {
        assert_eq!(frame_delay_ms(3), 333);
        assert_eq!(frame_delay_ms(10), 100);
        assert_eq!(frame_delay_ms(1000), VIEWER_MIN_FRAME_DELAY_MS);
    }
}
