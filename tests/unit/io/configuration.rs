//! Tests for output path patterns and JSON configuration loading

#[cfg(test)]
mod tests {
    use std::fs;
    use tessellate::algorithm::executor::MosaicConfig;
    use tessellate::io::configuration::{
        DEFAULT_STABILIZATION_THRESHOLD, format_output_path, load_json_config,
    };
    use tessellate::io::error::MosaicError;

    // Tests both placeholders are expanded
    #[test]
    fn test_format_output_path_placeholders() {
        assert_eq!(
            format_output_path("out/{name}_{scale}.png", "beach", Some(12)),
            "out/beach_12.png"
        );
        assert_eq!(
            format_output_path("out/{name}.png", "beach", None),
            "out/beach.png"
        );
        assert_eq!(
            format_output_path("fixed.png", "beach", Some(3)),
            "fixed.png"
        );
    }

    // Tests that missing fields fall back to defaults
    // Verified by removing serde(default) from the config
    #[test]
    fn test_load_json_config_partial() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("mosaic.json");
        fs::write(&path, r#"{ "randomness": 0.25, "best_k": 4 }"#).expect("write");

        let config: MosaicConfig = load_json_config(&path).expect("load");

        assert!((config.randomness - 0.25).abs() < f64::EPSILON);
        assert_eq!(config.best_k, 4);
        assert!(config.trim);
        assert!((config.stabilization_threshold - DEFAULT_STABILIZATION_THRESHOLD).abs() < f32::EPSILON);
    }

    // Tests malformed files surface as format errors
    #[test]
    fn test_load_json_config_malformed() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ not json").expect("write");

        let result: Result<MosaicConfig, MosaicError> = load_json_config(&path);

        assert!(matches!(result, Err(MosaicError::Format { .. })));
    }

    // Tests missing files surface as file system errors
    #[test]
    fn test_load_json_config_missing() {
        let dir = tempfile::tempdir().expect("tempdir");

        let result: Result<MosaicConfig, MosaicError> =
            load_json_config(&dir.path().join("absent.json"));

        assert!(matches!(result, Err(MosaicError::FileSystem { .. })));
    }
}
