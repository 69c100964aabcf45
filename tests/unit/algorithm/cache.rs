//! Tests for cache fingerprints, record validation and persistence

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;
    use tessellate::algorithm::builder::TileImage;
    use tessellate::algorithm::cache::{BuildParameters, CacheRecord, IndexCache};

    fn parameters() -> BuildParameters {
        BuildParameters::new(
            vec![PathBuf::from("lib/b.jpg"), PathBuf::from("lib/a.jpg")],
            2,
            1,
            3,
        )
    }

    fn record(parameters: BuildParameters) -> CacheRecord {
        let images = ["lib/a.jpg", "lib/b.jpg"]
            .into_iter()
            .map(|p| TileImage {
                path: PathBuf::from(p),
                height: 20,
                width: 10,
                aspect_ratio: 2.0,
                has_face: None,
            })
            .collect();
        CacheRecord {
            fingerprint: parameters.fingerprint(),
            parameters,
            dimensions: 6,
            matrix: (0..12).map(|v| v as f32).collect(),
            images,
            tiles: vec![vec![1; 6], vec![2; 6]],
        }
    }

    // Tests the fingerprint ignores listing order but not parameters
    // Verified by removing the path sort
    #[test]
    fn test_fingerprint_stability() {
        let base = parameters();
        let reordered = BuildParameters::new(
            vec![PathBuf::from("lib/a.jpg"), PathBuf::from("lib/b.jpg")],
            2,
            1,
            3,
        );
        let faces = BuildParameters {
            detect_faces: true,
            ..parameters()
        };
        let factor = BuildParameters {
            vectorization_factor: 0.5,
            ..parameters()
        };
        let taller = BuildParameters::new(base.paths.clone(), 3, 1, 3);

        assert_eq!(base.fingerprint(), reordered.fingerprint());
        assert_ne!(base.fingerprint(), faces.fingerprint());
        assert_ne!(base.fingerprint(), factor.fingerprint());
        assert_ne!(base.fingerprint(), taller.fingerprint());
        assert_eq!(base.fingerprint().as_str().len(), 64);
    }

    // Tests a stored record loads back and counts a hit
    #[test]
    fn test_store_then_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut cache = IndexCache::new(dir.path().join("cache"));

        assert!(cache.store(&record(parameters())));
        let loaded = cache.load(&parameters()).expect("cached record");

        assert_eq!(loaded.matrix.len(), 12);
        assert_eq!(loaded.tiles, vec![vec![1; 6], vec![2; 6]]);
        assert_eq!(cache.stats.hits, 1);
        assert_eq!(cache.list_records().expect("list").len(), 1);
        assert!(cache.path_for(&parameters().fingerprint()).exists());
    }

    // Tests lookups for other parameters miss
    #[test]
    fn test_load_miss() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut cache = IndexCache::new(dir.path());
        cache.store(&record(parameters()));

        let other = BuildParameters::new(vec![PathBuf::from("lib/c.jpg")], 2, 1, 3);

        assert!(cache.load(&other).is_none());
        assert_eq!(cache.stats.misses, 1);
        assert_eq!(cache.stats.read_failures, 0);
    }

    // Tests corrupt records degrade to a miss
    // Verified by propagating the decode error
    #[test]
    fn test_corrupt_record_is_a_miss() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut cache = IndexCache::new(dir.path());
        fs::write(cache.path_for(&parameters().fingerprint()), "{ truncated").expect("write");

        assert!(cache.load(&parameters()).is_none());
        assert_eq!(cache.stats.read_failures, 1);
    }

    // Tests validation catches inconsistent records
    #[test]
    fn test_validate_rejects_inconsistent_records() {
        let good = record(parameters());
        assert!(good.validate(&parameters()).is_ok());

        let mut short_matrix = record(parameters());
        short_matrix.matrix.pop();
        assert!(short_matrix.validate(&parameters()).is_err());

        let mut bad_tile = record(parameters());
        bad_tile.tiles[1].push(0);
        assert!(bad_tile.validate(&parameters()).is_err());

        let foreign = BuildParameters::new(vec![PathBuf::from("x.jpg")], 2, 1, 3);
        assert!(good.validate(&foreign).is_err());
    }

    // Tests a self-consistent record with the wrong vector length is rejected and counted
    // Verified by checking only matrix length against the stored dimensions
    #[test]
    fn test_stale_dimensions_are_a_miss() {
        let mut stale = record(parameters());
        stale.dimensions = 3;
        stale.matrix.truncate(6);
        assert!(stale.validate(&parameters()).is_err());

        let dir = tempfile::tempdir().expect("tempdir");
        let mut cache = IndexCache::new(dir.path());
        assert!(cache.store(&stale));

        assert!(cache.load(&parameters()).is_none());
        assert_eq!(cache.stats.read_failures, 1);
        assert_eq!(cache.stats.misses, 1);
        assert_eq!(cache.stats.hits, 0);
    }

    // Tests listing a missing directory
    #[test]
    fn test_list_records_missing_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = IndexCache::new(dir.path().join("absent"));

        assert!(cache.list_records().expect("list").is_empty());
    }
}
