//! Tests for exact nearest-neighbour search

#[cfg(test)]
mod tests {
    use tessellate::algorithm::index::{CodebookIndex, squared_distance};
    use tessellate::io::error::MosaicError;

    fn line_index() -> CodebookIndex {
        let mut index = CodebookIndex::new(2).expect("index");
        for x in [0.0f32, 10.0, 3.0, 7.0, 3.0] {
            index.add(&[x, 0.0]).expect("add");
        }
        index
    }

    // Tests ascending order with insertion-order ties
    // Verified by ordering the heap on distance only
    #[test]
    fn test_search_orders_by_distance_then_id() {
        let index = line_index();

        let hits = index.search(&[2.0, 0.0], 4).expect("search");
        let ids: Vec<usize> = hits.iter().map(|n| n.id).collect();

        assert_eq!(ids, vec![2, 4, 0, 3]);
        assert!((hits[0].distance - 1.0).abs() < f32::EPSILON);
        assert!((hits[2].distance - 4.0).abs() < f32::EPSILON);
    }

    // Tests that k larger than the index is clamped
    #[test]
    fn test_search_clamps_k() {
        let index = line_index();

        let hits = index.search(&[0.0, 0.0], 50).expect("search");

        assert_eq!(hits.len(), 5);
        assert_eq!(hits.last().map(|n| n.id), Some(1));
    }

    // Tests the single-hit path agrees with the nearest query
    #[test]
    fn test_search_single_hit() {
        let index = line_index();

        let hits = index.search(&[6.0, 1.0], 1).expect("search");
        let nearest = index.nearest(&[6.0, 1.0]).expect("nearest");

        assert_eq!(hits.len(), 1);
        assert_eq!(hits.first().map(|n| n.id), Some(3));
        assert_eq!(nearest.map(|n| n.id), Some(3));
    }

    // Tests dimensionality is enforced on add and search
    #[test]
    fn test_dimension_checks() {
        let mut index = line_index();

        assert!(matches!(
            index.add(&[1.0]),
            Err(MosaicError::DimensionMismatch { .. })
        ));
        assert!(index.search(&[1.0, 2.0, 3.0], 1).is_err());
        assert!(index.search(&[1.0, 2.0], 0).is_err());
        assert!(CodebookIndex::new(0).is_err());
    }

    // Tests that a matrix rebuild matches incremental adds
    #[test]
    fn test_add_matrix_rebuilds_same_index() {
        let index = line_index();
        let mut rebuilt = CodebookIndex::new(2).expect("index");

        rebuilt.add_matrix(index.matrix()).expect("add matrix");

        assert_eq!(rebuilt.len(), 5);
        assert_eq!(rebuilt.vector(3), Some(&[7.0f32, 0.0][..]));
        assert!(rebuilt.add_matrix(&[1.0, 2.0, 3.0]).is_err());
    }

    // Tests empty index queries
    #[test]
    fn test_empty_index() {
        let index = CodebookIndex::new(3).expect("index");

        assert!(index.is_empty());
        assert_eq!(index.nearest(&[0.0, 0.0, 0.0]).expect("nearest"), None);
        assert!(index.search(&[0.0, 0.0, 0.0], 3).expect("search").is_empty());
    }

    #[test]
    fn test_squared_distance() {
        assert!((squared_distance(&[1.0, 2.0], &[4.0, 6.0]) - 25.0).abs() < f32::EPSILON);
    }
}
