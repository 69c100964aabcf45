//! Tests for per-cell stabilization state

#[cfg(test)]
mod tests {
    use tessellate::algorithm::stabilization::StabilizationState;

    // Tests the first write is always accepted
    #[test]
    fn test_first_write_accepted() {
        let state = StabilizationState::new(3, 0.95);

        assert!(state.accepts(0, 1.0e9));
        assert_eq!(state.previous_tile(0), None);
        assert_eq!(state.cell_count(), 3);
    }

    // Tests the threshold comparison is strict
    // Verified by comparing with less-or-equal
    #[test]
    fn test_threshold_is_strict() {
        let mut state = StabilizationState::new(1, 0.5);
        state.record_distance(0, 100.0);

        assert!(state.accepts(0, 49.0));
        assert!(!state.accepts(0, 50.0));
        assert!(!state.accepts(0, 80.0));
    }

    // Tests the recorded distance always follows the latest query
    #[test]
    fn test_distance_updates_without_write() {
        let mut state = StabilizationState::new(1, 0.9);
        state.record_distance(0, 100.0);
        state.record_tile(0, 5);

        // A slightly better match is rejected but still becomes the new reference
        assert!(!state.accepts(0, 95.0));
        state.record_distance(0, 95.0);
        assert!(state.accepts(0, 85.0));
        assert_eq!(state.previous_tile(0), Some(5));
        assert_eq!(state.last_distance(0), Some(95.0));
    }

    // Tests reset clears history and resizes
    #[test]
    fn test_reset() {
        let mut state = StabilizationState::new(2, 0.9);
        state.record_distance(1, 1.0);
        state.record_tile(1, 3);

        state.reset(4);

        assert_eq!(state.cell_count(), 4);
        assert_eq!(state.previous_tile(1), None);
        assert!(state.accepts(1, 1.0e6));
        assert!((state.threshold() - 0.9).abs() < f32::EPSILON);
    }

    // Tests out-of-range cells are ignored
    #[test]
    fn test_out_of_range_cells() {
        let mut state = StabilizationState::new(1, 0.9);
        state.record_distance(5, 1.0);
        state.record_tile(5, 1);

        assert_eq!(state.previous_tile(5), None);
        assert_eq!(state.last_distance(5), None);
    }
}
