//! Tests for cell partitioning, origin convention and covered bounds

#[cfg(test)]
mod tests {
    use tessellate::spatial::grid::leading_offset;
    use tessellate::spatial::{CellShape, partition};

    // Tests the documented 150 pixel / 32 pixel example
    // Verified by removing the saturating subtraction of one
    #[test]
    fn test_partition_centers_cells_with_offset_convention() {
        let cells = partition(150, 150, CellShape::new(32, 32));

        assert_eq!(cells.len(), 16);
        assert_eq!(cells.grid_dims(), (4, 4));

        let first = cells.cells().first().expect("first cell");
        let last = cells.cells().last().expect("last cell");
        assert_eq!(first.origin(), [10, 10]);
        assert_eq!(last.origin(), [106, 106]);
    }

    // Tests row-major ordering and ordinals
    // Verified by swapping the row and column loops
    #[test]
    fn test_partition_is_row_major() {
        let cells = partition(64, 96, CellShape::new(32, 32));
        let origins: Vec<[usize; 2]> = cells.cells().iter().map(|c| c.origin()).collect();

        assert_eq!(
            origins,
            vec![[0, 0], [0, 32], [0, 64], [32, 0], [32, 32], [32, 64]]
        );
        for (i, cell) in cells.cells().iter().enumerate() {
            assert_eq!(cell.ordinal, i);
        }
    }

    // Tests that an exact division has no offset
    #[test]
    fn test_partition_exact_division_starts_at_zero() {
        let cells = partition(40, 30, CellShape::new(4, 3));

        assert_eq!(cells.len(), 100);
        assert_eq!(cells.cells().first().map(|c| c.origin()), Some([0, 0]));
        assert_eq!(cells.cells().last().map(|c| c.origin()), Some([36, 27]));
    }

    // Tests that degenerate or oversized shapes yield no cells
    // Verified by removing the degenerate shape check
    #[test]
    fn test_partition_without_cells() {
        assert!(partition(10, 10, CellShape::new(11, 5)).is_empty());
        assert!(partition(10, 10, CellShape::new(0, 5)).is_empty());
        assert!(partition(10, 10, CellShape::new(5, 0)).is_empty());
        assert!(partition(0, 0, CellShape::new(1, 1)).is_empty());
        assert!(partition(10, 10, CellShape::new(11, 5)).covered_bounds().is_none());
    }

    // Tests the inclusive covered region spans every cell fully
    #[test]
    fn test_covered_bounds_include_last_cell() {
        let cells = partition(150, 150, CellShape::new(32, 32));
        let bounds = cells.covered_bounds().expect("bounds");

        assert_eq!(bounds.min, [10, 10]);
        assert_eq!(bounds.max, [137, 137]);
        assert_eq!(bounds.height(), 128);
        assert_eq!(bounds.width(), 128);
        assert!(bounds.contains([137, 10]));
        assert!(!bounds.contains([138, 10]));
    }

    // Tests offsets for small margins saturate at zero
    #[test]
    fn test_leading_offset_saturates() {
        assert_eq!(leading_offset(33, 32), 0);
        assert_eq!(leading_offset(35, 32), 0);
        assert_eq!(leading_offset(36, 32), 1);
        assert_eq!(leading_offset(10, 0), 0);
    }

    // Tests spans match the cell shape
    #[test]
    fn test_cell_spans() {
        let cells = partition(20, 30, CellShape::new(8, 6));
        let cell = cells.cells().get(1).expect("second cell");

        assert_eq!(cell.row_span(), 1..9);
        assert_eq!(cell.col_span(), 6..12);
        assert!((CellShape::new(8, 6).aspect_ratio() - 8.0 / 6.0).abs() < f64::EPSILON);
    }
}
