//! Rectangular partitioning of a target image into mosaic cells
//!
//! Cells tile the central region of the image. The remainder margin along
//! each axis is split so roughly half of it is dropped from each side, with
//! the origin convention `offset = margin / 2 - 1` (saturating at zero).
//! Cells are ordered row-major: every cell of the top cell row from left to
//! right, then the next cell row.

use std::ops::Range;

/// Pixel dimensions shared by every cell of one mosaic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct CellShape {
    /// Cell height in pixels
    pub height: usize,
    /// Cell width in pixels
    pub width: usize,
}

impl CellShape {
    /// Create a cell shape
    pub const fn new(height: usize, width: usize) -> Self {
        Self { height, width }
    }

    /// Height over width
    pub fn aspect_ratio(&self) -> f64 {
        self.height as f64 / self.width as f64
    }

    /// Whether either dimension is zero
    pub const fn is_degenerate(&self) -> bool {
        self.height == 0 || self.width == 0
    }
}

/// Axis-aligned bounding box in pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    /// Minimum (row, col), inclusive
    pub min: [usize; 2],
    /// Maximum (row, col), inclusive
    pub max: [usize; 2],
}

impl BoundingBox {
    /// Check if a position is within the bounds
    pub const fn contains(&self, pos: [usize; 2]) -> bool {
        pos[0] >= self.min[0]
            && pos[0] <= self.max[0]
            && pos[1] >= self.min[1]
            && pos[1] <= self.max[1]
    }

    /// Number of rows covered
    pub const fn height(&self) -> usize {
        self.max[0] - self.min[0] + 1
    }

    /// Number of columns covered
    pub const fn width(&self) -> usize {
        self.max[1] - self.min[1] + 1
    }
}

/// One cell of the partition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridCell {
    /// Position of the cell in partition order
    pub ordinal: usize,
    /// Top pixel row of the cell
    pub row: usize,
    /// Left pixel column of the cell
    pub col: usize,
    /// Cell dimensions
    pub shape: CellShape,
}

impl GridCell {
    /// Cell origin as (row, col)
    pub const fn origin(&self) -> [usize; 2] {
        [self.row, self.col]
    }

    /// Pixel rows covered by the cell
    pub const fn row_span(&self) -> Range<usize> {
        self.row..self.row + self.shape.height
    }

    /// Pixel columns covered by the cell
    pub const fn col_span(&self) -> Range<usize> {
        self.col..self.col + self.shape.width
    }
}

/// Ordered cells covering an image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    cells: Vec<GridCell>,
    shape: CellShape,
    grid_dims: (usize, usize),
    image_dims: (usize, usize),
}

impl Partition {
    /// Cells in partition order
    pub fn cells(&self) -> &[GridCell] {
        &self.cells
    }

    /// Number of cells
    pub const fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether the image was too small for a single cell
    pub const fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Shared cell dimensions
    pub const fn shape(&self) -> CellShape {
        self.shape
    }

    /// Number of cell rows and cell columns
    pub const fn grid_dims(&self) -> (usize, usize) {
        self.grid_dims
    }

    /// Image (height, width) the partition was computed for
    pub const fn image_dims(&self) -> (usize, usize) {
        self.image_dims
    }

    /// Pixel region spanned from the first cell's origin to the far corner of the last cell
    pub fn covered_bounds(&self) -> Option<BoundingBox> {
        let first = self.cells.first()?;
        let last = self.cells.last()?;
        Some(BoundingBox {
            min: first.origin(),
            max: [
                last.row + self.shape.height - 1,
                last.col + self.shape.width - 1,
            ],
        })
    }
}

/// Leading offset for one axis
///
/// Half the margin is dropped before the first cell, minus one pixel, so a
/// 150 pixel axis cut into 32 pixel cells starts at 10 and ends its last cell at 137.
pub const fn leading_offset(extent: usize, cell: usize) -> usize {
    if cell == 0 {
        return 0;
    }
    ((extent % cell) / 2).saturating_sub(1)
}

/// Partition an image of `height` x `width` pixels into cells of `shape`
///
/// Produces `floor(height / shape.height) * floor(width / shape.width)` cells;
/// zero cells when the shape is degenerate or larger than the image.
pub fn partition(height: usize, width: usize, shape: CellShape) -> Partition {
    let image_dims = (height, width);

    if shape.is_degenerate() {
        return Partition {
            cells: Vec::new(),
            shape,
            grid_dims: (0, 0),
            image_dims,
        };
    }

    let cell_rows = height / shape.height;
    let cell_cols = width / shape.width;
    let row_offset = leading_offset(height, shape.height);
    let col_offset = leading_offset(width, shape.width);

    let mut cells = Vec::with_capacity(cell_rows * cell_cols);
    for i in 0..cell_rows {
        for j in 0..cell_cols {
            cells.push(GridCell {
                ordinal: cells.len(),
                row: row_offset + i * shape.height,
                col: col_offset + j * shape.width,
                shape,
            });
        }
    }

    Partition {
        cells,
        shape,
        grid_dims: (cell_rows, cell_cols),
        image_dims,
    }
}
