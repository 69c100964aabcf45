//! Exact nearest-neighbour index over codebook vectors

use crate::io::error::{Result, dimension_mismatch, invalid_parameter};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Search hit: squared Euclidean distance and the id of the stored vector
#[derive(Debug, Clone, Copy)]
pub struct Neighbor {
    /// Squared L2 distance to the query
    pub distance: f32,
    /// Insertion order of the matched vector
    pub id: usize,
}

impl PartialEq for Neighbor {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Neighbor {}

impl Ord for Neighbor {
    // Ties resolve to the earlier insertion
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then(self.id.cmp(&other.id))
    }
}

impl PartialOrd for Neighbor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Flat brute-force L2 index
///
/// Vectors are stored contiguously; ids are insertion positions, so ids
/// line up with the codebook's image and bitmap lists.
#[derive(Debug, Clone)]
pub struct CodebookIndex {
    dimensions: usize,
    data: Vec<f32>,
    len: usize,
}

impl CodebookIndex {
    /// Create an empty index for vectors of `dimensions` components
    ///
    /// # Errors
    ///
    /// Returns an error if `dimensions` is zero
    pub fn new(dimensions: usize) -> Result<Self> {
        if dimensions == 0 {
            return Err(invalid_parameter(
                "dimensions",
                &dimensions,
                &"must be positive",
            ));
        }
        Ok(Self {
            dimensions,
            data: Vec::new(),
            len: 0,
        })
    }

    /// Append a vector and return its id
    ///
    /// # Errors
    ///
    /// Returns an error if the vector length differs from the index dimensionality
    pub fn add(&mut self, vector: &[f32]) -> Result<usize> {
        if vector.len() != self.dimensions {
            return Err(dimension_mismatch(
                "index vector",
                self.dimensions,
                vector.len(),
            ));
        }
        self.data.extend_from_slice(vector);
        self.len += 1;
        Ok(self.len - 1)
    }

    /// Append every row of a row-major matrix
    ///
    /// # Errors
    ///
    /// Returns an error if the matrix length is not a multiple of the dimensionality
    pub fn add_matrix(&mut self, matrix: &[f32]) -> Result<()> {
        if matrix.len() % self.dimensions != 0 {
            return Err(dimension_mismatch(
                "index matrix",
                matrix.len().div_ceil(self.dimensions) * self.dimensions,
                matrix.len(),
            ));
        }
        for row in matrix.chunks_exact(self.dimensions) {
            self.add(row)?;
        }
        Ok(())
    }

    /// Number of stored vectors
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether the index holds no vectors
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Components per vector
    pub const fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Stored vectors as one row-major matrix
    pub fn matrix(&self) -> &[f32] {
        &self.data
    }

    /// Stored vector with the given id
    pub fn vector(&self, id: usize) -> Option<&[f32]> {
        self.data.chunks_exact(self.dimensions).nth(id)
    }

    /// The `k` stored vectors closest to `query`, nearest first
    ///
    /// `k` is clamped to the index size. Equal distances keep insertion order.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The query length differs from the index dimensionality
    /// - `k` is zero
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        if query.len() != self.dimensions {
            return Err(dimension_mismatch(
                "query vector",
                self.dimensions,
                query.len(),
            ));
        }
        if k == 0 {
            return Err(invalid_parameter("k", &k, &"must be positive"));
        }

        let k = k.min(self.len);
        if k == 1 {
            return Ok(self.nearest_unchecked(query).into_iter().collect());
        }

        // Max-heap of the k best so far; the root is the worst kept hit
        let mut heap = BinaryHeap::with_capacity(k + 1);
        for (id, row) in self.data.chunks_exact(self.dimensions).enumerate() {
            let candidate = Neighbor {
                distance: squared_distance(query, row),
                id,
            };
            if heap.len() < k {
                heap.push(candidate);
            } else if heap.peek().is_some_and(|worst| candidate < *worst) {
                heap.pop();
                heap.push(candidate);
            }
        }

        Ok(heap.into_sorted_vec())
    }

    /// The single closest stored vector, or `None` for an empty index
    ///
    /// # Errors
    ///
    /// Returns an error if the query length differs from the index dimensionality
    pub fn nearest(&self, query: &[f32]) -> Result<Option<Neighbor>> {
        if query.len() != self.dimensions {
            return Err(dimension_mismatch(
                "query vector",
                self.dimensions,
                query.len(),
            ));
        }
        Ok(self.nearest_unchecked(query))
    }

    fn nearest_unchecked(&self, query: &[f32]) -> Option<Neighbor> {
        self.data
            .chunks_exact(self.dimensions)
            .enumerate()
            .map(|(id, row)| Neighbor {
                distance: squared_distance(query, row),
                id,
            })
            .min()
    }
}

/// Squared Euclidean distance between equal-length vectors
pub fn squared_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}
