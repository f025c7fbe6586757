//! # Semantic Voxel Grid
//!
//! A dense `rows × cols × height` array of voxel codes.
//!
//! ## Memory Layout
//!
//! Cells are stored row-major with the height axis fastest:
//! `index = (row * cols + col) * height + level`. Every column is therefore one contiguous
//! slice, which lets the compositor fill columns independently and lets consumers read a
//! column without striding.

use serde::{Deserialize, Serialize};

use super::voxel_code::{VoxelCode, VOID};

/// The three axes of a voxel grid.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum GridAxis {
    Row,
    Col,
    Level,
}

/// A dense 3D grid of voxel codes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticVoxelGrid {
    rows: usize,
    cols: usize,
    height: usize,
    /// Edge length of one voxel in meters
    voxel_size: f64,
    data: Vec<VoxelCode>,
}

impl SemanticVoxelGrid {
    /// Creates a grid where every cell is void.
    pub fn new(rows: usize, cols: usize, height: usize, voxel_size: f64) -> Self {
        SemanticVoxelGrid {
            rows,
            cols,
            height,
            voxel_size,
            data: vec![VOID; rows * cols * height],
        }
    }

    /// `(rows, cols, height)`.
    pub fn dimensions(&self) -> (usize, usize, usize) {
        (self.rows, self.cols, self.height)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn voxel_size(&self) -> f64 {
        self.voxel_size
    }

    /// The number of cells along `axis`.
    pub fn extent(&self, axis: GridAxis) -> usize {
        match axis {
            GridAxis::Row => self.rows,
            GridAxis::Col => self.cols,
            GridAxis::Level => self.height,
        }
    }

    #[inline]
    fn index(&self, row: usize, col: usize, level: usize) -> usize {
        (row * self.cols + col) * self.height + level
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize, level: usize) -> VoxelCode {
        self.data[self.index(row, col, level)]
    }

    /// Reads a cell by signed coordinates, treating anything outside the grid as void.
    #[inline]
    pub fn get_or_void(&self, row: isize, col: isize, level: isize) -> VoxelCode {
        if row < 0
            || col < 0
            || level < 0
            || row as usize >= self.rows
            || col as usize >= self.cols
            || level as usize >= self.height
        {
            return VOID;
        }
        self.get(row as usize, col as usize, level as usize)
    }

    pub fn set(&mut self, row: usize, col: usize, level: usize, code: VoxelCode) {
        let index = self.index(row, col, level);
        self.data[index] = code;
    }

    /// The vertical stack of column `(row, col)`, bottom first.
    pub fn column(&self, row: usize, col: usize) -> &[VoxelCode] {
        let start = self.index(row, col, 0);
        &self.data[start..start + self.height]
    }

    pub fn column_mut(&mut self, row: usize, col: usize) -> &mut [VoxelCode] {
        let start = self.index(row, col, 0);
        let height = self.height;
        &mut self.data[start..start + height]
    }

    /// All cells in storage order.
    pub fn values(&self) -> &[VoxelCode] {
        &self.data
    }

    pub(crate) fn values_mut(&mut self) -> &mut [VoxelCode] {
        &mut self.data
    }

    /// The distinct non-void codes present, ascending.
    pub fn distinct_codes(&self) -> Vec<VoxelCode> {
        let mut codes: Vec<VoxelCode> = self.data.iter().copied().filter(|c| *c != VOID).collect();
        codes.sort_unstable();
        codes.dedup();
        codes
    }
}
