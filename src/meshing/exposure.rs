//! Exposure-face extraction.
//!
//! For one direction and one slice of the grid, the exposure mask keeps a voxel's code where
//! its face in that direction borders void or a different code, and 0 everywhere else. Cells
//! outside the grid count as void, so boundary faces are always exposed and faces between two
//! equal codes never are.

use crate::voxels::{
    grid::SemanticVoxelGrid,
    voxel_code::{VoxelCode, VOID},
};

use super::face_direction::FaceDirection;

/// A 2D mask of exposed faces for one slice and direction.
#[derive(Debug, Clone, PartialEq)]
pub struct ExposureMask {
    pub direction: FaceDirection,
    /// Index of the voxel slice along the direction's axis
    pub slice: usize,
    /// Number of cells along the mask's `u` axis
    pub u_len: usize,
    /// Number of cells along the mask's `v` axis
    pub v_len: usize,
    cells: Vec<VoxelCode>,
}

impl ExposureMask {
    /// Builds a mask from explicit cells laid out `u`-major.
    #[cfg(test)]
    pub(crate) fn from_cells(
        direction: FaceDirection,
        slice: usize,
        u_len: usize,
        v_len: usize,
        cells: Vec<VoxelCode>,
    ) -> Self {
        assert_eq!(cells.len(), u_len * v_len, "mask cell count");
        ExposureMask {
            direction,
            slice,
            u_len,
            v_len,
            cells,
        }
    }

    /// Derives the exposure mask of `slice` for `direction`.
    pub fn extract(grid: &SemanticVoxelGrid, direction: FaceDirection, slice: usize) -> Self {
        let (u_axis, v_axis) = direction.mask_axes();
        let u_len = grid.extent(u_axis);
        let v_len = grid.extent(v_axis);
        let (dr, dc, dl) = direction.neighbor_offset();

        let mut cells = vec![VOID; u_len * v_len];
        for u in 0..u_len {
            for v in 0..v_len {
                let (row, col, level) = direction.cell(slice, u, v);
                let value = grid.get(row, col, level);
                if value == VOID {
                    continue;
                }
                let neighbor = grid.get_or_void(
                    row as isize + dr,
                    col as isize + dc,
                    level as isize + dl,
                );
                if neighbor != value {
                    cells[u * v_len + v] = value;
                }
            }
        }

        ExposureMask {
            direction,
            slice,
            u_len,
            v_len,
            cells,
        }
    }

    /// The plane index of the faces in this mask, in voxel units along the direction's axis.
    pub fn plane(&self) -> usize {
        if self.direction.is_positive() {
            self.slice + 1
        } else {
            self.slice
        }
    }

    #[inline]
    pub fn get(&self, u: usize, v: usize) -> VoxelCode {
        self.cells[u * self.v_len + v]
    }

    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(|c| *c == VOID)
    }

    /// The number of exposed cells.
    pub fn exposed_count(&self) -> usize {
        self.cells.iter().filter(|c| **c != VOID).count()
    }
}
