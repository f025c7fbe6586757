//! # Face Direction Module
//!
//! This module defines the six axis-aligned directions a voxel face can point in, and how
//! each direction lays out its 2D exposure masks.
//!
//! Output coordinates are `(x, y, z) = (row, col, level) * voxel_size`, so `+Z` is up.

use cgmath::{Point3, Vector3};

use crate::voxels::grid::GridAxis;

/// Represents the six possible outward directions of a voxel face.
///
/// Each variant is assigned the 1-based index of its normal in the exported normal list,
/// which is ordered `[+X, -X, +Y, -Y, +Z, -Z]`.
#[derive(PartialEq, Eq, Hash, Copy, Clone, Debug)]
pub enum FaceDirection {
    /// Facing positive X (towards higher rows)
    FRONT = 1,

    /// Facing negative X
    BACK = 2,

    /// Facing positive Y (towards higher columns)
    RIGHT = 3,

    /// Facing negative Y
    LEFT = 4,

    /// Facing positive Z (up)
    TOP = 5,

    /// Facing negative Z (down)
    BOTTOM = 6,
}

impl FaceDirection {
    /// Returns all six directions in meshing order.
    ///
    /// The order is: [BOTTOM, TOP, LEFT, RIGHT, BACK, FRONT]. It fixes the order in which
    /// vertices and materials are first seen, so exports are deterministic.
    pub fn all() -> [FaceDirection; 6] {
        [
            FaceDirection::BOTTOM,
            FaceDirection::TOP,
            FaceDirection::LEFT,
            FaceDirection::RIGHT,
            FaceDirection::BACK,
            FaceDirection::FRONT,
        ]
    }

    /// The unit normals in normal-index order.
    pub fn normals() -> [Vector3<f64>; 6] {
        [
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(-1.0, 0.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
            Vector3::new(0.0, -1.0, 0.0),
            Vector3::new(0.0, 0.0, 1.0),
            Vector3::new(0.0, 0.0, -1.0),
        ]
    }

    /// 1-based index into [`FaceDirection::normals`].
    pub fn normal_index(self) -> u32 {
        self as u32
    }

    pub fn normal(self) -> Vector3<f64> {
        Self::normals()[self as usize - 1]
    }

    /// The grid axis this face is perpendicular to.
    pub fn axis(self) -> GridAxis {
        match self {
            FaceDirection::FRONT | FaceDirection::BACK => GridAxis::Row,
            FaceDirection::RIGHT | FaceDirection::LEFT => GridAxis::Col,
            FaceDirection::TOP | FaceDirection::BOTTOM => GridAxis::Level,
        }
    }

    pub fn is_positive(self) -> bool {
        matches!(
            self,
            FaceDirection::FRONT | FaceDirection::RIGHT | FaceDirection::TOP
        )
    }

    /// Offset `(row, col, level)` to the neighbor this face looks at.
    pub fn neighbor_offset(self) -> (isize, isize, isize) {
        let step = if self.is_positive() { 1 } else { -1 };
        match self.axis() {
            GridAxis::Row => (step, 0, 0),
            GridAxis::Col => (0, step, 0),
            GridAxis::Level => (0, 0, step),
        }
    }

    /// The grid axes spanning this direction's masks as `(u, v)`.
    ///
    /// `v` is the scan axis the greedy mesher extends width along, `u` the axis it extends
    /// height along.
    pub fn mask_axes(self) -> (GridAxis, GridAxis) {
        match self.axis() {
            GridAxis::Level => (GridAxis::Col, GridAxis::Row),
            GridAxis::Col => (GridAxis::Level, GridAxis::Row),
            GridAxis::Row => (GridAxis::Level, GridAxis::Col),
        }
    }

    /// Maps a mask cell of slice `slice` to grid coordinates `(row, col, level)`.
    #[inline]
    pub fn cell(self, slice: usize, u: usize, v: usize) -> (usize, usize, usize) {
        match self.axis() {
            GridAxis::Level => (v, u, slice),
            GridAxis::Col => (v, slice, u),
            GridAxis::Row => (slice, v, u),
        }
    }

    /// Maps a lattice point on plane `plane` to output lattice coordinates `(x, y, z)`.
    #[inline]
    pub fn lattice_point(self, plane: usize, u: usize, v: usize) -> Point3<usize> {
        let (x, y, z) = self.cell(plane, u, v);
        Point3::new(x, y, z)
    }

    /// Whether this direction belongs to the column-axis family, whose corner order and
    /// triangulation are reversed to keep outward winding.
    pub fn is_col_family(self) -> bool {
        self.axis() == GridAxis::Col
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normal_indices_match_normals() {
        for direction in FaceDirection::all() {
            let (dr, dc, dl) = direction.neighbor_offset();
            let normal = direction.normal();
            assert_eq!(normal, Vector3::new(dr as f64, dc as f64, dl as f64));
        }
    }

    #[test]
    fn every_normal_index_is_used_once() {
        let mut indices: Vec<u32> = FaceDirection::all()
            .iter()
            .map(|d| d.normal_index())
            .collect();
        indices.sort();
        assert_eq!(indices, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn cells_follow_mask_axes() {
        assert_eq!(FaceDirection::TOP.cell(4, 1, 2), (2, 1, 4));
        assert_eq!(FaceDirection::LEFT.cell(4, 1, 2), (2, 4, 1));
        assert_eq!(FaceDirection::FRONT.cell(4, 1, 2), (4, 2, 1));
    }
}
