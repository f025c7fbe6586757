use cgmath::Point3;

use crate::voxels::voxel_code::VoxelCode;

use super::face_direction::FaceDirection;

/// Represents one merged rectangle of exposed voxel faces.
///
/// A face covers the mask cells `[u0, u1) × [v0, v1)` of one plane and carries the voxel code
/// shared by every covered cell. Corner points are lattice coordinates; multiplying by the
/// voxel size gives meters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Face {
    /// Which direction the face points in
    pub direction: FaceDirection,
    /// The voxel code of every covered cell, used for material lookup
    pub code: VoxelCode,
    /// Plane index along the direction's axis
    pub plane: usize,
    pub u0: usize,
    pub u1: usize,
    pub v0: usize,
    pub v1: usize,
}

impl Face {
    /// Creates a face covering `[u, u + height) × [v, v + width)` on `plane`.
    pub fn new(
        direction: FaceDirection,
        code: VoxelCode,
        plane: usize,
        u: usize,
        v: usize,
        width: usize,
        height: usize,
    ) -> Self {
        Face {
            direction,
            code,
            plane,
            u0: u,
            u1: u + height,
            v0: v,
            v1: v + width,
        }
    }

    /// Number of mask cells covered.
    pub fn area(&self) -> usize {
        (self.u1 - self.u0) * (self.v1 - self.v0)
    }

    pub fn contains(&self, u: usize, v: usize) -> bool {
        (self.u0..self.u1).contains(&u) && (self.v0..self.v1).contains(&v)
    }

    /// The four corners in canonical `(u, v)` order `(u0,v0) (u1,v0) (u1,v1) (u0,v1)`.
    pub fn corners(&self) -> [Point3<usize>; 4] {
        let point = |u, v| self.direction.lattice_point(self.plane, u, v);
        [
            point(self.u0, self.v0),
            point(self.u1, self.v0),
            point(self.u1, self.v1),
            point(self.u0, self.v1),
        ]
    }

    /// The corners in emission order.
    ///
    /// Negative directions keep the canonical order. Positive column-family faces are fully
    /// reversed; other positive faces keep the first corner and reverse the rest.
    pub fn ordered_corners(&self) -> [Point3<usize>; 4] {
        let [c0, c1, c2, c3] = self.corners();
        match (self.direction.is_col_family(), self.direction.is_positive()) {
            (_, false) => [c0, c1, c2, c3],
            (true, true) => [c3, c2, c1, c0],
            (false, true) => [c0, c3, c2, c1],
        }
    }

    /// Corner positions of the two triangles a quad is split into.
    pub fn triangle_corners(&self) -> [[usize; 3]; 2] {
        if self.direction.is_col_family() {
            [[2, 1, 0], [3, 2, 0]]
        } else {
            [[0, 1, 2], [0, 2, 3]]
        }
    }
}
