//! Mesh generation for voxel export.
//!
//! This module converts a semantic voxel grid into a face-culled, greedy-merged polygon mesh
//! grouped by material.
//!
//! # Architecture
//! - [`FaceDirection`]: The six outward face directions and how their masks are laid out
//! - [`ExposureMask`]: Per-slice mask of faces bordering void or a different code
//! - [`greedy`]: Merges each mask into maximal same-code rectangles
//! - [`Face`]: One merged rectangle with its corner order and triangulation
//! - [`MeshAssembler`]: Deduplicates vertices and groups triangles per material
//!
//! # Usage
//! ```no_run
//! use voxel_city::{materials::MaterialTable, meshing::build_mesh, voxels::grid::SemanticVoxelGrid};
//!
//! let mut grid = SemanticVoxelGrid::new(1, 1, 1, 1.0);
//! grid.set(0, 0, 0, -3);
//! let mesh = build_mesh(&grid, &MaterialTable::default_palette(), true);
//! assert_eq!(mesh.triangle_count(), 12);
//! ```
//!
//! # Concurrency
//! Mask extraction and merging are independent per (direction, slice) and may run on the rayon
//! pool. Vertex deduplication is the only shared state and always runs in one sequential pass
//! over the faces in job order, so the output is identical either way.

pub mod exposure;
mod face;
pub mod face_direction;
pub mod greedy;
mod mesh;

pub use exposure::ExposureMask;
pub use face::Face;
pub use face_direction::FaceDirection;
pub use mesh::*;
