//! Greedy meshing implementation for voxel export.
//!
//! This module implements the greedy meshing algorithm which combines adjacent coplanar
//! exposed faces with the same voxel code into larger rectangles, significantly reducing the
//! number of vertices and triangles needed to describe a voxel grid.
//!
//! Each exposure mask is scanned row-major. Every cell moves from unvisited to visited exactly
//! once; a mask is done when all of its non-zero cells are visited. The decomposition covers
//! the mask exactly without overlap but is not guaranteed to use the fewest rectangles.

use bitvec::vec::BitVec;
use log::{debug, info};
use rayon::prelude::*;
use web_time::Instant;

use crate::voxels::{grid::SemanticVoxelGrid, voxel_code::VOID};

use super::{exposure::ExposureMask, face::Face, face_direction::FaceDirection};

/// Merges the exposed cells of one mask into rectangles.
///
/// # Arguments
/// * `mask` - The exposure mask of one slice and direction
///
/// # Returns
/// The faces in scan order: by `u`, then by `v`.
pub fn greedy_mask(mask: &ExposureMask) -> Vec<Face> {
    let (h, w) = (mask.u_len, mask.v_len);
    let plane = mask.plane();
    let mut visited: BitVec = BitVec::repeat(false, h * w);
    let mut faces = Vec::new();

    for u in 0..h {
        let mut v = 0;
        while v < w {
            let value = mask.get(u, v);
            if visited[u * w + v] || value == VOID {
                v += 1;
                continue;
            }

            let mut width = 1;
            while v + width < w
                && mask.get(u, v + width) == value
                && !visited[u * w + v + width]
            {
                width += 1;
            }

            let mut height = 1;
            'rows: while u + height < h {
                for k in 0..width {
                    let index = (u + height) * w + v + k;
                    if mask.get(u + height, v + k) != value || visited[index] {
                        break 'rows;
                    }
                }
                height += 1;
            }

            for du in 0..height {
                let start = (u + du) * w + v;
                visited[start..start + width].fill(true);
            }

            faces.push(Face::new(
                mask.direction,
                value,
                plane,
                u,
                v,
                width,
                height,
            ));
            v += width;
        }
    }

    faces
}

/// Extracts and merges every slice of one direction.
fn greedy_direction_slice(
    grid: &SemanticVoxelGrid,
    direction: FaceDirection,
    slice: usize,
) -> Vec<Face> {
    let mask = ExposureMask::extract(grid, direction, slice);
    if mask.is_empty() {
        return Vec::new();
    }
    greedy_mask(&mask)
}

/// Generates greedy-merged faces for all six directions of a grid.
///
/// # Arguments
/// * `grid` - The voxel grid to mesh
/// * `parallel` - Run the independent (direction, slice) jobs on the rayon pool
///
/// # Returns
/// Faces ordered by direction (see [`FaceDirection::all`]), then slice, then scan order. The
/// order is the same whether or not the jobs ran in parallel.
pub fn greedy_faces(grid: &SemanticVoxelGrid, parallel: bool) -> Vec<Face> {
    let start_time = Instant::now();

    let jobs: Vec<(FaceDirection, usize)> = FaceDirection::all()
        .into_iter()
        .flat_map(|direction| {
            (0..grid.extent(direction.axis())).map(move |slice| (direction, slice))
        })
        .collect();

    let per_job: Vec<Vec<Face>> = if parallel {
        jobs.par_iter()
            .map(|(direction, slice)| greedy_direction_slice(grid, *direction, *slice))
            .collect()
    } else {
        jobs.iter()
            .map(|(direction, slice)| greedy_direction_slice(grid, *direction, *slice))
            .collect()
    };

    let faces: Vec<Face> = per_job.into_iter().flatten().collect();

    for direction in FaceDirection::all() {
        debug!(
            "{:?}: {} faces",
            direction,
            faces.iter().filter(|f| f.direction == direction).count()
        );
    }
    info!(
        "Greedy meshing produced {} faces from {} masks in {:?}",
        faces.len(),
        jobs.len(),
        start_time.elapsed()
    );

    faces
}
