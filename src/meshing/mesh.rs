//! Mesh data structures and assembly for voxel export.
//!
//! This module turns greedy-merged faces into an export bundle: a deduplicated vertex list,
//! triangles grouped per material, and the material list itself.
//!
//! Vertices are deduplicated by exact coordinate match. Voxel corners are integer multiples of
//! the voxel size computed the same way every time, so shared corners always produce identical
//! floats and no tolerance is needed.

use std::{collections::HashMap, hash::Hash};

use cgmath::{Point3, Vector3};
use log::info;
use web_time::Instant;

use crate::materials::{Material, MaterialTable};
use crate::voxels::{grid::SemanticVoxelGrid, voxel_code::VoxelCode};

use super::{face::Face, face_direction::FaceDirection, greedy};

/// A triangle referencing 1-based vertex indices and a 1-based normal index.
///
/// The normal index is 0 in bundles that carry no normals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Triangle {
    pub vertices: [u32; 3],
    pub normal_index: u32,
}

/// All triangles sharing one material.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialGroup {
    pub material: Material,
    pub triangles: Vec<Triangle>,
}

/// A complete mesh ready for export.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshBundle {
    /// Unique vertices in meters, in first-seen order; triangle index `i` refers to entry `i - 1`
    pub vertices: Vec<Point3<f64>>,
    /// Unit normals; normal index `i` refers to entry `i - 1`
    pub normals: Vec<Vector3<f64>>,
    /// Triangle groups in first-seen material order
    pub groups: Vec<MaterialGroup>,
}

impl MeshBundle {
    pub fn triangle_count(&self) -> usize {
        self.groups.iter().map(|g| g.triangles.len()).sum()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// The materials in group order.
    pub fn materials(&self) -> impl Iterator<Item = &Material> {
        self.groups.iter().map(|g| &g.material)
    }
}

/// Incrementally builds a [`MeshBundle`] from quads.
///
/// Quads are grouped by a material key `K`. They must be added in a deterministic order;
/// vertex and material order follow it.
#[derive(Debug)]
pub struct MeshAssembler<K> {
    vertex_lookup: HashMap<[u64; 3], u32>,
    vertices: Vec<Point3<f64>>,
    group_lookup: HashMap<K, usize>,
    groups: Vec<(K, Vec<Triangle>)>,
    quad_count: usize,
}

impl<K: Hash + Eq + Clone> MeshAssembler<K> {
    pub fn new() -> Self {
        MeshAssembler {
            vertex_lookup: HashMap::new(),
            vertices: Vec::new(),
            group_lookup: HashMap::new(),
            groups: Vec::new(),
            quad_count: 0,
        }
    }

    /// Returns the 1-based index of `point`, inserting it if it is new.
    fn vertex_index(&mut self, point: Point3<f64>) -> u32 {
        // Adding 0.0 folds -0.0 into 0.0 so both share a key.
        let key = [
            (point.x + 0.0).to_bits(),
            (point.y + 0.0).to_bits(),
            (point.z + 0.0).to_bits(),
        ];
        if let Some(index) = self.vertex_lookup.get(&key) {
            return *index;
        }
        self.vertices.push(point);
        let index = self.vertices.len() as u32;
        self.vertex_lookup.insert(key, index);
        index
    }

    /// Adds one quad as two triangles to the group of `key`.
    ///
    /// # Arguments
    /// * `key` - Material key of the quad
    /// * `corners` - The corners in emission order
    /// * `triangles` - Corner positions `0..4` of the two triangles
    /// * `normal_index` - 1-based normal index, or 0 when the mesh carries no normals
    pub fn add_quad(
        &mut self,
        key: K,
        corners: [Point3<f64>; 4],
        triangles: [[usize; 3]; 2],
        normal_index: u32,
    ) {
        let indices = corners.map(|corner| self.vertex_index(corner));

        let group = match self.group_lookup.get(&key) {
            Some(group) => *group,
            None => {
                self.groups.push((key.clone(), Vec::new()));
                self.group_lookup.insert(key, self.groups.len() - 1);
                self.groups.len() - 1
            }
        };

        for triangle in triangles {
            self.groups[group].1.push(Triangle {
                vertices: triangle.map(|corner| indices[corner]),
                normal_index,
            });
        }
        self.quad_count += 1;
    }

    /// The number of quads added so far.
    pub fn quad_count(&self) -> usize {
        self.quad_count
    }

    /// Resolves each group's material and produces the bundle.
    pub fn finish(
        self,
        normals: Vec<Vector3<f64>>,
        mut material: impl FnMut(&K) -> Material,
    ) -> MeshBundle {
        let groups = self
            .groups
            .into_iter()
            .map(|(key, triangles)| MaterialGroup {
                material: material(&key),
                triangles,
            })
            .collect();
        MeshBundle {
            vertices: self.vertices,
            normals,
            groups,
        }
    }
}

impl<K: Hash + Eq + Clone> Default for MeshAssembler<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl MeshAssembler<VoxelCode> {
    /// Adds a greedy-merged voxel face, scaling its lattice corners by `voxel_size`.
    pub fn add_face(&mut self, face: &Face, voxel_size: f64) {
        let corners = face.ordered_corners().map(|p| {
            Point3::new(
                p.x as f64 * voxel_size,
                p.y as f64 * voxel_size,
                p.z as f64 * voxel_size,
            )
        });
        self.add_quad(
            face.code,
            corners,
            face.triangle_corners(),
            face.direction.normal_index(),
        );
    }
}

/// Generates the export mesh of a voxel grid.
///
/// # Arguments
/// * `grid` - The voxel grid to mesh
/// * `materials` - Table used to resolve each voxel code's material
/// * `parallel` - Run mask extraction and merging on the rayon pool; assembly stays sequential
///
/// # Returns
/// A bundle whose contents do not depend on `parallel`.
pub fn build_mesh(
    grid: &SemanticVoxelGrid,
    materials: &MaterialTable,
    parallel: bool,
) -> MeshBundle {
    let faces = greedy::greedy_faces(grid, parallel);

    let start_time = Instant::now();
    let mut assembler = MeshAssembler::new();
    for face in &faces {
        assembler.add_face(face, grid.voxel_size());
    }
    let bundle = assembler.finish(FaceDirection::normals().to_vec(), |code| {
        materials.material_for(*code)
    });

    info!(
        "Assembled {} vertices, {} triangles, {} materials in {:?}",
        bundle.vertex_count(),
        bundle.triangle_count(),
        bundle.groups.len(),
        start_time.elapsed()
    );

    bundle
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn single_voxel_has_twelve_triangles_and_eight_vertices() {
        let mut grid = SemanticVoxelGrid::new(1, 1, 1, 2.0);
        grid.set(0, 0, 0, -3);

        let bundle = build_mesh(&grid, &MaterialTable::default_palette(), false);

        assert_eq!(bundle.vertex_count(), 8);
        assert_eq!(bundle.triangle_count(), 12);
        assert_eq!(bundle.groups.len(), 1);
        assert_eq!(bundle.groups[0].material.name, "material_-3");
        let corners: HashSet<(u64, u64, u64)> = bundle
            .vertices
            .iter()
            .map(|p| (p.x.to_bits(), p.y.to_bits(), p.z.to_bits()))
            .collect();
        assert_eq!(corners.len(), 8);
        for p in &bundle.vertices {
            assert!([p.x, p.y, p.z].iter().all(|c| *c == 0.0 || *c == 2.0));
        }
    }

    #[test]
    fn indices_are_one_based_and_in_range() {
        let mut grid = SemanticVoxelGrid::new(2, 2, 2, 1.0);
        grid.set(0, 0, 0, -1);
        grid.set(1, 1, 1, 4);

        let bundle = build_mesh(&grid, &MaterialTable::default_palette(), false);
        let count = bundle.vertex_count() as u32;

        for group in &bundle.groups {
            for triangle in &group.triangles {
                assert!(triangle.vertices.iter().all(|i| (1..=count).contains(i)));
                assert!((1..=6).contains(&triangle.normal_index));
            }
        }
    }

    #[test]
    fn materials_keep_first_seen_order() {
        let mut grid = SemanticVoxelGrid::new(1, 2, 1, 1.0);
        grid.set(0, 0, 0, 9);
        grid.set(0, 1, 0, -2);

        let bundle = build_mesh(&grid, &MaterialTable::default_palette(), false);
        let names: Vec<&str> = bundle.materials().map(|m| m.name.as_str()).collect();

        // Bottom faces are meshed first, row-major with rows on the scan axis.
        assert_eq!(names, vec!["material_9", "material_-2"]);
    }

    #[test]
    fn shared_corners_are_stored_once() {
        let mut assembler = MeshAssembler::new();
        assembler.add_face(&Face::new(FaceDirection::TOP, 1, 1, 0, 0, 1, 1), 0.5);
        assembler.add_face(&Face::new(FaceDirection::TOP, 2, 1, 0, 1, 1, 1), 0.5);
        let table = MaterialTable::new();

        let bundle = assembler.finish(Vec::new(), |code| table.material_for(*code));

        assert_eq!(bundle.vertex_count(), 6);
        assert_eq!(bundle.groups.len(), 2);
    }
}
