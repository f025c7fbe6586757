//! File export of generated meshes.
//!
//! - [`obj`]: Wavefront OBJ + MTL writer for any [`MeshBundle`](crate::meshing::MeshBundle)
//! - [`surface`]: Numeric value grids draped over terrain as coloured quads

pub mod obj;
pub mod surface;

pub use obj::{export_obj, MaterialStyle, ObjPaths};
pub use surface::{build_surface, SurfaceOptions};
