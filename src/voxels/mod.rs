//! # Voxels
//!
//! This module turns independently-sourced 2D raster layers into a semantic 3D voxel grid.
//!
//! ## Architecture
//!
//! * **Layers**: Holds the 2D input grids and aligns them to one orientation and shape
//! * **Voxel Code**: Defines the integer codes a voxel can hold
//! * **Grid**: Dense storage of the composited voxels, one contiguous slice per column
//! * **Compositor**: Synthesizes each column's vertical stack from the aligned layers, or one grid
//!   per component plus a layered stack of them
//!
//! ## Data Flow
//!
//! 1. Raw layers are normalized (flip, NaN substitution, land-cover offset, elevation re-base)
//! 2. The compositor derives a single grid height and fills every column
//! 3. The resulting grid is handed to meshing or to downstream analysis as-is

pub mod compositor;
pub mod grid;
pub mod layers;
pub mod voxel_code;
