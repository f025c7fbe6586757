#![warn(rustdoc::missing_crate_level_docs)]
#![warn(rustdoc::invalid_rust_codeblocks)]

//! # Voxel City
//!
//! Converts georeferenced 2D raster layers of a city (building heights, land cover, terrain
//! elevation and canopy height) into a semantic 3D voxel grid, and exports that grid as a
//! face-culled, greedy-merged triangle mesh in Wavefront OBJ/MTL format.
//!
//! ## Key Modules
//!
//! * `voxels` - Raster layers, their normalization, the voxel grid and the column compositor
//! * `meshing` - Exposure masks, greedy rectangle merging and mesh assembly
//! * `materials` - Voxel-code-to-material tables and numeric colormaps
//! * `export` - OBJ/MTL writing and the numeric surface export
//! * `config` - Conversion parameters and the JSON scene document
//! * `cli` - The `voxel-city` command line
//!
//! ## Pipeline
//!
//! ```text
//! RasterLayers --normalize--> AlignedLayers --composite--> SemanticVoxelGrid
//!     --build_mesh--> MeshBundle --export_obj--> NAME.obj + NAME.mtl
//! ```
//!
//! ## Usage
//!
//! ```no_run
//! use std::path::Path;
//! use voxel_city::{config::SceneFile, export::MaterialStyle, materials::MaterialTable};
//!
//! let (layers, config) = SceneFile::load(Path::new("scene.json"))?.into_layers()?;
//! let mesh = voxel_city::convert(layers, &config, &MaterialTable::default_palette())?;
//! voxel_city::export::export_obj(&mesh, Path::new("out"), "city", MaterialStyle::Voxel)?;
//! # Ok::<(), voxel_city::error::VoxelCityError>(())
//! ```
//!
//! ## Performance Considerations
//!
//! * Voxel columns are contiguous and filled independently on the rayon pool
//! * Each (direction, slice) exposure mask is extracted and merged as an independent job
//! * Vertex deduplication runs once, sequentially, so output never depends on scheduling

use clap::Parser;
use log::info;

pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod materials;
pub mod meshing;
pub mod voxels;

use config::ConversionConfig;
use error::Result;
use materials::MaterialTable;
use meshing::MeshBundle;
use voxels::{grid::SemanticVoxelGrid, layers::RasterLayers};

/// Normalizes raw layers and composites them into a voxel grid.
pub fn voxelize(layers: RasterLayers, config: &ConversionConfig) -> Result<SemanticVoxelGrid> {
    config.validate()?;
    let aligned = layers.normalize(config.missing_height_default)?;
    voxels::compositor::composite(&aligned, config)
}

/// Runs the whole raster-to-mesh pipeline.
///
/// # Arguments
/// * `layers` - Raw input layers
/// * `config` - Conversion parameters
/// * `materials` - Table resolving voxel codes to materials
///
/// # Returns
/// The mesh bundle, ready for [`export::export_obj`].
pub fn convert(
    layers: RasterLayers,
    config: &ConversionConfig,
    materials: &MaterialTable,
) -> Result<MeshBundle> {
    let grid = voxelize(layers, config)?;
    Ok(meshing::build_mesh(&grid, materials, config.parallel))
}

/// Entry point of the `voxel-city` binary.
pub fn run() -> anyhow::Result<()> {
    let mut log_builder = env_logger::Builder::new();
    log_builder
        .target(env_logger::Target::Stdout)
        .parse_env("RUST_LOG")
        .init();

    info!("Logger initialized");
    cli::execute(cli::Cli::parse())
}
