//! # Command Line
//!
//! The `voxel-city` binary's arguments and subcommand dispatch.

use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;

use crate::config::{load_value_grid, SceneFile};
use crate::export::{build_surface, export_obj, MaterialStyle, SurfaceOptions};
use crate::materials::MaterialTable;
use crate::meshing::build_mesh;
use crate::voxels::compositor::{composite, composite_individuals};

#[derive(Parser, Debug, Clone)]
#[command(name = "voxel-city", version, about = "Raster city layers to voxel meshes")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Voxelize a scene and export it as OBJ + MTL
    Mesh {
        /// Scene document (JSON)
        #[arg(long)]
        input: PathBuf,
        #[arg(long, default_value = "output")]
        output_dir: PathBuf,
        /// Base name of the .obj and .mtl files
        #[arg(long, default_value = "voxcity")]
        name: String,
        /// Built-in palette
        #[arg(long, default_value = "default", conflicts_with = "material_table")]
        palette: String,
        /// Custom material table (JSON), replaces the palette
        #[arg(long)]
        material_table: Option<PathBuf>,
    },

    /// Voxelize a scene and write the voxel grid as JSON
    Voxelize {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
        /// Also write per-component and layered grids into this directory
        #[arg(long)]
        individuals: Option<PathBuf>,
        /// Levels between components in the layered grid
        #[arg(long, requires = "individuals")]
        layered_interval: Option<usize>,
    },

    /// Drape a numeric value grid over terrain and export it as OBJ + MTL
    Surface {
        /// Value grid (JSON nested arrays, null for missing)
        #[arg(long)]
        values: PathBuf,
        /// Elevation grid of the same shape
        #[arg(long)]
        elevation: PathBuf,
        #[arg(long, default_value = "output")]
        output_dir: PathBuf,
        #[arg(long, default_value = "surface")]
        name: String,
        #[arg(long)]
        cell_size: f64,
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        offset: f64,
        #[arg(long, default_value = "viridis")]
        colormap: String,
        #[arg(long, default_value_t = 256)]
        num_colors: usize,
        #[arg(long, default_value_t = 1.0)]
        alpha: f64,
        #[arg(long, allow_negative_numbers = true)]
        vmin: Option<f64>,
        #[arg(long, allow_negative_numbers = true)]
        vmax: Option<f64>,
    },
}

/// Runs one parsed command.
pub fn execute(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Mesh {
            input,
            output_dir,
            name,
            palette,
            material_table,
        } => {
            let materials = match material_table {
                Some(path) => {
                    let text = fs::read_to_string(&path)
                        .with_context(|| format!("open {}", path.display()))?;
                    MaterialTable::from_json(&text)
                        .with_context(|| format!("material table {}", path.display()))?
                }
                None => MaterialTable::by_name(&palette)?,
            };

            let scene = SceneFile::load(&input)
                .with_context(|| format!("load scene {}", input.display()))?;
            let (layers, config) = scene.into_layers()?;
            let grid = crate::voxelize(layers, &config)?;
            let bundle = build_mesh(&grid, &materials, config.parallel);
            let paths = export_obj(&bundle, &output_dir, &name, MaterialStyle::Voxel)
                .with_context(|| format!("export to {}", output_dir.display()))?;
            info!("Mesh written to {}", paths.obj.display());
        }

        Command::Voxelize {
            input,
            output,
            individuals,
            layered_interval,
        } => {
            let scene = SceneFile::load(&input)
                .with_context(|| format!("load scene {}", input.display()))?;
            let (layers, config) = scene.into_layers()?;
            config.validate()?;
            let aligned = layers.normalize(config.missing_height_default)?;
            let grid = composite(&aligned, &config)?;

            if let Some(dir) = individuals {
                let grids = composite_individuals(&aligned, &config, layered_interval)?;
                fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
                for (stem, component) in grids.named() {
                    let path = dir.join(format!("{stem}.json"));
                    fs::write(&path, serde_json::to_vec(component)?)
                        .with_context(|| format!("create {}", path.display()))?;
                }
                info!(
                    "Individual grids with layered interval {} written to {}",
                    grids.layered_interval,
                    dir.display()
                );
            }

            let json = serde_json::to_vec(&grid)?;
            fs::write(&output, json).with_context(|| format!("create {}", output.display()))?;
            info!(
                "Voxel grid {:?} with codes {:?} written to {}",
                grid.dimensions(),
                grid.distinct_codes(),
                output.display()
            );
        }

        Command::Surface {
            values,
            elevation,
            output_dir,
            name,
            cell_size,
            offset,
            colormap,
            num_colors,
            alpha,
            vmin,
            vmax,
        } => {
            let values = load_value_grid(&values, "values")
                .with_context(|| format!("load values {}", values.display()))?;
            let dem = load_value_grid(&elevation, "elevation")
                .with_context(|| format!("load elevation {}", elevation.display()))?;
            let options = SurfaceOptions {
                cell_size,
                offset,
                colormap,
                num_colors,
                alpha,
                vmin,
                vmax,
            };
            let bundle = build_surface(&values, &dem, &options)?;
            let paths = export_obj(&bundle, &output_dir, &name, MaterialStyle::Surface)
                .with_context(|| format!("export to {}", output_dir.display()))?;
            info!("Surface written to {}", paths.obj.display());
        }
    }
    Ok(())
}
