//! # Materials
//!
//! Table-driven mapping from voxel codes to export materials.
//!
//! A [`MaterialTable`] maps each voxel code to a label and an RGB colour. The built-in
//! `default` palette covers the compositor's fills, the facade material codes and the
//! land-cover surface classes. Codes missing from a table fall back to black rather than
//! failing the export.

use std::collections::HashMap;

use log::warn;
use phf::phf_map;
use serde::{Deserialize, Serialize};

use crate::error::{Result, VoxelCityError};
use crate::voxels::voxel_code::{VoxelClass, VoxelCode, VoxelFill};

pub mod colormap;
mod lut;

/// Colour used for codes missing from a table.
pub const FALLBACK_COLOR: Rgb = Rgb::new(0, 0, 0);

/// An 8-bit RGB colour, serialized as `[r, g, b]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[u8; 3]", into = "[u8; 3]")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Rgb { r, g, b }
    }

    /// Channels scaled to `[0, 1]`.
    pub fn to_unit(self) -> [f64; 3] {
        [
            self.r as f64 / 255.0,
            self.g as f64 / 255.0,
            self.b as f64 / 255.0,
        ]
    }
}

impl From<[u8; 3]> for Rgb {
    fn from([r, g, b]: [u8; 3]) -> Self {
        Rgb::new(r, g, b)
    }
}

impl From<Rgb> for [u8; 3] {
    fn from(color: Rgb) -> Self {
        [color.r, color.g, color.b]
    }
}

/// A named, coloured grouping of faces.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    /// Identifier used by `usemtl`/`newmtl`
    pub name: String,
    /// Human readable description
    pub label: String,
    pub color: Rgb,
    /// Opacity in `[0, 1]`
    pub alpha: f64,
}

/// One row of a material table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialEntry {
    pub label: String,
    pub color: Rgb,
    #[serde(default = "opaque")]
    pub alpha: f64,
}

fn opaque() -> f64 {
    1.0
}

/// Built-in palette, keyed by voxel code: `(label, [r, g, b])`.
static DEFAULT_PALETTE: phf::Map<i32, (&'static str, [u8; 3])> = phf_map! {
    -99i32 => ("Void marker", [0, 0, 0]),
    -30i32 => ("Landmark", [255, 0, 102]),
    -17i32 => ("Plaster", [238, 242, 234]),
    -16i32 => ("Glass", [56, 78, 84]),
    -15i32 => ("Stone", [147, 140, 114]),
    -14i32 => ("Metal", [139, 149, 159]),
    -13i32 => ("Concrete", [186, 187, 181]),
    -12i32 => ("Wood", [248, 166, 2]),
    -11i32 => ("Brick", [81, 59, 56]),
    -3i32 => ("Building", [180, 187, 216]),
    -2i32 => ("Tree", [78, 99, 63]),
    -1i32 => ("Underground", [188, 143, 143]),
    1i32 => ("Bareland", [239, 228, 176]),
    2i32 => ("Rangeland", [123, 130, 59]),
    3i32 => ("Shrub", [97, 140, 86]),
    4i32 => ("Agriculture land", [112, 120, 56]),
    5i32 => ("Tree (ground surface)", [116, 150, 66]),
    6i32 => ("Moss and lichen", [187, 204, 40]),
    7i32 => ("Wet land", [77, 118, 99]),
    8i32 => ("Mangrove", [22, 61, 51]),
    9i32 => ("Water", [44, 66, 133]),
    10i32 => ("Snow and ice", [205, 215, 224]),
    11i32 => ("Developed space", [108, 119, 129]),
    12i32 => ("Road", [59, 62, 87]),
    13i32 => ("Building (ground surface)", [150, 166, 190]),
    14i32 => ("No data", [239, 228, 176]),
};

/// Names of the built-in palettes accepted by [`MaterialTable::by_name`].
pub const PALETTE_NAMES: [&str; 1] = ["default"];

/// The export name of the material for a voxel code.
pub fn material_name(code: VoxelCode) -> String {
    format!("material_{code}")
}

/// Maps voxel codes to materials.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MaterialTable {
    entries: HashMap<VoxelCode, MaterialEntry>,
}

impl MaterialTable {
    /// Creates an empty table; every code will use the fallback colour.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in `default` palette.
    pub fn default_palette() -> Self {
        let entries = DEFAULT_PALETTE
            .entries()
            .map(|(code, (label, color))| {
                (
                    *code,
                    MaterialEntry {
                        label: label.to_string(),
                        color: Rgb::from(*color),
                        alpha: if *code == -99 { 0.0 } else { 1.0 },
                    },
                )
            })
            .collect();
        MaterialTable { entries }
    }

    /// Looks up a built-in palette by name.
    pub fn by_name(name: &str) -> Result<Self> {
        match name {
            "default" => Ok(Self::default_palette()),
            _ => Err(VoxelCityError::invalid_material_table(format!(
                "unknown palette '{name}', expected one of {PALETTE_NAMES:?}"
            ))),
        }
    }

    /// Parses a table from JSON.
    ///
    /// Keys are voxel codes; values are either `[r, g, b]` or
    /// `{"label": ..., "color": [r, g, b], "alpha": ..}` with `alpha` optional.
    pub fn from_json(text: &str) -> Result<Self> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawEntry {
            Color([u8; 3]),
            Full(MaterialEntry),
        }

        let raw: HashMap<String, RawEntry> = serde_json::from_str(text)?;
        let mut table = MaterialTable::new();
        for (key, entry) in raw {
            let code: VoxelCode = key.trim().parse().map_err(|_| {
                VoxelCityError::invalid_material_table(format!("key '{key}' is not a voxel code"))
            })?;
            if code == 0 {
                return Err(VoxelCityError::invalid_material_table(
                    "code 0 is void and cannot carry a material",
                ));
            }
            let entry = match entry {
                RawEntry::Color(color) => MaterialEntry {
                    label: default_label(code),
                    color: Rgb::from(color),
                    alpha: 1.0,
                },
                RawEntry::Full(entry) => entry,
            };
            if !(0.0..=1.0).contains(&entry.alpha) {
                return Err(VoxelCityError::invalid_material_table(format!(
                    "alpha {} of code {code} is outside [0, 1]",
                    entry.alpha
                )));
            }
            table.entries.insert(code, entry);
        }
        Ok(table)
    }

    pub fn insert(&mut self, code: VoxelCode, entry: MaterialEntry) {
        self.entries.insert(code, entry);
    }

    pub fn get(&self, code: VoxelCode) -> Option<&MaterialEntry> {
        self.entries.get(&code)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The material for `code`, falling back to [`FALLBACK_COLOR`] for unmapped codes.
    pub fn material_for(&self, code: VoxelCode) -> Material {
        match self.entries.get(&code) {
            Some(entry) => Material {
                name: material_name(code),
                label: entry.label.clone(),
                color: entry.color,
                alpha: entry.alpha,
            },
            None => {
                warn!("No material for voxel code {code}, using fallback colour");
                Material {
                    name: material_name(code),
                    label: default_label(code),
                    color: FALLBACK_COLOR,
                    alpha: 1.0,
                }
            }
        }
    }
}

/// A generic label derived from the code's class.
fn default_label(code: VoxelCode) -> String {
    match VoxelClass::of(code) {
        VoxelClass::Void => "Void".to_string(),
        VoxelClass::LandCover(class) => format!("Land cover {class}"),
        VoxelClass::Fill(VoxelFill::Underground) => "Underground".to_string(),
        VoxelClass::Fill(VoxelFill::TreeCrown) => "Tree".to_string(),
        VoxelClass::Fill(VoxelFill::Building) => "Building".to_string(),
        VoxelClass::Other(other) => format!("Code {other}"),
    }
}
