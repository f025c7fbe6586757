//! # Wavefront OBJ Export
//!
//! Writes a [`MeshBundle`] as an `.obj` file plus its companion `.mtl` material library.
//!
//! Both files are rendered to memory first and only written once rendering has succeeded, so
//! a failed export leaves no partial files behind.

use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use log::info;

use crate::error::Result;
use crate::meshing::MeshBundle;

/// Lighting parameters written for every material.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MaterialStyle {
    /// Semi-glossy, self-lit voxel materials
    Voxel,
    /// Matte surface materials
    Surface,
}

/// Paths of the files produced by [`export_obj`].
#[derive(Debug, Clone, PartialEq)]
pub struct ObjPaths {
    pub obj: PathBuf,
    pub mtl: PathBuf,
}

/// Writes the OBJ body of `bundle` as one object named `file_name`, referencing
/// `<file_name>.mtl` as its material library.
pub fn write_obj<W: Write>(bundle: &MeshBundle, file_name: &str, out: &mut W) -> io::Result<()> {
    writeln!(out, "# Generated OBJ file")?;
    writeln!(out)?;
    writeln!(out, "# group")?;
    writeln!(out, "o {file_name}")?;
    writeln!(out)?;
    writeln!(out, "# material")?;
    writeln!(out, "mtllib {file_name}.mtl")?;
    writeln!(out)?;

    if !bundle.normals.is_empty() {
        writeln!(out, "# normals")?;
        for n in &bundle.normals {
            writeln!(out, "vn {:.6} {:.6} {:.6}", n.x, n.y, n.z)?;
        }
        writeln!(out)?;
    }

    writeln!(out, "# verts")?;
    for v in &bundle.vertices {
        writeln!(out, "v {:.6} {:.6} {:.6}", v.x, v.y, v.z)?;
    }
    writeln!(out)?;

    writeln!(out, "# faces")?;
    for group in &bundle.groups {
        writeln!(out, "usemtl {}", group.material.name)?;
        for triangle in &group.triangles {
            let [a, b, c] = triangle.vertices;
            if triangle.normal_index == 0 {
                writeln!(out, "f {a} {b} {c}")?;
            } else {
                let n = triangle.normal_index;
                writeln!(out, "f {a}//{n} {b}//{n} {c}//{n}")?;
            }
        }
        writeln!(out)?;
    }
    Ok(())
}

/// Writes the material library of `bundle`, one entry per group in group order.
pub fn write_mtl<W: Write>(bundle: &MeshBundle, style: MaterialStyle, out: &mut W) -> io::Result<()> {
    writeln!(out, "# Material file")?;
    writeln!(out)?;
    for material in bundle.materials() {
        let [r, g, b] = material.color.to_unit();
        writeln!(out, "newmtl {}", material.name)?;
        writeln!(out, "Ka {r:.6} {g:.6} {b:.6}")?;
        writeln!(out, "Kd {r:.6} {g:.6} {b:.6}")?;
        match style {
            MaterialStyle::Voxel => {
                writeln!(out, "Ke {r:.6} {g:.6} {b:.6}")?;
                writeln!(out, "Ks 0.500000 0.500000 0.500000")?;
                writeln!(out, "Ns 50.000000")?;
                writeln!(out, "illum 2")?;
            }
            MaterialStyle::Surface => {
                writeln!(out, "Ks 0.000000 0.000000 0.000000")?;
                writeln!(out, "Ns 10.000000")?;
                writeln!(out, "illum 1")?;
            }
        }
        writeln!(out, "d {:.6}", material.alpha)?;
        writeln!(out)?;
    }
    Ok(())
}

/// Renders both files to memory.
///
/// # Returns
/// `(obj, mtl)` file contents.
pub fn render_obj(
    bundle: &MeshBundle,
    file_name: &str,
    style: MaterialStyle,
) -> Result<(Vec<u8>, Vec<u8>)> {
    let mut obj = Vec::new();
    write_obj(bundle, file_name, &mut obj)?;
    let mut mtl = Vec::new();
    write_mtl(bundle, style, &mut mtl)?;
    Ok((obj, mtl))
}

/// Exports `bundle` as `<output_dir>/<file_name>.obj` and `.mtl`.
///
/// The output directory is created if needed.
pub fn export_obj(
    bundle: &MeshBundle,
    output_dir: &Path,
    file_name: &str,
    style: MaterialStyle,
) -> Result<ObjPaths> {
    let (obj, mtl) = render_obj(bundle, file_name, style)?;

    fs::create_dir_all(output_dir)?;
    let paths = ObjPaths {
        obj: output_dir.join(format!("{file_name}.obj")),
        mtl: output_dir.join(format!("{file_name}.mtl")),
    };
    fs::write(&paths.obj, obj)?;
    fs::write(&paths.mtl, mtl)?;

    info!(
        "Wrote {} and {}",
        paths.obj.display(),
        paths.mtl.display()
    );
    Ok(paths)
}
