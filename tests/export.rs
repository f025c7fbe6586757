use std::fs;

use voxel_city::{
    config::ConversionConfig,
    error::VoxelCityError,
    export::{build_surface, export_obj, MaterialStyle, SurfaceOptions},
    materials::MaterialTable,
    meshing::build_mesh,
    voxels::{grid::SemanticVoxelGrid, layers::Grid2},
};

fn two_voxel_grid() -> SemanticVoxelGrid {
    let mut grid = SemanticVoxelGrid::new(2, 1, 1, 1.0);
    grid.set(0, 0, 0, -3);
    grid.set(1, 0, 0, 77);
    grid
}

#[test]
fn writes_obj_and_mtl_side_by_side() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("nested").join("out");
    let bundle = build_mesh(&two_voxel_grid(), &MaterialTable::default_palette(), false);

    let paths = export_obj(&bundle, &out, "block", MaterialStyle::Voxel).unwrap();

    assert_eq!(paths.obj, out.join("block.obj"));
    assert_eq!(paths.mtl, out.join("block.mtl"));
    let obj = fs::read_to_string(&paths.obj).unwrap();
    let mtl = fs::read_to_string(&paths.mtl).unwrap();

    assert!(obj.contains("# group\no block\n"));
    assert!(obj.contains("mtllib block.mtl"));
    let normals: Vec<&str> = obj.lines().filter(|l| l.starts_with("vn ")).collect();
    assert_eq!(
        normals,
        vec![
            "vn 1.000000 0.000000 0.000000",
            "vn -1.000000 0.000000 0.000000",
            "vn 0.000000 1.000000 0.000000",
            "vn 0.000000 -1.000000 0.000000",
            "vn 0.000000 0.000000 1.000000",
            "vn 0.000000 0.000000 -1.000000",
        ]
    );
    // Different codes never hide each other, so both cubes keep all six quads.
    assert_eq!(obj.lines().filter(|l| l.starts_with("v ")).count(), 12);
    assert_eq!(obj.lines().filter(|l| l.starts_with("f ")).count(), 24);

    let usemtl: Vec<&str> = obj.lines().filter(|l| l.starts_with("usemtl ")).collect();
    assert_eq!(usemtl, vec!["usemtl material_-3", "usemtl material_77"]);
    let newmtl: Vec<&str> = mtl.lines().filter(|l| l.starts_with("newmtl ")).collect();
    assert_eq!(newmtl, vec!["newmtl material_-3", "newmtl material_77"]);

    // Code 77 has no palette entry and renders black.
    assert!(mtl.contains("newmtl material_77\nKa 0.000000 0.000000 0.000000\n"));
    assert!(mtl.contains("Ks 0.500000 0.500000 0.500000\nNs 50.000000\nillum 2\n"));
}

#[test]
fn every_face_line_references_existing_entries() {
    let dir = tempfile::tempdir().unwrap();
    let bundle = build_mesh(&two_voxel_grid(), &MaterialTable::default_palette(), true);
    let paths = export_obj(&bundle, dir.path(), "check", MaterialStyle::Voxel).unwrap();
    let obj = fs::read_to_string(paths.obj).unwrap();

    let vertex_count = obj.lines().filter(|l| l.starts_with("v ")).count();
    for line in obj.lines().filter(|l| l.starts_with("f ")) {
        let refs: Vec<&str> = line[2..].split(' ').collect();
        assert_eq!(refs.len(), 3);
        for r in refs {
            let (v, n) = r.split_once("//").unwrap();
            let v: usize = v.parse().unwrap();
            let n: usize = n.parse().unwrap();
            assert!((1..=vertex_count).contains(&v));
            assert!((1..=6).contains(&n));
        }
    }
}

#[test]
fn custom_material_table_drives_colours() {
    let dir = tempfile::tempdir().unwrap();
    let table = MaterialTable::from_json(
        r#"{"-3": {"label": "Tower", "color": [255, 0, 0], "alpha": 0.25}, "77": [0, 0, 255]}"#,
    )
    .unwrap();
    let bundle = build_mesh(&two_voxel_grid(), &table, false);

    let paths = export_obj(&bundle, dir.path(), "custom", MaterialStyle::Voxel).unwrap();
    let mtl = fs::read_to_string(paths.mtl).unwrap();

    assert!(mtl.contains("newmtl material_-3\nKa 1.000000 0.000000 0.000000\n"));
    assert!(mtl.contains("d 0.250000\n"));
    assert!(mtl.contains("newmtl material_77\nKa 0.000000 0.000000 1.000000\n"));
}

#[test]
fn surface_export_writes_plain_faces() {
    let dir = tempfile::tempdir().unwrap();
    let values = Grid2::from_rows("values", vec![vec![0.0, 5.0], vec![10.0, f64::NAN]]).unwrap();
    let dem = Grid2::from_rows("elevation", vec![vec![3.0, 3.0], vec![3.0, 3.0]]).unwrap();
    let options = SurfaceOptions {
        cell_size: 2.0,
        colormap: "viridis".to_string(),
        num_colors: 8,
        alpha: 0.5,
        ..SurfaceOptions::default()
    };

    let bundle = build_surface(&values, &dem, &options).unwrap();
    let paths = export_obj(&bundle, dir.path(), "heat", MaterialStyle::Surface).unwrap();
    let obj = fs::read_to_string(paths.obj).unwrap();
    let mtl = fs::read_to_string(paths.mtl).unwrap();

    assert!(!obj.contains("vn "));
    assert_eq!(obj.lines().filter(|l| l.starts_with("f ")).count(), 6);
    assert!(obj.lines().filter(|l| l.starts_with("f ")).all(|l| !l.contains("//")));
    // Flat terrain snaps every quad one cell up.
    assert!(obj
        .lines()
        .filter(|l| l.starts_with("v "))
        .all(|l| l.ends_with(" 2.000000")));
    assert_eq!(mtl.lines().filter(|l| l.starts_with("newmtl material_")).count(), 3);
    assert!(mtl.contains("illum 1\nd 0.500000\n"));
}

#[test]
fn failed_surface_export_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("never");
    let values = Grid2::from_rows("values", vec![vec![1.0, 1.0]]).unwrap();
    let dem = Grid2::filled(1, 2, 0.0);

    let result = build_surface(&values, &dem, &SurfaceOptions::default())
        .and_then(|bundle| export_obj(&bundle, &out, "flat", MaterialStyle::Surface));

    assert!(matches!(result, Err(VoxelCityError::DegenerateRange { .. })));
    assert!(!out.exists());
}

#[test]
fn unknown_palette_fails_before_anything_is_written() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("never");

    let result = MaterialTable::by_name("neon").and_then(|table| {
        let mesh = voxel_city::convert(
            voxel_city::voxels::layers::RasterLayers {
                building_height: Grid2::filled(1, 1, 0.0),
                building_segments: voxel_city::voxels::layers::SegmentGrid::empty(1, 1),
                land_cover: Grid2::filled(1, 1, 0),
                elevation: Grid2::filled(1, 1, 0.0),
                canopy_height: Grid2::filled(1, 1, 0.0),
                building_id: None,
            },
            &ConversionConfig::default(),
            &table,
        )?;
        export_obj(&mesh, &out, "city", MaterialStyle::Voxel)
    });

    assert!(matches!(
        result,
        Err(VoxelCityError::InvalidMaterialTable { .. })
    ));
    assert!(!out.exists());
}
