use voxel_city::{
    config::{ConversionConfig, SceneFile},
    error::VoxelCityError,
    materials::MaterialTable,
    voxels::{
        compositor::ground_level,
        layers::{BuildingSegment, Grid2, RasterLayers, SegmentGrid},
    },
};

fn scene(json: &str) -> (RasterLayers, ConversionConfig) {
    let scene: SceneFile = serde_json::from_str(json).unwrap();
    scene.into_layers().unwrap()
}

fn flat_layers(rows: usize, cols: usize) -> RasterLayers {
    RasterLayers {
        building_height: Grid2::filled(rows, cols, 0.0),
        building_segments: SegmentGrid::empty(rows, cols),
        land_cover: Grid2::filled(rows, cols, 0),
        elevation: Grid2::filled(rows, cols, 0.0),
        canopy_height: Grid2::filled(rows, cols, 0.0),
        building_id: None,
    }
}

#[test]
fn building_block_meshes_to_a_two_material_box() {
    let (layers, config) = scene(
        r#"{
            "building_height": [[2, 2, 2], [2, 2, 2], [2, 2, 2]],
            "building_segments": [
                [[[0, 2]], [[0, 2]], [[0, 2]]],
                [[[0, 2]], [[0, 2]], [[0, 2]]],
                [[[0, 2]], [[0, 2]], [[0, 2]]]
            ],
            "land_cover": [[0, 0, 0], [0, 0, 0], [0, 0, 0]],
            "elevation": [[0, 0, 0], [0, 0, 0], [0, 0, 0]],
            "canopy_height": [[0, 0, 0], [0, 0, 0], [0, 0, 0]],
            "config": { "parallel": false }
        }"#,
    );

    let grid = voxel_city::voxelize(layers.clone(), &config).unwrap();
    assert_eq!(grid.dimensions(), (3, 3, 3));
    assert_eq!(grid.column(1, 1), &[1, -3, -3]);

    let mesh = voxel_city::convert(layers, &config, &MaterialTable::default_palette()).unwrap();

    // Four horizontal faces (both sides of the land-cover/building boundary count) and two
    // strips on each of the four sides.
    assert_eq!(mesh.triangle_count(), 24);
    // 4 corners at z = 0, 1 and 3 each
    assert_eq!(mesh.vertex_count(), 12);
    let names: Vec<&str> = mesh.materials().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["material_1", "material_-3"]);
    for p in &mesh.vertices {
        assert!(p.x == 0.0 || p.x == 3.0);
        assert!(p.y == 0.0 || p.y == 3.0);
        assert!([0.0, 1.0, 3.0].contains(&p.z));
    }
}

#[test]
fn tree_on_sloped_terrain() {
    let mut layers = flat_layers(1, 2);
    layers.elevation = Grid2::from_rows("elevation", vec![vec![10.0, 12.0]]).unwrap();
    layers.canopy_height = Grid2::from_rows("canopy_height", vec![vec![0.0, 4.0]]).unwrap();
    layers.land_cover = Grid2::from_rows("land_cover", vec![vec![4, 11]]).unwrap();
    let config = ConversionConfig {
        trunk_height_ratio: 0.5,
        ..ConversionConfig::default()
    };

    let grid = voxel_city::voxelize(layers, &config).unwrap();

    // Elevation is rebased to (0, 2); height is ceil(2 + 4) + 1.
    assert_eq!(grid.height(), 7);
    assert_eq!(grid.column(0, 0), &[5, 0, 0, 0, 0, 0, 0]);
    // Ground at 3: underground below, surface code 12, crown [3 + 2, 3 + 4)
    assert_eq!(grid.column(0, 1), &[-1, -1, 12, 0, 0, -2, -2]);
}

#[test]
fn missing_building_heights_take_the_default() {
    let mut layers = flat_layers(1, 1);
    layers.building_height = Grid2::filled(1, 1, f64::NAN);
    layers.building_segments =
        SegmentGrid::from_rows(vec![vec![vec![BuildingSegment::new(0.0, f64::NAN)]]]).unwrap();
    let config = ConversionConfig::default();

    let grid = voxel_city::voxelize(layers, &config).unwrap();

    assert_eq!(grid.height(), 11);
    let column = grid.column(0, 0);
    assert_eq!(column[0], 1);
    assert!(column[1..].iter().all(|c| *c == -3));
}

#[test]
fn parallel_and_sequential_pipelines_agree() {
    let mut rng = fastrand::Rng::with_seed(11);
    let (rows, cols) = (6, 5);
    let mut layers = flat_layers(rows, cols);
    let mut segments = Vec::new();
    for row in 0..rows {
        let mut line = Vec::new();
        for col in 0..cols {
            layers.elevation.set(row, col, rng.f64() * 4.0);
            layers.land_cover.set(row, col, rng.i32(0..14));
            if rng.bool() {
                layers.canopy_height.set(row, col, rng.f64() * 8.0);
            }
            let top = rng.f64() * 6.0;
            layers.building_height.set(row, col, top);
            line.push(if rng.bool() {
                vec![BuildingSegment::new(0.0, top)]
            } else {
                vec![]
            });
        }
        segments.push(line);
    }
    layers.building_segments = SegmentGrid::from_rows(segments).unwrap();

    let table = MaterialTable::default_palette();
    let sequential = ConversionConfig {
        parallel: false,
        ..ConversionConfig::default()
    };
    let parallel = ConversionConfig {
        parallel: true,
        ..ConversionConfig::default()
    };

    let a = voxel_city::convert(layers.clone(), &sequential, &table).unwrap();
    let b = voxel_city::convert(layers, &parallel, &table).unwrap();

    assert_eq!(a, b);
}

#[test]
fn mismatched_layers_fail_before_compositing() {
    let mut layers = flat_layers(2, 3);
    layers.land_cover = Grid2::filled(2, 2, 0);

    let result = voxel_city::voxelize(layers, &ConversionConfig::default());

    assert!(matches!(
        result,
        Err(VoxelCityError::ShapeMismatch {
            layer: "land_cover",
            expected: (2, 3),
            found: (2, 2),
        })
    ));
}

#[test]
fn invalid_voxel_size_is_rejected() {
    let config = ConversionConfig {
        voxel_size: -1.0,
        ..ConversionConfig::default()
    };
    assert!(matches!(
        voxel_city::voxelize(flat_layers(1, 1), &config),
        Err(VoxelCityError::InvalidParameter { .. })
    ));
}

#[test]
fn every_column_sits_on_underground_and_one_surface_cell() {
    let mut rng = fastrand::Rng::with_seed(29);
    for voxel_size in [0.5, 1.0, 2.0] {
        let (rows, cols) = (rng.usize(1..8), rng.usize(1..8));
        let mut layers = flat_layers(rows, cols);
        let mut segments = Vec::new();
        for row in 0..rows {
            let mut line = Vec::new();
            for col in 0..cols {
                layers.elevation.set(row, col, rng.f64() * 12.0);
                layers.land_cover.set(row, col, rng.i32(0..14));
                layers.canopy_height.set(row, col, rng.f64() * 6.0);
                let bottom = rng.f64() * 3.0;
                let top = bottom + rng.f64() * 9.0;
                layers.building_height.set(row, col, top);
                line.push(vec![BuildingSegment::new(bottom, top)]);
            }
            segments.push(line);
        }
        layers.building_segments = SegmentGrid::from_rows(segments).unwrap();
        let raw = layers.clone();
        let config = ConversionConfig {
            voxel_size,
            ..ConversionConfig::default()
        };

        let grid = voxel_city::voxelize(layers, &config).unwrap();

        let min = raw
            .elevation
            .values()
            .iter()
            .copied()
            .fold(f64::INFINITY, f64::min);
        for row in 0..rows {
            for col in 0..cols {
                // Rows are flipped during normalization.
                let source_row = rows - 1 - row;
                let elevation = *raw.elevation.get(source_row, col) - min;
                let ground = ground_level(elevation, voxel_size) as usize;
                let column = grid.column(row, col);

                assert!(ground >= 1 && ground <= column.len());
                assert!(column[..ground - 1].iter().all(|c| *c == -1));
                assert_eq!(
                    column[ground - 1],
                    raw.land_cover.get(source_row, col) + 1,
                    "column ({row}, {col}) at voxel size {voxel_size}"
                );
            }
        }
    }
}

#[test]
fn infinite_heights_fail_before_compositing() {
    let mut layers = flat_layers(1, 1);
    layers.building_segments =
        SegmentGrid::from_rows(vec![vec![vec![BuildingSegment::new(0.0, f64::INFINITY)]]])
            .unwrap();
    assert!(matches!(
        voxel_city::voxelize(layers, &ConversionConfig::default()),
        Err(VoxelCityError::InfiniteHeight {
            layer: "building_segments",
            ..
        })
    ));

    let mut layers = flat_layers(1, 1);
    layers.canopy_height = Grid2::filled(1, 1, f64::INFINITY);
    assert!(matches!(
        voxel_city::voxelize(layers, &ConversionConfig::default()),
        Err(VoxelCityError::InfiniteHeight {
            layer: "canopy_height",
            ..
        })
    ));
}

#[test]
fn negative_land_cover_is_rejected() {
    let mut layers = flat_layers(1, 1);
    layers.land_cover = Grid2::filled(1, 1, -1);
    assert!(matches!(
        voxel_city::voxelize(layers, &ConversionConfig::default()),
        Err(VoxelCityError::InvalidLandCover { code: -1, .. })
    ));
}
