use std::fs;
use std::path::Path;

use gdal::raster::Buffer;
use gdal::DriverManager;
use tempfile::TempDir;

use sph_toolbox::top::{FOOTER_LINES, HEADER_LINES};
use sph_toolbox::{
    dem_to_top, points_to_pts, res_to_netcdf, res_to_rasters, EndOfFile, Error, HeightSource,
    TopConfig,
};

fn gtiff_available() -> bool {
    DriverManager::get_driver_by_name("GTiff").is_ok()
}

/// 2x2 のDEM、左上 (0, 20)、ピクセル 10
fn write_test_dem(path: &Path) {
    let driver = DriverManager::get_driver_by_name("GTiff").unwrap();
    let mut dataset = driver
        .create_with_band_type::<f32, _>(path, 2, 2, 1)
        .unwrap();
    dataset
        .set_geo_transform(&[0.0, 10.0, 0.0, 20.0, 0.0, -10.0])
        .unwrap();
    let mut band = dataset.rasterband(1).unwrap();
    band.set_no_data_value(Some(-9999.0)).unwrap();
    let mut buffer = Buffer::new((2, 2), vec![100.0f32, 101.0, 102.0, 103.0]);
    band.write((0, 0), (2, 2), &mut buffer).unwrap();
}

const RESULT: &str = "\
 time =  0.0
 5.0 15.0 1.0 0.1 0.2 0.3
 15.0 15.0 2.0 0.1 0.2 0.3
 time =  10.0
 5.0 5.0 3.0 0.4 0.5 0.6
";

#[test]
fn test_dem_to_top_workflow() {
    if !gtiff_available() {
        eprintln!("Skipping test: GTiff driver not available");
        return;
    }
    let temp_dir = TempDir::new().unwrap();
    let dem_path = temp_dir.path().join("dem.tif");
    let top_path = temp_dir.path().join("dem.top");
    write_test_dem(&dem_path);

    let written = dem_to_top(&dem_path, &top_path, &TopConfig::default()).unwrap();
    assert_eq!(written, 4);

    let text = fs::read_to_string(&top_path).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 4 + HEADER_LINES + FOOTER_LINES);
    assert_eq!(lines[3], "4\t10.0");
    assert_eq!(lines[5], "5.0\t15.0\t100.0");
    assert_eq!(lines[6], "15.0\t15.0\t101.0");
    assert_eq!(lines[7], "5.0\t5.0\t102.0");
    assert_eq!(lines[8], "15.0\t5.0\t103.0");
}

const POINTS: &str = r#"{"type": "FeatureCollection", "features": [
{"type": "Feature", "properties": {"thickness": 1.5}, "geometry": {"type": "Point", "coordinates": [100.0, 200.0, 5.0]}},
{"type": "Feature", "properties": {"thickness": 2.5}, "geometry": {"type": "Point", "coordinates": [103.0, 204.0, 6.0]}},
{"type": "Feature", "properties": {"thickness": null}, "geometry": {"type": "Point", "coordinates": [106.0, 208.0, 7.0]}}
]}"#;

#[test]
fn test_points_to_pts_workflow() {
    if DriverManager::get_driver_by_name("GeoJSON").is_err() {
        eprintln!("Skipping test: GeoJSON driver not available");
        return;
    }
    let temp_dir = TempDir::new().unwrap();
    let points_path = temp_dir.path().join("source.geojson");
    let pts_path = temp_dir.path().join("source.pts");
    fs::write(&points_path, POINTS).unwrap();

    let written = points_to_pts(&points_path, &HeightSource::Z, &pts_path).unwrap();
    assert_eq!(written, 3);

    let text = fs::read_to_string(&pts_path).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), sph_toolbox::pts::HEADER_LINES + 3);
    assert_eq!(lines[1], "3  5.0  10.0  10.0  2");
    assert_eq!(lines[3], "100.0\t200.0\t5.0");
    assert_eq!(lines[5], "106.0\t208.0\t7.0");

    // 3番目の点は属性が null
    let err = points_to_pts(
        &points_path,
        &HeightSource::Field("thickness".to_string()),
        &temp_dir.path().join("by_field.pts"),
    )
    .unwrap_err();
    assert!(matches!(err, Error::MissingHeight { index: 2, .. }));
}

#[test]
fn test_res_to_netcdf_workflow() {
    if !gtiff_available() {
        eprintln!("Skipping test: GTiff driver not available");
        return;
    }
    let temp_dir = TempDir::new().unwrap();
    let dem_path = temp_dir.path().join("dem.tif");
    let res_path = temp_dir.path().join("frank.QGIS_res");
    let nc_path = temp_dir.path().join("frank.nc");
    write_test_dem(&dem_path);
    fs::write(&res_path, RESULT).unwrap();

    res_to_netcdf(&res_path, &dem_path, &nc_path, EndOfFile::Flush).unwrap();

    let file = netcdf::open(&nc_path).unwrap();
    assert_eq!(file.dimension("time").unwrap().len(), 2);

    let height = file
        .variable("Height")
        .unwrap()
        .get_values::<f32, _>(..)
        .unwrap();
    assert_eq!(height, vec![1.0, 2.0, -9999.0, -9999.0, -9999.0, -9999.0, 3.0, -9999.0]);
}

#[test]
fn test_res_to_rasters_drop_last_step() {
    if !gtiff_available() {
        eprintln!("Skipping test: GTiff driver not available");
        return;
    }
    let temp_dir = TempDir::new().unwrap();
    let dem_path = temp_dir.path().join("dem.tif");
    let res_path = temp_dir.path().join("frank.QGIS_res");
    let out_dir = temp_dir.path().join("grids");
    write_test_dem(&dem_path);
    fs::write(&res_path, RESULT).unwrap();

    let paths = res_to_rasters(&res_path, &dem_path, &out_dir, EndOfFile::Drop).unwrap();
    assert_eq!(paths.len(), 4);

    let dataset = gdal::Dataset::open(&paths[0]).unwrap();
    assert_eq!(dataset.raster_count(), 1);
    assert_eq!(dataset.raster_size(), (2, 2));
}

#[test]
fn test_missing_dem_is_reported_first() {
    let temp_dir = TempDir::new().unwrap();
    let res_path = temp_dir.path().join("frank.QGIS_res");
    fs::write(&res_path, RESULT).unwrap();

    let err = res_to_netcdf(
        &res_path,
        &temp_dir.path().join("missing.tif"),
        &temp_dir.path().join("out.nc"),
        EndOfFile::Flush,
    )
    .unwrap_err();
    assert!(matches!(err, Error::MissingFile(_)));
    assert!(!temp_dir.path().join("out.nc").exists());
}
