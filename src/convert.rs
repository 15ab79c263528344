//! Entry points turning a `.QGIS_res` file into netCDF or raster grids on the
//! grid of a DEM.

use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{Error, Result};
use crate::grid::build_series;
use crate::model::GridSeries;
use crate::reader::read_dem;
use crate::res::{parse_res, EndOfFile};
use crate::writer::{GeoTiffWriter, NetCdfWriter};

/// Parses `res` and grids it on the DEM's grid. Returns the series and the
/// DEM's CRS as WKT.
pub fn load_series(res: &Path, dem: &Path, eof: EndOfFile) -> Result<(GridSeries, Option<String>)> {
    // 入力を先に検証する
    let dem = read_dem(dem)?;
    if !res.is_file() {
        return Err(Error::MissingFile(res.to_path_buf()));
    }

    let reader = BufReader::new(File::open(res)?);
    let blocks = parse_res(reader, eof)?;
    if blocks.is_empty() {
        return Err(Error::EmptyResult);
    }

    let series = build_series(&dem.geometry, &blocks);
    info!(
        "Gridded {} time steps onto {} x {} cells",
        series.slices.len(),
        dem.geometry.cols,
        dem.geometry.rows
    );
    Ok((series, dem.crs_wkt))
}

pub fn res_to_netcdf(res: &Path, dem: &Path, output: &Path, eof: EndOfFile) -> Result<()> {
    let (series, crs_wkt) = load_series(res, dem, eof)?;
    NetCdfWriter::write_series(output, &series, crs_wkt.as_deref())
}

/// Writes `<stem>_<Quantity>.tif` files into `output_dir`.
pub fn res_to_rasters(
    res: &Path,
    dem: &Path,
    output_dir: &Path,
    eof: EndOfFile,
) -> Result<Vec<PathBuf>> {
    let (series, crs_wkt) = load_series(res, dem, eof)?;
    fs::create_dir_all(output_dir)?;

    let stem = res
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("result");
    let writer = GeoTiffWriter::new();
    let paths = writer.write_series(&series, crs_wkt.as_deref(), output_dir, stem)?;
    Ok(paths)
}
