//! netCDF4 output of a result grid series.
//!
//! Layout: dimensions `time` (unlimited), `latitude`, `longitude`; variables
//! `Height`, `Vx`, `Vy`, `Vavg` shaped `(time, latitude, longitude)` with a
//! `-9999` fill value, and a scalar `crs` grid-mapping variable carrying the
//! DEM's WKT and, when the projection is known to CF, its `grid_mapping_name`.

use std::path::Path;

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::model::{GridGeometry, GridSeries, Quantity, TimeSlice, NODATA_VALUE};

const GRID_MAPPING: &str = "crs";

pub struct NetCdfWriter {
    file: netcdf::FileMut,
    time_index: usize,
}

impl NetCdfWriter {
    pub fn create(path: &Path, geometry: &GridGeometry, crs_wkt: Option<&str>) -> Result<Self> {
        let mut file = netcdf::create(path)?;

        file.add_unlimited_dimension("time")?;
        file.add_dimension("latitude", geometry.rows)?;
        file.add_dimension("longitude", geometry.cols)?;

        {
            let mut time_var = file.add_variable::<f64>("time", &["time"])?;
            time_var.put_attribute("standard_name", "time")?;
            time_var.put_attribute("long_name", "simulation time")?;
            time_var.put_attribute("units", "s")?;
            time_var.put_attribute("axis", "T")?;
        }

        // セル中心座標（北から南）
        {
            let latitudes: Vec<f64> = (0..geometry.rows)
                .map(|row| geometry.cell_center(row, 0).1)
                .collect();
            let mut lat_var = file.add_variable::<f64>("latitude", &["latitude"])?;
            lat_var.put_attribute("long_name", "y coordinate of cell centre")?;
            lat_var.put_attribute("axis", "Y")?;
            lat_var.put_values(&latitudes, ..)?;
        }

        {
            let longitudes: Vec<f64> = (0..geometry.cols)
                .map(|col| geometry.cell_center(0, col).0)
                .collect();
            let mut lon_var = file.add_variable::<f64>("longitude", &["longitude"])?;
            lon_var.put_attribute("long_name", "x coordinate of cell centre")?;
            lon_var.put_attribute("axis", "X")?;
            lon_var.put_values(&longitudes, ..)?;
        }

        {
            let mut crs_var = file.add_variable::<i32>(GRID_MAPPING, &[])?;
            if let Some(wkt) = crs_wkt {
                if let Some(name) = grid_mapping_name(wkt) {
                    crs_var.put_attribute("grid_mapping_name", name)?;
                } else {
                    debug!("No CF grid mapping name for the DEM's CRS");
                }
                crs_var.put_attribute("crs_wkt", wkt)?;
                crs_var.put_attribute("spatial_ref", wkt)?;
            }
            let transform = geometry
                .geo_transform()
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(" ");
            crs_var.put_attribute("GeoTransform", transform.as_str())?;
        }

        for quantity in Quantity::ALL {
            let mut var =
                file.add_variable::<f32>(quantity.name(), &["time", "latitude", "longitude"])?;
            var.put_attribute("long_name", quantity.long_name())?;
            var.put_attribute("units", quantity.units())?;
            var.put_attribute("_FillValue", NODATA_VALUE as f32)?;
            var.put_attribute("grid_mapping", GRID_MAPPING)?;
        }

        file.add_attribute("Conventions", "CF-1.8")?;
        file.add_attribute("source", "SPH landslide model")?;

        debug!("Created netCDF {:?}", path);
        Ok(Self {
            file,
            time_index: 0,
        })
    }

    pub fn write_slice(&mut self, slice: &TimeSlice) -> Result<()> {
        let t_idx = self.time_index;

        {
            let mut time_var = self
                .file
                .variable_mut("time")
                .ok_or_else(|| missing_variable("time"))?;
            time_var.put_value(slice.time, [t_idx])?;
        }

        for quantity in Quantity::ALL {
            let mut var = self
                .file
                .variable_mut(quantity.name())
                .ok_or_else(|| missing_variable(quantity.name()))?;
            var.put_values(slice.values(quantity), (t_idx, .., ..))?;
        }

        self.time_index += 1;
        Ok(())
    }

    pub fn n_timesteps(&self) -> usize {
        self.time_index
    }

    /// Writes a whole series to `path`.
    pub fn write_series(path: &Path, series: &GridSeries, crs_wkt: Option<&str>) -> Result<()> {
        let mut writer = Self::create(path, &series.geometry, crs_wkt)?;
        for slice in &series.slices {
            writer.write_slice(slice)?;
        }
        info!(
            "Written netCDF {:?} with {} time steps",
            path,
            writer.n_timesteps()
        );
        Ok(())
    }
}

// WKT の投影法名と CF の grid_mapping_name の対応
const CF_PROJECTIONS: &[(&str, &str)] = &[
    ("transverse_mercator", "transverse_mercator"),
    ("lambert_conformal_conic", "lambert_conformal_conic"),
    ("lambert_conic_conformal", "lambert_conformal_conic"),
    ("albers", "albers_conical_equal_area"),
    ("lambert_azimuthal_equal_area", "lambert_azimuthal_equal_area"),
    ("polar_stereographic", "polar_stereographic"),
    ("oblique_stereographic", "oblique_stereographic"),
    ("mercator", "mercator"),
];

/// CF `grid_mapping_name` for a WKT1 or WKT2 definition, if it has one.
pub fn grid_mapping_name(wkt: &str) -> Option<&'static str> {
    let normalized = wkt.to_ascii_lowercase().replace(&[' ', '-'][..], "_");
    let keyword = normalized.split('[').next()?.trim();

    match keyword {
        "projcs" | "projcrs" | "projectedcrs" => {
            let method = ["projection[\"", "method[\""]
                .iter()
                .find_map(|tag| normalized.split_once(tag))
                .and_then(|(_, rest)| rest.split('"').next())?;
            CF_PROJECTIONS
                .iter()
                .find(|(pattern, _)| method.contains(pattern))
                .map(|&(_, name)| name)
        }
        "geogcs" | "geogcrs" | "geographiccrs" => Some("latitude_longitude"),
        _ => None,
    }
}

fn missing_variable(name: &str) -> Error {
    Error::InvalidInput(format!("netCDF variable '{}' is missing", name))
}
