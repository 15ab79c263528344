use std::path::Path;

use gdal::vector::LayerAccess;
use gdal::Dataset;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::model::{Dem, GridGeometry, PointSample};

/// 点の高さをどこから取るか
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeightSource {
    /// 属性フィールドの値
    Field(String),
    /// ジオメトリのZ値
    Z,
}

/// Reads band 1 of a raster into memory.
pub fn read_dem(path: &Path) -> Result<Dem> {
    if !path.exists() {
        return Err(Error::MissingFile(path.to_path_buf()));
    }

    let dataset = Dataset::open(path)?;
    if dataset.raster_count() == 0 {
        return Err(Error::InvalidInput(format!(
            "{} has no raster band",
            path.display()
        )));
    }

    let (cols, rows) = dataset.raster_size();
    let transform = dataset.geo_transform()?;
    if transform[2] != 0.0 || transform[4] != 0.0 {
        warn!("Rotated geotransform ignored for {:?}", path);
    }
    if transform[1] <= 0.0 {
        return Err(Error::InvalidInput(format!(
            "{} has a non-positive pixel size {}",
            path.display(),
            transform[1]
        )));
    }
    if (transform[1] + transform[5]).abs() > 1e-9 * transform[1] {
        warn!(
            "Non-square pixels ({} x {}), using the X resolution",
            transform[1], -transform[5]
        );
    }

    let geometry = GridGeometry {
        rows,
        cols,
        x_min: transform[0],
        y_max: transform[3],
        pixel_size: transform[1],
    };

    let band = dataset.rasterband(1)?;
    let no_data = band.no_data_value();
    let buffer = band.read_as::<f64>((0, 0), (cols, rows), (cols, rows), None)?;
    let values = buffer.data().to_vec();

    let projection = dataset.projection();
    let crs_wkt = if projection.is_empty() {
        None
    } else {
        Some(projection)
    };

    debug!(
        "Read DEM {:?}: {}x{} cells, pixel {}, nodata {:?}",
        path, cols, rows, geometry.pixel_size, no_data
    );

    Ok(Dem {
        geometry,
        values,
        no_data,
        crs_wkt,
    })
}

/// Reads every feature of the first layer as a point sample.
pub fn read_points(path: &Path, height: &HeightSource) -> Result<Vec<PointSample>> {
    if !path.exists() {
        return Err(Error::MissingFile(path.to_path_buf()));
    }

    let dataset = Dataset::open(path)?;
    if dataset.layer_count() == 0 {
        return Err(Error::InvalidInput(format!(
            "{} has no vector layer",
            path.display()
        )));
    }
    let mut layer = dataset.layer(0)?;

    let mut points = Vec::new();
    for (index, feature) in layer.features().enumerate() {
        let geometry = feature.geometry().ok_or_else(|| {
            Error::InvalidInput(format!("Feature {} has no geometry", index))
        })?;
        let (x, y, z) = geometry.get_point(0);

        let h = match height {
            HeightSource::Z => z,
            HeightSource::Field(name) => {
                let field_index = feature.field_index(name)?;
                feature
                    .field_as_double(field_index)?
                    .ok_or_else(|| Error::MissingHeight {
                        index,
                        field: name.clone(),
                    })?
            }
        };

        points.push(PointSample { x, y, height: h });
    }

    debug!("Read {} points from {:?}", points.len(), path);
    Ok(points)
}
