use anyhow::{Context, Result};
use gdal::raster::Buffer;
use gdal::DriverManager;
use gdal::Metadata;
use std::path::{Path, PathBuf};

use crate::model::{GridSeries, Quantity, NODATA_VALUE};
use crate::text::format_float;

mod netcdf_writer;

pub use self::netcdf_writer::NetCdfWriter;

#[derive(Default)]
pub struct GeoTiffWriter {}

impl GeoTiffWriter {
    pub fn new() -> Self {
        Self {}
    }

    /// 各物理量ごとに1ファイル（タイムステップごとに1バンド）を書き出す
    pub fn write_series(
        &self,
        series: &GridSeries,
        crs_wkt: Option<&str>,
        output_dir: &Path,
        stem: &str,
    ) -> Result<Vec<PathBuf>> {
        let mut written = Vec::with_capacity(Quantity::ALL.len());
        for quantity in Quantity::ALL {
            let output_path = output_dir.join(format!("{}_{}.tif", stem, quantity.name()));
            self.write_quantity(series, quantity, crs_wkt, &output_path)?;
            written.push(output_path);
        }
        Ok(written)
    }

    pub fn write_quantity(
        &self,
        series: &GridSeries,
        quantity: Quantity,
        crs_wkt: Option<&str>,
        output_path: &Path,
    ) -> Result<()> {
        let rows = series.geometry.rows;
        let cols = series.geometry.cols;
        let bands = series.slices.len();
        if bands == 0 {
            anyhow::bail!("No time step to write for {}", quantity.name());
        }

        tracing::info!(
            "Writing {} GeoTIFF: {} x {} pixels, {} bands",
            quantity.name(),
            cols,
            rows,
            bands
        );

        // GTiffドライバーを取得
        let driver =
            DriverManager::get_driver_by_name("GTiff").context("Failed to get GTiff driver")?;

        let mut dataset = driver
            .create_with_band_type::<f32, _>(output_path, cols, rows, bands)
            .context("Failed to create dataset")?;

        // ジオトランスフォームを設定
        dataset
            .set_geo_transform(&series.geometry.geo_transform())
            .context("Failed to set geo transform")?;

        // 座標系を設定
        match crs_wkt {
            Some(wkt) => dataset
                .set_projection(wkt)
                .context("Failed to set projection")?,
            None => tracing::warn!("DEM has no CRS, {:?} is written without one", output_path),
        }

        for (i, slice) in series.slices.iter().enumerate() {
            let mut band = dataset
                .rasterband(i + 1)
                .with_context(|| format!("Failed to get raster band {}", i + 1))?;

            band.set_no_data_value(Some(NODATA_VALUE))
                .context("Failed to set no data value")?;
            band.set_description(&format!("time={}", format_float(slice.time)))
                .context("Failed to set band description")?;

            // GDALは行優先順を期待
            let mut buffer = Buffer::new((cols, rows), slice.values(quantity).to_vec());
            band.write((0, 0), (cols, rows), &mut buffer)
                .with_context(|| format!("Failed to write band {}", i + 1))?;
        }

        dataset
            .set_metadata_item("QUANTITY", quantity.name(), "")
            .context("Failed to set quantity metadata")?;
        dataset
            .set_metadata_item("UNITS", quantity.units(), "")
            .context("Failed to set units metadata")?;

        Ok(())
    }
}
