use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use tracing::info;

use crate::error::Result;
use crate::model::{Dem, TerrainSample};
use crate::reader::read_dem;
use crate::text::format_float;

const TOP_MARKER: &str = "ictop";
const TOP_VERSION: &str = "11";

/// `.top` のヘッダ行数とフッタ行数
pub const HEADER_LINES: usize = 5;
pub const FOOTER_LINES: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RowOrder {
    #[default]
    NorthToSouth,
    SouthToNorth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TopFooter {
    #[default]
    Terrain,
    TopoProps,
}

impl TopFooter {
    fn label(self) -> &'static str {
        match self {
            TopFooter::Terrain => "terrain",
            TopFooter::TopoProps => "topo_props",
        }
    }
}

/// 出力座標の原点
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CoordinateOrigin {
    /// ラスタの座標系でのセル中心
    #[default]
    CellCentre,
    /// 南西端のセルを 0 とするローカル座標（ピクセルサイズずつ加算）
    LocalOffset,
}

impl CoordinateOrigin {
    fn format(self, value: f64) -> String {
        match self {
            // 最初の値は整数の 0 として書かれる
            CoordinateOrigin::LocalOffset if value == 0.0 => "0".to_string(),
            _ => format_float(value),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopConfig {
    pub row_order: RowOrder,
    /// NoDataセルを出力しない（ヘッダの点数も有効セル数になる）
    pub skip_no_data: bool,
    pub footer: TopFooter,
    pub origin: CoordinateOrigin,
}

impl Default for TopConfig {
    fn default() -> Self {
        Self {
            row_order: RowOrder::NorthToSouth,
            skip_no_data: true,
            footer: TopFooter::Terrain,
            origin: CoordinateOrigin::CellCentre,
        }
    }
}

/// `0, p, p+p, ...` accumulated step by step.
fn local_offsets(count: usize, pixel_size: f64) -> Vec<f64> {
    let mut offsets = Vec::with_capacity(count);
    let mut offset = 0.0;
    for _ in 0..count {
        offsets.push(offset);
        offset += pixel_size;
    }
    offsets
}

/// Samples of `dem` in the configured row order.
///
/// With [`CoordinateOrigin::LocalOffset`] x counts from the western column
/// and y from the southern row.
pub fn terrain_samples<'a>(
    dem: &'a Dem,
    config: &TopConfig,
) -> impl Iterator<Item = TerrainSample> + 'a {
    let (rows, cols) = dem.shape();
    let origin = config.origin;
    let x_offsets = local_offsets(cols, dem.geometry.pixel_size);
    let y_offsets = local_offsets(rows, dem.geometry.pixel_size);
    let row_indices: Box<dyn Iterator<Item = usize>> = match config.row_order {
        RowOrder::NorthToSouth => Box::new(0..rows),
        RowOrder::SouthToNorth => Box::new((0..rows).rev()),
    };
    let skip_no_data = config.skip_no_data;

    row_indices
        .flat_map(move |row| (0..cols).map(move |col| (row, col)))
        .filter_map(move |(row, col)| {
            let z = dem.value(row, col);
            if skip_no_data && dem.is_no_data(z) {
                return None;
            }
            let (x, y) = match origin {
                CoordinateOrigin::CellCentre => dem.geometry.cell_center(row, col),
                CoordinateOrigin::LocalOffset => (x_offsets[col], y_offsets[rows - 1 - row]),
            };
            Some(TerrainSample { x, y, z })
        })
}

/// Writes `dem` in `.top` format and returns the number of data lines.
pub fn write_top<W: Write>(dem: &Dem, writer: &mut W, config: &TopConfig) -> Result<usize> {
    let count = if config.skip_no_data {
        dem.valid_count()
    } else {
        dem.geometry.len()
    };

    writeln!(writer, "{}", TOP_MARKER)?;
    writeln!(writer, "{}", TOP_VERSION)?;
    writeln!(writer, "np\tdeltx")?;
    writeln!(
        writer,
        "{}\t{}",
        count,
        format_float(dem.geometry.pixel_size)
    )?;
    writeln!(writer, "X Y Z")?;

    let mut written = 0;
    for sample in terrain_samples(dem, config) {
        writeln!(
            writer,
            "{}\t{}\t{}",
            config.origin.format(sample.x),
            config.origin.format(sample.y),
            format_float(sample.z)
        )?;
        written += 1;
    }

    writeln!(writer, "{}", config.footer.label())?;
    writeln!(writer, "0")?;

    Ok(written)
}

/// Converts the raster at `input` into a `.top` file at `output`.
pub fn dem_to_top(input: &Path, output: &Path, config: &TopConfig) -> Result<usize> {
    let dem = read_dem(input)?;
    let (rows, cols) = dem.shape();
    info!("Converting DEM to TOP: {} x {} cells", cols, rows);

    let mut writer = BufWriter::new(File::create(output)?);
    let written = write_top(&dem, &mut writer, config)?;
    writer.flush()?;

    info!("Written {} terrain points to {:?}", written, output);
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GridGeometry, NODATA_VALUE};

    fn create_test_dem() -> Dem {
        Dem {
            geometry: GridGeometry {
                rows: 2,
                cols: 2,
                x_min: 500.0,
                y_max: 1000.0,
                pixel_size: 10.0,
            },
            values: vec![1.0, 2.0, 3.0, NODATA_VALUE],
            no_data: Some(NODATA_VALUE),
            crs_wkt: None,
        }
    }

    fn render(dem: &Dem, config: &TopConfig) -> String {
        let mut out = Vec::new();
        write_top(dem, &mut out, config).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_header_and_footer_literals() {
        let text = render(&create_test_dem(), &TopConfig::default());
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "ictop");
        assert_eq!(lines[1], "11");
        assert_eq!(lines[2], "np\tdeltx");
        assert_eq!(lines[3], "3\t10.0");
        assert_eq!(lines[4], "X Y Z");
        assert_eq!(lines[lines.len() - 2], "terrain");
        assert_eq!(lines[lines.len() - 1], "0");
        assert!(text.ends_with("0\n"));
    }

    #[test]
    fn test_cell_centers_north_to_south() {
        let text = render(&create_test_dem(), &TopConfig::default());
        let data: Vec<&str> = text.lines().skip(HEADER_LINES).take(3).collect();

        assert_eq!(
            data,
            vec!["505.0\t995.0\t1.0", "515.0\t995.0\t2.0", "505.0\t985.0\t3.0"]
        );
    }

    #[test]
    fn test_line_count_skipping_no_data() {
        let dem = create_test_dem();
        let mut out = Vec::new();
        let written = write_top(&dem, &mut out, &TopConfig::default()).unwrap();

        assert_eq!(written, 3);
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 3 + HEADER_LINES + FOOTER_LINES);
    }

    #[test]
    fn test_include_all_cells_south_to_north() {
        let config = TopConfig {
            row_order: RowOrder::SouthToNorth,
            skip_no_data: false,
            footer: TopFooter::TopoProps,
            origin: CoordinateOrigin::CellCentre,
        };
        let text = render(&create_test_dem(), &config);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 4 + HEADER_LINES + FOOTER_LINES);
        assert_eq!(lines[3], "4\t10.0");
        assert_eq!(lines[5], "505.0\t985.0\t3.0");
        assert_eq!(lines[6], "515.0\t985.0\t-9999.0");
        assert_eq!(lines[7], "505.0\t995.0\t1.0");
        assert_eq!(lines[lines.len() - 2], "topo_props");
    }

    #[test]
    fn test_local_offsets_from_south_west() {
        let config = TopConfig {
            row_order: RowOrder::SouthToNorth,
            skip_no_data: false,
            footer: TopFooter::Terrain,
            origin: CoordinateOrigin::LocalOffset,
        };
        let text = render(&create_test_dem(), &config);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[3], "4\t10.0");
        assert_eq!(
            &lines[HEADER_LINES..HEADER_LINES + 4],
            &["0\t0\t3.0", "10.0\t0\t-9999.0", "0\t10.0\t1.0", "10.0\t10.0\t2.0"]
        );
        assert_eq!(lines[lines.len() - 2], "terrain");
    }

    #[test]
    fn test_local_offsets_accumulate_pixel_size() {
        assert_eq!(local_offsets(4, 0.1), vec![0.0, 0.1, 0.2, 0.30000000000000004]);
        assert_eq!(CoordinateOrigin::LocalOffset.format(0.0), "0");
        assert_eq!(CoordinateOrigin::CellCentre.format(0.0), "0.0");
    }
}
