use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::model::PointSample;
use crate::reader::{read_points, HeightSource};
use crate::text::format_float;

pub const HEADER_LINES: usize = 3;

// 点源パラメータの固定値
const SOURCE_GRID: f64 = 10.0;
const SOURCE_SPACING: f64 = 10.0;
const FACTHSML: u32 = 2;

/// Distance between the first two points, used as the grid spacing of the
/// whole point source. This is a heuristic, not a nearest-neighbour search.
pub fn estimate_spacing(points: &[PointSample]) -> Result<f64> {
    match points {
        [first, second, ..] => {
            let spacing = (second.x - first.x).hypot(second.y - first.y);
            if spacing == 0.0 {
                warn!("The first two points coincide, spacing is 0");
            }
            Ok(spacing)
        }
        _ => Err(Error::TooFewPoints(points.len())),
    }
}

pub fn write_pts<W: Write>(points: &[PointSample], writer: &mut W) -> Result<()> {
    let spacing = estimate_spacing(points)?;

    writeln!(writer, "npoin source grid spacing facthsml")?;
    writeln!(
        writer,
        "{}  {}  {}  {}  {}",
        points.len(),
        format_float(spacing),
        format_float(SOURCE_GRID),
        format_float(SOURCE_SPACING),
        FACTHSML
    )?;
    writeln!(writer, "X Y Z")?;

    for point in points {
        writeln!(
            writer,
            "{}\t{}\t{}",
            format_float(point.x),
            format_float(point.y),
            format_float(point.height)
        )?;
    }

    Ok(())
}

/// Converts the point layer at `input` into a `.pts` file at `output`.
pub fn points_to_pts(input: &Path, height: &HeightSource, output: &Path) -> Result<usize> {
    let points = read_points(input, height)?;
    info!("Converting {} points to PTS", points.len());

    let mut writer = BufWriter::new(File::create(output)?);
    write_pts(&points, &mut writer)?;
    writer.flush()?;

    info!("Written PTS: {:?}", output);
    Ok(points.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_points() -> Vec<PointSample> {
        vec![
            PointSample { x: 0.0, y: 0.0, height: 1.5 },
            PointSample { x: 3.0, y: 4.0, height: 2.0 },
            PointSample { x: 100.0, y: 100.0, height: 3.25 },
        ]
    }

    #[test]
    fn test_spacing_uses_first_two_points() {
        let spacing = estimate_spacing(&create_test_points()).unwrap();
        assert_eq!(spacing, 5.0);
    }

    #[test]
    fn test_spacing_requires_two_points() {
        let one = vec![PointSample { x: 1.0, y: 1.0, height: 1.0 }];
        assert!(matches!(estimate_spacing(&one), Err(Error::TooFewPoints(1))));
        assert!(matches!(estimate_spacing(&[]), Err(Error::TooFewPoints(0))));
    }

    #[test]
    fn test_pts_layout() {
        let points = create_test_points();
        let mut out = Vec::new();
        write_pts(&points, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "npoin source grid spacing facthsml");
        assert_eq!(lines[1], "3  5.0  10.0  10.0  2");
        assert_eq!(lines[2], "X Y Z");
        assert_eq!(lines.len(), HEADER_LINES + points.len());
        assert_eq!(lines[3], "0.0\t0.0\t1.5");
        assert_eq!(lines[5], "100.0\t100.0\t3.25");
    }
}
