/// 出力グリッドで「データなし」を表す値
pub const NODATA_VALUE: f64 = -9999.0;

/// Row 0 is the northernmost row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridGeometry {
    pub rows: usize,
    pub cols: usize,
    pub x_min: f64,
    pub y_max: f64,
    pub pixel_size: f64,
}

impl GridGeometry {
    pub fn len(&self) -> usize {
        self.rows * self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn cell_center(&self, row: usize, col: usize) -> (f64, f64) {
        let x = self.x_min + (col as f64 + 0.5) * self.pixel_size;
        let y = self.y_max - (row as f64 + 0.5) * self.pixel_size;
        (x, y)
    }

    /// `floor((x - x_min) / pixel)`、グリッド外なら `None`
    pub fn column_of(&self, x: f64) -> Option<usize> {
        let col = ((x - self.x_min) / self.pixel_size).floor();
        if col >= 0.0 && (col as usize) < self.cols {
            Some(col as usize)
        } else {
            None
        }
    }

    pub fn geo_transform(&self) -> [f64; 6] {
        [
            self.x_min,
            self.pixel_size,
            0.0,
            self.y_max,
            0.0,
            -self.pixel_size,
        ]
    }
}

/// A single-band elevation raster held in memory, row-major from the north.
#[derive(Debug, Clone)]
pub struct Dem {
    pub geometry: GridGeometry,
    pub values: Vec<f64>,
    pub no_data: Option<f64>,
    pub crs_wkt: Option<String>,
}

impl Dem {
    pub fn shape(&self) -> (usize, usize) {
        (self.geometry.rows, self.geometry.cols)
    }

    pub fn value(&self, row: usize, col: usize) -> f64 {
        self.values[row * self.geometry.cols + col]
    }

    pub fn is_no_data(&self, value: f64) -> bool {
        match self.no_data {
            Some(nd) if nd.is_nan() => value.is_nan(),
            Some(nd) => value == nd,
            None => false,
        }
    }

    pub fn valid_count(&self) -> usize {
        self.values.iter().filter(|&&v| !self.is_no_data(v)).count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TerrainSample {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointSample {
    pub x: f64,
    pub y: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResultRecord {
    pub x: f64,
    pub y: f64,
    pub height: f64,
    pub vx: f64,
    pub vy: f64,
    pub vavg: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantity {
    Height,
    Vx,
    Vy,
    Vavg,
}

impl Quantity {
    pub const ALL: [Quantity; 4] = [Quantity::Height, Quantity::Vx, Quantity::Vy, Quantity::Vavg];

    pub fn name(self) -> &'static str {
        match self {
            Quantity::Height => "Height",
            Quantity::Vx => "Vx",
            Quantity::Vy => "Vy",
            Quantity::Vavg => "Vavg",
        }
    }

    pub fn long_name(self) -> &'static str {
        match self {
            Quantity::Height => "flow height",
            Quantity::Vx => "velocity along x",
            Quantity::Vy => "velocity along y",
            Quantity::Vavg => "depth averaged velocity",
        }
    }

    pub fn units(self) -> &'static str {
        match self {
            Quantity::Height => "m",
            _ => "m s-1",
        }
    }
}

/// 1タイムステップ分のグリッド（各量とも行優先）
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSlice {
    pub time: f64,
    pub height: Vec<f32>,
    pub vx: Vec<f32>,
    pub vy: Vec<f32>,
    pub vavg: Vec<f32>,
}

impl TimeSlice {
    pub fn empty(time: f64, len: usize) -> Self {
        let fill = vec![NODATA_VALUE as f32; len];
        Self {
            time,
            height: fill.clone(),
            vx: fill.clone(),
            vy: fill.clone(),
            vavg: fill,
        }
    }

    pub fn values(&self, quantity: Quantity) -> &[f32] {
        match quantity {
            Quantity::Height => &self.height,
            Quantity::Vx => &self.vx,
            Quantity::Vy => &self.vy,
            Quantity::Vavg => &self.vavg,
        }
    }

    pub fn set(&mut self, index: usize, record: &ResultRecord) {
        self.height[index] = record.height as f32;
        self.vx[index] = record.vx as f32;
        self.vy[index] = record.vy as f32;
        self.vavg[index] = record.vavg as f32;
    }
}

#[derive(Debug, Clone)]
pub struct GridSeries {
    pub geometry: GridGeometry,
    pub slices: Vec<TimeSlice>,
}

impl GridSeries {
    pub fn times(&self) -> Vec<f64> {
        self.slices.iter().map(|s| s.time).collect()
    }

    /// (time, row, col) 順に連結した値
    pub fn stacked(&self, quantity: Quantity) -> Vec<f32> {
        self.slices
            .iter()
            .flat_map(|s| s.values(quantity).iter().copied())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geometry() -> GridGeometry {
        GridGeometry {
            rows: 2,
            cols: 3,
            x_min: 100.0,
            y_max: 50.0,
            pixel_size: 10.0,
        }
    }

    #[test]
    fn test_cell_center_formula() {
        let g = geometry();
        assert_eq!(g.cell_center(0, 0), (105.0, 45.0));
        assert_eq!(g.cell_center(1, 2), (125.0, 35.0));
    }

    #[test]
    fn test_column_of_bounds() {
        let g = geometry();
        assert_eq!(g.column_of(100.0), Some(0));
        assert_eq!(g.column_of(119.9), Some(1));
        assert_eq!(g.column_of(129.99), Some(2));
        assert_eq!(g.column_of(130.0), None);
        assert_eq!(g.column_of(99.0), None);
    }

    #[test]
    fn test_no_data_detection() {
        let dem = Dem {
            geometry: geometry(),
            values: vec![1.0, -9999.0, 3.0, 4.0, -9999.0, 6.0],
            no_data: Some(NODATA_VALUE),
            crs_wkt: None,
        };
        assert_eq!(dem.valid_count(), 4);
        assert_eq!(dem.value(1, 2), 6.0);

        let nan_dem = Dem {
            no_data: Some(f64::NAN),
            values: vec![f64::NAN, 1.0, 2.0, 3.0, 4.0, 5.0],
            ..dem
        };
        assert_eq!(nan_dem.valid_count(), 5);
    }
}
