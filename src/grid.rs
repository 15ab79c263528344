use std::collections::BTreeMap;

use tracing::debug;

use crate::model::{GridGeometry, GridSeries, ResultRecord, TimeSlice};
use crate::res::ResultBlock;

/// y truncated to one decimal, as an integer key.
fn y_key(y: f64) -> i64 {
    (y * 10.0).trunc() as i64
}

/// Places the scattered samples of one block onto the grid.
///
/// Samples are grouped by their y truncated to one decimal; a grid row takes
/// the group whose key equals its truncated centre y, and each sample of the
/// group lands in column `floor((x - x_min) / pixel)`. Cells without a sample
/// keep the no-data value.
pub fn rasterize_block(geometry: &GridGeometry, block: &ResultBlock) -> TimeSlice {
    let mut slice = TimeSlice::empty(block.time, geometry.len());

    let mut records: Vec<&ResultRecord> = block.records.iter().collect();
    records.sort_by(|a, b| a.y.total_cmp(&b.y));

    let mut groups: BTreeMap<i64, Vec<&ResultRecord>> = BTreeMap::new();
    for record in records {
        groups.entry(y_key(record.y)).or_default().push(record);
    }

    let mut placed = 0;
    for row in 0..geometry.rows {
        let (_, y) = geometry.cell_center(row, 0);
        let Some(group) = groups.get(&y_key(y)) else {
            continue;
        };
        for record in group {
            if let Some(col) = geometry.column_of(record.x) {
                slice.set(row * geometry.cols + col, record);
                placed += 1;
            }
        }
    }

    debug!(
        "time {}: placed {} of {} samples",
        block.time,
        placed,
        block.records.len()
    );
    slice
}

pub fn build_series(geometry: &GridGeometry, blocks: &[ResultBlock]) -> GridSeries {
    GridSeries {
        geometry: *geometry,
        slices: blocks
            .iter()
            .map(|block| rasterize_block(geometry, block))
            .collect(),
    }
}
