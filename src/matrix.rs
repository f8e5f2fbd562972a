use std::collections::BTreeMap;

use crate::error::{Error, Result};

pub const SATELLITES: usize = 5;
pub const SIGNALS_PER_SATELLITE: usize = 7;
pub const COLUMNS: usize = SATELLITES * SIGNALS_PER_SATELLITE;
pub const ROWS: usize = 170;

const AXIS_LABELS: [&str; SIGNALS_PER_SATELLITE] = [
    "Gyro X", "Gyro Y", "Gyro Z", "Accel X", "Accel Y", "Accel Z", "Impact",
];

/// Descriptive name for a logical column, e.g. column 8 is "Gyro Y 2".
pub fn column_label(column: usize) -> String {
    let axis = AXIS_LABELS[column % SIGNALS_PER_SATELLITE];
    let satellite = column / SIGNALS_PER_SATELLITE + 1;
    format!("{axis} {satellite}")
}

/// Fixed-shape grid of calibrated samples: one row per sample index, one
/// column per (satellite, signal) pair. Cells start unset, which is not the
/// same thing as a real 0.0 reading; the distinction collapses to 0 only
/// when a consumer asks for a dense view.
#[derive(Clone, Debug)]
pub struct SensorMatrix {
    cells: Vec<[Option<f64>; COLUMNS]>,
}

impl Default for SensorMatrix {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorMatrix {
    pub fn new() -> Self {
        Self {
            cells: vec![[None; COLUMNS]; ROWS],
        }
    }

    /// Overwrites one column from the top, one row per sample. Samples past
    /// row 169 are discarded; a column outside the grid is rejected.
    pub fn write(&mut self, column: usize, samples: &[f64]) -> Result<()> {
        if column >= COLUMNS {
            return Err(Error::OutOfRangeColumn {
                column: column as i64,
            });
        }
        for (row, &value) in samples.iter().take(ROWS).enumerate() {
            self.cells[row][column] = Some(value);
        }
        Ok(())
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<f64> {
        self.cells[row][column]
    }

    pub fn set_cell(&mut self, row: usize, column: usize, value: Option<f64>) {
        self.cells[row][column] = value;
    }

    /// True while no frame has written a single cell.
    pub fn is_empty(&self) -> bool {
        self.cells
            .iter()
            .all(|row| row.iter().all(Option::is_none))
    }

    /// Dense column-keyed view for downstream consumers (charting and the
    /// like): `col0`..`col34`, each exactly 170 values, unset cells rendered
    /// as 0.0. Called after every decoded frame, so it stays a plain copy.
    pub fn snapshot(&self) -> BTreeMap<String, Vec<f64>> {
        let mut out = BTreeMap::new();
        for column in 0..COLUMNS {
            let values = self
                .cells
                .iter()
                .map(|row| row[column].unwrap_or(0.0))
                .collect();
            out.insert(format!("col{column}"), values);
        }
        out
    }

    /// Swaps in a fully reconstructed matrix (file load).
    pub fn replace(&mut self, other: SensorMatrix) {
        self.cells = other.cells;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_cycle_every_seven_columns() {
        assert_eq!(column_label(0), "Gyro X 1");
        assert_eq!(column_label(5), "Accel Z 1");
        assert_eq!(column_label(6), "Impact 1");
        assert_eq!(column_label(8), "Gyro Y 2");
        assert_eq!(column_label(34), "Impact 5");
    }

    #[test]
    fn write_fills_rows_top_down() {
        let mut m = SensorMatrix::new();
        m.write(4, &[1.5, 2.5]).unwrap();
        assert_eq!(m.cell(0, 4), Some(1.5));
        assert_eq!(m.cell(1, 4), Some(2.5));
        assert_eq!(m.cell(2, 4), None);
        assert!(!m.is_empty());
    }

    #[test]
    fn write_discards_samples_past_last_row() {
        let mut m = SensorMatrix::new();
        let long = vec![1.0; ROWS + 30];
        m.write(0, &long).unwrap();
        assert_eq!(m.cell(ROWS - 1, 0), Some(1.0));
    }

    #[test]
    fn write_rejects_out_of_range_column() {
        let mut m = SensorMatrix::new();
        let err = m.write(COLUMNS, &[1.0]).unwrap_err();
        assert!(matches!(
            err,
            crate::error::Error::OutOfRangeColumn { column: 35 }
        ));
        assert!(m.is_empty());
    }

    #[test]
    fn snapshot_renders_unset_as_zero_but_store_keeps_the_difference() {
        let mut m = SensorMatrix::new();
        m.write(2, &[0.0, 7.0]).unwrap();
        let snap = m.snapshot();
        assert_eq!(snap.len(), COLUMNS);
        let col2 = &snap["col2"];
        assert_eq!(col2.len(), ROWS);
        assert_eq!(col2[0], 0.0);
        assert_eq!(col2[1], 7.0);
        assert_eq!(col2[2], 0.0);
        // A written zero and an untouched cell look alike in the snapshot
        // but not in the store.
        assert_eq!(m.cell(0, 2), Some(0.0));
        assert_eq!(m.cell(2, 2), None);
    }

    #[test]
    fn replace_swaps_whole_store() {
        let mut a = SensorMatrix::new();
        a.write(0, &[1.0]).unwrap();
        let mut b = SensorMatrix::new();
        b.write(1, &[9.0]).unwrap();
        a.replace(b);
        assert_eq!(a.cell(0, 0), None);
        assert_eq!(a.cell(0, 1), Some(9.0));
    }
}
