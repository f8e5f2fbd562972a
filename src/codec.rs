use chrono::{DateTime, Utc};
use csv::ReaderBuilder;

use crate::error::{Error, Result};
use crate::matrix::{column_label, SensorMatrix, COLUMNS, ROWS};
use crate::timing::SLOTS;

/// Marker written for a cell no frame ever touched. A real 0.0 reading
/// exports as "0.0000", so the two survive a round trip distinct.
const UNSET_FIELD: &str = "0";

/// `SensorData_<ISO8601 seconds, ':' -> '-'>.csv`
pub fn export_filename(now: DateTime<Utc>) -> String {
    format!("SensorData_{}.csv", now.format("%Y-%m-%dT%H-%M-%S"))
}

/// Serializes the matrix plus start-time registry to flat CSV: a header row,
/// then 170 rows of 37 fields. Fields 0..34 are the calibrated values at
/// fixed 4-decimal precision; fields 35/36 carry the raw and normalized
/// start times for registry slot = row on the first 15 rows and stay empty
/// below that.
pub fn export_csv(matrix: &SensorMatrix, raw: &[u32; SLOTS], normalized: &[u32; SLOTS]) -> Result<String> {
    if matrix.is_empty() {
        return Err(Error::EmptyExportSource);
    }

    let mut out = String::new();
    for column in 0..COLUMNS {
        out.push_str(&column_label(column));
        out.push(',');
    }
    out.push_str("RawStartTime,NormalizedStartTime\n");

    for row in 0..ROWS {
        for column in 0..COLUMNS {
            match matrix.cell(row, column) {
                Some(value) => out.push_str(&format!("{value:.4}")),
                None => out.push_str(UNSET_FIELD),
            }
            out.push(',');
        }
        if row < SLOTS {
            out.push_str(&format!("{},{}", raw[row], normalized[row]));
        } else {
            out.push(',');
        }
        out.push('\n');
    }
    Ok(out)
}

/// Everything a persisted file restores.
#[derive(Debug)]
pub struct Imported {
    pub matrix: SensorMatrix,
    pub raw: [u32; SLOTS],
    pub normalized: [u32; SLOTS],
}

/// Parses a persisted file back into a matrix and registry arrays. The
/// header row is skipped; every data row must provide 35 parseable value
/// fields or the whole import fails (the caller's live state is built only
/// from a fully parsed file). Missing or non-numeric start-time fields leave
/// that registry slot at its empty sentinel. Rows past 170 are ignored.
pub fn import_csv(text: &str) -> Result<Imported> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut matrix = SensorMatrix::new();
    let mut raw = [0u32; SLOTS];
    let mut normalized = [0u32; SLOTS];

    for (row, result) in reader.records().enumerate() {
        if row >= ROWS {
            break;
        }
        let record = result.map_err(|e| Error::ImportParse {
            row,
            reason: e.to_string(),
        })?;
        if record.len() < COLUMNS {
            return Err(Error::ImportParse {
                row,
                reason: format!(
                    "expected at least {COLUMNS} value fields, found {}",
                    record.len()
                ),
            });
        }

        for column in 0..COLUMNS {
            let field = record[column].trim();
            if field == UNSET_FIELD {
                continue;
            }
            let value: f64 = field.parse().map_err(|_| Error::ImportParse {
                row,
                reason: format!("field {column} is not numeric: {field:?}"),
            })?;
            matrix.set_cell(row, column, Some(value));
        }

        if row < SLOTS {
            if let Some(v) = record.get(COLUMNS).and_then(|f| f.trim().parse::<f64>().ok()) {
                raw[row] = v as u32;
            }
            if let Some(v) = record
                .get(COLUMNS + 1)
                .and_then(|f| f.trim().parse::<f64>().ok())
            {
                normalized[row] = v as u32;
            }
        }
    }

    Ok(Imported {
        matrix,
        raw,
        normalized,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn populated() -> (SensorMatrix, [u32; SLOTS], [u32; SLOTS]) {
        let mut matrix = SensorMatrix::new();
        matrix.write(0, &[1.23456, -2.5, 0.0]).unwrap();
        matrix.write(34, &[0.00059]).unwrap();
        let mut raw = [0u32; SLOTS];
        let mut normalized = [0u32; SLOTS];
        for i in 0..SLOTS {
            raw[i] = 1000 + i as u32;
            normalized[i] = i as u32;
        }
        (matrix, raw, normalized)
    }

    #[test]
    fn filename_follows_the_convention() {
        let t = Utc.with_ymd_and_hms(2026, 8, 23, 14, 5, 9).unwrap();
        assert_eq!(export_filename(t), "SensorData_2026-08-23T14-05-09.csv");
    }

    #[test]
    fn export_shape_and_header() {
        let (matrix, raw, normalized) = populated();
        let text = export_csv(&matrix, &raw, &normalized).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 1 + ROWS);

        let header: Vec<&str> = lines[0].split(',').collect();
        assert_eq!(header.len(), COLUMNS + 2);
        assert_eq!(header[0], "Gyro X 1");
        assert_eq!(header[6], "Impact 1");
        assert_eq!(header[34], "Impact 5");
        assert_eq!(header[35], "RawStartTime");
        assert_eq!(header[36], "NormalizedStartTime");

        // Every data row carries 37 fields; start times only on the first 15.
        let first: Vec<&str> = lines[1].split(',').collect();
        assert_eq!(first.len(), COLUMNS + 2);
        assert_eq!(first[0], "1.2346");
        assert_eq!(first[35], "1000");
        assert_eq!(first[36], "0");
        let row20: Vec<&str> = lines[1 + 20].split(',').collect();
        assert_eq!(row20[35], "");
        assert_eq!(row20[36], "");
    }

    #[test]
    fn unset_and_written_zero_stay_distinct() {
        let (matrix, raw, normalized) = populated();
        let text = export_csv(&matrix, &raw, &normalized).unwrap();
        let row2: Vec<&str> = text.lines().nth(3).unwrap().split(',').collect();
        assert_eq!(row2[0], "0.0000"); // written 0.0
        assert_eq!(row2[1], "0"); // never written

        let back = import_csv(&text).unwrap();
        assert_eq!(back.matrix.cell(2, 0), Some(0.0));
        assert_eq!(back.matrix.cell(2, 1), None);
    }

    #[test]
    fn round_trip_is_stable() {
        let (matrix, raw, normalized) = populated();
        let first = export_csv(&matrix, &raw, &normalized).unwrap();
        let back = import_csv(&first).unwrap();
        assert_eq!(back.raw, raw);
        assert_eq!(back.normalized, normalized);
        let second = export_csv(&back.matrix, &back.raw, &back.normalized).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn empty_matrix_refuses_to_export() {
        let matrix = SensorMatrix::new();
        let err = export_csv(&matrix, &[0; SLOTS], &[0; SLOTS]).unwrap_err();
        assert!(matches!(err, Error::EmptyExportSource));
    }

    #[test]
    fn short_row_aborts_the_import() {
        let (matrix, raw, normalized) = populated();
        let mut text = export_csv(&matrix, &raw, &normalized).unwrap();
        // Chop the second data row down to 34 fields.
        let mut lines: Vec<String> = text.lines().map(str::to_string).collect();
        lines[2] = lines[2].split(',').take(34).collect::<Vec<_>>().join(",");
        text = lines.join("\n");

        let err = import_csv(&text).unwrap_err();
        assert!(matches!(err, Error::ImportParse { row: 1, .. }));
    }

    #[test]
    fn garbage_value_field_aborts_the_import() {
        let (matrix, raw, normalized) = populated();
        let text = export_csv(&matrix, &raw, &normalized)
            .unwrap()
            .replacen("-2.5000", "bogus", 1);
        assert!(import_csv(&text).is_err());
    }

    #[test]
    fn bad_start_time_fields_leave_slots_empty() {
        let (matrix, raw, normalized) = populated();
        let text = export_csv(&matrix, &raw, &normalized)
            .unwrap()
            .replacen("1000,0", "oops,0", 1);
        let back = import_csv(&text).unwrap();
        assert_eq!(back.raw[0], 0);
        assert_eq!(back.normalized[0], 0);
        assert_eq!(back.raw[1], raw[1]);
    }
}
