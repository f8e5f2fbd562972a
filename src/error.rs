use thiserror::Error;
use uuid::Uuid;

/// Everything that can go wrong between a BLE notification and a saved CSV.
///
/// Decode-path failures (`MalformedFrame`, `UnknownChannel`, `OutOfRangeColumn`)
/// are per-frame: log them and keep processing. Import failures abort that
/// import only and leave in-memory state alone.
#[derive(Debug, Error)]
pub enum Error {
    #[error("frame buffer has {len} bytes, shorter than the {header}-byte header")]
    MalformedFrame { len: usize, header: usize },

    #[error("notification on unclassified channel {0}")]
    UnknownChannel(Uuid),

    #[error("column {column} falls outside the 35-column sensor matrix")]
    OutOfRangeColumn { column: i64 },

    #[error("CSV import failed at data row {row}: {reason}")]
    ImportParse { row: usize, reason: String },

    #[error("no samples captured yet, refusing to export an empty matrix")]
    EmptyExportSource,

    #[error(transparent)]
    Bluetooth(#[from] btleplug::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
