// This should be the *only* file that knows the sensor scale factors.

use crate::error::{Error, Result};
use crate::matrix::{COLUMNS, SATELLITES, SIGNALS_PER_SATELLITE};
use crate::protocol::{SensorKind, TelemetryFrame};

/// Raw gyro counts to degrees per second.
pub const GYRO_SCALE: f64 = 1.0 / 16.4;
/// Raw accelerometer counts to g.
pub const ACCEL_SCALE: f64 = 0.2;
/// Raw impact-sensor counts to volts.
pub const IMPACT_SCALE: f64 = 2.42 / 4095.0;

pub fn scale_factor(kind: SensorKind) -> f64 {
    match kind {
        SensorKind::Gyro => GYRO_SCALE,
        SensorKind::Accel => ACCEL_SCALE,
        SensorKind::Impact => IMPACT_SCALE,
    }
}

/// Maps (satellite, kind, axis) to a logical matrix column. Each satellite
/// owns 7 adjacent columns: gyro x/y/z, accel x/y/z, impact.
pub fn column_index(satellite_id: u8, kind: SensorKind, axis: u8) -> Result<usize> {
    let local = match kind {
        SensorKind::Gyro => axis as i64,
        SensorKind::Accel => 3 + axis as i64,
        SensorKind::Impact => 6,
    };
    let column = (satellite_id as i64 - 1) * SIGNALS_PER_SATELLITE as i64 + local;

    let satellite_ok = (1..=SATELLITES as u8).contains(&satellite_id);
    let axis_ok = kind == SensorKind::Impact || axis <= 2;
    if !satellite_ok || !axis_ok {
        return Err(Error::OutOfRangeColumn { column });
    }
    debug_assert!((0..COLUMNS as i64).contains(&column));
    Ok(column as usize)
}

/// Pure calibration step: the frame's raw counts become engineering units
/// (°/s, g or V) and land in exactly one matrix column.
pub fn map_and_scale(frame: &TelemetryFrame) -> Result<(usize, Vec<f64>)> {
    let column = column_index(frame.satellite_id, frame.kind, frame.axis)?;
    let scale = scale_factor(frame.kind);
    let scaled = frame.samples.iter().map(|&s| s as f64 * scale).collect();
    Ok((column, scaled))
}
