use std::collections::HashMap;

use uuid::Uuid;

use crate::error::{Error, Result};
use crate::firmware::{self, FrameLayout};

/// Which notification channel a payload arrived on. The wire format carries
/// no sensor-type field; the delivering GATT service is the only source of
/// this information.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SensorKind {
    Gyro,
    Accel,
    Impact,
}

impl SensorKind {
    /// Position within a satellite's 3-slot start-time group.
    pub fn slot(self) -> usize {
        match self {
            SensorKind::Gyro => 0,
            SensorKind::Accel => 1,
            SensorKind::Impact => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SensorKind::Gyro => "gyro",
            SensorKind::Accel => "accel",
            SensorKind::Impact => "impact",
        }
    }
}

/// One decoded telemetry frame: raw counts, not yet calibrated.
#[derive(Clone, Debug)]
pub struct TelemetryFrame {
    /// Not validated; the protocol has no sequence numbering beyond this.
    pub event_id: u16,
    pub satellite_id: u8,
    pub kind: SensorKind,
    /// 0..=2 for gyro/accel, ignored for impact.
    pub axis: u8,
    /// Device-local clock, milliseconds.
    pub start_timestamp: u32,
    pub samples: Vec<i16>,
}

/// Accumulates notification payloads per channel until a frame threshold is
/// reached. Notifications are small and a frame spans several of them, so
/// the raw bytes pile up here until `take_frame` can cut one loose.
#[derive(Default)]
pub struct Reassembler {
    pending: HashMap<Uuid, Vec<u8>>,
}

impl Reassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a notification payload to the channel's accumulation.
    pub fn append(&mut self, channel: Uuid, bytes: &[u8]) {
        self.pending.entry(channel).or_default().extend_from_slice(bytes);
    }

    /// True once the channel has enough bytes for at least a short frame.
    pub fn is_complete(&self, channel: Uuid) -> bool {
        self.pending
            .get(&channel)
            .map_or(false, |buf| buf.len() >= firmware::FRAME_COMPLETE_THRESHOLD)
    }

    /// Cuts a completed frame out of the channel buffer, picking the full
    /// layout when enough bytes arrived and the short one at exactly the
    /// threshold. The channel buffer resets to empty; bytes past the layout's
    /// wire length are dropped, not carried into the next frame.
    pub fn take_frame(&mut self, channel: Uuid) -> Option<(Vec<u8>, FrameLayout)> {
        let buf = self.pending.get_mut(&channel)?;
        let layout = if buf.len() >= firmware::LAYOUT_FULL.wire_len {
            firmware::LAYOUT_FULL
        } else if buf.len() == firmware::LAYOUT_SHORT.wire_len {
            firmware::LAYOUT_SHORT
        } else {
            return None;
        };

        let mut bytes = std::mem::take(buf);
        let excess = bytes.len() - layout.wire_len;
        if excess > 0 {
            log::warn!(
                "channel {channel}: dropping {excess} bytes past the {}-byte frame boundary",
                layout.wire_len
            );
        }
        bytes.truncate(layout.wire_len);
        Some((bytes, layout))
    }

    /// Bytes currently buffered for a channel.
    pub fn pending_len(&self, channel: Uuid) -> usize {
        self.pending.get(&channel).map_or(0, Vec::len)
    }
}

/// Decodes a completed buffer into a frame. Sample words are signed 16-bit;
/// the accelerometer streams little-endian, gyro and impact big-endian.
pub fn decode_frame(kind: SensorKind, buf: &[u8], layout: FrameLayout) -> Result<TelemetryFrame> {
    if buf.len() < firmware::FRAME_HEADER_LEN {
        return Err(Error::MalformedFrame {
            len: buf.len(),
            header: firmware::FRAME_HEADER_LEN,
        });
    }

    let event_id = u16::from_le_bytes([buf[0], buf[1]]);
    let satellite_id = buf[2];
    let axis = buf[3];
    let start_timestamp = u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]);

    let mut samples = Vec::with_capacity(layout.max_samples);
    let mut offset = layout.decode_start;
    while offset + 2 <= buf.len() && samples.len() < layout.max_samples {
        let word = [buf[offset], buf[offset + 1]];
        let value = match kind {
            SensorKind::Accel => i16::from_le_bytes(word),
            SensorKind::Gyro | SensorKind::Impact => i16::from_be_bytes(word),
        };
        samples.push(value);
        offset += 2;
    }

    Ok(TelemetryFrame {
        event_id,
        satellite_id,
        kind,
        axis,
        start_timestamp,
        samples,
    })
}
