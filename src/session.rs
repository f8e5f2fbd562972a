use std::collections::BTreeMap;

use uuid::Uuid;

use crate::calibration;
use crate::codec;
use crate::error::Result;
use crate::matrix::{SensorMatrix, ROWS};
use crate::protocol::{self, Reassembler, SensorKind};
use crate::timing::{StartTimeRegistry, SLOTS};

/// What a completed frame did to the session, for logging and verbose output.
#[derive(Clone, Debug)]
pub struct FrameReport {
    pub event_id: u16,
    pub satellite_id: u8,
    pub kind: SensorKind,
    pub column: usize,
    pub samples_stored: usize,
}

/// One capture session: the reassembly buffers, the sample matrix and the
/// start-time registry, owned together and mutated only through `ingest`.
/// All notifications funnel through a single caller (one channel consumer),
/// which is what keeps the at-most-one-writer-per-frame rule without a lock.
#[derive(Default)]
pub struct Session {
    reassembler: Reassembler,
    matrix: SensorMatrix,
    registry: StartTimeRegistry,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one notification payload in. Returns `Ok(None)` while the
    /// channel is still accumulating, `Ok(Some(report))` when a frame
    /// completed and was stored. Errors are per-frame; the session stays
    /// usable and the caller is expected to log and continue.
    pub fn ingest(
        &mut self,
        kind: SensorKind,
        channel: Uuid,
        payload: &[u8],
    ) -> Result<Option<FrameReport>> {
        self.reassembler.append(channel, payload);
        let Some((bytes, layout)) = self.reassembler.take_frame(channel) else {
            return Ok(None);
        };

        let frame = protocol::decode_frame(kind, &bytes, layout)?;
        let (column, scaled) = calibration::map_and_scale(&frame)?;
        self.matrix.write(column, &scaled)?;
        self.registry
            .observe(frame.satellite_id, kind, frame.start_timestamp);

        Ok(Some(FrameReport {
            event_id: frame.event_id,
            satellite_id: frame.satellite_id,
            kind,
            column,
            samples_stored: scaled.len().min(ROWS),
        }))
    }

    /// Column-keyed view of the whole matrix; refreshed per decoded frame.
    pub fn snapshot(&self) -> BTreeMap<String, Vec<f64>> {
        self.matrix.snapshot()
    }

    pub fn export_csv(&self) -> Result<String> {
        codec::export_csv(&self.matrix, self.registry.raw(), self.registry.normalized())
    }

    /// Replaces matrix and registry wholesale from a persisted file. Runs on
    /// `&mut self`, so it can never interleave with live decoding; on any
    /// parse error the current state is left untouched.
    pub fn import_csv(&mut self, text: &str) -> Result<()> {
        let imported = codec::import_csv(text)?;
        self.matrix.replace(imported.matrix);
        self.registry.replace(imported.raw, imported.normalized);
        Ok(())
    }

    pub fn matrix(&self) -> &SensorMatrix {
        &self.matrix
    }

    pub fn start_times_raw(&self) -> &[u32; SLOTS] {
        self.registry.raw()
    }

    pub fn start_times_normalized(&self) -> &[u32; SLOTS] {
        self.registry.normalized()
    }
}
