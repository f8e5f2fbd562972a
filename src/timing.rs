use crate::matrix::SATELLITES;
use crate::protocol::SensorKind;

pub const KINDS: usize = 3;
pub const SLOTS: usize = SATELLITES * KINDS;

/// Raw and normalized per-satellite-per-kind start timestamps.
///
/// Each satellite owns three consecutive slots (gyro, accel, impact). The
/// raw value is the first start timestamp seen for that slot and is never
/// overwritten; 0 doubles as the empty sentinel, since a device clock reads
/// 0 only at the boot instant. Once all five satellites of a kind have
/// reported, the group minimum is subtracted from every normalized value so
/// the earliest satellite sits at t=0. An explicit per-group flag makes the
/// pass run exactly once; no guessing from timestamp magnitudes.
#[derive(Clone, Debug, Default)]
pub struct StartTimeRegistry {
    raw: [u32; SLOTS],
    normalized: [u32; SLOTS],
    group_normalized: [bool; KINDS],
}

/// Registry slot for a satellite/kind pair.
pub fn slot(satellite_id: u8, kind: SensorKind) -> usize {
    (satellite_id as usize - 1) * KINDS + kind.slot()
}

impl StartTimeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the first start timestamp for a satellite/kind pair, then
    /// normalizes the kind's group if this completed it. Later observations
    /// for an already-captured slot are ignored.
    pub fn observe(&mut self, satellite_id: u8, kind: SensorKind, timestamp: u32) {
        if !(1..=SATELLITES as u8).contains(&satellite_id) {
            return;
        }
        let s = slot(satellite_id, kind);
        if self.raw[s] != 0 {
            return;
        }
        self.raw[s] = timestamp;
        self.normalized[s] = timestamp;
        self.normalize_group(kind);
    }

    fn normalize_group(&mut self, kind: SensorKind) {
        let g = kind.slot();
        if self.group_normalized[g] {
            return;
        }
        let slots: Vec<usize> = (0..SATELLITES).map(|sat| sat * KINDS + g).collect();
        if slots.iter().any(|&s| self.raw[s] == 0) {
            return;
        }
        let min = slots.iter().map(|&s| self.normalized[s]).min().unwrap_or(0);
        for &s in &slots {
            self.normalized[s] -= min;
        }
        self.group_normalized[g] = true;
        log::info!(
            "normalized {} start times, group minimum {min} ms",
            kind.label()
        );
    }

    pub fn raw(&self) -> &[u32; SLOTS] {
        &self.raw
    }

    pub fn normalized(&self) -> &[u32; SLOTS] {
        &self.normalized
    }

    /// Wholesale overwrite from a persisted file. Groups with all five raw
    /// values present are treated as already normalized.
    pub fn replace(&mut self, raw: [u32; SLOTS], normalized: [u32; SLOTS]) {
        self.raw = raw;
        self.normalized = normalized;
        for g in 0..KINDS {
            self.group_normalized[g] =
                (0..SATELLITES).all(|sat| self.raw[sat * KINDS + g] != 0);
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_normalizes_once_all_five_report() {
        let mut reg = StartTimeRegistry::new();
        let raws = [100u32, 50, 75, 120, 90];
        for (i, &ts) in raws.iter().enumerate().take(4) {
            reg.observe(i as u8 + 1, SensorKind::Gyro, ts);
            // Until the fifth satellite, normalized mirrors raw.
            assert_eq!(reg.normalized()[slot(i as u8 + 1, SensorKind::Gyro)], ts);
        }
        reg.observe(5, SensorKind::Gyro, raws[4]);

        let got: Vec<u32> = (1..=5u8)
            .map(|sat| reg.normalized()[slot(sat, SensorKind::Gyro)])
            .collect();
        assert_eq!(got, vec![50, 0, 25, 70, 40]);
        // Raw values stay untouched.
        let raw: Vec<u32> = (1..=5u8)
            .map(|sat| reg.raw()[slot(sat, SensorKind::Gyro)])
            .collect();
        assert_eq!(raw, raws.to_vec());
    }

    #[test]
    fn normalization_is_idempotent() {
        let mut reg = StartTimeRegistry::new();
        for (i, ts) in [100u32, 50, 75, 120, 90].into_iter().enumerate() {
            reg.observe(i as u8 + 1, SensorKind::Gyro, ts);
        }
        let after_first = *reg.normalized();
        // Duplicate frames with fresh timestamps must not re-capture or
        // re-subtract. A small delta (below any old magnitude heuristic)
        // must also leave things alone.
        reg.observe(2, SensorKind::Gyro, 999);
        reg.observe(1, SensorKind::Gyro, 3);
        assert_eq!(*reg.normalized(), after_first);
    }

    #[test]
    fn first_timestamp_wins() {
        let mut reg = StartTimeRegistry::new();
        reg.observe(1, SensorKind::Accel, 500);
        reg.observe(1, SensorKind::Accel, 900);
        assert_eq!(reg.raw()[slot(1, SensorKind::Accel)], 500);
    }

    #[test]
    fn groups_normalize_independently() {
        let mut reg = StartTimeRegistry::new();
        for sat in 1..=5u8 {
            reg.observe(sat, SensorKind::Impact, 1000 + sat as u32);
        }
        // Impact is normalized, gyro untouched.
        assert_eq!(reg.normalized()[slot(1, SensorKind::Impact)], 0);
        assert_eq!(reg.normalized()[slot(5, SensorKind::Impact)], 4);
        reg.observe(1, SensorKind::Gyro, 77);
        assert_eq!(reg.normalized()[slot(1, SensorKind::Gyro)], 77);
    }

    #[test]
    fn replace_marks_complete_groups_normalized() {
        let mut reg = StartTimeRegistry::new();
        let mut raw = [0u32; SLOTS];
        let mut norm = [0u32; SLOTS];
        for sat in 0..SATELLITES {
            raw[sat * KINDS] = 1000 + sat as u32; // gyro slots full
            norm[sat * KINDS] = sat as u32;
        }
        reg.replace(raw, norm);
        // A later gyro observation must not disturb the loaded values.
        reg.observe(3, SensorKind::Gyro, 42);
        assert_eq!(reg.raw()[slot(3, SensorKind::Gyro)], 1002);
        assert_eq!(reg.normalized()[slot(3, SensorKind::Gyro)], 2);
    }
}
