// For now, this only has information about the firmware,
// not the firmware itself.

// Keep these in sync with the satellite firmware.

pub const DEFAULT_DEVICE_NAME: &str = "Dummy Data";

pub const USER_SERVICE_UUID: &str = "152f2e2d-2c2b-2a29-2827-262524232221";
pub const GYRO_SERVICE_UUID: &str = "100f0e0d-0c0b-0a09-0807-060504030201";
pub const ACCEL_SERVICE_UUID: &str = "201f1e1d-1c1b-1a19-1817-161514131211";
pub const IMPACT_SERVICE_UUID: &str = "302f2e2d-2c2b-2a29-2827-262524232221";

/// Fixed header shared by every frame: event id (u16 LE) at byte 0,
/// satellite id at 2, axis at 3, start timestamp (u32 LE) at 4.
pub const FRAME_HEADER_LEN: usize = 8;

/// How the sample region of a completed frame sits on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameLayout {
    /// Bytes consumed from the reassembly buffer.
    pub wire_len: usize,
    /// Byte offset of the first sample.
    pub decode_start: usize,
    /// Samples the layout carries; anything past this is padding.
    pub max_samples: usize,
}

/// Full frame: 14-byte preamble, 170 samples.
pub const LAYOUT_FULL: FrameLayout = FrameLayout {
    wire_len: 354,
    decode_start: 14,
    max_samples: 170,
};

/// Short frame: one preamble byte fewer, one sample fewer.
pub const LAYOUT_SHORT: FrameLayout = FrameLayout {
    wire_len: 353,
    decode_start: 13,
    max_samples: 169,
};

/// A channel is complete once it has accumulated at least this many bytes.
pub const FRAME_COMPLETE_THRESHOLD: usize = LAYOUT_SHORT.wire_len;

// Sampling rates (Hz), for consumers that label time axes.
pub const GYRO_SAMPLING_HZ: f64 = 2730.66;
pub const ACCEL_SAMPLING_HZ: f64 = 5120.0;
pub const IMPACT_SAMPLING_HZ: f64 = 5461.33;
