pub mod bluetooth;
pub mod calibration;
pub mod codec;
pub mod error;
pub mod firmware;
pub mod matrix;
pub mod protocol;
pub mod session;
pub mod timing;

pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::protocol::{SensorKind, TelemetryFrame};
    pub use crate::session::{FrameReport, Session};
    pub use crate::{bluetooth, calibration, codec, firmware, matrix, protocol, session, timing};

    #[derive(Clone)]
    pub struct App {
        pub verbose: u8,
        pub scantime: f32,
        pub device_name: String,
    }
}
