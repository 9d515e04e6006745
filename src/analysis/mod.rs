pub mod events;
pub mod fall_rate;
mod summary;

pub use events::{detect_events, Detection, DetectorConfig, EventDetector, JumpEvent};
pub use fall_rate::{correction_factor, normalize_fall_rate, CALIBRATION_TABLE};
pub use summary::{analyze, fall_rate_series, JumpAnalysis};
