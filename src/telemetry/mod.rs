mod assembler;
mod series;
mod types;

pub use assembler::{assemble, parse, Gate};
pub use series::{Interpolate, Interpolated, Sample, TimeSeries, MAX_INTERPOLATION_GAP_S};
pub use types::{
    offset_delta, Diagnostics, GeodeticCoordinate, GpsFix, InertialSample, ParsedLogData, TrackSpeed,
};
