use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveTime, Timelike};
use strum_macros::Display;

use super::series::TimeSeries;
use super::types::{
    offset_delta, Diagnostics, GeodeticCoordinate, GpsFix, InertialSample, ParsedLogData,
    TrackSpeed,
};
use crate::decoder::{decode, DecodeStats, DeviceState, LogError, Record, Records};

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Recording gate. Only `StateTransition` records move it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Gate {
    Idle,
    Recording,
}

impl Gate {
    pub fn on_state(self, state: DeviceState) -> Gate {
        match state {
            DeviceState::Flying => Gate::Recording,
            _ => Gate::Idle,
        }
    }
}

/// Maps GNSS UTC time-of-day onto the device clock, anchored at the first valid fix.
#[derive(Debug, Clone, Copy)]
struct GnssClock {
    anchor_utc_s: f64,
    anchor_offset_s: f64,
}

impl GnssClock {
    fn offset_for(&self, utc: NaiveTime) -> f64 {
        let mut delta = seconds_of_day(utc) - self.anchor_utc_s;
        if delta < -SECONDS_PER_DAY / 2.0 {
            delta += SECONDS_PER_DAY;
        } else if delta > SECONDS_PER_DAY / 2.0 {
            delta -= SECONDS_PER_DAY;
        }
        self.anchor_offset_s + delta
    }
}

fn seconds_of_day(utc: NaiveTime) -> f64 {
    utc.num_seconds_from_midnight() as f64 + utc.nanosecond() as f64 / 1e9
}

/// Fold state for one log.
#[derive(Debug)]
struct Assembler {
    gate: Gate,
    /// Latest device clock seen, seconds.
    clock_s: f64,
    gnss: Option<GnssClock>,
    last_gnss_offset: Option<f64>,
    first_dated: Option<(NaiveDate, NaiveTime)>,
    altitude: TimeSeries<f64>,
    vertical_speed: TimeSeries<f64>,
    gps: TimeSeries<GpsFix>,
    track: TimeSeries<TrackSpeed>,
    inertial: TimeSeries<InertialSample>,
    format_version: Option<String>,
    firmware: Option<String>,
    surface_altitude_ft: Option<f64>,
    thresholds: BTreeMap<String, f64>,
    gated: usize,
    out_of_order: usize,
}

impl Assembler {
    fn new() -> Self {
        Self {
            gate: Gate::Idle,
            clock_s: 0.0,
            gnss: None,
            last_gnss_offset: None,
            first_dated: None,
            altitude: TimeSeries::new(),
            vertical_speed: TimeSeries::new(),
            gps: TimeSeries::new(),
            track: TimeSeries::new(),
            inertial: TimeSeries::new(),
            format_version: None,
            firmware: None,
            surface_altitude_ft: None,
            thresholds: BTreeMap::new(),
            gated: 0,
            out_of_order: 0,
        }
    }

    fn accepting_samples(&self) -> bool {
        self.gate == Gate::Recording && self.gnss.is_some()
    }

    fn tally(&mut self, pushed: bool) {
        if !pushed {
            self.out_of_order += 1;
        }
    }

    fn apply(mut self, record: Record) -> Self {
        if let Some(ms) = record.device_time_ms() {
            self.clock_s = ms as f64 / 1000.0;
        }

        match record {
            Record::Version { format, firmware } => {
                self.format_version = Some(format);
                self.firmware = firmware;
            }
            Record::SurfaceReference { altitude_ft } => {
                self.surface_altitude_ft = Some(altitude_ft);
            }
            Record::StateTransition { state, .. } => {
                let next = self.gate.on_state(state);
                if next != self.gate {
                    log::debug!("Gate {} -> {} at {:.3}s ({})", self.gate, next, self.clock_s, state);
                }
                self.gate = next;
            }
            Record::EnvironmentalSample {
                altitude_ft,
                vertical_speed_mps,
                ..
            } => {
                if !self.accepting_samples() {
                    self.gated += 1;
                    return self;
                }
                let offset = self.clock_s;
                let pushed = self.altitude.push(offset, altitude_ft)
                    && self.vertical_speed.push(offset, vertical_speed_mps);
                self.tally(pushed);
            }
            Record::InertialSample {
                accel_g, gyro_dps, ..
            } => {
                if !self.accepting_samples() {
                    self.gated += 1;
                    return self;
                }
                let offset = self.clock_s;
                let pushed = self
                    .inertial
                    .push(offset, InertialSample { accel_g, gyro_dps });
                self.tally(pushed);
            }
            Record::PositionFix {
                utc,
                latitude,
                longitude,
                altitude_m,
                quality,
                satellites,
            } => {
                if quality == 0 {
                    return self;
                }
                let clock = *self.gnss.get_or_insert(GnssClock {
                    anchor_utc_s: seconds_of_day(utc),
                    anchor_offset_s: self.clock_s,
                });
                let offset = clock.offset_for(utc);
                self.last_gnss_offset = Some(offset);
                let fix = GpsFix {
                    position: GeodeticCoordinate::new(latitude, longitude, altitude_m),
                    quality,
                    satellites,
                };
                let pushed = self.gps.push(offset, fix);
                self.tally(pushed);
            }
            Record::TrackAndSpeed {
                utc,
                date,
                track_deg,
                speed_mps,
                valid,
            } => {
                if let (Some(date), Some(utc), None) = (date, utc, self.first_dated) {
                    self.first_dated = Some((date, utc));
                }
                if !valid {
                    return self;
                }
                let offset = match (utc, self.gnss) {
                    (Some(utc), Some(clock)) => Some(clock.offset_for(utc)),
                    (None, Some(_)) => self.last_gnss_offset,
                    _ => None,
                };
                if let Some(offset) = offset {
                    let pushed = self.track.push(
                        offset,
                        TrackSpeed {
                            track_deg: track_deg.rem_euclid(360.0),
                            speed_mps,
                        },
                    );
                    self.tally(pushed);
                }
            }
            Record::Threshold { name, value } => {
                self.thresholds.insert(name, value);
            }
            Record::Unknown { .. } => {}
        }
        self
    }

    fn finish(self, stats: DecodeStats) -> ParsedLogData {
        let start_time = match (self.first_dated, self.gnss) {
            (Some((date, utc)), Some(clock)) => {
                let absolute = date.and_time(utc).and_utc();
                let start = offset_delta(clock.offset_for(utc))
                    .and_then(|offset| absolute.checked_sub_signed(offset));
                if start.is_none() {
                    log::warn!("Device clock out of range; log has no absolute start time");
                }
                start
            }
            _ => None,
        };

        let has_gps = !self.gps.is_empty();
        let error = if stats.records == 0 {
            Some("No usable records found in log".to_string())
        } else if !has_gps {
            Some("No GPS position fixes found".to_string())
        } else if self.altitude.is_empty() {
            Some("No samples recorded while device was flying".to_string())
        } else {
            None
        };

        let span = self.altitude.span().or_else(|| self.gps.span());
        let duration_s = span.map(|(first, last)| last - first).unwrap_or(0.0);
        let sample_rate_hz = if self.altitude.len() > 1 && duration_s > 0.0 {
            (self.altitude.len() - 1) as f64 / duration_s
        } else {
            0.0
        };

        let diagnostics = Diagnostics {
            decode: stats,
            gated: self.gated,
            out_of_order: self.out_of_order,
        };

        match &error {
            Some(message) => log::warn!("Log has no valid data: {}", message),
            None => log::info!(
                "Assembled {} barometric and {} GPS samples over {:.1}s ({:.1} Hz)",
                self.altitude.len(),
                self.gps.len(),
                duration_s,
                sample_rate_hz
            ),
        }
        log::debug!("Log diagnostics: {:?}", diagnostics);

        ParsedLogData {
            start_time,
            duration_s,
            sample_rate_hz,
            altitude: self.altitude,
            vertical_speed: self.vertical_speed,
            gps: self.gps,
            track: self.track,
            inertial: self.inertial,
            has_gps,
            has_valid_data: error.is_none(),
            error,
            format_version: self.format_version,
            firmware: self.firmware,
            surface_altitude_ft: self.surface_altitude_ft,
            thresholds: self.thresholds,
            diagnostics,
        }
    }
}

/// Folds a record stream into [`ParsedLogData`]. Never fails; problems are
/// reported through `has_valid_data` and `error`.
pub fn assemble(mut records: Records<'_>) -> ParsedLogData {
    let assembler = records.by_ref().fold(Assembler::new(), Assembler::apply);
    assembler.finish(records.stats())
}

/// Buffer checks, decode and assembly in one step.
pub fn parse(buffer: &[u8]) -> Result<ParsedLogData, LogError> {
    Ok(assemble(decode(buffer)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{pad, sentence, LogBuilder};
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_unrecognised_lines_only() {
        let text = pad("hello\nworld\n# not a sentence\n".to_string());
        let parsed = parse(text.as_bytes()).unwrap();
        assert!(!parsed.has_valid_data);
        assert!(!parsed.has_gps);
        assert_eq!(parsed.entries(), 0);
        assert_eq!(parsed.error.as_deref(), Some("No usable records found in log"));
    }

    #[test]
    fn test_buffer_errors_propagate() {
        assert_eq!(parse(b"").unwrap_err(), LogError::Empty);
        assert_eq!(parse(b"12345").unwrap_err(), LogError::TooSmall);
    }

    #[test]
    fn test_gate_discards_samples_before_flying_and_fix() {
        let log = LogBuilder::new()
            .line("PVER,2,1.4.0")
            .line("PSFC,1200")
            // Flying but no fix yet
            .line("PSTA,0,FLYING")
            .env(100, 5000.0, 0.0)
            // Fix arrives, gate opens
            .fix("120000.20", 47.0, 8.0, 1500.0)
            .env(300, 5001.0, 0.0)
            .imu(300)
            // Back to idle closes the gate
            .line("PSTA,400,LANDED")
            .env(500, 5002.0, 0.0)
            .imu(500)
            .build();

        let parsed = parse(log.as_bytes()).unwrap();
        assert!(parsed.has_valid_data, "{:?}", parsed.error);
        assert_eq!(parsed.altitude.len(), 1);
        assert_eq!(parsed.altitude.first().unwrap().offset, 0.3);
        assert_eq!(parsed.inertial.len(), 1);
        assert_eq!(parsed.diagnostics.gated, 3);
        assert_eq!(parsed.surface_altitude_ft, Some(1200.0));
        assert_eq!(parsed.format_version.as_deref(), Some("2"));
        assert_eq!(parsed.firmware.as_deref(), Some("1.4.0"));
    }

    #[test]
    fn test_no_fix_means_no_valid_data() {
        let log = LogBuilder::new()
            .line("PSTA,0,FLYING")
            .env(100, 5000.0, 0.0)
            .env(200, 5000.0, 0.0)
            .build();
        let parsed = parse(log.as_bytes()).unwrap();
        assert!(!parsed.has_valid_data);
        assert!(!parsed.has_gps);
        assert_eq!(parsed.entries(), 0);
        assert_eq!(parsed.diagnostics.gated, 2);
        assert_eq!(parsed.error.as_deref(), Some("No GPS position fixes found"));
    }

    #[test]
    fn test_gnss_offsets_follow_device_clock() {
        let log = LogBuilder::new()
            .line("PSTA,10000,FLYING")
            .fix("235959.50", 47.0, 8.0, 1500.0)
            .fix("000000.00", 47.0, 8.0, 1490.0)
            .line("GPRMC,000000.00,A,4700.0000,N,00800.0000,E,20.0,90.0,190926,,,A")
            .env(10600, 4900.0, -10.0)
            .build();

        let parsed = parse(log.as_bytes()).unwrap();
        let offsets: Vec<f64> = parsed.gps.iter().map(|s| s.offset).collect();
        assert_eq!(offsets.len(), 2);
        assert!((offsets[0] - 10.0).abs() < 1e-6);
        assert!((offsets[1] - 10.5).abs() < 1e-6);

        let track = parsed.track.first().unwrap();
        assert!((track.offset - 10.5).abs() < 1e-6);
        assert_eq!(track.value.track_deg, 90.0);

        // 2026-09-19 00:00:00 is 10.5 s into the log
        let expected = Utc.with_ymd_and_hms(2026, 9, 18, 23, 59, 49).unwrap()
            + chrono::Duration::milliseconds(500);
        assert_eq!(parsed.start_time, Some(expected));
        assert_eq!(parsed.absolute_time(10.5), Utc.with_ymd_and_hms(2026, 9, 19, 0, 0, 0).single());
    }

    #[test]
    fn test_device_clock_out_of_range_drops_start_time() {
        for clock_ms in ["18000000000000000000", "1000000000000000000"] {
            let log = LogBuilder::new()
                .line(&format!("PSTA,{},FLYING", clock_ms))
                .fix("120000.00", 47.0, 8.0, 1500.0)
                .line("GPRMC,120000.00,A,4700.0000,N,00800.0000,E,20.0,90.0,190926,,,A")
                .build();
            let parsed = parse(log.as_bytes()).unwrap();
            assert!(parsed.has_gps);
            assert_eq!(parsed.start_time, None, "clock {}", clock_ms);
            assert_eq!(parsed.absolute_time(1.0), None);
        }
    }

    #[test]
    fn test_sample_rate_and_duration() {
        let mut builder = LogBuilder::new()
            .line("PSTA,0,FLYING")
            .fix("120000.00", 47.0, 8.0, 1500.0);
        for i in 0..=40 {
            builder = builder.env(i * 250, 5000.0, 0.0);
        }
        let parsed = parse(builder.build().as_bytes()).unwrap();
        assert_eq!(parsed.entries(), 41);
        assert!((parsed.duration_s - 10.0).abs() < 1e-9);
        assert!((parsed.sample_rate_hz - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_thresholds_and_unknown_records() {
        let log = pad(
            [sentence("PTHR,exit_fpm,2200"), sentence("PZZZ,1,2")].join("\n"),
        );
        let parsed = parse(log.as_bytes()).unwrap();
        assert_eq!(parsed.thresholds.get("exit_fpm"), Some(&2200.0));
        assert_eq!(parsed.diagnostics.decode.unknown, 1);
    }

    #[test]
    fn test_gate_transitions() {
        assert_eq!(Gate::Idle.on_state(DeviceState::Flying), Gate::Recording);
        assert_eq!(Gate::Recording.on_state(DeviceState::Armed), Gate::Idle);
        assert_eq!(Gate::Recording.on_state(DeviceState::Unknown), Gate::Idle);
    }
}
