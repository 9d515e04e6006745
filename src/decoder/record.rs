use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;
use strum_macros::Display;

use super::sentence::Sentence;

const FPM_TO_MPS: f64 = 0.00508;
const KNOTS_TO_MPS: f64 = 0.514_444;
const KMH_TO_MPS: f64 = 1.0 / 3.6;

/// Internal state reported by the logger in `PSTA` sentences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum DeviceState {
    Idle,
    Armed,
    Flying,
    Landed,
    Unknown,
}

impl DeviceState {
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_ascii_uppercase().as_str() {
            "IDLE" | "0" => DeviceState::Idle,
            "ARMED" | "WAIT" | "1" => DeviceState::Armed,
            "FLYING" | "REC" | "2" => DeviceState::Flying,
            "LANDED" | "3" => DeviceState::Landed,
            _ => DeviceState::Unknown,
        }
    }
}

/// A decoded sentence.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Record {
    Version {
        format: String,
        firmware: Option<String>,
    },
    SurfaceReference {
        altitude_ft: f64,
    },
    StateTransition {
        time_ms: u64,
        state: DeviceState,
    },
    EnvironmentalSample {
        time_ms: u64,
        pressure_pa: f64,
        altitude_ft: f64,
        vertical_speed_mps: f64,
        temperature_c: Option<f64>,
    },
    InertialSample {
        time_ms: u64,
        accel_g: [f64; 3],
        gyro_dps: [f64; 3],
    },
    PositionFix {
        utc: NaiveTime,
        latitude: f64,
        longitude: f64,
        altitude_m: f64,
        quality: u8,
        satellites: u8,
    },
    TrackAndSpeed {
        utc: Option<NaiveTime>,
        date: Option<NaiveDate>,
        track_deg: f64,
        speed_mps: f64,
        valid: bool,
    },
    Threshold {
        name: String,
        value: f64,
    },
    Unknown {
        tag: String,
        fields: Vec<String>,
    },
}

impl Record {
    /// Interprets a checksummed sentence. `None` means the tag was recognised
    /// but its fields did not parse.
    pub fn from_sentence(sentence: &Sentence<'_>) -> Option<Record> {
        let tag = sentence.tag;
        match tag {
            "PVER" => Some(Record::Version {
                format: sentence.field(0)?.to_string(),
                firmware: sentence.field(1).map(String::from),
            }),
            "PSFC" => Some(Record::SurfaceReference {
                altitude_ft: sentence.f64_at(0)?,
            }),
            "PSTA" => Some(Record::StateTransition {
                time_ms: sentence.u64_at(0)?,
                state: DeviceState::from_code(sentence.field(1)?),
            }),
            "PENV" => Some(Record::EnvironmentalSample {
                time_ms: sentence.u64_at(0)?,
                pressure_pa: sentence.f64_at(1)?,
                altitude_ft: sentence.f64_at(2)?,
                vertical_speed_mps: sentence.f64_at(3)? * FPM_TO_MPS,
                temperature_c: sentence.f64_at(4),
            }),
            "PIMU" => Some(Record::InertialSample {
                time_ms: sentence.u64_at(0)?,
                accel_g: [
                    sentence.f64_at(1)?,
                    sentence.f64_at(2)?,
                    sentence.f64_at(3)?,
                ],
                gyro_dps: [
                    sentence.f64_at(4)?,
                    sentence.f64_at(5)?,
                    sentence.f64_at(6)?,
                ],
            }),
            "PTHR" => Some(Record::Threshold {
                name: sentence.field(0)?.to_string(),
                value: sentence.f64_at(1)?,
            }),
            _ if is_nmea(tag, "GGA") => parse_gga(sentence),
            _ if is_nmea(tag, "RMC") => parse_rmc(sentence),
            _ if is_nmea(tag, "VTG") => parse_vtg(sentence),
            _ => Some(Record::Unknown {
                tag: tag.to_string(),
                fields: sentence.fields.iter().map(|f| f.to_string()).collect(),
            }),
        }
    }

    /// Device clock of the record in milliseconds, for tags that carry one.
    pub fn device_time_ms(&self) -> Option<u64> {
        match self {
            Record::StateTransition { time_ms, .. }
            | Record::EnvironmentalSample { time_ms, .. }
            | Record::InertialSample { time_ms, .. } => Some(*time_ms),
            _ => None,
        }
    }
}

/// Two-letter talker followed by a sentence formatter, e.g. `GPGGA`, `GNRMC`.
fn is_nmea(tag: &str, formatter: &str) -> bool {
    tag.len() == 5 && tag.is_char_boundary(2) && &tag[2..] == formatter
}

fn parse_gga(s: &Sentence<'_>) -> Option<Record> {
    let utc = parse_utc(s.field(0)?)?;
    let quality: u8 = s.field(5)?.parse().ok()?;
    if quality == 0 {
        return Some(Record::PositionFix {
            utc,
            latitude: 0.0,
            longitude: 0.0,
            altitude_m: 0.0,
            quality,
            satellites: 0,
        });
    }
    Some(Record::PositionFix {
        utc,
        latitude: parse_coordinate(s.field(1)?, s.field(2)?)?,
        longitude: parse_coordinate(s.field(3)?, s.field(4)?)?,
        altitude_m: s.f64_at(8)?,
        quality,
        satellites: s.field(6).and_then(|v| v.parse().ok()).unwrap_or(0),
    })
}

fn parse_rmc(s: &Sentence<'_>) -> Option<Record> {
    let valid = s.field(1)? == "A";
    Some(Record::TrackAndSpeed {
        utc: s.field(0).and_then(parse_utc),
        date: s
            .field(8)
            .and_then(|d| NaiveDate::parse_from_str(d, "%d%m%y").ok()),
        track_deg: s.f64_at(7).unwrap_or(0.0),
        speed_mps: s.f64_at(6).unwrap_or(0.0) * KNOTS_TO_MPS,
        valid,
    })
}

fn parse_vtg(s: &Sentence<'_>) -> Option<Record> {
    let track_deg = s.f64_at(0)?;
    let speed_mps = match s.f64_at(6) {
        Some(kmh) => kmh * KMH_TO_MPS,
        None => s.f64_at(4)? * KNOTS_TO_MPS,
    };
    Some(Record::TrackAndSpeed {
        utc: None,
        date: None,
        track_deg,
        speed_mps,
        valid: true,
    })
}

/// `hhmmss[.sss]` UTC time of day.
fn parse_utc(value: &str) -> Option<NaiveTime> {
    if value.len() < 6 || !value.is_ascii() {
        return None;
    }
    let hour: u32 = value[0..2].parse().ok()?;
    let minute: u32 = value[2..4].parse().ok()?;
    let seconds: f64 = value[4..].parse().ok()?;
    let whole = seconds.trunc();
    let millis = ((seconds - whole) * 1000.0).round() as u32;
    NaiveTime::from_hms_milli_opt(hour, minute, whole as u32, millis.min(999))
}

/// `ddmm.mmmm` / `dddmm.mmmm` plus hemisphere into signed degrees.
fn parse_coordinate(value: &str, hemisphere: &str) -> Option<f64> {
    let raw: f64 = value.parse().ok()?;
    let degrees = (raw / 100.0).trunc();
    let minutes = raw - degrees * 100.0;
    let decimal = degrees + minutes / 60.0;
    match hemisphere {
        "N" | "E" => Some(decimal),
        "S" | "W" => Some(-decimal),
        _ => None,
    }
}
