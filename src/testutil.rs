//! Builders for checksummed sentences and synthetic logs.

use crate::decoder::{checksum, MIN_LOG_BYTES};

/// Wraps a sentence body as `$body*CK`.
pub fn sentence(body: &str) -> String {
    format!("${}*{:02X}", body, checksum(body.as_bytes()))
}

/// Appends comment lines until the buffer clears the minimum size check.
pub fn pad(mut text: String) -> String {
    while text.len() < MIN_LOG_BYTES {
        text.push_str("\n# padding ##########################");
    }
    text.push('\n');
    text
}

fn nmea_coordinate(value: f64, positive: char, negative: char, width: usize) -> (String, char) {
    let abs = value.abs();
    let degrees = abs.trunc();
    let minutes = (abs - degrees) * 60.0;
    let text = format!("{:0width$}{:09.6}", degrees as u32, minutes, width = width);
    (text, if value < 0.0 { negative } else { positive })
}

#[derive(Debug, Default)]
pub struct LogBuilder {
    lines: Vec<String>,
}

impl LogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn line(mut self, body: &str) -> Self {
        self.lines.push(sentence(body));
        self
    }

    pub fn env(self, time_ms: u64, altitude_ft: f64, vertical_fpm: f64) -> Self {
        self.line(&format!(
            "PENV,{},95000,{:.2},{:.2},15.0",
            time_ms, altitude_ft, vertical_fpm
        ))
    }

    pub fn imu(self, time_ms: u64) -> Self {
        self.line(&format!("PIMU,{},0.01,-0.02,1.00,0.5,0.1,-0.3", time_ms))
    }

    pub fn fix(self, utc: &str, latitude: f64, longitude: f64, altitude_m: f64) -> Self {
        let (lat, ns) = nmea_coordinate(latitude, 'N', 'S', 2);
        let (lon, ew) = nmea_coordinate(longitude, 'E', 'W', 3);
        self.line(&format!(
            "GPGGA,{},{},{},{},{},1,10,0.8,{:.1},M,48.0,M,,",
            utc, lat, ns, lon, ew, altitude_m
        ))
    }

    pub fn build(self) -> String {
        pad(self.lines.join("\n"))
    }
}
