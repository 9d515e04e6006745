use std::time::Duration;

use serde::Serialize;

use crate::telemetry::{ParsedLogData, Sample, TimeSeries};

const MPS_TO_FPM: f64 = 196.850_394;
const STANDARD_GRAVITY: f64 = 9.806_65;
const EPSILON_S: f64 = 1e-9;

/// Thresholds for the window rules. Empirical, tune per device/firmware.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorConfig {
    pub exit_descent_fpm: f64,
    pub exit_window: Duration,
    pub deployment_decel_g: f64,
    pub deployment_window: Duration,
    /// Descent below this after exit marks the canopy as open.
    pub canopy_descent_fpm: f64,
    pub landing_descent_fpm: f64,
    pub landing_window: Duration,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            exit_descent_fpm: 2000.0,
            exit_window: Duration::from_secs(1),
            deployment_decel_g: 0.25,
            deployment_window: Duration::from_millis(100),
            canopy_descent_fpm: 2000.0,
            landing_descent_fpm: 100.0,
            landing_window: Duration::from_secs(10),
        }
    }
}

/// Detected offsets, seconds from log start.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct JumpEvent {
    pub exit_offset: Option<f64>,
    /// Deployment activation, or canopy completion when no activation was seen.
    pub deployment_offset: Option<f64>,
    pub canopy_offset: Option<f64>,
    pub landing_offset: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Detection {
    pub events: JumpEvent,
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct EventDetector {
    config: DetectorConfig,
}

fn descent_fpm(vertical_speed_mps: f64) -> f64 {
    -vertical_speed_mps * MPS_TO_FPM
}

/// Start offset of the first run of qualifying points spanning at least `span_s`.
fn first_sustained(points: impl Iterator<Item = (f64, f64, bool)>, span_s: f64) -> Option<f64> {
    let mut run_start: Option<f64> = None;
    for (start, end, holds) in points {
        if !holds {
            run_start = None;
            continue;
        }
        let from = *run_start.get_or_insert(start);
        if end - from + EPSILON_S >= span_s {
            return Some(from);
        }
    }
    None
}

impl EventDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Runs every rule over a vertical-speed series (m/s, positive up).
    pub fn detect(&self, vertical_speed: &TimeSeries<f64>) -> Detection {
        let mut notes = Vec::new();
        let samples = vertical_speed.samples();

        if samples.is_empty() {
            notes.push("No vertical speed samples; no events detected".to_string());
            return Detection {
                events: JumpEvent::default(),
                notes,
            };
        }

        let exit = self.detect_exit(samples);
        if exit.is_none() {
            notes.push(format!(
                "Exit not detected: descent never exceeded {:.0} ft/min for {:.1}s",
                self.config.exit_descent_fpm,
                self.config.exit_window.as_secs_f64()
            ));
        }

        let activation = exit.and_then(|exit| self.detect_activation(samples, exit));
        let canopy = exit.and_then(|exit| self.detect_canopy(samples, exit));
        let deployment = match (exit, activation, canopy) {
            (None, _, _) => None,
            (Some(_), Some(activation), _) => Some(activation),
            (Some(_), None, Some(canopy)) => {
                notes.push(format!(
                    "Deployment activation not detected (no {:.2} g deceleration); using canopy opening",
                    self.config.deployment_decel_g
                ));
                Some(canopy)
            }
            (Some(_), None, None) => {
                notes.push("Deployment not detected after exit".to_string());
                None
            }
        };

        let landing_from = deployment.or(exit);
        let landing = self.detect_landing(samples, landing_from);
        if landing.is_none() {
            notes.push(format!(
                "Landing not detected: descent never stayed below {:.0} ft/min for {:.0}s",
                self.config.landing_descent_fpm,
                self.config.landing_window.as_secs_f64()
            ));
        }

        for note in &notes {
            log::debug!("{}", note);
        }

        Detection {
            events: JumpEvent {
                exit_offset: exit,
                deployment_offset: deployment,
                canopy_offset: canopy,
                landing_offset: landing,
            },
            notes,
        }
    }

    pub fn detect_exit(&self, samples: &[Sample<f64>]) -> Option<f64> {
        let threshold = self.config.exit_descent_fpm;
        first_sustained(
            samples
                .iter()
                .map(|s| (s.offset, s.offset, descent_fpm(s.value) > threshold)),
            self.config.exit_window.as_secs_f64(),
        )
    }

    /// Sustained deceleration of the descent after exit.
    pub fn detect_activation(&self, samples: &[Sample<f64>], exit: f64) -> Option<f64> {
        let threshold = self.config.deployment_decel_g * STANDARD_GRAVITY;
        let start = samples.partition_point(|s| s.offset < exit);
        let intervals = samples[start..]
            .windows(2)
            .filter(|pair| pair[1].offset > pair[0].offset)
            .map(|pair| {
                let dt = pair[1].offset - pair[0].offset;
                // Descent rate dropping means the jumper is slowing down
                let decel = (pair[1].value - pair[0].value) / dt;
                (pair[0].offset, pair[1].offset, decel >= threshold)
            });
        first_sustained(intervals, self.config.deployment_window.as_secs_f64())
    }

    /// First sample after exit whose descent drops back below the canopy threshold.
    pub fn detect_canopy(&self, samples: &[Sample<f64>], exit: f64) -> Option<f64> {
        let threshold = self.config.canopy_descent_fpm;
        samples
            .iter()
            .filter(|s| s.offset > exit)
            .find(|s| descent_fpm(s.value) < threshold)
            .map(|s| s.offset)
    }

    pub fn detect_landing(&self, samples: &[Sample<f64>], after: Option<f64>) -> Option<f64> {
        let threshold = self.config.landing_descent_fpm;
        let start = after.map_or(0, |t| samples.partition_point(|s| s.offset < t));
        first_sustained(
            samples[start..]
                .iter()
                .map(|s| (s.offset, s.offset, descent_fpm(s.value) < threshold)),
            self.config.landing_window.as_secs_f64(),
        )
    }
}

/// Runs event detection over a parsed log's vertical-speed series.
pub fn detect_events(data: &ParsedLogData, config: &DetectorConfig) -> Detection {
    EventDetector::new(config.clone()).detect(&data.vertical_speed)
}
