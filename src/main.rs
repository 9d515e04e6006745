use std::fs;
use std::path::Path;
use std::process::ExitCode;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use uuid::Uuid;

use jumplog::analysis::{analyze, JumpAnalysis};
use jumplog::formation::{FormationGroup, FormationGrouper, JumpRecord};
use jumplog::projection::{default_origin, ParticipantData, Projector};
use jumplog::telemetry::Diagnostics;
use jumplog::{parse, validate, Config, ParsedLogData};

#[derive(Parser)]
#[command(name = "jumplog")]
#[command(about = "Skydiving altimeter log analysis")]
struct Cli {
    /// YAML file with detection, formation and projection settings
    #[arg(long, global = true)]
    config: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check whether a log file is acceptable
    Validate { log: String },
    /// Decode a log and print its summary
    Parse {
        log: String,
        /// Include every time series in the output
        #[arg(long)]
        series: bool,
    },
    /// Detect jump events and fall rates
    Analyze { log: String },
    /// Group logs into formations by start time
    Group {
        #[arg(required = true)]
        logs: Vec<String>,
    },
    /// Positions of every jumper relative to a base jumper
    Project {
        #[arg(required = true)]
        logs: Vec<String>,
        /// Index of the base jumper among the given logs
        #[arg(long, default_value_t = 0)]
        base: usize,
        /// RFC 3339 instant, or T+<duration> from the base log start
        #[arg(long)]
        at: String,
    },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match Config::from_file(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Config error: {}", e);
                return ExitCode::FAILURE;
            }
        },
        None => Config::default(),
    };

    match cli.command {
        Commands::Validate { log } => validate_log(&log),
        Commands::Parse { log, series } => parse_log(&log, series),
        Commands::Analyze { log } => analyze_log(&log, &config),
        Commands::Group { logs } => group_logs(&logs, &config),
        Commands::Project { logs, base, at } => project_logs(&logs, base, &at, &config),
    }
}

#[derive(Serialize)]
struct LogSummary<'a> {
    start_time: Option<DateTime<Utc>>,
    duration_s: f64,
    sample_rate_hz: f64,
    entries: usize,
    has_gps: bool,
    has_valid_data: bool,
    error: Option<&'a str>,
    format_version: Option<&'a str>,
    firmware: Option<&'a str>,
    surface_altitude_ft: Option<f64>,
    diagnostics: Diagnostics,
}

impl<'a> From<&'a ParsedLogData> for LogSummary<'a> {
    fn from(data: &'a ParsedLogData) -> Self {
        Self {
            start_time: data.start_time,
            duration_s: data.duration_s,
            sample_rate_hz: data.sample_rate_hz,
            entries: data.entries(),
            has_gps: data.has_gps,
            has_valid_data: data.has_valid_data,
            error: data.error.as_deref(),
            format_version: data.format_version.as_deref(),
            firmware: data.firmware.as_deref(),
            surface_altitude_ft: data.surface_altitude_ft,
            diagnostics: data.diagnostics,
        }
    }
}

#[derive(Serialize)]
struct NamedAnalysis<'a> {
    log: &'a str,
    start_time: Option<DateTime<Utc>>,
    #[serde(flatten)]
    analysis: JumpAnalysis,
}

#[derive(Serialize)]
struct NamedGroup {
    logs: Vec<String>,
    #[serde(flatten)]
    group: FormationGroup,
}

fn print_json<T: Serialize>(value: &T) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Serialization error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn read_log(path: &str) -> Result<Vec<u8>, String> {
    fs::read(path).map_err(|e| format!("Error reading {}: {}", path, e))
}

fn load_log(path: &str) -> Result<ParsedLogData, String> {
    let buffer = read_log(path)?;
    parse(&buffer).map_err(|e| format!("{}: {}", path, e))
}

fn display_name(path: &str) -> String {
    Path::new(path)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}

fn validate_log(path: &str) -> ExitCode {
    let buffer = match read_log(path) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let validation = validate(&buffer);
    let code = print_json(&validation);
    if validation.is_valid {
        code
    } else {
        ExitCode::FAILURE
    }
}

fn parse_log(path: &str, series: bool) -> ExitCode {
    let data = match load_log(path) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    if series {
        print_json(&data)
    } else {
        print_json(&LogSummary::from(&data))
    }
}

fn analyze_log(path: &str, config: &Config) -> ExitCode {
    let data = match load_log(path) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    print_json(&NamedAnalysis {
        log: path,
        start_time: data.start_time,
        analysis: analyze(&data, &config.detector()),
    })
}

/// Exit time when one was detected, otherwise the log start.
fn jump_start(data: &ParsedLogData, config: &Config) -> Option<DateTime<Utc>> {
    let events = analyze(data, &config.detector()).events;
    events
        .exit_offset
        .and_then(|t| data.absolute_time(t))
        .or(data.start_time)
}

fn group_logs(paths: &[String], config: &Config) -> ExitCode {
    let tolerance = match config.formation_tolerance() {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Config error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut grouper = FormationGrouper::new(tolerance);
    let mut names: Vec<(Uuid, String)> = Vec::new();
    for path in paths {
        let data = match load_log(path) {
            Ok(d) => d,
            Err(e) => {
                log::warn!("Skipping {}", e);
                continue;
            }
        };
        let Some(start) = jump_start(&data, config) else {
            log::warn!("Skipping {}: no absolute start time", path);
            continue;
        };
        let id = Uuid::new_v4();
        grouper.insert(JumpRecord::new(id, start));
        names.push((id, path.clone()));
    }

    if grouper.is_empty() {
        eprintln!("No groupable logs");
        return ExitCode::FAILURE;
    }

    let lookup = |id: &Uuid| {
        names
            .iter()
            .find(|(known, _)| known == id)
            .map(|(_, name)| name.clone())
            .unwrap_or_default()
    };
    let groups: Vec<NamedGroup> = grouper
        .groups()
        .into_iter()
        .map(|group| NamedGroup {
            logs: group.members.iter().map(&lookup).collect(),
            group,
        })
        .collect();
    print_json(&groups)
}

fn parse_at(s: &str, anchor: DateTime<Utc>) -> Result<DateTime<Utc>, String> {
    let s = s.trim();

    // Relative: T+42s, T-500ms
    if s.to_lowercase().starts_with('t') {
        let rest = &s[1..];
        let (neg, rest) = match rest.strip_prefix('-') {
            Some(r) => (true, r),
            None => (false, rest.strip_prefix('+').unwrap_or(rest)),
        };
        let std_dur = humantime::parse_duration(rest.trim())
            .map_err(|e| format!("Invalid duration '{}': {}", rest, e))?;
        let dur = chrono::Duration::from_std(std_dur).map_err(|e| e.to_string())?;
        let shifted = if neg {
            anchor.checked_sub_signed(dur)
        } else {
            anchor.checked_add_signed(dur)
        };
        return shifted.ok_or_else(|| format!("Time '{}' is out of range", s));
    }

    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| format!("Invalid time '{}': {}", s, e))
}

fn project_logs(paths: &[String], base: usize, at: &str, config: &Config) -> ExitCode {
    if base >= paths.len() {
        eprintln!("Base index {} out of range ({} logs)", base, paths.len());
        return ExitCode::FAILURE;
    }

    let mut participants = Vec::with_capacity(paths.len());
    let mut base_id = None;
    for (i, path) in paths.iter().enumerate() {
        let data = match load_log(path) {
            Ok(d) => d,
            Err(e) => {
                eprintln!("{}", e);
                return ExitCode::FAILURE;
            }
        };
        let Some(participant) = ParticipantData::from_log(Uuid::new_v4(), display_name(path), data)
        else {
            log::warn!("Skipping {}: no absolute start time", path);
            continue;
        };
        if i == base {
            base_id = Some(participant.id);
        }
        participants.push(participant);
    }

    let Some(base_id) = base_id else {
        eprintln!("Base log {} has no absolute start time", paths[base]);
        return ExitCode::FAILURE;
    };
    let anchor = participants
        .iter()
        .find(|p| p.id == base_id)
        .map(|p| p.start_time)
        .unwrap_or_else(Utc::now);
    let time = match parse_at(at, anchor) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let projector = Projector::new(config.projection.closure_window);
    let result = default_origin(&participants, base_id)
        .and_then(|origin| projector.project_at_time(&participants, time, base_id, &origin));
    match result {
        Ok(positions) => print_json(&positions),
        Err(e) => {
            eprintln!("Projection error: {}", e);
            ExitCode::FAILURE
        }
    }
}
