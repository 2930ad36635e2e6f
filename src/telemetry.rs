// src/telemetry.rs
//
// Lightweight JSONL telemetry sink.
//
// One JSON object per line, controlled entirely via environment
// variables so experiments can turn logging on and off without code
// changes:
//
// - `MIRPOOL_TELEMETRY_MODE`: "off" (default) or "jsonl".
// - `MIRPOOL_TELEMETRY_PATH`: path to the JSONL file; required when
//   mode is "jsonl".
// - `MIRPOOL_TELEMETRY_APPEND`: "1"/"true"/"yes" appends to an existing
//   file instead of truncating.
//
// Write failures disable the sink rather than interrupting the
// simulation. Every record carries `schema_version`.

use std::env;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{self, Value as JsonValue};

use crate::env::{EpisodeSummary, StepResult};

/// Current telemetry schema version.
pub const SCHEMA_VERSION: u32 = 1;

/// One row per user per interval: the append-only tabular shape keyed
/// by `(user_id, interval_index)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRow {
    pub schema_version: u32,
    pub episode_id: u64,
    pub interval_index: u64,
    pub user_id: usize,
    pub requested_bw: f64,
    pub mir_target: f64,
    pub allocated_bw: f64,
    pub abuse_counter: u32,
    pub abuse_flag: bool,
}

/// One row per interval: totals plus the reward breakdown. Reward
/// fields are absent (not zero) for no-traffic intervals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntervalRow {
    pub schema_version: u32,
    pub episode_id: u64,
    pub interval_index: u64,
    pub total_allocated: f64,
    pub remaining_capacity: f64,
    pub no_traffic: bool,
    pub efficiency: Option<f64>,
    pub over_penalty: Option<f64>,
    pub abuse_penalty: Option<f64>,
    pub total_reward: Option<f64>,
}

/// Episode boundary marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeMarker {
    pub schema_version: u32,
    pub episode_id: u64,
    pub seed: u64,
    pub marker_type: EpisodeMarkerType,
    /// Present on end markers only.
    pub summary: Option<EpisodeSummary>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EpisodeMarkerType {
    Start,
    End,
}

/// JSONL telemetry sink (disabled by default).
pub struct TelemetrySink {
    enabled: bool,
    append: bool,
    path: Option<PathBuf>,
    writer: Option<BufWriter<File>>,
    episode_id: u64,
}

impl Default for TelemetrySink {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetrySink {
    /// Create a disabled sink.
    pub fn new() -> Self {
        Self {
            enabled: false,
            append: false,
            path: None,
            writer: None,
            episode_id: 0,
        }
    }

    /// Configure from environment variables.
    pub fn from_env() -> Self {
        let enabled = env::var("MIRPOOL_TELEMETRY_MODE")
            .map(|s| s.to_lowercase() == "jsonl")
            .unwrap_or(false);
        let path = env::var("MIRPOOL_TELEMETRY_PATH").ok().map(PathBuf::from);
        let append = env::var("MIRPOOL_TELEMETRY_APPEND")
            .map(|s| matches!(s.to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Self {
            enabled,
            append,
            path,
            writer: None,
            episode_id: 0,
        }
    }

    /// Enable with an explicit path (truncating).
    pub fn enable(path: PathBuf) -> Self {
        Self {
            enabled: true,
            append: false,
            path: Some(path),
            writer: None,
            episode_id: 0,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Set the episode id stamped on subsequent rows.
    pub fn reset_episode(&mut self, episode_id: u64) {
        self.episode_id = episode_id;
    }

    fn ensure_writer(&mut self) -> Option<&mut BufWriter<File>> {
        if !self.enabled {
            return None;
        }
        if self.writer.is_none() {
            let path = self.path.as_ref()?;
            if let Some(parent) = path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            let file = OpenOptions::new()
                .create(true)
                .append(self.append)
                .write(true)
                .truncate(!self.append)
                .open(path)
                .ok()?;
            self.writer = Some(BufWriter::new(file));
        }
        self.writer.as_mut()
    }

    fn write_json(&mut self, value: &JsonValue) {
        let Some(writer) = self.ensure_writer() else {
            return;
        };
        let line = match serde_json::to_string(value) {
            Ok(s) => s,
            Err(_) => return,
        };
        if writeln!(writer, "{}", line).is_err() {
            self.enabled = false;
            self.writer = None;
        }
    }

    fn write_record<T: Serialize>(&mut self, record: &T) {
        let value = serde_json::to_value(record).unwrap_or_default();
        self.write_json(&value);
    }

    pub fn log_episode_start(&mut self, seed: u64) {
        let marker = EpisodeMarker {
            schema_version: SCHEMA_VERSION,
            episode_id: self.episode_id,
            seed,
            marker_type: EpisodeMarkerType::Start,
            summary: None,
        };
        self.write_record(&marker);
    }

    pub fn log_episode_end(&mut self, seed: u64, summary: &EpisodeSummary) {
        let marker = EpisodeMarker {
            schema_version: SCHEMA_VERSION,
            episode_id: self.episode_id,
            seed,
            marker_type: EpisodeMarkerType::End,
            summary: Some(summary.clone()),
        };
        self.write_record(&marker);
    }

    /// Log one step: the interval row plus one row per user.
    pub fn log_step(&mut self, step: &StepResult) {
        if !self.enabled {
            return;
        }

        let breakdown = step.reward.breakdown();
        let row = IntervalRow {
            schema_version: SCHEMA_VERSION,
            episode_id: self.episode_id,
            interval_index: step.interval.interval_index,
            total_allocated: step.interval.total_allocated,
            remaining_capacity: step.interval.remaining_capacity,
            no_traffic: step.reward.is_no_traffic(),
            efficiency: breakdown.map(|b| b.efficiency),
            over_penalty: breakdown.map(|b| b.over_penalty),
            abuse_penalty: breakdown.map(|b| b.abuse_penalty),
            total_reward: breakdown.map(|b| b.total_reward),
        };
        self.write_record(&row);

        for rec in &step.interval.user_records {
            let row = UserRow {
                schema_version: SCHEMA_VERSION,
                episode_id: self.episode_id,
                interval_index: step.interval.interval_index,
                user_id: rec.user_id,
                requested_bw: rec.requested_bw,
                mir_target: rec.mir_target,
                allocated_bw: rec.allocated_bw,
                abuse_counter: rec.abuse_counter,
                abuse_flag: rec.abuse_flag,
            };
            self.write_record(&row);
        }
    }

    pub fn flush(&mut self) {
        if let Some(writer) = &mut self.writer {
            let _ = writer.flush();
        }
    }
}

impl Drop for TelemetrySink {
    fn drop(&mut self) {
        self.flush();
    }
}
