//! JSONL logger: append-only line-delimited JSON activity records.
//!
//! Each line is a self-contained JSON object, assembled in memory and written
//! with a single `write_all` so a tailing reader never sees a partial line.
//!
//! Four-level fallback chain:
//! 1. Primary file path
//! 2. Fallback path (e.g. the system temp dir)
//! 3. stderr with `[WTR-JSONL]` prefix
//! 4. Silent discard (tracker operations never fail because of logging)

#![allow(missing_docs)]

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, WtrError};

/// Severity level for log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

/// Log event types matching the tracker activity model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    IntakeLogged,
    ImplausibleFiltered,
    ImplausiblePurged,
    UserWiped,
    SchemaRepaired,
    MigrationApplied,
    StorageError,
    FeedbackFailed,
}

/// A single JSONL log entry; only `ts`, `event` and `severity` are always present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// ISO 8601 UTC timestamp.
    pub ts: String,
    pub event: EventType,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_ml: Option<f64>,
    /// Calendar day the event refers to (`YYYY-MM-DD`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// Rows affected or entries involved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ok: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl LogEntry {
    /// Create a new entry stamped with the current UTC time.
    pub fn new(event: EventType, severity: Severity) -> Self {
        Self {
            ts: format_utc_now(),
            event,
            severity,
            user: None,
            amount_ml: None,
            date: None,
            count: None,
            ok: None,
            error_code: None,
            error_message: None,
            details: None,
        }
    }
}

/// Configuration for the JSONL writer.
#[derive(Debug, Clone)]
pub struct JsonlConfig {
    /// Primary log file path.
    pub path: PathBuf,
    /// Optional fallback path (e.g. on a different filesystem).
    pub fallback_path: Option<PathBuf>,
    /// Maximum file size before rotation (bytes). Default: 10 MiB.
    pub max_size_bytes: u64,
    /// Number of rotated files to keep. Default: 3.
    pub max_rotated_files: u32,
}

impl Default for JsonlConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("activity.jsonl"),
            fallback_path: Some(std::env::temp_dir().join("wtr-activity.jsonl")),
            max_size_bytes: 10 * 1024 * 1024,
            max_rotated_files: 3,
        }
    }
}

impl JsonlConfig {
    /// Default rotation policy for a specific primary path.
    #[must_use]
    pub fn for_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }
}

/// Where lines currently go. Each failure moves one step down the chain.
enum Sink {
    File {
        out: BufWriter<File>,
        path: PathBuf,
        is_fallback: bool,
    },
    Stderr,
    Discard,
}

/// Append-only JSONL writer with size-based rotation.
pub struct JsonlWriter {
    config: JsonlConfig,
    sink: Sink,
    bytes_written: u64,
}

impl JsonlWriter {
    /// Open the primary file, or the first sink further down the chain that works.
    pub fn open(config: JsonlConfig) -> Self {
        let mut writer = Self {
            config,
            sink: Sink::Discard,
            bytes_written: 0,
        };
        writer.sink = writer.first_available_sink(false);
        writer
    }

    /// Writer that drops everything. Used when activity logging is disabled.
    pub fn discard() -> Self {
        Self {
            config: JsonlConfig {
                path: PathBuf::new(),
                fallback_path: None,
                max_size_bytes: u64::MAX,
                max_rotated_files: 0,
            },
            sink: Sink::Discard,
            bytes_written: 0,
        }
    }

    /// Serialize `entry` and append it as one line.
    pub fn write_entry(&mut self, entry: &LogEntry) {
        match serde_json::to_string(entry) {
            Ok(mut line) => {
                line.push('\n');
                self.emit(&line);
            }
            Err(e) => eprintln!("[WTR-JSONL] serialize error: {e}"),
        }
    }

    pub fn flush(&mut self) {
        if let Sink::File { out, .. } = &mut self.sink {
            let _ = out.flush();
        }
    }

    /// `normal`, `fallback`, `stderr` or `discard`.
    pub fn state(&self) -> &'static str {
        match &self.sink {
            Sink::File {
                is_fallback: false, ..
            } => "normal",
            Sink::File {
                is_fallback: true, ..
            } => "fallback",
            Sink::Stderr => "stderr",
            Sink::Discard => "discard",
        }
    }

    /// Bytes in the current file, including what was there before opening.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    fn emit(&mut self, line: &str) {
        let len = line.len() as u64;
        if matches!(self.sink, Sink::File { .. })
            && self.bytes_written.saturating_add(len) > self.config.max_size_bytes
        {
            self.rotate();
        }

        loop {
            match &mut self.sink {
                Sink::File { out, .. } => {
                    if out.write_all(line.as_bytes()).is_ok() {
                        self.bytes_written += len;
                        return;
                    }
                }
                Sink::Stderr => {
                    let prefixed = format!("[WTR-JSONL] {line}");
                    if io::stderr().write_all(prefixed.as_bytes()).is_ok() {
                        return;
                    }
                }
                Sink::Discard => return,
            }
            self.step_down();
        }
    }

    fn step_down(&mut self) {
        let on_primary = matches!(
            self.sink,
            Sink::File {
                is_fallback: false,
                ..
            }
        );
        let on_fallback = matches!(self.sink, Sink::File { is_fallback: true, .. });
        self.sink = if on_primary {
            self.first_available_sink(true)
        } else if on_fallback {
            eprintln!("[WTR-JSONL] fallback write failed, using stderr");
            Sink::Stderr
        } else {
            Sink::Discard
        };
    }

    fn first_available_sink(&mut self, skip_primary: bool) -> Sink {
        if !skip_primary && let Ok((file, size)) = open_append(&self.config.path) {
            self.bytes_written = size;
            return Sink::File {
                out: BufWriter::new(file),
                path: self.config.path.clone(),
                is_fallback: false,
            };
        }

        let Some(fallback) = self.config.fallback_path.clone() else {
            eprintln!("[WTR-JSONL] primary path failed and no fallback configured, using stderr");
            return Sink::Stderr;
        };
        match open_append(&fallback) {
            Ok((file, size)) => {
                eprintln!(
                    "[WTR-JSONL] primary path failed, using fallback: {}",
                    fallback.display()
                );
                self.bytes_written = size;
                Sink::File {
                    out: BufWriter::new(file),
                    path: fallback,
                    is_fallback: true,
                }
            }
            Err(_) => {
                eprintln!("[WTR-JSONL] both primary and fallback paths failed, using stderr");
                Sink::Stderr
            }
        }
    }

    fn rotate(&mut self) {
        let Sink::File {
            mut out,
            path,
            is_fallback,
        } = std::mem::replace(&mut self.sink, Sink::Discard)
        else {
            return;
        };
        let _ = out.flush();
        drop(out);

        shift_rotated(&path, self.config.max_rotated_files);

        if let Ok((file, _)) = open_append(&path) {
            self.bytes_written = 0;
            self.sink = Sink::File {
                out: BufWriter::new(file),
                path,
                is_fallback,
            };
        } else if is_fallback {
            self.sink = Sink::Stderr;
        } else {
            self.sink = self.first_available_sink(true);
        }
    }
}

impl Drop for JsonlWriter {
    fn drop(&mut self) {
        self.flush();
    }
}

// ──────────────────────── helpers ────────────────────────

/// Open or create a file for appending. Returns `(File, current_size)`.
fn open_append(path: &Path) -> Result<(File, u64)> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|source| WtrError::io(parent, source))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| WtrError::io(path, source))?;
    let size = file.metadata().map_or(0, |m| m.len());
    Ok((file, size))
}

/// Shift `base` to `base.1`, `base.1` to `base.2`, and so on; the oldest beyond `keep` is removed.
fn shift_rotated(base: &Path, keep: u32) {
    if keep == 0 {
        let _ = fs::remove_file(base);
        return;
    }
    let _ = fs::remove_file(rotated_name(base, keep));
    for i in (1..keep).rev() {
        let _ = fs::rename(rotated_name(base, i), rotated_name(base, i + 1));
    }
    let _ = fs::rename(base, rotated_name(base, 1));
}

/// `foo.jsonl` with index 3 is `foo.jsonl.3`.
fn rotated_name(base: &Path, index: u32) -> PathBuf {
    let mut name = base.as_os_str().to_owned();
    name.push(format!(".{index}"));
    PathBuf::from(name)
}

fn format_utc_now() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

// ──────────────────────── tests ────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn config_at(path: PathBuf) -> JsonlConfig {
        JsonlConfig {
            path,
            fallback_path: None,
            max_size_bytes: 1024 * 1024,
            max_rotated_files: 3,
        }
    }

    #[test]
    fn write_entry_produces_valid_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.jsonl");
        let mut writer = JsonlWriter::open(config_at(path.clone()));

        let mut entry = LogEntry::new(EventType::IntakeLogged, Severity::Info);
        entry.user = Some("u1".to_string());
        entry.amount_ml = Some(250.0);
        writer.write_entry(&entry);
        writer.write_entry(&LogEntry::new(EventType::UserWiped, Severity::Warning));
        writer.flush();

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        let parsed: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed["event"], "intake_logged");
        assert_eq!(parsed["severity"], "info");
        assert_eq!(parsed["user"], "u1");
        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["event"], "user_wiped");
    }

    #[test]
    fn rotation_shifts_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rot.jsonl");
        let mut writer = JsonlWriter::open(JsonlConfig {
            max_size_bytes: 100,
            ..config_at(path.clone())
        });

        for _ in 0..10 {
            writer.write_entry(&LogEntry::new(EventType::IntakeLogged, Severity::Info));
        }
        writer.flush();

        assert!(path.exists());
        assert!(rotated_name(&path, 1).exists());
        assert!(!rotated_name(&path, 4).exists());
    }

    #[test]
    fn fallback_when_primary_dir_unwritable() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        fs::write(&blocker, b"file").unwrap();
        let fallback = dir.path().join("fallback.jsonl");
        let mut writer = JsonlWriter::open(JsonlConfig {
            fallback_path: Some(fallback.clone()),
            ..config_at(blocker.join("primary.jsonl"))
        });

        assert_eq!(writer.state(), "fallback");
        writer.write_entry(&LogEntry::new(EventType::StorageError, Severity::Warning));
        writer.flush();

        let contents = fs::read_to_string(&fallback).unwrap();
        assert!(!contents.is_empty());
    }

    #[test]
    fn discard_writer_accepts_entries() {
        let mut writer = JsonlWriter::discard();
        writer.write_entry(&LogEntry::new(EventType::IntakeLogged, Severity::Info));
        assert_eq!(writer.state(), "discard");
        assert_eq!(writer.bytes_written(), 0);
    }

    #[test]
    fn entry_optional_fields_omitted_when_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sparse.jsonl");
        let mut writer = JsonlWriter::open(config_at(path.clone()));

        writer.write_entry(&LogEntry::new(EventType::MigrationApplied, Severity::Info));
        writer.flush();

        let line = fs::read_to_string(&path).unwrap();
        assert!(!line.contains("\"user\""));
        assert!(!line.contains("\"amount_ml\""));
        assert!(!line.contains("\"count\""));
    }
}
