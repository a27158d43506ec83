//! Typed activity events on top of the JSONL writer.
//!
//! Every tracker operation runs on one thread, so the log owns its writer
//! directly behind a `RefCell` instead of a channel and a logger thread.

#![allow(missing_docs)]

use std::cell::RefCell;

use crate::logger::jsonl::{EventType, JsonlConfig, JsonlWriter, LogEntry, Severity};

/// Events recorded in the activity log.
#[derive(Debug, Clone, PartialEq)]
pub enum ActivityEvent {
    IntakeLogged {
        user: String,
        amount_ml: f64,
        date: String,
    },
    ImplausibleFiltered {
        user: Option<String>,
        ceiling_ml: f64,
        dropped: Vec<f64>,
    },
    ImplausiblePurged {
        user: String,
        ceiling_ml: f64,
        deleted: usize,
    },
    UserWiped {
        user: String,
        deleted: usize,
    },
    SchemaRepaired {
        missing_columns: Vec<String>,
        rows_migrated: usize,
        backup_retained: Option<String>,
    },
    MigrationApplied {
        version: u32,
        name: &'static str,
    },
    StorageError {
        operation: &'static str,
        code: String,
        message: String,
    },
    FeedbackFailed {
        amount_ml: f64,
        message: String,
    },
}

/// Single-threaded activity logger.
pub struct ActivityLog {
    writer: RefCell<JsonlWriter>,
}

impl ActivityLog {
    /// Log to a JSONL file, degrading to fallback/stderr/discard on failure.
    pub fn open(config: JsonlConfig) -> Self {
        Self {
            writer: RefCell::new(JsonlWriter::open(config)),
        }
    }

    /// Logger that records nothing.
    pub fn disabled() -> Self {
        Self {
            writer: RefCell::new(JsonlWriter::discard()),
        }
    }

    /// Append one event. Never fails.
    pub fn record(&self, event: &ActivityEvent) {
        let entry = event_to_log_entry(event);
        if let Ok(mut writer) = self.writer.try_borrow_mut() {
            writer.write_entry(&entry);
            writer.flush();
        }
    }

    /// Degradation state of the underlying writer.
    pub fn state(&self) -> String {
        self.writer
            .try_borrow()
            .map_or_else(|_| "busy".to_string(), |w| w.state().to_string())
    }
}

impl std::fmt::Debug for ActivityLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivityLog")
            .field("state", &self.state())
            .finish()
    }
}

fn event_to_log_entry(event: &ActivityEvent) -> LogEntry {
    match event {
        ActivityEvent::IntakeLogged {
            user,
            amount_ml,
            date,
        } => {
            let mut e = LogEntry::new(EventType::IntakeLogged, Severity::Info);
            e.user = Some(user.clone());
            e.amount_ml = Some(*amount_ml);
            e.date = Some(date.clone());
            e.ok = Some(true);
            e
        }
        ActivityEvent::ImplausibleFiltered {
            user,
            ceiling_ml,
            dropped,
        } => {
            let mut e = LogEntry::new(EventType::ImplausibleFiltered, Severity::Warning);
            e.user.clone_from(user);
            e.count = Some(dropped.len() as u64);
            let values: Vec<String> = dropped.iter().map(|v| format!("{v}")).collect();
            e.details = Some(format!(
                "ceiling_ml={ceiling_ml} dropped=[{}]",
                values.join(",")
            ));
            e
        }
        ActivityEvent::ImplausiblePurged {
            user,
            ceiling_ml,
            deleted,
        } => {
            let mut e = LogEntry::new(EventType::ImplausiblePurged, Severity::Info);
            e.user = Some(user.clone());
            e.count = Some(*deleted as u64);
            e.details = Some(format!("ceiling_ml={ceiling_ml}"));
            e.ok = Some(true);
            e
        }
        ActivityEvent::UserWiped { user, deleted } => {
            let mut e = LogEntry::new(EventType::UserWiped, Severity::Warning);
            e.user = Some(user.clone());
            e.count = Some(*deleted as u64);
            e.ok = Some(true);
            e
        }
        ActivityEvent::SchemaRepaired {
            missing_columns,
            rows_migrated,
            backup_retained,
        } => {
            let severity = if backup_retained.is_some() {
                Severity::Critical
            } else {
                Severity::Warning
            };
            let mut e = LogEntry::new(EventType::SchemaRepaired, severity);
            e.count = Some(*rows_migrated as u64);
            e.ok = Some(backup_retained.is_none());
            e.details = Some(match backup_retained {
                Some(backup) => format!(
                    "missing={} backup_retained={backup}",
                    missing_columns.join(",")
                ),
                None => format!("missing={}", missing_columns.join(",")),
            });
            e
        }
        ActivityEvent::MigrationApplied { version, name } => {
            let mut e = LogEntry::new(EventType::MigrationApplied, Severity::Info);
            e.details = Some(format!("version={version} name={name}"));
            e.ok = Some(true);
            e
        }
        ActivityEvent::StorageError {
            operation,
            code,
            message,
        } => {
            let mut e = LogEntry::new(EventType::StorageError, Severity::Critical);
            e.details = Some(format!("operation={operation}"));
            e.error_code = Some(code.clone());
            e.error_message = Some(message.clone());
            e.ok = Some(false);
            e
        }
        ActivityEvent::FeedbackFailed { amount_ml, message } => {
            let mut e = LogEntry::new(EventType::FeedbackFailed, Severity::Warning);
            e.amount_ml = Some(*amount_ml);
            e.error_message = Some(message.clone());
            e.ok = Some(false);
            e
        }
    }
}
