//! Intake store: insert, per-user history, per-user/day raw total.
//!
//! No bound checking happens here; plausibility is the validator's job.
//! Failures are logged at this boundary and returned as `WtrError::Sql`, so
//! callers can tell "no intake" apart from "could not read".

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use rusqlite::types::Type;
use rusqlite::{Connection, params};
use serde::Serialize;

use crate::core::dates::{DATE_FORMAT, format_day, today};
use crate::core::errors::{Result, WtrError};
use crate::logger::activity::{ActivityEvent, ActivityLog};
use crate::store::schema::{self, ReconcileReport};
use crate::store::open_connection;

/// One persisted intake record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntakeEntry {
    pub id: i64,
    pub user_id: String,
    pub amount_ml: f64,
    pub date: NaiveDate,
}

/// Handle to the intake database file.
#[derive(Debug)]
pub struct IntakeStore {
    path: PathBuf,
    activity: ActivityLog,
    reconcile: ReconcileReport,
}

impl IntakeStore {
    /// Open the store at `path` without an activity log.
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_log(path, ActivityLog::disabled())
    }

    /// Open the store, running the schema reconciler before anything else.
    ///
    /// Reconciler failures are fatal: a store whose table cannot be made
    /// usable is never returned.
    pub fn open_with_log(path: &Path, activity: ActivityLog) -> Result<Self> {
        let mut conn = open_connection(path)?;
        let reconcile = match schema::reconcile(&mut conn) {
            Ok(report) => report,
            Err(err) => {
                eprintln!("[WTR-SCHEMA] reconcile failed for {}: {err}", path.display());
                activity.record(&ActivityEvent::StorageError {
                    operation: "reconcile",
                    code: err.code().to_string(),
                    message: err.to_string(),
                });
                return Err(err);
            }
        };
        drop(conn);

        if let Some(repair) = &reconcile.repair {
            activity.record(&ActivityEvent::SchemaRepaired {
                missing_columns: reconcile.missing_columns.clone(),
                rows_migrated: repair.rows_migrated,
                backup_retained: repair.backup_retained.then(|| repair.backup_table.clone()),
            });
        }
        for version in &reconcile.migrations_applied {
            let name = schema::MIGRATIONS
                .iter()
                .find(|m| m.version == *version)
                .map_or("unknown", |m| m.name);
            activity.record(&ActivityEvent::MigrationApplied {
                version: *version,
                name,
            });
        }

        Ok(Self {
            path: path.to_path_buf(),
            activity,
            reconcile,
        })
    }

    /// Path to the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Activity log shared by store, validator and maintenance operations.
    pub fn activity(&self) -> &ActivityLog {
        &self.activity
    }

    /// What the reconciler did when this store was opened.
    pub fn reconcile_report(&self) -> &ReconcileReport {
        &self.reconcile
    }

    /// Append one record. Any numeric amount is accepted. Returns the new row id.
    pub fn insert(&self, user: &str, amount_ml: f64, date: NaiveDate) -> Result<i64> {
        let day = format_day(date);
        let id = self.run("insert", |conn| {
            conn.prepare_cached(
                "INSERT INTO water_intake (user_id, intake_ml, date) VALUES (?1, ?2, ?3)",
            )?
            .execute(params![user, amount_ml, day])?;
            Ok(conn.last_insert_rowid())
        })?;
        self.activity.record(&ActivityEvent::IntakeLogged {
            user: user.to_string(),
            amount_ml,
            date: day,
        });
        Ok(id)
    }

    /// [`insert`](Self::insert) dated today.
    pub fn insert_today(&self, user: &str, amount_ml: f64) -> Result<i64> {
        self.insert(user, amount_ml, today())
    }

    /// Full history for `user`, most recent day first, newest insert first within a day.
    pub fn history(&self, user: &str) -> Result<Vec<IntakeEntry>> {
        self.run("history", |conn| {
            let mut stmt = conn.prepare_cached(
                "SELECT id, user_id, intake_ml, date FROM water_intake
                 WHERE user_id = ?1 ORDER BY date DESC, id DESC",
            )?;
            let rows = stmt
                .query_map(params![user], |row| {
                    let raw_date: String = row.get(3)?;
                    let date = NaiveDate::parse_from_str(&raw_date, DATE_FORMAT).map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e))
                    })?;
                    Ok(IntakeEntry {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        amount_ml: row.get(2)?,
                        date,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    /// Raw (unfiltered) sum for `user` on `date`; `0.0` when there are no rows.
    pub fn daily_total(&self, user: &str, date: NaiveDate) -> Result<f64> {
        let day = format_day(date);
        self.run("daily_total", |conn| {
            conn.query_row(
                "SELECT COALESCE(SUM(intake_ml), 0.0) FROM water_intake
                 WHERE user_id = ?1 AND date = ?2",
                params![user, day],
                |row| row.get(0),
            )
        })
    }

    /// Run one statement sequence on a fresh connection, logging any failure.
    pub(crate) fn run<T>(
        &self,
        operation: &'static str,
        f: impl FnOnce(&Connection) -> rusqlite::Result<T>,
    ) -> Result<T> {
        let outcome = open_connection(&self.path)
            .and_then(|conn| f(&conn).map_err(|e| WtrError::sql(operation, &e)));
        if let Err(err) = &outcome {
            eprintln!("[WTR-STORE] {operation} failed: {err}");
            self.activity.record(&ActivityEvent::StorageError {
                operation,
                code: err.code().to_string(),
                message: err.to_string(),
            });
        }
        outcome
    }
}
