//! Schema reconciler: column-drift repair plus versioned migrations.
//!
//! Runs once per open, before the store is trusted:
//! 1. If `water_intake` exists but lacks a required column, rename it to a
//!    fresh backup name, recreate it, and copy rows forward. The backup is
//!    dropped only when the copied row count matches; otherwise it stays.
//! 2. Apply every migration in [`MIGRATIONS`] newer than `PRAGMA user_version`,
//!    each in its own transaction together with the version bump.
//!
//! Assumes a single writer for the duration of the call.

#![allow(missing_docs)]

use rusqlite::{Connection, OptionalExtension, Transaction};
use serde::Serialize;

use crate::core::errors::{Result, WtrError};
use crate::store::{REQUIRED_COLUMNS, TABLE};

/// One ordered schema step.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub version: u32,
    pub name: &'static str,
    pub sql: &'static str,
}

const CREATE_TABLE_SQL: &str = "CREATE TABLE IF NOT EXISTS water_intake (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL,
    intake_ml REAL NOT NULL,
    date TEXT NOT NULL
);";

/// Applied in order; `version` values must be strictly increasing.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create_water_intake",
        sql: CREATE_TABLE_SQL,
    },
    Migration {
        version: 2,
        name: "index_user_date",
        sql: "CREATE INDEX IF NOT EXISTS idx_water_intake_user_date
              ON water_intake(user_id, date);",
    },
    Migration {
        // Tables patched by adding a nullable amount column carry NULLs.
        version: 3,
        name: "backfill_null_amounts",
        sql: "UPDATE water_intake SET intake_ml = 0 WHERE intake_ml IS NULL;",
    },
];

/// Latest schema version this build understands.
#[must_use]
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |m| m.version)
}

/// Outcome of a column-drift repair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DriftRepair {
    /// Table the drifted original was renamed to.
    pub backup_table: String,
    pub backup_rows: usize,
    pub rows_migrated: usize,
    /// True when the backup was kept because the copy failed or was incomplete.
    pub backup_retained: bool,
    pub copy_error: Option<String>,
}

/// What the reconciler found and did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub table_existed: bool,
    pub columns_before: Vec<String>,
    pub missing_columns: Vec<String>,
    pub repair: Option<DriftRepair>,
    pub migrations_applied: Vec<u32>,
    pub version_before: u32,
    pub schema_version: u32,
}

impl ReconcileReport {
    /// True when nothing had to change.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.repair.is_none() && self.migrations_applied.is_empty()
    }
}

/// Column names of `table`, in declaration order. Empty if the table is absent.
pub fn table_columns(conn: &Connection, table: &str) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({})", quote_ident(table)))
        .map_err(|e| WtrError::sql("table_info", &e))?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>(1))
        .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
        .map_err(|e| WtrError::sql("table_info", &e))?;
    Ok(columns)
}

/// Required columns absent from `actual`.
#[must_use]
pub fn missing_columns(actual: &[String]) -> Vec<String> {
    REQUIRED_COLUMNS
        .iter()
        .filter(|required| !actual.iter().any(|c| c == *required))
        .map(|c| (*c).to_string())
        .collect()
}

/// Run drift repair and pending migrations on `conn`.
pub fn reconcile(conn: &mut Connection) -> Result<ReconcileReport> {
    let columns_before = table_columns(conn, TABLE)?;
    let table_existed = !columns_before.is_empty();
    let missing = if table_existed {
        missing_columns(&columns_before)
    } else {
        Vec::new()
    };

    let repair = if missing.is_empty() {
        None
    } else {
        eprintln!(
            "[WTR-SCHEMA] {TABLE} is missing columns {missing:?}; rebuilding table"
        );
        let repair = repair_drift(conn, &columns_before)?;
        if repair.backup_retained {
            eprintln!(
                "[WTR-SCHEMA] WARNING: copy-forward incomplete ({} of {} rows); backup kept in {}",
                repair.rows_migrated, repair.backup_rows, repair.backup_table
            );
        }
        Some(repair)
    };

    let version_before = user_version(conn)?;
    let migrations_applied = apply_migrations(conn, version_before)?;

    Ok(ReconcileReport {
        table_existed,
        columns_before,
        missing_columns: missing,
        repair,
        migrations_applied,
        version_before,
        schema_version: user_version(conn)?,
    })
}

fn repair_drift(conn: &mut Connection, columns: &[String]) -> Result<DriftRepair> {
    let mut tx = conn
        .transaction()
        .map_err(|e| WtrError::sql("repair_begin", &e))?;

    let backup_table = choose_backup_name(&tx)?;
    tx.execute_batch(&format!(
        "ALTER TABLE {TABLE} RENAME TO {};",
        quote_ident(&backup_table)
    ))
    .map_err(|e| WtrError::sql("repair_rename", &e))?;
    tx.execute_batch(CREATE_TABLE_SQL)
        .map_err(|e| WtrError::sql("repair_create", &e))?;
    // Later migrations re-run against the fresh table (indexes went with the backup).
    tx.pragma_update(None, "user_version", 1_u32)
        .map_err(|e| WtrError::sql("repair_version", &e))?;

    let backup_rows = count_rows(&tx, &backup_table)?;

    let copy_result = match copy_forward_sql(&backup_table, columns) {
        Ok(sql) => {
            let sp = tx
                .savepoint()
                .map_err(|e| WtrError::sql("repair_savepoint", &e))?;
            match sp.execute(&sql, []) {
                Ok(copied) => sp
                    .commit()
                    .map(|()| copied)
                    .map_err(|e| e.to_string()),
                // Savepoint rolls back on drop.
                Err(e) => Err(e.to_string()),
            }
        }
        Err(reason) => Err(reason),
    };

    let (rows_migrated, copy_error) = match copy_result {
        Ok(n) => (n, None),
        Err(reason) => (0, Some(reason)),
    };

    let backup_retained = copy_error.is_some() || rows_migrated != backup_rows;
    if !backup_retained {
        tx.execute_batch(&format!("DROP TABLE {};", quote_ident(&backup_table)))
            .map_err(|e| WtrError::sql("repair_drop_backup", &e))?;
    }

    tx.commit().map_err(|e| WtrError::sql("repair_commit", &e))?;

    Ok(DriftRepair {
        backup_table,
        backup_rows,
        rows_migrated,
        backup_retained,
        copy_error,
    })
}

/// Build the copy-forward statement for a drifted backup table.
///
/// `user_id` and `date` cannot be reconstructed; their absence is a copy failure.
fn copy_forward_sql(backup: &str, columns: &[String]) -> std::result::Result<String, String> {
    let has = |name: &str| columns.iter().any(|c| c == name);
    for required in ["user_id", "date"] {
        if !has(required) {
            return Err(format!("backup has no {required} column to copy from"));
        }
    }

    let amount = if has("intake_ml") {
        "COALESCE(intake_ml, 0)"
    } else {
        "0"
    };
    let backup = quote_ident(backup);
    Ok(if has("id") {
        format!(
            "INSERT INTO {TABLE} (id, user_id, intake_ml, date) \
             SELECT id, user_id, {amount}, date FROM {backup}"
        )
    } else {
        format!(
            "INSERT INTO {TABLE} (user_id, intake_ml, date) \
             SELECT user_id, {amount}, date FROM {backup}"
        )
    })
}

fn choose_backup_name(tx: &Transaction<'_>) -> Result<String> {
    let base = format!("{TABLE}_backup");
    let mut candidate = base.clone();
    let mut n = 2_u32;
    while table_exists(tx, &candidate)? {
        candidate = format!("{base}_{n}");
        n += 1;
    }
    Ok(candidate)
}

fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
    conn.query_row(
        "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [name],
        |_| Ok(()),
    )
    .optional()
    .map(|found| found.is_some())
    .map_err(|e| WtrError::sql("table_exists", &e))
}

fn count_rows(conn: &Connection, table: &str) -> Result<usize> {
    let count: i64 = conn
        .query_row(
            &format!("SELECT COUNT(*) FROM {}", quote_ident(table)),
            [],
            |row| row.get(0),
        )
        .map_err(|e| WtrError::sql("count_rows", &e))?;
    Ok(usize::try_from(count).unwrap_or(0))
}

/// Current `PRAGMA user_version`.
pub fn user_version(conn: &Connection) -> Result<u32> {
    let version: i64 = conn
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .map_err(|e| WtrError::sql("user_version", &e))?;
    u32::try_from(version).map_err(|_| WtrError::Schema {
        details: format!("invalid schema version {version}"),
    })
}

fn apply_migrations(conn: &mut Connection, current: u32) -> Result<Vec<u32>> {
    let latest = latest_version();
    if current > latest {
        return Err(WtrError::Schema {
            details: format!(
                "database schema v{current} is newer than this build supports (v{latest})"
            ),
        });
    }

    let mut applied = Vec::new();
    for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
        let tx = conn
            .transaction()
            .map_err(|e| WtrError::sql("migration_begin", &e))?;
        tx.execute_batch(migration.sql).map_err(|e| WtrError::Schema {
            details: format!(
                "migration v{} ({}) failed: {e}",
                migration.version, migration.name
            ),
        })?;
        tx.pragma_update(None, "user_version", migration.version)
            .map_err(|e| WtrError::sql("migration_version", &e))?;
        tx.commit()
            .map_err(|e| WtrError::sql("migration_commit", &e))?;
        applied.push(migration.version);
    }
    Ok(applied)
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
