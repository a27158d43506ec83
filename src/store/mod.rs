//! SQLite persistence for intake records.
//!
//! One table, `water_intake`. Every operation opens its own connection and
//! drops it on return; the schema reconciler runs inside [`intake::IntakeStore::open`]
//! before any other statement touches the table.

pub mod intake;
pub mod maintenance;
pub mod schema;

use std::path::Path;

use rusqlite::{Connection, OpenFlags};

use crate::core::errors::{Result, WtrError};

/// Name of the intake table.
pub const TABLE: &str = "water_intake";

/// Columns every usable `water_intake` table must carry.
pub const REQUIRED_COLUMNS: [&str; 4] = ["id", "user_id", "intake_ml", "date"];

/// Open a connection to the database at `path`, creating file and parent dir.
pub(crate) fn open_connection(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|source| WtrError::io(parent, source))?;
    }

    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(|e| WtrError::sql("open", &e))?;
    apply_pragmas(&conn)?;
    Ok(conn)
}

fn apply_pragmas(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;
         PRAGMA busy_timeout = 5000;",
    )
    .map_err(|e| WtrError::sql("pragmas", &e))?;
    let mode: String = conn
        .query_row("PRAGMA journal_mode", [], |row| row.get(0))
        .map_err(|e| WtrError::sql("pragmas", &e))?;
    if !mode.eq_ignore_ascii_case("wal") {
        eprintln!("[WTR-STORE] WARNING: requested WAL mode but got '{mode}'");
    }
    Ok(())
}
