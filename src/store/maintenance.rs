//! Maintenance operations: threshold purge and full per-user wipe.
//!
//! Both are one `DELETE` statement each and bypass the validator. Neither asks
//! for confirmation; callers own that.

use rusqlite::params;

use crate::core::errors::Result;
use crate::logger::activity::ActivityEvent;
use crate::store::intake::IntakeStore;

/// Delete every row of `user` with `intake_ml > ceiling_ml`. Returns rows deleted.
pub fn purge_implausible(store: &IntakeStore, user: &str, ceiling_ml: f64) -> Result<usize> {
    let deleted = store.run("purge_implausible", |conn| {
        conn.execute(
            "DELETE FROM water_intake WHERE user_id = ?1 AND intake_ml > ?2",
            params![user, ceiling_ml],
        )
    })?;
    store.activity().record(&ActivityEvent::ImplausiblePurged {
        user: user.to_string(),
        ceiling_ml,
        deleted,
    });
    Ok(deleted)
}

/// Delete every row of `user`. Returns rows deleted.
pub fn wipe(store: &IntakeStore, user: &str) -> Result<usize> {
    let deleted = store.run("wipe", |conn| {
        conn.execute("DELETE FROM water_intake WHERE user_id = ?1", params![user])
    })?;
    store.activity().record(&ActivityEvent::UserWiped {
        user: user.to_string(),
        deleted,
    });
    Ok(deleted)
}

/// Number of rows [`purge_implausible`] would delete.
pub fn count_implausible(store: &IntakeStore, user: &str, ceiling_ml: f64) -> Result<usize> {
    let count: i64 = store.run("count_implausible", |conn| {
        conn.query_row(
            "SELECT COUNT(*) FROM water_intake WHERE user_id = ?1 AND intake_ml > ?2",
            params![user, ceiling_ml],
            |row| row.get(0),
        )
    })?;
    Ok(usize::try_from(count).unwrap_or(0))
}
