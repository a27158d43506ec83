#![forbid(unsafe_code)]

//! Water Tracker (wtr): personal hydration log backed by a single SQLite table.
//!
//! Pieces, leaf first:
//! 1. **Store**: insert, per-user history, per-user/day raw totals
//! 2. **Validator**: plausibility filtering and capped daily totals
//! 3. **Maintenance**: purge implausible rows, wipe a user
//! 4. **Schema reconciler**: drift repair and versioned migrations on open
//!
//! # Library usage
//!
//! ```rust,no_run
//! use water_tracker::prelude::*;
//!
//! # fn main() -> water_tracker::core::errors::Result<()> {
//! let store = IntakeStore::open(std::path::Path::new("water_tracker.db"))?;
//! store.insert_today("user_123", 250.0)?;
//! let total = validated_daily_total(&store, "user_123", today(), &LimitsConfig::default())?;
//! # let _ = total;
//! # Ok(())
//! # }
//! ```

pub mod prelude;

#[cfg(feature = "cli")]
pub mod cli;
pub mod core;
pub mod feedback;
pub mod logger;
pub mod store;
pub mod validate;
