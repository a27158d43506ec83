//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use water_tracker::prelude::*;
//! ```

// Core
pub use crate::core::config::{Config, GoalsConfig, LimitsConfig};
pub use crate::core::dates::{format_day, parse_day, today};
pub use crate::core::errors::{Result, WtrError};

// Store
pub use crate::store::intake::{IntakeEntry, IntakeStore};
pub use crate::store::maintenance::{count_implausible, purge_implausible, wipe};
pub use crate::store::schema::{ReconcileReport, reconcile};

// Validator
pub use crate::validate::plausibility::{
    DataQualityReport, PlausibilityReport, data_quality, filter_plausible, validated_daily_total,
    validated_history,
};
pub use crate::validate::summary::{DashboardState, DashboardSummary, load_dashboard, summarize};

// Feedback
pub use crate::feedback::{CannedAnalyzer, Feedback, IntakeAnalyzer};
