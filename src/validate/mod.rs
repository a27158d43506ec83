//! Read-side validation: plausibility filtering, bounded totals, dashboard metrics.

pub mod plausibility;
pub mod summary;
