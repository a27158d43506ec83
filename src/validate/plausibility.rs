//! Plausibility filtering and bounded daily totals.
//!
//! Read-side only: nothing here writes to the store.

#![allow(missing_docs)]

use chrono::NaiveDate;
use serde::Serialize;

use crate::core::config::LimitsConfig;
use crate::core::errors::Result;
use crate::logger::activity::ActivityEvent;
use crate::store::intake::{IntakeEntry, IntakeStore};

/// Whether a single amount is a legitimate entry: at most `ceiling_ml`. NaN never is.
#[must_use]
pub fn is_plausible(amount_ml: f64, ceiling_ml: f64) -> bool {
    amount_ml <= ceiling_ml
}

/// Result of [`filter_plausible`]: the kept subset plus the side-channel of drops.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlausibilityReport {
    pub ceiling_ml: f64,
    /// Plausible entries in their original order.
    pub kept: Vec<IntakeEntry>,
    /// Entries removed, in their original order.
    pub dropped: Vec<IntakeEntry>,
}

impl PlausibilityReport {
    pub fn dropped_count(&self) -> usize {
        self.dropped.len()
    }

    pub fn dropped_amounts(&self) -> Vec<f64> {
        self.dropped.iter().map(|e| e.amount_ml).collect()
    }

    /// Human-readable warning per dropped entry.
    pub fn warnings(&self) -> Vec<String> {
        self.dropped
            .iter()
            .map(|e| format!("filtered out unrealistic entry: {}ml on {}", e.amount_ml, e.date))
            .collect()
    }
}

/// Split `history` into plausible and dropped entries. Order is preserved;
/// `amount == ceiling_ml` is kept.
#[must_use]
pub fn filter_plausible(history: &[IntakeEntry], ceiling_ml: f64) -> PlausibilityReport {
    let (kept, dropped): (Vec<IntakeEntry>, Vec<IntakeEntry>) = history
        .iter()
        .cloned()
        .partition(|e| is_plausible(e.amount_ml, ceiling_ml));
    PlausibilityReport {
        ceiling_ml,
        kept,
        dropped,
    }
}

/// Sum of plausible entries dated `date`, clamped to `daily_cap_ml`.
#[must_use]
pub fn bounded_daily_total(
    history: &[IntakeEntry],
    date: NaiveDate,
    ceiling_ml: f64,
    daily_cap_ml: f64,
) -> f64 {
    let sum: f64 = history
        .iter()
        .filter(|e| e.date == date && is_plausible(e.amount_ml, ceiling_ml))
        .map(|e| e.amount_ml)
        .sum();
    sum.min(daily_cap_ml)
}

/// Read `user`'s history and filter it, logging a warning event when anything was dropped.
pub fn validated_history(
    store: &IntakeStore,
    user: &str,
    ceiling_ml: f64,
) -> Result<PlausibilityReport> {
    let history = store.history(user)?;
    let report = filter_plausible(&history, ceiling_ml);
    if !report.dropped.is_empty() {
        store.activity().record(&ActivityEvent::ImplausibleFiltered {
            user: Some(user.to_string()),
            ceiling_ml,
            dropped: report.dropped_amounts(),
        });
    }
    Ok(report)
}

/// Validated total for `user` on `date`.
///
/// Re-reads the full history rather than trusting [`IntakeStore::daily_total`],
/// so implausible rows still in the table never count.
pub fn validated_daily_total(
    store: &IntakeStore,
    user: &str,
    date: NaiveDate,
    limits: &LimitsConfig,
) -> Result<f64> {
    let history = store.history(user)?;
    Ok(bounded_daily_total(
        &history,
        date,
        limits.entry_ceiling_ml,
        limits.daily_cap_ml,
    ))
}

/// Explicit comparison of raw store figures against validated ones for one day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataQualityReport {
    pub user: String,
    pub date: NaiveDate,
    pub raw_entries: usize,
    pub plausible_entries: usize,
    /// `IntakeStore::daily_total`, unfiltered.
    pub raw_daily_total: f64,
    /// Plausible sum for the day before the cap.
    pub plausible_daily_sum: f64,
    /// Plausible sum after the cap.
    pub validated_daily_total: f64,
    /// Implausible entries across the whole history.
    pub flagged: Vec<IntakeEntry>,
}

impl DataQualityReport {
    /// No implausible rows anywhere in the user's history.
    pub fn is_clean(&self) -> bool {
        self.flagged.is_empty()
    }

    pub fn implausible_count(&self) -> usize {
        self.flagged.len()
    }

    /// Raw and validated totals for the day disagree.
    pub fn totals_diverge(&self) -> bool {
        (self.raw_daily_total - self.validated_daily_total).abs() > f64::EPSILON
    }

    /// The plausible sum hit the daily cap.
    pub fn total_clamped(&self) -> bool {
        self.plausible_daily_sum > self.validated_daily_total
    }
}

/// Build the [`DataQualityReport`] for `user` on `date`.
pub fn data_quality(
    store: &IntakeStore,
    user: &str,
    date: NaiveDate,
    limits: &LimitsConfig,
) -> Result<DataQualityReport> {
    let history = store.history(user)?;
    let raw_daily_total = store.daily_total(user, date)?;
    Ok(quality_from_history(
        user,
        &history,
        raw_daily_total,
        date,
        limits,
    ))
}

pub(crate) fn quality_from_history(
    user: &str,
    history: &[IntakeEntry],
    raw_daily_total: f64,
    date: NaiveDate,
    limits: &LimitsConfig,
) -> DataQualityReport {
    let report = filter_plausible(history, limits.entry_ceiling_ml);
    let plausible_daily_sum: f64 = report
        .kept
        .iter()
        .filter(|e| e.date == date)
        .map(|e| e.amount_ml)
        .sum();
    DataQualityReport {
        user: user.to_string(),
        date,
        raw_entries: history.len(),
        plausible_entries: report.kept.len(),
        raw_daily_total,
        plausible_daily_sum,
        validated_daily_total: plausible_daily_sum.min(limits.daily_cap_ml),
        flagged: report.dropped,
    }
}
