//! Dashboard summary: metrics derived from validated history only.
//!
//! The dashboard state (who is looking, which day, last amount entered) is an
//! explicit value handed in by the caller.

#![allow(missing_docs)]

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Duration, NaiveDate};
use serde::Serialize;

use crate::core::config::{Config, GoalsConfig, LimitsConfig};
use crate::core::dates::today;
use crate::feedback::{Feedback, IntakeAnalyzer, feedback_for};
use crate::logger::activity::ActivityEvent;
use crate::store::intake::{IntakeEntry, IntakeStore};
use crate::validate::plausibility::{DataQualityReport, filter_plausible, quality_from_history};

/// Entries listed in the "recent" section.
pub const RECENT_ENTRIES: usize = 10;
/// Days covered by the weekly summary, today included.
pub const WEEK_DAYS: i64 = 7;

/// Explicit presentation state.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardState {
    pub user_id: String,
    pub today: NaiveDate,
    /// Amount the feedback panel comments on. When unset, the most recent
    /// valid entry is used.
    pub last_amount_ml: Option<f64>,
}

impl DashboardState {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            today: today(),
            last_amount_ml: None,
        }
    }

    #[must_use]
    pub fn on(mut self, date: NaiveDate) -> Self {
        self.today = date;
        self
    }

    #[must_use]
    pub fn with_last_amount(mut self, amount_ml: f64) -> Self {
        self.last_amount_ml = Some(amount_ml);
        self
    }
}

/// How close today's total is to the goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressTier {
    GoalAchieved,
    AlmostThere,
    Halfway,
    KeepDrinking,
}

impl ProgressTier {
    #[must_use]
    pub fn from_progress(progress: f64) -> Self {
        if progress >= 1.0 {
            Self::GoalAchieved
        } else if progress >= 0.75 {
            Self::AlmostThere
        } else if progress >= 0.5 {
            Self::Halfway
        } else {
            Self::KeepDrinking
        }
    }

    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::GoalAchieved => "Daily goal achieved! You're doing amazing!",
            Self::AlmostThere => "Almost there! You're at 75% of your goal",
            Self::Halfway => "Halfway there! Keep going!",
            Self::KeepDrinking => "Keep drinking! You're below 50% of your goal",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Achievement {
    DailyGoal,
    SevenEntries,
    ThirtyEntries,
}

impl Achievement {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::DailyGoal => "Daily Goal Achieved",
            Self::SevenEntries => "7-Day Streak",
            Self::ThirtyEntries => "Monthly Tracker",
        }
    }
}

/// One point of the per-day trend.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DailyPoint {
    pub date: NaiveDate,
    pub total_ml: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WeeklySummary {
    pub entries: usize,
    pub days: usize,
    pub total_ml: f64,
    pub average_entry_ml: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EntryStats {
    pub valid_entries: usize,
    pub max_entry_ml: f64,
    pub min_entry_ml: f64,
}

/// Everything the dashboard renders.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub user_id: String,
    pub today: NaiveDate,
    /// Set when the store could not be read; figures then describe an empty history.
    pub storage_error: Option<String>,
    pub today_total_ml: f64,
    pub daily_goal_ml: f64,
    pub goal_progress: f64,
    pub progress_tier: ProgressTier,
    pub average_entry_ml: f64,
    pub tracking_days: usize,
    pub daily_series: Vec<DailyPoint>,
    pub weekly: Option<WeeklySummary>,
    pub entry_stats: Option<EntryStats>,
    pub achievements: Vec<Achievement>,
    pub recent: Vec<IntakeEntry>,
    pub data_quality: DataQualityReport,
    pub feedback: Option<Feedback>,
}

impl DashboardSummary {
    pub fn storage_degraded(&self) -> bool {
        self.storage_error.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.entry_stats.is_none()
    }
}

/// Pure summary over an already-read history.
#[must_use]
pub fn summarize(
    history: &[IntakeEntry],
    raw_daily_total: f64,
    state: &DashboardState,
    limits: &LimitsConfig,
    goals: &GoalsConfig,
) -> DashboardSummary {
    let valid = filter_plausible(history, limits.entry_ceiling_ml).kept;
    let data_quality =
        quality_from_history(&state.user_id, history, raw_daily_total, state.today, limits);

    let today_total_ml = data_quality.validated_daily_total;
    let goal_progress = (today_total_ml / goals.daily_goal_ml).min(1.0);

    let average_entry_ml = if valid.is_empty() {
        0.0
    } else {
        (valid.iter().map(|e| e.amount_ml).sum::<f64>() / valid.len() as f64)
            .min(limits.entry_ceiling_ml)
    };

    let tracking_days = valid.iter().map(|e| e.date).collect::<BTreeSet<_>>().len();

    let mut per_day: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for e in &valid {
        *per_day.entry(e.date).or_insert(0.0) += e.amount_ml;
    }
    let daily_series = per_day
        .into_iter()
        .map(|(date, total)| DailyPoint {
            date,
            total_ml: total.min(limits.daily_cap_ml),
        })
        .collect();

    let mut achievements = Vec::new();
    if today_total_ml >= goals.daily_goal_ml {
        achievements.push(Achievement::DailyGoal);
    }
    if valid.len() >= 7 {
        achievements.push(Achievement::SevenEntries);
    }
    if valid.len() >= 30 {
        achievements.push(Achievement::ThirtyEntries);
    }

    DashboardSummary {
        user_id: state.user_id.clone(),
        today: state.today,
        storage_error: None,
        today_total_ml,
        daily_goal_ml: goals.daily_goal_ml,
        goal_progress,
        progress_tier: ProgressTier::from_progress(goal_progress),
        average_entry_ml,
        tracking_days,
        daily_series,
        weekly: weekly_summary(&valid, state.today),
        entry_stats: entry_stats(&valid),
        achievements,
        recent: valid.iter().take(RECENT_ENTRIES).cloned().collect(),
        data_quality,
        feedback: None,
    }
}

/// Read the store and build the summary, degrading read failures to an empty
/// history flagged through [`DashboardSummary::storage_error`].
pub fn load_dashboard(
    store: &IntakeStore,
    state: &DashboardState,
    config: &Config,
    analyzer: &dyn IntakeAnalyzer,
) -> DashboardSummary {
    let read = store.history(&state.user_id).and_then(|history| {
        store
            .daily_total(&state.user_id, state.today)
            .map(|raw| (history, raw))
    });
    let (history, raw_daily_total, storage_error) = match read {
        Ok((history, raw)) => (history, raw, None),
        Err(err) => (Vec::new(), 0.0, Some(err.to_string())),
    };

    let mut summary = summarize(
        &history,
        raw_daily_total,
        state,
        &config.limits,
        &config.goals,
    );
    summary.storage_error = storage_error;

    if !summary.data_quality.flagged.is_empty() {
        store.activity().record(&ActivityEvent::ImplausibleFiltered {
            user: Some(state.user_id.clone()),
            ceiling_ml: config.limits.entry_ceiling_ml,
            dropped: summary
                .data_quality
                .flagged
                .iter()
                .map(|e| e.amount_ml)
                .collect(),
        });
    }

    let last_amount = state
        .last_amount_ml
        .or_else(|| summary.recent.first().map(|e| e.amount_ml));
    summary.feedback = last_amount.and_then(|amount| {
        feedback_for(
            analyzer,
            amount,
            config.limits.entry_ceiling_ml,
            store.activity(),
        )
    });
    summary
}

fn weekly_summary(valid: &[IntakeEntry], today: NaiveDate) -> Option<WeeklySummary> {
    let since = today - Duration::days(WEEK_DAYS - 1);
    let week: Vec<&IntakeEntry> = valid.iter().filter(|e| e.date >= since).collect();
    if week.is_empty() {
        return None;
    }
    let total_ml: f64 = week.iter().map(|e| e.amount_ml).sum();
    Some(WeeklySummary {
        entries: week.len(),
        days: week.iter().map(|e| e.date).collect::<BTreeSet<_>>().len(),
        total_ml,
        average_entry_ml: total_ml / week.len() as f64,
    })
}

fn entry_stats(valid: &[IntakeEntry]) -> Option<EntryStats> {
    let first = valid.first()?;
    let (min, max) = valid.iter().fold((first.amount_ml, first.amount_ml), |(lo, hi), e| {
        (lo.min(e.amount_ml), hi.max(e.amount_ml))
    });
    Some(EntryStats {
        valid_entries: valid.len(),
        max_entry_ml: max,
        min_entry_ml: min,
    })
}
