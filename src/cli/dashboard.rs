//! Text dashboard: goal gauge, daily sparkline, weekly block, achievements,
//! data-quality notices and feedback.
//!
//! Pure rendering of a [`DashboardSummary`]; no storage access happens here.

#![allow(missing_docs)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

use std::fmt::Write as _;

use colored::{ColoredString, Colorize};

use crate::cli::{PROGRESS_BAR_WIDTH, format_entry, format_ml, progress_bar};
use crate::feedback::Feedback;
use crate::validate::summary::{DashboardSummary, ProgressTier};

// ──────────────────── sparkline characters ────────────────────

/// Unicode block characters for sparkline rendering (8 levels).
const SPARK_CHARS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Days shown in the trend sparkline.
pub const SPARKLINE_DAYS: usize = 30;

// ──────────────────── color mapping ────────────────────

fn tier_colored(tier: ProgressTier) -> ColoredString {
    let msg = tier.message();
    match tier {
        ProgressTier::GoalAchieved => msg.green().bold(),
        ProgressTier::AlmostThere => msg.cyan(),
        ProgressTier::Halfway => msg.yellow(),
        ProgressTier::KeepDrinking => msg.red(),
    }
}

/// Sparkline over values normalized against `scale`.
fn render_sparkline(values: &[f64], scale: f64) -> String {
    if scale <= 0.0 {
        return String::new();
    }
    values
        .iter()
        .map(|v| {
            let idx = ((v / scale).clamp(0.0, 1.0) * 7.0).round() as usize;
            SPARK_CHARS[idx.min(7)]
        })
        .collect()
}

// ──────────────────── full render ────────────────────

/// Render the whole dashboard as multi-line text.
#[must_use]
pub fn render(summary: &DashboardSummary, ceiling_ml: f64) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} {} ({})",
        "Water Tracker".bold(),
        summary.user_id,
        summary.today
    );

    if let Some(reason) = &summary.storage_error {
        let _ = writeln!(out, "{} {reason}", "storage degraded:".yellow().bold());
    }

    let _ = writeln!(
        out,
        "\nToday   {} / {}  {} {:.0}%",
        format_ml(summary.today_total_ml),
        format_ml(summary.daily_goal_ml),
        progress_bar(summary.goal_progress, PROGRESS_BAR_WIDTH),
        summary.goal_progress * 100.0
    );
    let _ = writeln!(out, "        {}", tier_colored(summary.progress_tier));

    if summary.is_empty() {
        let _ = writeln!(
            out,
            "\nNo valid entries yet. Log your first drink with `wtr log 250`."
        );
    } else {
        let _ = writeln!(
            out,
            "\nAverage entry {}   Days tracked {}",
            format_ml(summary.average_entry_ml),
            summary.tracking_days
        );

        let tail_start = summary.daily_series.len().saturating_sub(SPARKLINE_DAYS);
        let tail: Vec<f64> = summary.daily_series[tail_start..]
            .iter()
            .map(|p| p.total_ml)
            .collect();
        let peak = tail.iter().copied().fold(summary.daily_goal_ml, f64::max);
        let _ = writeln!(out, "Trend   {}", render_sparkline(&tail, peak));

        if let Some(stats) = &summary.entry_stats {
            let _ = writeln!(
                out,
                "Entries {} valid, largest {}, smallest {}",
                stats.valid_entries,
                format_ml(stats.max_entry_ml),
                format_ml(stats.min_entry_ml)
            );
        }
    }

    match &summary.weekly {
        Some(week) => {
            let _ = writeln!(
                out,
                "\nThis week: {} in {} entries over {} days (avg {} per entry)",
                format_ml(week.total_ml),
                week.entries,
                week.days,
                format_ml(week.average_entry_ml)
            );
        }
        None => {
            let _ = writeln!(out, "\nNo data for the past week yet.");
        }
    }

    if !summary.achievements.is_empty() {
        let labels: Vec<&str> = summary.achievements.iter().map(|a| a.label()).collect();
        let _ = writeln!(out, "Achievements: {}", labels.join(", ").green());
    }

    if !summary.recent.is_empty() {
        let _ = writeln!(out, "\nRecent entries");
        for entry in &summary.recent {
            let _ = writeln!(out, "  {}", format_entry(entry, ceiling_ml));
        }
    }

    let quality = &summary.data_quality;
    if quality.implausible_count() > 0 {
        let _ = writeln!(
            out,
            "\n{} {} unrealistic entries filtered (over {}); run `wtr clean` to remove them",
            "note:".yellow().bold(),
            quality.implausible_count(),
            format_ml(ceiling_ml)
        );
    }
    if quality.totals_diverge() {
        let _ = writeln!(
            out,
            "{} raw total for today is {}, validated total is {}",
            "note:".yellow().bold(),
            format_ml(quality.raw_daily_total),
            format_ml(quality.validated_daily_total)
        );
    }

    match &summary.feedback {
        Some(Feedback::Available(text)) => {
            let _ = writeln!(out, "\n{} {text}", "Feedback:".blue().bold());
        }
        Some(Feedback::Unavailable(reason)) => {
            let _ = writeln!(out, "\n{} {reason}", "warning:".yellow().bold());
        }
        None => {}
    }

    out
}
