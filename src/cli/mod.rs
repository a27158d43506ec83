//! Human-readable rendering shared by the `wtr` subcommands.

#![allow(missing_docs)]

pub mod dashboard;

use colored::Colorize;

use crate::store::intake::IntakeEntry;

/// Width of the goal progress bar in cells.
pub const PROGRESS_BAR_WIDTH: usize = 30;

/// Whole millilitres with a unit, e.g. `1250 ml`.
#[must_use]
pub fn format_ml(amount_ml: f64) -> String {
    format!("{amount_ml:.0} ml")
}

/// `[█████░░░░░]` style bar for a fraction in `[0, 1]`.
#[must_use]
pub fn progress_bar(fraction: f64, width: usize) -> String {
    let fraction = if fraction.is_finite() {
        fraction.clamp(0.0, 1.0)
    } else {
        0.0
    };
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let filled = ((fraction * width as f64).round() as usize).min(width);
    format!("[{}{}]", "█".repeat(filled), "░".repeat(width - filled))
}

/// One history row: `2024-01-01    250 ml`. Rows above `ceiling_ml` are highlighted.
#[must_use]
pub fn format_entry(entry: &IntakeEntry, ceiling_ml: f64) -> String {
    let amount = format!("{:>10}", format_ml(entry.amount_ml));
    let amount = if entry.amount_ml > ceiling_ml || entry.amount_ml < 0.0 {
        amount.red().to_string()
    } else {
        amount
    };
    format!("{}  {amount}", entry.date)
}

/// Stderr notice shown when a read had to fall back to empty data.
pub fn print_storage_degraded(reason: &str) {
    eprintln!(
        "{} storage degraded, showing empty data: {reason}",
        "warning:".yellow().bold()
    );
}
