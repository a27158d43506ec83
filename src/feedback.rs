//! Hydration feedback for the most recently entered amount.
//!
//! The analyzer is an external collaborator; the tracker only needs
//! `analyze_intake(amount) -> text`. [`CannedAnalyzer`] is the built-in one.

use serde::Serialize;

use crate::core::errors::{Result, WtrError};
use crate::logger::activity::{ActivityEvent, ActivityLog};
use crate::validate::plausibility::is_plausible;

/// Source of free-text feedback about one intake amount.
pub trait IntakeAnalyzer {
    /// Feedback text for `amount_ml`.
    fn analyze_intake(&self, amount_ml: f64) -> Result<String>;
}

/// Fixed messages keyed on the size of the drink.
#[derive(Debug, Clone, Copy, Default)]
pub struct CannedAnalyzer;

impl IntakeAnalyzer for CannedAnalyzer {
    fn analyze_intake(&self, amount_ml: f64) -> Result<String> {
        if !amount_ml.is_finite() || amount_ml <= 0.0 {
            return Err(WtrError::Feedback {
                details: format!("no feedback for amount {amount_ml}"),
            });
        }
        let text = if amount_ml < 250.0 {
            "A small sip. Try to drink a full glass next time to keep your hydration steady."
        } else if amount_ml < 500.0 {
            "Nice glass of water! Regular glasses through the day keep you on track."
        } else if amount_ml < 1000.0 {
            "Great intake! That's a solid step toward your daily goal."
        } else if amount_ml <= 2000.0 {
            "That's a lot at once. Spreading intake across the day is easier on your body."
        } else {
            "Very large amount in one go. Drink steadily rather than all at once."
        };
        Ok(text.to_string())
    }
}

/// Feedback shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "text", rename_all = "snake_case")]
pub enum Feedback {
    Available(String),
    /// Analyzer failed; shown as an inline warning.
    Unavailable(String),
}

/// Ask `analyzer` about `amount_ml`. Returns `None` for amounts outside `(0, ceiling_ml]`;
/// analyzer errors become [`Feedback::Unavailable`] and never propagate.
pub fn feedback_for(
    analyzer: &dyn IntakeAnalyzer,
    amount_ml: f64,
    ceiling_ml: f64,
    activity: &ActivityLog,
) -> Option<Feedback> {
    if amount_ml <= 0.0 || !is_plausible(amount_ml, ceiling_ml) {
        return None;
    }
    Some(match analyzer.analyze_intake(amount_ml) {
        Ok(text) => Feedback::Available(text),
        Err(err) => {
            activity.record(&ActivityEvent::FeedbackFailed {
                amount_ml,
                message: err.to_string(),
            });
            Feedback::Unavailable(format!("feedback temporarily unavailable: {err}"))
        }
    })
}
