//! Core types: errors, configuration, calendar-day helpers.

pub mod config;
pub mod dates;
pub mod errors;
