//! Configuration system: TOML file + env var overrides + smart defaults.

#![allow(missing_docs)]

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, WtrError};

/// Single-entry ceiling: the largest amount accepted as one legitimate drink.
pub const DEFAULT_ENTRY_CEILING_ML: f64 = 5_000.0;
/// Display cap for one user's total on one day.
pub const DEFAULT_DAILY_CAP_ML: f64 = 10_000.0;
/// Standard daily hydration goal.
pub const DEFAULT_DAILY_GOAL_ML: f64 = 2_000.0;
/// Database file name used when no path is configured.
pub const DEFAULT_DB_FILE_NAME: &str = "water_tracker.db";

/// Full tracker configuration model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub limits: LimitsConfig,
    pub goals: GoalsConfig,
    pub user: UserConfig,
    pub paths: PathsConfig,
}

/// Plausibility bounds applied by the validator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LimitsConfig {
    /// Inclusive upper bound for a single entry.
    pub entry_ceiling_ml: f64,
    /// Clamp applied to a validated daily total.
    pub daily_cap_ml: f64,
}

/// Hydration goals used by the dashboard summary.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GoalsConfig {
    pub daily_goal_ml: f64,
}

/// Identity used when the CLI is invoked without `--user`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct UserConfig {
    pub default_user: String,
}

/// Filesystem paths used by wtr.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PathsConfig {
    pub config_file: PathBuf,
    pub sqlite_db: PathBuf,
    pub jsonl_log: PathBuf,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            entry_ceiling_ml: DEFAULT_ENTRY_CEILING_ML,
            daily_cap_ml: DEFAULT_DAILY_CAP_ML,
        }
    }
}

impl Default for GoalsConfig {
    fn default() -> Self {
        Self {
            daily_goal_ml: DEFAULT_DAILY_GOAL_ML,
        }
    }
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            default_user: "user_123".to_string(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        let home_dir = env::var_os("HOME").map_or_else(
            || {
                eprintln!(
                    "[WTR-CONFIG] WARNING: HOME not set, falling back to /tmp for data paths"
                );
                PathBuf::from("/tmp")
            },
            PathBuf::from,
        );
        let cfg = home_dir.join(".config").join("wtr").join("config.toml");
        let data = home_dir.join(".local").join("share").join("wtr");
        Self {
            config_file: cfg,
            sqlite_db: data.join(DEFAULT_DB_FILE_NAME),
            jsonl_log: data.join("activity.jsonl"),
        }
    }
}

impl Config {
    /// Default configuration path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        PathsConfig::default().config_file
    }

    /// Load config from default or explicit path, then apply env overrides.
    ///
    /// Missing config file is not an error when loading from default path; defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path_buf = path.map_or_else(Self::default_path, Path::to_path_buf);
        let is_explicit_path = path.is_some();

        let mut cfg = if path_buf.exists() {
            let raw = fs::read_to_string(&path_buf).map_err(|source| WtrError::Io {
                path: path_buf.clone(),
                source,
            })?;
            let parsed: Self = toml::from_str(&raw)?;
            parsed
        } else if is_explicit_path {
            return Err(WtrError::MissingConfig { path: path_buf });
        } else {
            Self::default()
        };

        cfg.paths.config_file = path_buf;
        cfg.apply_env_overrides_from(env_var)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Deterministic hash of the effective config for the activity log.
    ///
    /// FNV-1a over the canonical JSON form, stable across processes.
    pub fn stable_hash(&self) -> Result<String> {
        let canonical = serde_json::to_string(self)?;
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in canonical.as_bytes() {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        Ok(format!("{hash:016x}"))
    }

    fn apply_env_overrides_from<F>(&mut self, mut lookup: F) -> Result<()>
    where
        F: FnMut(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("WTR_SQLITE_DB") {
            self.paths.sqlite_db = PathBuf::from(raw);
        }
        if let Some(raw) = lookup("WTR_JSONL_LOG") {
            self.paths.jsonl_log = PathBuf::from(raw);
        }
        if let Some(raw) = lookup("WTR_ENTRY_CEILING_ML") {
            self.limits.entry_ceiling_ml = parse_env_f64("WTR_ENTRY_CEILING_ML", &raw)?;
        }
        if let Some(raw) = lookup("WTR_DAILY_CAP_ML") {
            self.limits.daily_cap_ml = parse_env_f64("WTR_DAILY_CAP_ML", &raw)?;
        }
        if let Some(raw) = lookup("WTR_DAILY_GOAL_ML") {
            self.goals.daily_goal_ml = parse_env_f64("WTR_DAILY_GOAL_ML", &raw)?;
        }
        if let Some(raw) = lookup("WTR_DEFAULT_USER") {
            self.user.default_user = raw.trim().to_string();
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        for (name, val) in [
            ("limits.entry_ceiling_ml", self.limits.entry_ceiling_ml),
            ("limits.daily_cap_ml", self.limits.daily_cap_ml),
            ("goals.daily_goal_ml", self.goals.daily_goal_ml),
        ] {
            if !val.is_finite() || val <= 0.0 {
                return Err(WtrError::InvalidConfig {
                    details: format!("{name} must be a positive number, got {val}"),
                });
            }
        }

        if self.limits.daily_cap_ml < self.limits.entry_ceiling_ml {
            return Err(WtrError::InvalidConfig {
                details: format!(
                    "limits.daily_cap_ml ({}) must be >= limits.entry_ceiling_ml ({})",
                    self.limits.daily_cap_ml, self.limits.entry_ceiling_ml
                ),
            });
        }

        if self.user.default_user.is_empty() {
            return Err(WtrError::InvalidConfig {
                details: "user.default_user must not be empty".to_string(),
            });
        }

        if self.paths.sqlite_db.as_os_str().is_empty() {
            return Err(WtrError::InvalidConfig {
                details: "paths.sqlite_db must not be empty".to_string(),
            });
        }

        Ok(())
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|raw| !raw.trim().is_empty())
}

fn parse_env_f64(name: &str, raw: &str) -> Result<f64> {
    raw.trim()
        .parse::<f64>()
        .map_err(|error| WtrError::ConfigParse {
            context: "env",
            details: format!("{name}={raw:?}: {error}"),
        })
}
