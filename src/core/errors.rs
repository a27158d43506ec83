//! WTR-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, WtrError>;

/// Top-level error type for the water tracker.
#[derive(Debug, Error)]
pub enum WtrError {
    #[error("[WTR-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[WTR-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[WTR-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[WTR-2001] invalid intake input: {details}")]
    InvalidInput { details: String },

    #[error("[WTR-2002] unparseable date {value:?}: expected YYYY-MM-DD")]
    InvalidDate { value: String },

    #[error("[WTR-2101] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[WTR-2102] SQL failure in {context}: {details}")]
    Sql {
        context: &'static str,
        details: String,
    },

    #[error("[WTR-2201] schema repair failed: {details}")]
    Schema { details: String },

    #[error("[WTR-2202] feedback unavailable: {details}")]
    Feedback { details: String },

    #[error("[WTR-3002] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl WtrError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "WTR-1001",
            Self::MissingConfig { .. } => "WTR-1002",
            Self::ConfigParse { .. } => "WTR-1003",
            Self::InvalidInput { .. } => "WTR-2001",
            Self::InvalidDate { .. } => "WTR-2002",
            Self::Serialization { .. } => "WTR-2101",
            Self::Sql { .. } => "WTR-2102",
            Self::Schema { .. } => "WTR-2201",
            Self::Feedback { .. } => "WTR-2202",
            Self::Io { .. } => "WTR-3002",
        }
    }

    /// Whether retrying might resolve the failure.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Io { .. } | Self::Sql { .. } | Self::Feedback { .. })
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// SQL failure tagged with the store operation that raised it.
    #[must_use]
    pub fn sql(context: &'static str, source: &rusqlite::Error) -> Self {
        Self::Sql {
            context,
            details: source.to_string(),
        }
    }
}

impl From<rusqlite::Error> for WtrError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sql {
            context: "rusqlite",
            details: value.to_string(),
        }
    }
}

impl From<serde_json::Error> for WtrError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for WtrError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_variants() -> Vec<WtrError> {
        vec![
            WtrError::InvalidConfig {
                details: String::new(),
            },
            WtrError::MissingConfig {
                path: PathBuf::new(),
            },
            WtrError::ConfigParse {
                context: "",
                details: String::new(),
            },
            WtrError::InvalidInput {
                details: String::new(),
            },
            WtrError::InvalidDate {
                value: String::new(),
            },
            WtrError::Serialization {
                context: "",
                details: String::new(),
            },
            WtrError::Sql {
                context: "",
                details: String::new(),
            },
            WtrError::Schema {
                details: String::new(),
            },
            WtrError::Feedback {
                details: String::new(),
            },
            WtrError::Io {
                path: PathBuf::new(),
                source: std::io::Error::other("test"),
            },
        ]
    }

    #[test]
    fn error_codes_are_unique() {
        let errors = all_variants();
        let codes: Vec<&str> = errors.iter().map(WtrError::code).collect();
        let unique: std::collections::HashSet<&&str> = codes.iter().collect();
        assert_eq!(
            codes.len(),
            unique.len(),
            "error codes must be unique: {codes:?}"
        );
    }

    #[test]
    fn display_includes_code_for_every_variant() {
        for err in all_variants() {
            let msg = err.to_string();
            assert!(
                msg.contains(err.code()),
                "display should contain error code {}: {msg}",
                err.code()
            );
            assert!(err.code().starts_with("WTR-"));
        }
    }

    #[test]
    fn retryable_errors_are_correct() {
        assert!(
            WtrError::Sql {
                context: "",
                details: String::new()
            }
            .is_retryable()
        );
        assert!(
            WtrError::Feedback {
                details: String::new()
            }
            .is_retryable()
        );
        assert!(
            !WtrError::InvalidInput {
                details: String::new()
            }
            .is_retryable()
        );
        assert!(
            !WtrError::Schema {
                details: String::new()
            }
            .is_retryable()
        );
    }

    #[test]
    fn from_rusqlite_error() {
        let sql_err =
            rusqlite::Error::SqliteFailure(rusqlite::ffi::Error::new(1), Some("test".to_string()));
        let err: WtrError = sql_err.into();
        assert_eq!(err.code(), "WTR-2102");
    }

    #[test]
    fn sql_constructor_keeps_context() {
        let err = WtrError::sql("history", &rusqlite::Error::InvalidQuery);
        assert!(err.to_string().contains("history"));
    }

    #[test]
    fn from_toml_error() {
        let toml_err = toml::from_str::<toml::Value>("= invalid").unwrap_err();
        let err: WtrError = toml_err.into();
        assert_eq!(err.code(), "WTR-1003");
    }
}
