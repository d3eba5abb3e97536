//! Core error types for wakeclock-core.
//!
//! This module defines the error hierarchy using thiserror. Most holiday
//! data failures never surface here at all -- the oracle is best-effort by
//! contract -- but scheduling failures do, because an alarm that cannot be
//! registered is a critical user-facing failure.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for wakeclock-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Platform scheduler errors
    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// Platform scheduler errors.
///
/// `NotAuthorized` is kept distinct so callers can surface a permission
/// problem to the user instead of silently dropping an alarm registration.
#[derive(Error, Debug)]
pub enum SchedulerError {
    /// The platform refused the registration for lack of permission
    #[error("Not authorized to schedule exact alarms")]
    NotAuthorized,

    /// The platform rejected the request for any other reason
    #[error("Platform scheduler rejected '{handle}': {message}")]
    Rejected { handle: String, message: String },
}

/// Validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Time-of-day string does not parse to HH:mm within range
    #[error("Invalid time-of-day '{0}': expected HH:mm")]
    InvalidTimeOfDay(String),

    /// Weekday index outside 0..=6
    #[error("Invalid weekday index {0}: expected 0 (Sunday) to 6 (Saturday)")]
    InvalidWeekday(u8),

    /// Unknown enum tag at the storage boundary
    #[error("Unknown {kind} tag '{value}'")]
    UnknownTag { kind: &'static str, value: String },
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(err, _msg) => {
                if err.code == rusqlite::ErrorCode::DatabaseLocked {
                    DatabaseError::Locked
                } else {
                    DatabaseError::QueryFailed(err.to_string())
                }
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Database(err.into())
    }
}

impl From<Box<dyn std::error::Error + Send + Sync>> for CoreError {
    fn from(err: Box<dyn std::error::Error + Send + Sync>) -> Self {
        CoreError::Custom(err.to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
