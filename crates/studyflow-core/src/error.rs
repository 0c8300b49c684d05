//! Core error types for studyflow-core.
//!
//! State-machine transitions are infallible apart from a duplicate start;
//! everything else that can fail is persistence-adjacent and surfaces here.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for studyflow-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// No user context when persistence was attempted
    #[error("Not authenticated: no active user")]
    NotAuthenticated,

    /// `start()` while a countdown is already running
    #[error("Timer is already running")]
    AlreadyRunning,

    /// Second finalization of the same session record
    #[error("Session {session_id} is already finalized")]
    AlreadyFinalized { session_id: i64 },

    /// Completion requested for an id the store does not know
    #[error("Session {0} not found")]
    SessionNotFound(i64),

    #[error("Routine {0} not found")]
    RoutineNotFound(i64),

    /// Transient failure reported by the external store
    #[error("Persistence failure: {0}")]
    PersistenceFailure(#[from] DatabaseError),

    /// Non-positive or non-numeric duration input
    #[error("Invalid duration: {0}")]
    InvalidDuration(String),

    /// Calendar input that names no real day or month
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    /// True for errors that come from the store rather than from caller misuse.
    pub fn is_persistence(&self) -> bool {
        matches!(self, CoreError::PersistenceFailure(_))
    }
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

    /// Stored row could not be decoded
    #[error("Corrupt row in {table}: {message}")]
    CorruptRow { table: String, message: String },

    /// Database is locked
    #[error("Database is locked")]
    Locked,

    /// Connection mutex was poisoned by a panicking holder
    #[error("Database connection poisoned")]
    Poisoned,
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

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _msg) => {
                if e.code == rusqlite::ErrorCode::DatabaseLocked
                    || e.code == rusqlite::ErrorCode::DatabaseBusy
                {
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
        CoreError::PersistenceFailure(err.into())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
