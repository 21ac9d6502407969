//! Core error types for eyebreak-core.
//!
//! This module defines the error hierarchy using thiserror. Configuration
//! read failures are not represented here: a missing or malformed phase
//! length falls back to the phase default and is never surfaced.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for eyebreak-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Alarm scheduling errors
    #[error("Alarm error: {0}")]
    Alarm(#[from] AlarmError),

    /// A phase tag received from an alarm payload did not name a known phase.
    ///
    /// Acting on an unknown phase would desynchronize the pending alarm from
    /// the in-memory cycle, so this is surfaced instead of being ignored.
    #[error("Unknown phase tag: {tag:?}")]
    UnknownPhase { tag: String },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
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

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

/// Alarm-backend errors.
#[derive(Error, Debug)]
pub enum AlarmError {
    /// The backend could not register the wake alarm
    #[error("Failed to schedule alarm: {0}")]
    ScheduleFailed(String),

    /// The backend could not cancel the pending wake alarm
    #[error("Failed to cancel alarm: {0}")]
    CancelFailed(String),
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
