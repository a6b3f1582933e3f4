//! Error types for the mail-archive-etl library.
//!
//! This module provides custom error types using `thiserror` for better error handling
//! and more specific error messages throughout the pipeline. Most of these never escape
//! a single file: the parser and dispatcher turn them into empty contributions.

use thiserror::Error;

/// Errors that can occur while extracting, linking or loading email archives.
#[derive(Error, Debug)]
pub enum EtlError {
    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// MIME structure could not be parsed
    #[error("Failed to parse email structure: {0}")]
    Mime(#[from] mailparse::MailParseError),

    /// Structural problem with a source file that mailparse accepted
    #[error("Malformed email: {0}")]
    Structure(String),

    /// A MIME part payload could not be decoded
    #[error("Failed to decode content: {0}")]
    Decode(String),

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Connection pool errors
    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// CSV writing errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Configuration source errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Reference time zone name not recognised
    #[error("Invalid time zone: {0}")]
    InvalidTimezone(String),

    /// Rejected user input (paths, table names, worker counts)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A worker task died before reporting its result
    #[error("Worker failed: {0}")]
    Worker(String),

    /// General error with context
    #[error("{0}")]
    Other(String),
}

/// Convenience type alias for Result with `EtlError`
pub type Result<T> = std::result::Result<T, EtlError>;

impl From<anyhow::Error> for EtlError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
