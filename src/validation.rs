use std::path::Path;

use crate::error::{EtlError, Result};

/// Upper bound on concurrent parser workers
pub const MAX_WORKERS: usize = 256;

fn invalid(message: impl Into<String>) -> EtlError {
    EtlError::InvalidInput(message.into())
}

/// Validation utilities for input sanitization and edge case handling
#[derive(Debug, Copy, Clone)]
pub struct InputValidator;

impl InputValidator {
    /// Validate the input directory; the only check whose failure stops a run
    pub fn validate_input_dir(path: &Path) -> Result<()> {
        if path.as_os_str().is_empty() {
            return Err(invalid("Input directory cannot be empty"));
        }

        if !path.exists() {
            return Err(invalid(format!(
                "Input directory does not exist: {}",
                path.display()
            )));
        }

        if !path.is_dir() {
            return Err(invalid(format!(
                "Input path is not a directory: {}",
                path.display()
            )));
        }

        Ok(())
    }

    /// Validate worker count
    pub fn validate_worker_count(workers: usize) -> Result<()> {
        if workers == 0 {
            return Err(invalid("Worker count must be greater than 0"));
        }

        if workers > MAX_WORKERS {
            return Err(invalid(format!(
                "Worker count too large (max {MAX_WORKERS})"
            )));
        }

        Ok(())
    }

    /// Validate a table name before it is interpolated into SQL
    pub fn validate_table_name(name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(invalid("Table name cannot be empty"));
        }

        if name.len() > 64 {
            return Err(invalid("Table name too long (max 64 characters)"));
        }

        let mut chars = name.chars();
        let starts_ok = chars
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
        if !starts_ok || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(invalid(format!("Table name contains invalid characters: {name}")));
        }

        Ok(())
    }

    /// Validate the archive file extension (no leading dot)
    pub fn validate_extension(extension: &str) -> Result<()> {
        if extension.trim().is_empty() {
            return Err(invalid("File extension cannot be empty"));
        }

        if extension.starts_with('.') {
            return Err(invalid("File extension must not start with '.'"));
        }

        if !extension.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(invalid("File extension contains invalid characters"));
        }

        Ok(())
    }
}
