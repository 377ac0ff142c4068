//! Custom error types for petty.
//!
//! The variants fall into three kinds that callers are expected to tell apart
//! without string matching:
//!
//! - store errors: the database is unreachable, corrupt, or rejected a write
//! - not found: a referenced snapshot does not exist
//! - validation: an incoming account record is missing a required field
//!
//! Everything else (account files, configuration) is reported with enough
//! context to fix the input by hand.

use std::path::PathBuf;
use thiserror::Error;

/// Primary error type for petty operations.
#[derive(Error, Debug)]
pub enum PettyError {
    // =========================================================================
    // Store Errors
    // =========================================================================
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Database file could not be opened or initialized.
    #[error("Failed to open database at '{path}': {source}")]
    DatabaseOpen {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Directory for the database file could not be created.
    #[error("Failed to create database directory '{path}': {source}")]
    DatabaseDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Database was written by a newer petty.
    #[error("Database schema version mismatch: expected {expected}, found {found}")]
    SchemaMismatch { expected: i32, found: i32 },

    // =========================================================================
    // Lookup Errors
    // =========================================================================
    /// Referenced item does not exist.
    #[error("{item_type} with ID '{id}' not found")]
    NotFound { item_type: &'static str, id: String },

    // =========================================================================
    // Validation Errors
    // =========================================================================
    /// An account record in a capture batch is incomplete.
    #[error("Invalid account at {list}[{index}]: {reason}")]
    Validation {
        list: &'static str,
        index: usize,
        reason: String,
    },

    // =========================================================================
    // Account Source Errors
    // =========================================================================
    /// Failed to parse an account list file.
    #[error("Failed to parse '{file}': {reason}")]
    ParseError { file: String, reason: String },

    /// File read/write error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Path-specific IO error with context.
    #[error("Failed to {operation} '{path}': {source}")]
    PathError {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Configuration file could not be read or written.
    #[error("Invalid configuration in '{path}': {reason}")]
    ConfigError { path: PathBuf, reason: String },

    /// Configuration values failed validation.
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    /// Background task ended without delivering a result.
    #[error("Background task failed: {reason}")]
    TaskFailed { reason: String },
}

/// Result type alias for petty operations.
pub type Result<T> = std::result::Result<T, PettyError>;

impl PettyError {
    /// Create a not found error.
    pub fn not_found(item_type: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            item_type,
            id: id.to_string(),
        }
    }

    /// Create a snapshot not found error.
    pub fn snapshot_not_found(id: impl ToString) -> Self {
        Self::not_found("Snapshot", id)
    }

    /// Create a validation error for one record of a capture batch.
    pub fn validation(list: &'static str, index: usize, reason: impl Into<String>) -> Self {
        Self::Validation {
            list,
            index,
            reason: reason.into(),
        }
    }

    /// Create a parse error.
    pub fn parse_error(file: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ParseError {
            file: file.into(),
            reason: reason.into(),
        }
    }

    /// Create a path error with context.
    pub fn path_error(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::PathError {
            operation,
            path: path.into(),
            source,
        }
    }

    /// Create an invalid configuration error.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Persistence was unreachable, corrupt, or rejected a write.
    #[must_use]
    pub const fn is_store_error(&self) -> bool {
        matches!(
            self,
            Self::Database(_)
                | Self::DatabaseOpen { .. }
                | Self::DatabaseDirectory { .. }
                | Self::SchemaMismatch { .. }
        )
    }

    /// A referenced item does not exist.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// A capture batch was rejected before anything was written.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// Get a suggestion for how to fix this error, if applicable.
    #[must_use]
    pub const fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::NotFound { .. } => Some("Run 'petty list' to see the available snapshots."),
            Self::Validation { .. } => {
                Some("Every account needs a non-empty id and username. Fix the input and retry.")
            }
            Self::SchemaMismatch { .. } => {
                Some("Upgrade petty, or point --db at a database created by this version.")
            }
            Self::DatabaseOpen { .. } | Self::DatabaseDirectory { .. } => {
                Some("Check that the database directory exists and is writable.")
            }
            Self::InvalidConfig { .. } | Self::ConfigError { .. } => {
                Some("Run 'petty config --show' to inspect the effective configuration.")
            }
            _ => None,
        }
    }
}

// =============================================================================
// CLI Error Formatting Utilities
// =============================================================================

use colored::Colorize;

/// Format a structured CLI error with explanation and suggestions.
///
/// # Arguments
/// * `title` - Brief error title (e.g., "Snapshot not found")
/// * `explanation` - What went wrong and why
/// * `suggestions` - List of actionable suggestions
#[must_use]
pub fn format_error(title: &str, explanation: &str, suggestions: &[&str]) -> String {
    use std::fmt::Write;

    let mut output = format!("{} {}", "✗".red().bold(), title.bold());

    if !explanation.is_empty() {
        let _ = write!(output, "\n\n   {explanation}");
    }

    if !suggestions.is_empty() {
        output.push_str("\n\n   ");
        if suggestions.len() == 1 {
            let _ = write!(output, "{} {}", "Hint:".cyan(), suggestions[0]);
        } else {
            let _ = write!(output, "{}:", "Try".cyan());
            for suggestion in suggestions {
                let _ = write!(output, "\n     {} {}", "•".dimmed(), suggestion);
            }
        }
    }

    output
}

/// Render a petty error for the terminal, attaching its suggestion if any.
#[must_use]
pub fn format_petty_error(err: &PettyError) -> String {
    let title = if err.is_not_found() {
        "Not found"
    } else if err.is_validation() {
        "Rejected capture"
    } else if err.is_store_error() {
        "Storage failure"
    } else {
        "Error"
    };

    let suggestions: Vec<&str> = err.suggestion().into_iter().collect();
    format_error(title, &err.to_string(), &suggestions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = PettyError::snapshot_not_found(42);
        assert_eq!(err.to_string(), "Snapshot with ID '42' not found");
        assert!(err.is_not_found());
        assert!(!err.is_store_error());
    }

    #[test]
    fn test_validation_display() {
        let err = PettyError::validation("followers", 3, "missing username");
        assert!(err.to_string().contains("followers[3]"));
        assert!(err.is_validation());
        assert!(err.suggestion().is_some());
    }

    #[test]
    fn test_from_rusqlite_error_is_store_error() {
        let err: PettyError = rusqlite::Error::InvalidQuery.into();
        assert!(err.is_store_error());
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: PettyError = io_err.into();
        assert!(matches!(err, PettyError::Io(_)));
    }

    #[test]
    fn format_error_single_suggestion() {
        let output = format_error("Test Error", "Something went wrong", &["Try this"]);
        assert!(output.contains("Test Error"));
        assert!(output.contains("Something went wrong"));
        assert!(output.contains("Try this"));
    }

    #[test]
    fn format_error_multiple_suggestions() {
        let output = format_error(
            "Test Error",
            "Something went wrong",
            &["First option", "Second option"],
        );
        assert!(output.contains("First option"));
        assert!(output.contains("Second option"));
    }

    #[test]
    fn format_petty_error_includes_hint() {
        let output = format_petty_error(&PettyError::snapshot_not_found(7));
        assert!(output.contains("Not found"));
        assert!(output.contains("petty list"));
    }
}
