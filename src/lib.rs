//! petty - follower and following snapshots
//!
//! This library captures the full set of accounts related to one user at a
//! point in time, stores each capture as an immutable snapshot, and compares
//! snapshots to find who started or stopped following.
//!
//! # Modules
//!
//! - [`model`] - Accounts, relationship rows, snapshots and diffs
//! - [`merge`] - Combining followers and following into relationship rows
//! - [`query`] - Filtering a snapshot by relationship category
//! - [`diff`] - Follower differences between two snapshots
//! - [`storage`] - `SQLite` snapshot store
//! - [`source`] - Where account lists come from
//! - [`worker`] - Running a capture off the calling thread
//! - [`error`] - Error types

pub mod cli;
pub mod config;
pub mod diff;
pub mod error;
pub mod logging;
pub mod merge;
pub mod model;
pub mod query;
pub mod source;
pub mod storage;
pub mod worker;

pub use cli::*;
pub use error::{PettyError, Result, format_error, format_petty_error};
pub use model::*;
pub use query::RelationshipFilter;
pub use source::{AccountSource, JsonFileSource, MemorySource};
pub use storage::Storage;

use chrono::{DateTime, Datelike, Utc};

/// Default database filename
pub const DEFAULT_DB_NAME: &str = "petty.db";

/// Standard width for dividers in CLI output
pub const DIVIDER_WIDTH: usize = 60;

/// Get the default data directory for petty
#[must_use]
pub fn default_data_dir() -> std::path::PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("petty")
}

/// Get the default database path
#[must_use]
pub fn default_db_path() -> std::path::PathBuf {
    default_data_dir().join(DEFAULT_DB_NAME)
}

/// Format an unsigned integer with thousands separators.
#[must_use]
pub fn format_number_u64(value: u64) -> String {
    let mut out = String::with_capacity(24);

    for (idx, ch) in value.to_string().chars().rev().enumerate() {
        if idx > 0 && idx % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }

    out.chars().rev().collect()
}

/// Format a usize with thousands separators.
#[must_use]
pub fn format_number_usize(value: usize) -> String {
    format_number_u64(u64::try_from(value).unwrap_or(u64::MAX))
}

/// Format a datetime as a human-friendly relative string.
///
/// - < 1 minute: "just now"
/// - < 1 hour: "Nm ago"
/// - < 24 hours: "Nh ago"
/// - < 7 days: "Nd ago"
/// - Same calendar year: "Mon D"
/// - Different year: "Mon D, YYYY"
#[must_use]
pub fn format_relative_date(dt: DateTime<Utc>) -> String {
    format_relative_date_with_base(dt, Utc::now())
}

/// Format a datetime relative to a fixed base time (useful for tests).
#[must_use]
pub fn format_relative_date_with_base(dt: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let duration = now.signed_duration_since(dt);

    if duration.num_seconds() < 0 {
        return dt.format("%b %d, %Y").to_string();
    }

    let seconds = duration.num_seconds();
    let minutes = duration.num_minutes();
    let hours = duration.num_hours();
    let days = duration.num_days();

    if seconds < 60 {
        "just now".to_string()
    } else if minutes < 60 {
        format!("{minutes}m ago")
    } else if hours < 24 {
        format!("{hours}h ago")
    } else if days < 7 {
        format!("{days}d ago")
    } else if dt.year() == now.year() {
        dt.format("%b %d").to_string()
    } else {
        dt.format("%b %d, %Y").to_string()
    }
}

/// Escape text for CSV by doubling quotes and flattening newlines.
#[must_use]
pub fn csv_escape_text(text: &str) -> String {
    text.replace('"', "\"\"").replace(['\n', '\r'], " ")
}

/// Quote one CSV field so embedded commas and quotes stay inside it.
#[must_use]
pub fn csv_field(text: &str) -> String {
    format!("\"{}\"", csv_escape_text(text))
}
