//! Account sources.
//!
//! A source hands over the two fully materialized lists of one capture. The
//! file source reads JSON arrays of account objects shaped like the remote
//! API returns them:
//!
//! ```json
//! [{"id": "109", "username": "alice", "display_name": "Alice", "url": "https://example.social/@alice"}]
//! ```
//!
//! `account_id` is accepted in place of `id`, so petty's own JSON output can
//! be fed back in. Records are not validated here; incomplete records are
//! rejected as a batch when the snapshot is created.

use crate::error::{PettyError, Result};
use crate::model::Account;
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Supplier of the followers and following lists for one capture.
pub trait AccountSource {
    /// Accounts that follow the tracked user.
    ///
    /// # Errors
    ///
    /// Returns an error if the list cannot be obtained.
    fn fetch_followers(&self) -> Result<Vec<Account>>;

    /// Accounts the tracked user follows.
    ///
    /// # Errors
    ///
    /// Returns an error if the list cannot be obtained.
    fn fetch_following(&self) -> Result<Vec<Account>>;
}

/// Reads both lists from JSON files on disk.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    followers: PathBuf,
    following: PathBuf,
}

impl JsonFileSource {
    pub fn new(followers: impl Into<PathBuf>, following: impl Into<PathBuf>) -> Self {
        Self {
            followers: followers.into(),
            following: following.into(),
        }
    }
}

impl AccountSource for JsonFileSource {
    fn fetch_followers(&self) -> Result<Vec<Account>> {
        read_account_file(&self.followers)
    }

    fn fetch_following(&self) -> Result<Vec<Account>> {
        read_account_file(&self.following)
    }
}

/// Lists already held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    pub followers: Vec<Account>,
    pub following: Vec<Account>,
}

impl MemorySource {
    #[must_use]
    pub const fn new(followers: Vec<Account>, following: Vec<Account>) -> Self {
        Self {
            followers,
            following,
        }
    }
}

impl AccountSource for MemorySource {
    fn fetch_followers(&self) -> Result<Vec<Account>> {
        Ok(self.followers.clone())
    }

    fn fetch_following(&self) -> Result<Vec<Account>> {
        Ok(self.following.clone())
    }
}

#[derive(Debug, Deserialize)]
struct RawAccount {
    #[serde(default, alias = "account_id")]
    id: Option<Value>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

impl RawAccount {
    fn into_account(self) -> Account {
        // Remote ids may arrive as strings or numbers.
        let id = match self.id {
            Some(Value::String(s)) => s,
            Some(Value::Number(n)) => n.to_string(),
            _ => String::new(),
        };

        Account::new(
            id,
            self.username.unwrap_or_default(),
            self.display_name.unwrap_or_default(),
            self.url.unwrap_or_default(),
        )
    }
}

/// Parse a JSON array of account objects.
///
/// # Errors
///
/// Returns [`PettyError::ParseError`] if `content` is not an array of objects.
pub fn parse_accounts(content: &str, file: &str) -> Result<Vec<Account>> {
    let raw: Vec<RawAccount> =
        serde_json::from_str(content).map_err(|e| PettyError::parse_error(file, e.to_string()))?;
    Ok(raw.into_iter().map(RawAccount::into_account).collect())
}

/// Read and parse one account list file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn read_account_file(path: &Path) -> Result<Vec<Account>> {
    let content =
        std::fs::read_to_string(path).map_err(|e| PettyError::path_error("read", path, e))?;
    let accounts = parse_accounts(&content, &path.display().to_string())?;
    debug!(path = %path.display(), accounts = accounts.len(), "Read account list");
    Ok(accounts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn parses_api_shaped_accounts() {
        let json = r#"[
            {"id": "109", "username": "alice", "display_name": "Alice", "url": "https://example.social/@alice", "acct": "alice"},
            {"id": 110, "username": "bob", "display_name": "", "url": "https://example.social/@bob"}
        ]"#;

        let accounts = parse_accounts(json, "followers.json").unwrap();
        assert_eq!(accounts.len(), 2);
        assert_eq!(accounts[0].account_id, "109");
        assert_eq!(accounts[0].display_name, "Alice");
        assert_eq!(accounts[1].account_id, "110");
        assert_eq!(accounts[1].display_name, "bob");
    }

    #[test]
    fn accepts_account_id_alias() {
        let json = r#"[{"account_id": "1", "username": "alice", "display_name": "Alice", "url": "", "is_follower": true}]"#;
        let accounts = parse_accounts(json, "rows.json").unwrap();
        assert_eq!(accounts[0].account_id, "1");
    }

    #[test]
    fn missing_fields_are_left_for_validation() {
        let json = r#"[{"username": "ghost"}]"#;
        let accounts = parse_accounts(json, "x.json").unwrap();
        assert!(accounts[0].account_id.is_empty());
        assert!(crate::merge::validate_capture(&accounts, &[]).is_err());
    }

    #[test]
    fn rejects_non_array() {
        let err = parse_accounts(r#"{"id": "1"}"#, "bad.json").unwrap_err();
        assert!(matches!(err, PettyError::ParseError { .. }));
        assert!(err.to_string().contains("bad.json"));
    }

    #[test]
    fn json_file_source_reads_both_lists() {
        let dir = TempDir::new().unwrap();
        let followers = dir.path().join("followers.json");
        let following = dir.path().join("following.json");
        std::fs::write(&followers, r#"[{"id": "1", "username": "alice"}]"#).unwrap();
        std::fs::write(&following, "[]").unwrap();

        let source = JsonFileSource::new(&followers, &following);
        assert_eq!(source.fetch_followers().unwrap().len(), 1);
        assert!(source.fetch_following().unwrap().is_empty());
    }

    #[test]
    fn missing_file_is_path_error() {
        let source = JsonFileSource::new("/nonexistent/followers.json", "/nonexistent/following.json");
        let err = source.fetch_followers().unwrap_err();
        assert!(matches!(err, PettyError::PathError { .. }));
    }
}
