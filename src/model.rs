//! Data models for relationship snapshots.
//!
//! An [`Account`] is the remote identity as the account source reported it.
//! A [`Snapshot`] groups one [`RelationshipRow`] per distinct account captured
//! at a single point in time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// A remote account.
///
/// Equality and hashing only look at `account_id`; two copies of the same
/// account with different display attributes compare equal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub account_id: String,
    pub username: String,
    pub display_name: String,
    pub url: String,
}

impl Account {
    /// Build an account, falling back to `username` when `display_name` is empty.
    pub fn new(
        account_id: impl Into<String>,
        username: impl Into<String>,
        display_name: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        let username = username.into();
        let display_name = display_name.into();
        let display_name = if display_name.trim().is_empty() {
            username.clone()
        } else {
            display_name
        };

        Self {
            account_id: account_id.into(),
            username,
            display_name,
            url: url.into(),
        }
    }

    /// Display name as it should be shown and stored.
    #[must_use]
    pub fn effective_display_name(&self) -> &str {
        if self.display_name.trim().is_empty() {
            &self.username
        } else {
            &self.display_name
        }
    }

    /// Ordering used for every list petty returns: username, then id.
    #[must_use]
    pub fn cmp_by_username(&self, other: &Self) -> Ordering {
        self.username
            .cmp(&other.username)
            .then_with(|| self.account_id.cmp(&other.account_id))
    }
}

impl PartialEq for Account {
    fn eq(&self, other: &Self) -> bool {
        self.account_id == other.account_id
    }
}

impl Eq for Account {}

impl Hash for Account {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.account_id.hash(state);
    }
}

/// One account's relationship flags within one snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipRow {
    #[serde(flatten)]
    pub account: Account,
    /// The account follows the tracked user.
    pub is_follower: bool,
    /// The tracked user follows the account.
    pub is_following: bool,
}

impl RelationshipRow {
    #[must_use]
    pub fn account_id(&self) -> &str {
        &self.account.account_id
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.account.username
    }

    #[must_use]
    pub const fn is_mutual(&self) -> bool {
        self.is_follower && self.is_following
    }
}

/// Store-assigned snapshot identifier. Ids grow in creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SnapshotId(pub i64);

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SnapshotId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().trim_start_matches('#').parse().map(Self)
    }
}

impl From<i64> for SnapshotId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

/// A persisted capture of the full relationship set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: SnapshotId,
    pub created_at: DateTime<Utc>,
    /// Number of distinct accounts in the snapshot.
    pub account_count: usize,
}

/// Follower changes between two snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotDiff {
    pub current: SnapshotId,
    pub previous: SnapshotId,
    /// Following the user in `current` but not in `previous`.
    pub new_followers: Vec<Account>,
    /// Following the user in `previous` but not in `current`.
    pub unfollowers: Vec<Account>,
}

impl SnapshotDiff {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.new_followers.is_empty() && self.unfollowers.is_empty()
    }
}

/// Per-category row counts for one snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipCounts {
    pub total: usize,
    pub followers: usize,
    pub following: usize,
    pub mutuals: usize,
    pub not_following_back: usize,
    pub not_followed_back: usize,
}

impl RelationshipCounts {
    /// Tally the categories of a row set.
    #[must_use]
    pub fn from_rows(rows: &[RelationshipRow]) -> Self {
        rows.iter().fold(Self::default(), |mut counts, row| {
            counts.total += 1;
            counts.followers += usize::from(row.is_follower);
            counts.following += usize::from(row.is_following);
            counts.mutuals += usize::from(row.is_mutual());
            counts.not_following_back += usize::from(row.is_follower && !row.is_following);
            counts.not_followed_back += usize::from(row.is_following && !row.is_follower);
            counts
        })
    }
}

/// Outcome of a completed capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureSummary {
    pub snapshot_id: SnapshotId,
    pub followers_count: usize,
    pub following_count: usize,
    pub account_count: usize,
}
