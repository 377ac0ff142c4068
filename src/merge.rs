//! Relationship merge.
//!
//! Combines a followers list and a following list captured at the same moment
//! into one row per distinct account. Duplicate ids are tolerated: the first
//! copy seen wins, and `followers` is read before `following`, so an account
//! present in both lists keeps the attributes of its followers copy.

use crate::error::{PettyError, Result};
use crate::model::{Account, RelationshipRow};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Name of the followers input, used in validation errors.
pub const FOLLOWERS_LIST: &str = "followers";

/// Name of the following input, used in validation errors.
pub const FOLLOWING_LIST: &str = "following";

/// Check that every record carries a non-empty `account_id` and `username`.
///
/// # Errors
///
/// Returns [`PettyError::Validation`] for the first incomplete record.
pub fn validate_accounts(list: &'static str, accounts: &[Account]) -> Result<()> {
    for (index, account) in accounts.iter().enumerate() {
        if account.account_id.trim().is_empty() {
            return Err(PettyError::validation(list, index, "missing account_id"));
        }
        if account.username.trim().is_empty() {
            return Err(PettyError::validation(
                list,
                index,
                format!("missing username for account '{}'", account.account_id),
            ));
        }
    }
    Ok(())
}

/// Validate both inputs of a capture.
///
/// # Errors
///
/// Returns [`PettyError::Validation`] naming the offending list and position.
pub fn validate_capture(followers: &[Account], following: &[Account]) -> Result<()> {
    validate_accounts(FOLLOWERS_LIST, followers)?;
    validate_accounts(FOLLOWING_LIST, following)
}

/// Merge the two lists into deduplicated relationship rows.
///
/// The result holds exactly one row per distinct `account_id` across both
/// inputs, sorted by username then id. Empty display names are replaced by the
/// username.
#[must_use]
pub fn merge_relationships(followers: &[Account], following: &[Account]) -> Vec<RelationshipRow> {
    let follower_ids: HashSet<&str> = followers.iter().map(|a| a.account_id.as_str()).collect();
    let following_ids: HashSet<&str> = following.iter().map(|a| a.account_id.as_str()).collect();

    let mut unified: HashMap<&str, &Account> =
        HashMap::with_capacity(follower_ids.len() + following_ids.len());
    for account in followers.iter().chain(following) {
        unified.entry(account.account_id.as_str()).or_insert(account);
    }

    let mut rows: Vec<RelationshipRow> = unified
        .into_iter()
        .map(|(id, account)| RelationshipRow {
            account: Account {
                display_name: account.effective_display_name().to_string(),
                ..account.clone()
            },
            is_follower: follower_ids.contains(id),
            is_following: following_ids.contains(id),
        })
        .collect();
    rows.sort_by(|a, b| a.account.cmp_by_username(&b.account));

    debug!(
        followers = followers.len(),
        following = following.len(),
        merged = rows.len(),
        "Merged relationship lists"
    );
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn acct(id: &str, username: &str) -> Account {
        Account::new(
            id,
            username,
            format!("{username} display"),
            format!("https://example.social/@{username}"),
        )
    }

    fn flags(rows: &[RelationshipRow], username: &str) -> (bool, bool) {
        let row = rows.iter().find(|r| r.username() == username).unwrap();
        (row.is_follower, row.is_following)
    }

    #[test]
    fn merges_seed_scenario() {
        let followers = vec![acct("1", "alice"), acct("2", "bob"), acct("3", "charlie")];
        let following = vec![acct("2", "bob"), acct("4", "diana")];

        let rows = merge_relationships(&followers, &following);
        let names: Vec<&str> = rows.iter().map(RelationshipRow::username).collect();
        assert_eq!(names, ["alice", "bob", "charlie", "diana"]);

        assert_eq!(flags(&rows, "alice"), (true, false));
        assert_eq!(flags(&rows, "bob"), (true, true));
        assert_eq!(flags(&rows, "charlie"), (true, false));
        assert_eq!(flags(&rows, "diana"), (false, true));
    }

    #[test]
    fn duplicates_within_a_list_keep_first_copy() {
        let followers = vec![
            Account::new("1", "alice", "First", ""),
            Account::new("1", "alice", "Second", ""),
        ];

        let rows = merge_relationships(&followers, &[]);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].account.display_name, "First");
    }

    #[test]
    fn followers_copy_wins_across_lists() {
        let followers = vec![Account::new("1", "alice", "From followers", "f")];
        let following = vec![Account::new("1", "alice", "From following", "g")];

        let rows = merge_relationships(&followers, &following);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].account.display_name, "From followers");
        assert_eq!(rows[0].account.url, "f");
        assert!(rows[0].is_mutual());
    }

    #[test]
    fn empty_display_name_is_filled_from_username() {
        let raw = Account {
            account_id: "5".to_string(),
            username: "eve".to_string(),
            display_name: String::new(),
            url: String::new(),
        };

        let rows = merge_relationships(&[raw], &[]);
        assert_eq!(rows[0].account.display_name, "eve");
    }

    #[test]
    fn empty_inputs_produce_no_rows() {
        assert!(merge_relationships(&[], &[]).is_empty());
    }

    #[test]
    fn validation_reports_list_and_index() {
        let followers = vec![acct("1", "alice")];
        let following = vec![acct("2", "bob"), Account::new("", "ghost", "", "")];

        let err = validate_capture(&followers, &following).unwrap_err();
        match err {
            PettyError::Validation { list, index, .. } => {
                assert_eq!(list, FOLLOWING_LIST);
                assert_eq!(index, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn validation_rejects_missing_username() {
        let followers = vec![Account::new("1", " ", "", "")];
        let err = validate_capture(&followers, &[]).unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("username"));
    }
}
