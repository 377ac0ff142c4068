//! Follower difference between two snapshots.
//!
//! Only the `is_follower` flag takes part; changes on the following side are
//! not reported here.

use crate::model::{Account, RelationshipRow, SnapshotDiff, SnapshotId};
use itertools::Itertools;
use std::collections::HashSet;

/// Compare the follower sets of two snapshots' rows.
///
/// `new_followers` are followers in `current` whose id is not a follower in
/// `previous`; `unfollowers` is the reverse. Both are sorted by username.
#[must_use]
pub fn diff_followers(
    current: SnapshotId,
    current_rows: &[RelationshipRow],
    previous: SnapshotId,
    previous_rows: &[RelationshipRow],
) -> SnapshotDiff {
    SnapshotDiff {
        current,
        previous,
        new_followers: followers_missing_from(current_rows, previous_rows),
        unfollowers: followers_missing_from(previous_rows, current_rows),
    }
}

/// Followers in `rows` that are not followers in `other`.
fn followers_missing_from(rows: &[RelationshipRow], other: &[RelationshipRow]) -> Vec<Account> {
    let other_followers: HashSet<&str> = other
        .iter()
        .filter(|row| row.is_follower)
        .map(RelationshipRow::account_id)
        .collect();

    rows.iter()
        .filter(|row| row.is_follower && !other_followers.contains(row.account_id()))
        .map(|row| row.account.clone())
        .unique()
        .sorted_by(Account::cmp_by_username)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn follower(id: &str, username: &str) -> RelationshipRow {
        RelationshipRow {
            account: Account::new(id, username, "", ""),
            is_follower: true,
            is_following: false,
        }
    }

    fn followed(id: &str, username: &str) -> RelationshipRow {
        RelationshipRow {
            account: Account::new(id, username, "", ""),
            is_follower: false,
            is_following: true,
        }
    }

    fn usernames(accounts: &[Account]) -> Vec<&str> {
        accounts.iter().map(|a| a.username.as_str()).collect()
    }

    #[test]
    fn seed_scenario_both_directions() {
        let s1 = vec![
            follower("1", "alice"),
            follower("2", "bob"),
            follower("3", "charlie"),
            followed("4", "diana"),
        ];
        let s2 = vec![
            follower("1", "alice"),
            follower("2", "bob"),
            follower("5", "eve"),
            followed("4", "diana"),
        ];

        let forward = diff_followers(SnapshotId(2), &s2, SnapshotId(1), &s1);
        assert_eq!(usernames(&forward.new_followers), ["eve"]);
        assert_eq!(usernames(&forward.unfollowers), ["charlie"]);

        let backward = diff_followers(SnapshotId(1), &s1, SnapshotId(2), &s2);
        assert_eq!(backward.new_followers, forward.unfollowers);
        assert_eq!(backward.unfollowers, forward.new_followers);
    }

    #[test]
    fn following_only_changes_are_ignored() {
        let before = vec![follower("1", "alice")];
        let after = vec![follower("1", "alice"), followed("9", "zed")];

        let diff = diff_followers(SnapshotId(2), &after, SnapshotId(1), &before);
        assert!(diff.is_empty());
    }

    #[test]
    fn losing_follower_flag_counts_as_unfollow() {
        let before = vec![follower("1", "alice")];
        let after = vec![followed("1", "alice")];

        let diff = diff_followers(SnapshotId(2), &after, SnapshotId(1), &before);
        assert!(diff.new_followers.is_empty());
        assert_eq!(usernames(&diff.unfollowers), ["alice"]);
    }

    #[test]
    fn identical_sets_produce_empty_diff() {
        let rows = vec![follower("1", "alice"), follower("2", "bob")];
        let diff = diff_followers(SnapshotId(1), &rows, SnapshotId(1), &rows);
        assert!(diff.is_empty());
    }

    #[test]
    fn renamed_account_is_matched_by_id() {
        let before = vec![follower("1", "alice")];
        let after = vec![follower("1", "alice_new")];

        let diff = diff_followers(SnapshotId(2), &after, SnapshotId(1), &before);
        assert!(diff.is_empty());
    }
}
