//! Read-side filtering of a snapshot's relationship rows.

use crate::model::RelationshipRow;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Relationship category to select from a snapshot.
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipFilter {
    /// Every account in the snapshot.
    #[default]
    All,
    /// Accounts that follow the user.
    Followers,
    /// Accounts the user follows.
    Following,
    /// They follow the user; the user does not follow back.
    #[value(alias = "not_following_back")]
    NotFollowingBack,
    /// The user follows them; they do not follow back.
    #[value(alias = "not_followed_back")]
    NotFollowedBack,
}

impl RelationshipFilter {
    /// All categories in display order.
    pub const ALL: [Self; 5] = [
        Self::All,
        Self::Followers,
        Self::Following,
        Self::NotFollowingBack,
        Self::NotFollowedBack,
    ];

    /// Whether `row` belongs to this category.
    #[must_use]
    pub const fn matches(self, row: &RelationshipRow) -> bool {
        match self {
            Self::All => true,
            Self::Followers => row.is_follower,
            Self::Following => row.is_following,
            Self::NotFollowingBack => row.is_follower && !row.is_following,
            Self::NotFollowedBack => row.is_following && !row.is_follower,
        }
    }

    /// Stable snake_case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Followers => "followers",
            Self::Following => "following",
            Self::NotFollowingBack => "not_following_back",
            Self::NotFollowedBack => "not_followed_back",
        }
    }

    /// Human-readable heading.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::All => "All accounts",
            Self::Followers => "Followers",
            Self::Following => "Following",
            Self::NotFollowingBack => "Not following back",
            Self::NotFollowedBack => "Not followed back",
        }
    }
}

impl fmt::Display for RelationshipFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Select the rows matching `filter`, sorted by username then account id.
///
/// Usernames compare byte-wise, so uppercase sorts before lowercase.
#[must_use]
pub fn filter_rows<I>(rows: I, filter: RelationshipFilter) -> Vec<RelationshipRow>
where
    I: IntoIterator<Item = RelationshipRow>,
{
    let mut selected: Vec<RelationshipRow> =
        rows.into_iter().filter(|row| filter.matches(row)).collect();
    selected.sort_by(|a, b| a.account.cmp_by_username(&b.account));
    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Account;

    fn row(id: &str, username: &str, is_follower: bool, is_following: bool) -> RelationshipRow {
        RelationshipRow {
            account: Account::new(id, username, "", ""),
            is_follower,
            is_following,
        }
    }

    fn seed_rows() -> Vec<RelationshipRow> {
        vec![
            row("4", "diana", false, true),
            row("2", "bob", true, true),
            row("3", "charlie", true, false),
            row("1", "alice", true, false),
        ]
    }

    fn names(rows: &[RelationshipRow]) -> Vec<&str> {
        rows.iter().map(RelationshipRow::username).collect()
    }

    #[test]
    fn all_is_sorted_by_username() {
        let rows = filter_rows(seed_rows(), RelationshipFilter::All);
        assert_eq!(names(&rows), ["alice", "bob", "charlie", "diana"]);
    }

    #[test]
    fn followers_and_following() {
        let followers = filter_rows(seed_rows(), RelationshipFilter::Followers);
        assert_eq!(names(&followers), ["alice", "bob", "charlie"]);

        let following = filter_rows(seed_rows(), RelationshipFilter::Following);
        assert_eq!(names(&following), ["bob", "diana"]);
    }

    #[test]
    fn one_sided_categories() {
        let nfb = filter_rows(seed_rows(), RelationshipFilter::NotFollowingBack);
        assert_eq!(names(&nfb), ["alice", "charlie"]);

        let nfdb = filter_rows(seed_rows(), RelationshipFilter::NotFollowedBack);
        assert_eq!(names(&nfdb), ["diana"]);
    }

    #[test]
    fn one_sided_categories_are_disjoint() {
        for r in seed_rows() {
            assert!(
                !(RelationshipFilter::NotFollowingBack.matches(&r)
                    && RelationshipFilter::NotFollowedBack.matches(&r))
            );
        }
    }

    #[test]
    fn sort_is_byte_order_with_id_tiebreak() {
        let rows = vec![
            row("2", "same", true, false),
            row("9", "alpha", true, false),
            row("1", "same", true, false),
            row("5", "Zulu", true, false),
        ];
        let sorted = filter_rows(rows, RelationshipFilter::All);
        let ids: Vec<&str> = sorted.iter().map(RelationshipRow::account_id).collect();
        assert_eq!(ids, ["5", "9", "1", "2"]);
    }

    #[test]
    fn parses_snake_and_kebab_names() {
        assert_eq!(
            RelationshipFilter::from_str("not_following_back", false).unwrap(),
            RelationshipFilter::NotFollowingBack
        );
        assert_eq!(
            RelationshipFilter::from_str("not-followed-back", false).unwrap(),
            RelationshipFilter::NotFollowedBack
        );
        assert_eq!(RelationshipFilter::NotFollowedBack.to_string(), "not_followed_back");
    }
}
