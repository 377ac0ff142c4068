use petty::diff::diff_followers;
use petty::merge::merge_relationships;
use petty::query::filter_rows;
use petty::{Account, RelationshipFilter, SnapshotId, Storage};
use proptest::prelude::*;
use proptest::test_runner::Config as ProptestConfig;
use std::collections::HashSet;

// Ids come from a small pool so the two lists overlap and repeat often.
fn arb_account() -> impl Strategy<Value = Account> {
    (0u8..16, prop::option::of("[A-Za-z ]{0,8}")).prop_map(|(n, display)| {
        Account::new(
            n.to_string(),
            format!("user{n:02}"),
            display.unwrap_or_default(),
            format!("https://example.social/@user{n:02}"),
        )
    })
}

fn arb_list() -> impl Strategy<Value = Vec<Account>> {
    prop::collection::vec(arb_account(), 0..=12)
}

fn id_set(accounts: &[Account]) -> HashSet<String> {
    accounts.iter().map(|a| a.account_id.clone()).collect()
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        failure_persistence: None,
        .. ProptestConfig::default()
    })]

    #[test]
    fn merged_rows_cover_each_distinct_id_once(followers in arb_list(), following in arb_list()) {
        let rows = merge_relationships(&followers, &following);

        let expected: HashSet<String> = id_set(&followers).union(&id_set(&following)).cloned().collect();
        let seen: HashSet<String> = rows.iter().map(|r| r.account_id().to_string()).collect();
        prop_assert_eq!(rows.len(), expected.len());
        prop_assert_eq!(seen, expected);
    }

    #[test]
    fn flags_match_list_membership(followers in arb_list(), following in arb_list()) {
        let follower_ids = id_set(&followers);
        let following_ids = id_set(&following);

        for row in merge_relationships(&followers, &following) {
            prop_assert_eq!(row.is_follower, follower_ids.contains(row.account_id()));
            prop_assert_eq!(row.is_following, following_ids.contains(row.account_id()));
            prop_assert!(row.is_follower || row.is_following);
        }
    }

    #[test]
    fn one_sided_categories_are_disjoint(followers in arb_list(), following in arb_list()) {
        let rows = merge_relationships(&followers, &following);
        let not_following_back = filter_rows(rows.clone(), RelationshipFilter::NotFollowingBack);
        let not_followed_back = filter_rows(rows.clone(), RelationshipFilter::NotFollowedBack);

        let left: HashSet<&str> = not_following_back.iter().map(|r| r.account_id()).collect();
        let right: HashSet<&str> = not_followed_back.iter().map(|r| r.account_id()).collect();
        prop_assert!(left.is_disjoint(&right));

        let mutuals = rows.iter().filter(|r| r.is_mutual()).count();
        prop_assert_eq!(left.len() + right.len() + mutuals, rows.len());
    }

    #[test]
    fn filtered_rows_are_sorted(followers in arb_list(), following in arb_list()) {
        let rows = merge_relationships(&followers, &following);
        for filter in RelationshipFilter::ALL {
            let selected = filter_rows(rows.clone(), filter);
            prop_assert!(selected.windows(2).all(|w| w[0].username() <= w[1].username()));
            prop_assert!(selected.iter().all(|r| filter.matches(r)));
        }
    }

    #[test]
    fn diff_is_symmetric(
        a_followers in arb_list(),
        b_followers in arb_list(),
        following in arb_list(),
    ) {
        let a = merge_relationships(&a_followers, &following);
        let b = merge_relationships(&b_followers, &following);

        let forward = diff_followers(SnapshotId(2), &b, SnapshotId(1), &a);
        let backward = diff_followers(SnapshotId(1), &a, SnapshotId(2), &b);

        prop_assert_eq!(forward.new_followers, backward.unfollowers);
        prop_assert_eq!(forward.unfollowers, backward.new_followers);
    }

    #[test]
    fn diff_with_same_followers_is_empty(
        followers in arb_list(),
        following_a in arb_list(),
        following_b in arb_list(),
    ) {
        // Following changes alone never show up in a follower diff.
        let a = merge_relationships(&followers, &following_a);
        let b = merge_relationships(&followers, &following_b);
        prop_assert!(diff_followers(SnapshotId(2), &b, SnapshotId(1), &a).is_empty());
    }
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 32,
        failure_persistence: None,
        .. ProptestConfig::default()
    })]

    #[test]
    fn stored_snapshot_matches_merge(followers in arb_list(), following in arb_list()) {
        let mut storage = Storage::open_memory().unwrap();
        let id = storage.create_snapshot(&followers, &following).unwrap();

        let expected = merge_relationships(&followers, &following);
        let stored = storage.get_relationship_rows(id, RelationshipFilter::All).unwrap();
        prop_assert_eq!(stored, expected);
        prop_assert_eq!(
            storage.get_snapshot(id).unwrap().account_count,
            id_set(&followers).union(&id_set(&following)).count()
        );
    }

    #[test]
    fn stored_diff_is_symmetric(
        a_followers in arb_list(),
        b_followers in arb_list(),
        following in arb_list(),
    ) {
        let mut storage = Storage::open_memory().unwrap();
        let a = storage.create_snapshot(&a_followers, &following).unwrap();
        let b = storage.create_snapshot(&b_followers, &following).unwrap();

        let forward = storage.diff(a, b).unwrap();
        let backward = storage.diff(b, a).unwrap();
        prop_assert_eq!(&forward.new_followers, &backward.unfollowers);
        prop_assert_eq!(&forward.unfollowers, &backward.new_followers);

        let expected_new: HashSet<String> =
            id_set(&a_followers).difference(&id_set(&b_followers)).cloned().collect();
        prop_assert_eq!(id_set(&forward.new_followers), expected_new);

        if id_set(&a_followers) == id_set(&b_followers) {
            prop_assert!(forward.is_empty());
        }
    }
}
