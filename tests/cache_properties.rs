use proptest::prelude::*;
use std::collections::BTreeSet;
use trackflow::domain::models::{completion_percentage, CompletionMap, CompletionResult, SongId};
use trackflow::CompletionCache;

fn results_for(ids: &[SongId]) -> CompletionMap {
    ids.iter()
        .map(|id| (*id, CompletionResult::undefined()))
        .collect()
}

proptest! {
    /// Property: the cache key ignores id order and duplicates
    #[test]
    fn prop_key_is_order_independent(
        (ids, shuffled) in prop::collection::vec(0i64..1_000, 1..20)
            .prop_flat_map(|ids| (Just(ids.clone()), Just(ids).prop_shuffle())),
        flag in any::<bool>(),
    ) {
        let cache = CompletionCache::default();
        cache.set(&ids, flag, results_for(&ids), None);

        let mut doubled = shuffled.clone();
        doubled.extend_from_slice(&shuffled);
        prop_assert!(cache.get(&shuffled, flag).is_some());
        prop_assert!(cache.get(&doubled, flag).is_some());
        prop_assert!(cache.get(&shuffled, !flag).is_none());
    }

    /// Property: after invalidating a song no entry mentioning it survives
    #[test]
    fn prop_invalidation_is_complete(
        key_sets in prop::collection::vec(prop::collection::vec(0i64..30, 1..8), 1..12),
        target in 0i64..30,
    ) {
        let cache = CompletionCache::default();
        for ids in &key_sets {
            cache.set(ids, false, results_for(ids), None);
        }
        let distinct: BTreeSet<Vec<SongId>> = key_sets
            .iter()
            .map(|ids| ids.iter().copied().collect::<BTreeSet<_>>().into_iter().collect())
            .collect();
        let mentioning = distinct.iter().filter(|ids| ids.contains(&target)).count();

        let dropped = cache.invalidate_song(target);
        prop_assert_eq!(dropped, mentioning);
        prop_assert_eq!(cache.len(), distinct.len() - mentioning);

        for ids in &key_sets {
            let hit = cache.get(ids, false);
            prop_assert_eq!(hit.is_some(), !ids.contains(&target));
        }
    }

    /// Property: percentages stay within 0..=100 and grow with completed steps
    #[test]
    fn prop_percentage_bounds(total in 1usize..200, completed in 0usize..200) {
        let completed = completed.min(total);
        let pct = completion_percentage(completed, total).unwrap();
        prop_assert!(pct <= 100);
        if completed == total {
            prop_assert_eq!(pct, 100);
        }
        prop_assert_eq!(pct == 0, completed * 200 < total);

        if completed < total {
            let next = completion_percentage(completed + 1, total).unwrap();
            prop_assert!(next >= pct);
        }
    }
}

#[test]
fn test_zero_step_workflow_has_no_percentage() {
    assert_eq!(completion_percentage(0, 0), None);
    assert_eq!(completion_percentage(3, 0), None);
}
