mod helpers;

use std::collections::HashMap;

use helpers::database::{motif_values, seed_motifs, setup_test_db};
use motif_reducer::domain::ports::MotifStore;
use proptest::prelude::*;
use tokio_util::sync::CancellationToken;

fn rewrite_once(values: &[i64]) -> (Vec<i64>, u64, i64) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    runtime.block_on(async {
        let pool = setup_test_db().await;
        let store = seed_motifs(&pool, values).await;
        let token = CancellationToken::new();
        let stats = store.measure_duplicates(&token).await.unwrap();
        let rewritten = store.rewrite_duplicates(&token).await.unwrap();
        let after = motif_values(&pool).await;
        pool.close().await;
        (after, rewritten, stats.all_repeating_count)
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// Property: a rewrite adds its position to every repeated value and
    /// leaves unique values alone
    #[test]
    fn prop_rewrite_perturbs_exactly_the_duplicates(
        values in prop::collection::vec(0i64..6, 1..40)
    ) {
        let mut counts: HashMap<i64, usize> = HashMap::new();
        for v in &values {
            *counts.entry(*v).or_default() += 1;
        }

        let (after, rewritten, measured) = rewrite_once(&values);

        prop_assert_eq!(rewritten as i64, measured);
        for (position, (before, now)) in values.iter().zip(&after).enumerate() {
            if counts[before] > 1 {
                prop_assert_eq!(*now, before + position as i64);
            } else {
                prop_assert_eq!(now, before);
            }
        }
    }

    /// Property: members of one duplicate group never collide after a rewrite
    #[test]
    fn prop_rewrite_separates_each_group(
        values in prop::collection::vec(0i64..4, 2..30)
    ) {
        let (after, _, _) = rewrite_once(&values);

        let mut groups: HashMap<i64, Vec<i64>> = HashMap::new();
        for (before, now) in values.iter().zip(&after) {
            groups.entry(*before).or_default().push(*now);
        }
        for members in groups.values().filter(|m| m.len() > 1) {
            let mut sorted = members.clone();
            sorted.sort_unstable();
            sorted.dedup();
            prop_assert_eq!(sorted.len(), members.len());
        }
    }

    /// Property: the same sample always rewrites to the same values
    #[test]
    fn prop_rewrite_is_deterministic(
        values in prop::collection::vec(0i64..5, 1..25)
    ) {
        let (first, _, _) = rewrite_once(&values);
        let (second, _, _) = rewrite_once(&values);
        prop_assert_eq!(first, second);
    }
}
