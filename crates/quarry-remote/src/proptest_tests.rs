//! Property-based tests for the entry cache.

use std::num::NonZeroUsize;

use proptest::prelude::*;

use crate::cache::{EntryCache, Pagination};
use crate::testing::FakeSource;

fn names(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("entry-{i:03}")).collect()
}

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
        .block_on(future)
}

proptest! {
    #[test]
    fn prop_walks_are_ordered_and_resumable(
        total in 0usize..40,
        page_size in 1usize..8,
        prefix in 0usize..45,
        lookups in proptest::collection::vec(0usize..40, 0..4),
    ) {
        let expected = names(total);
        let refs: Vec<&str> = expected.iter().map(String::as_str).collect();
        let source = FakeSource::new(&refs);
        let mut cache = EntryCache::new(Pagination::from_page_size(NonZeroUsize::new(page_size)));

        block_on(async {
            for i in lookups.iter().filter(|i| **i < total) {
                cache.lookup(&expected[*i], &source).await.unwrap();
            }

            let mut cursor = cache.entries(&source);
            for _ in 0..prefix.min(total) {
                cursor.next_entry().await.unwrap().unwrap();
            }
            drop(cursor);

            let first = cache.entries(&source).names().await.unwrap();
            let requests = source.request_count();
            let second = cache.entries(&source).names().await.unwrap();

            assert_eq!(first, expected);
            assert_eq!(second, expected);
            assert_eq!(source.request_count(), requests);
        });

        prop_assert!(cache.is_complete());
        prop_assert_eq!(source.page_requests().len(), total / page_size + 1);
        let offsets: Vec<usize> = source.page_requests().iter().map(|(o, _)| *o).collect();
        let expected_offsets: Vec<usize> = (0..=total / page_size).map(|p| p * page_size).collect();
        prop_assert_eq!(offsets, expected_offsets);
    }
}
