//! Bounded top-K retention of accounts ranked by age.
//!
//! The accumulator is the only state shared between page folds. Every read
//! and write goes through one mutex, since whether a record stays depends on
//! a comparison against everything already kept.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use parking_lot::Mutex;

use crate::model::Record;

/// Heap entry ordered by `(age, seq)`. `seq` is the arrival order, so among
/// equal ages the earliest record sorts first and is the last to be evicted.
#[derive(Debug, Clone)]
struct Ranked {
    age: i64,
    seq: u64,
    record: Record,
}

impl PartialEq for Ranked {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Ranked {}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Ranked {
    fn cmp(&self, other: &Self) -> Ordering {
        self.age.cmp(&other.age).then(self.seq.cmp(&other.seq))
    }
}

#[derive(Debug, Default)]
struct TopKState {
    /// Max-heap: the root is the worst record currently kept.
    heap: BinaryHeap<Ranked>,
    next_seq: u64,
}

#[derive(Debug)]
pub struct TopKAccumulator {
    limit: usize,
    state: Mutex<TopKState>,
}

impl TopKAccumulator {
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self { limit, state: Mutex::new(TopKState::default()) }
    }

    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Merges `candidates` and trims back to the `limit` youngest records.
    ///
    /// The whole batch is applied under a single lock acquisition, so two
    /// folds never interleave. Candidates failing [`Record::is_valid`] are
    /// never admitted. Returns how many candidates entered the kept set
    /// (some of them may have been evicted again by later candidates of the
    /// same batch).
    pub fn fold<I>(&self, candidates: I) -> usize
    where
        I: IntoIterator<Item = Record>,
    {
        let mut state = self.state.lock();
        let mut admitted = 0;

        for record in candidates {
            if !record.is_valid() {
                continue;
            }
            let seq = state.next_seq;
            state.next_seq += 1;
            let entry = Ranked { age: record.rank_key(), seq, record };

            if state.heap.len() < self.limit {
                state.heap.push(entry);
                admitted += 1;
                continue;
            }

            let beats_worst = state.heap.peek().is_some_and(|worst| entry < *worst);
            if beats_worst {
                state.heap.pop();
                state.heap.push(entry);
                admitted += 1;
            }
        }

        admitted
    }

    /// Current contents, youngest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Record> {
        let state = self.state.lock();
        state.heap.clone().into_sorted_vec().into_iter().map(|entry| entry.record).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().heap.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use proptest::prelude::*;

    use super::*;

    fn valid(id: i64, age: i64) -> Record {
        Record::new(id, format!("user-{id}"), age, "555-123-4567")
    }

    fn invalid(id: i64, age: i64) -> Record {
        Record::new(id, format!("user-{id}"), age, "not a number")
    }

    fn ages(records: &[Record]) -> Vec<i64> {
        records.iter().map(Record::rank_key).collect()
    }

    fn ids(records: &[Record]) -> Vec<i64> {
        records.iter().map(|record| record.id.0).collect()
    }

    fn seeded_permutation<T: Clone>(items: &[T], seed: u64) -> Vec<T> {
        fn splitmix64(mut value: u64) -> u64 {
            value = value.wrapping_add(0x9E37_79B9_7F4A_7C15);
            value = (value ^ (value >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
            value = (value ^ (value >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
            value ^ (value >> 31)
        }

        let mut keyed = items
            .iter()
            .cloned()
            .enumerate()
            .map(|(index, item)| {
                let index_u64 = u64::try_from(index).unwrap_or(u64::MAX);
                (splitmix64(seed ^ index_u64), item)
            })
            .collect::<Vec<_>>();
        keyed.sort_by_key(|(key, _)| *key);
        keyed.into_iter().map(|(_, item)| item).collect()
    }

    #[test]
    fn keeps_the_k_youngest_across_folds() {
        let accumulator = TopKAccumulator::new(2);
        accumulator.fold(vec![valid(1, 40), valid(2, 20), valid(3, 30)]);
        assert_eq!(ages(&accumulator.snapshot()), vec![20, 30]);

        accumulator.fold(vec![valid(4, 10)]);
        assert_eq!(ages(&accumulator.snapshot()), vec![10, 20]);
        assert_eq!(accumulator.len(), 2);
    }

    #[test]
    fn invalid_records_are_never_admitted() {
        let accumulator = TopKAccumulator::new(3);
        let admitted = accumulator.fold(vec![invalid(1, 1), valid(2, 50), invalid(3, 2)]);
        assert_eq!(admitted, 1);
        assert_eq!(ids(&accumulator.snapshot()), vec![2]);
    }

    #[test]
    fn equal_ages_keep_the_first_seen_record() {
        let accumulator = TopKAccumulator::new(2);
        accumulator.fold(vec![valid(1, 20), valid(2, 30)]);
        accumulator.fold(vec![valid(3, 30), valid(4, 20)]);
        assert_eq!(ids(&accumulator.snapshot()), vec![1, 4]);

        let accumulator = TopKAccumulator::new(1);
        accumulator.fold(vec![valid(5, 25), valid(6, 25)]);
        assert_eq!(ids(&accumulator.snapshot()), vec![5]);
    }

    #[test]
    fn zero_limit_keeps_nothing() {
        let accumulator = TopKAccumulator::new(0);
        assert_eq!(accumulator.fold(vec![valid(1, 1)]), 0);
        assert!(accumulator.is_empty());
        assert!(accumulator.snapshot().is_empty());
    }

    #[test]
    fn concurrent_folds_preserve_the_invariant() {
        let accumulator = Arc::new(TopKAccumulator::new(5));
        let handles = (0..8_i64)
            .map(|worker| {
                let accumulator = Arc::clone(&accumulator);
                std::thread::spawn(move || {
                    for batch in 0..10_i64 {
                        let base = worker * 1000 + batch * 10;
                        accumulator.fold((0..10).map(|offset| valid(base + offset, base + offset)));
                    }
                })
            })
            .collect::<Vec<_>>();
        for handle in handles {
            if let Err(err) = handle.join() {
                panic!("fold worker panicked: {err:?}");
            }
        }

        assert_eq!(ages(&accumulator.snapshot()), vec![0, 1, 2, 3, 4]);
    }

    proptest! {
        #[test]
        fn property_fold_order_does_not_change_kept_ages(
            batches in prop::collection::vec(
                prop::collection::vec((0_i64..200, any::<bool>()), 0..12),
                0..8,
            ),
            limit in 0_usize..8,
            seed in any::<u64>(),
        ) {
            let mut next_id = 0_i64;
            let batches = batches
                .into_iter()
                .map(|batch| {
                    batch
                        .into_iter()
                        .map(|(age, is_valid)| {
                            next_id += 1;
                            if is_valid { valid(next_id, age) } else { invalid(next_id, age) }
                        })
                        .collect::<Vec<_>>()
                })
                .collect::<Vec<_>>();

            let mut expected = batches
                .iter()
                .flatten()
                .filter(|record| record.is_valid())
                .map(Record::rank_key)
                .collect::<Vec<_>>();
            expected.sort_unstable();
            expected.truncate(limit);

            let in_order = TopKAccumulator::new(limit);
            for batch in &batches {
                in_order.fold(batch.clone());
            }
            let shuffled = TopKAccumulator::new(limit);
            for batch in seeded_permutation(&batches, seed) {
                shuffled.fold(batch);
            }

            let kept = in_order.snapshot();
            prop_assert!(kept.len() <= limit);
            prop_assert!(kept.iter().all(Record::is_valid));
            prop_assert_eq!(ages(&kept), expected.clone());
            prop_assert_eq!(ages(&shuffled.snapshot()), expected);
        }
    }
}
