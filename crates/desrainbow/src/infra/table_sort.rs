//! Table sort operations
//!
//! This module provides functions for sorting rainbow table entries by
//! endpoint and removing chains whose endpoints collide.

use crate::domain::chain::ChainEntry;
use rayon::prelude::*;

/// Sort table entries by endpoint using a parallel stable sort
///
/// Stability keeps the merge order among entries with the same end, which
/// `deduplicate_table` relies on to keep the first one.
pub fn sort_table_parallel(entries: &mut [ChainEntry]) {
    if entries.is_empty() {
        return;
    }

    entries.par_sort_by_key(|entry| entry.end);
}

/// Deduplicate sorted table
///
/// Keep only the first entry among those with the same end.
/// Returns the number of removed entries.
pub fn deduplicate_table(entries: &mut Vec<ChainEntry>) -> usize {
    let before = entries.len();
    entries.dedup_by_key(|entry| entry.end);
    before - entries.len()
}

/// Merge per-batch results into a sorted, endpoint-unique entry list
///
/// Batches are concatenated in the given order before sorting, so "first"
/// means first batch, then first position within the batch.
/// Returns the merged entries and the number of duplicates removed.
pub fn merge_batches(batches: Vec<Vec<ChainEntry>>) -> (Vec<ChainEntry>, usize) {
    let total = batches.iter().map(Vec::len).sum();
    let mut entries = Vec::with_capacity(total);
    for batch in batches {
        entries.extend(batch);
    }

    sort_table_parallel(&mut entries);
    let removed = deduplicate_table(&mut entries);

    (entries, removed)
}

/// Whether entries are sorted by end with no repeated end
pub fn is_sorted_unique(entries: &[ChainEntry]) -> bool {
    entries.windows(2).all(|w| w[0].end < w[1].end)
}
