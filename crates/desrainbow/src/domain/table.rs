//! In-memory rainbow table
//!
//! A table is its header plus chain entries that are unique on `end` and
//! sorted by it, so an endpoint lookup is a binary search.

use crate::domain::chain::ChainEntry;
use crate::domain::config::Configuration;
use crate::domain::password::PasswordIndex;
use crate::domain::table_format::{TableHeader, check_configuration};
use crate::error::RainbowResult;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RainbowTable {
    header: TableHeader,
    entries: Vec<ChainEntry>,
}

impl RainbowTable {
    /// Wrap entries that are already sorted and deduplicated by `end`
    pub fn from_sorted(config: &Configuration, entries: Vec<ChainEntry>) -> Self {
        debug_assert!(entries.windows(2).all(|w| w[0].end < w[1].end));

        Self {
            header: TableHeader::new(config, entries.len() as u64),
            entries,
        }
    }

    /// Assemble a table from a loaded header and its entries
    pub fn from_parts(header: TableHeader, entries: Vec<ChainEntry>) -> Self {
        Self { header, entries }
    }

    pub fn header(&self) -> &TableHeader {
        &self.header
    }

    pub fn entries(&self) -> &[ChainEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<ChainEntry> {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Find the start of the chain ending at `end`
    pub fn find_start(&self, end: PasswordIndex) -> Option<PasswordIndex> {
        find_start(&self.entries, end)
    }

    /// Fail with `ConfigMismatch` if the table was built with other parameters
    pub fn check_compatible(&self, config: &Configuration) -> RainbowResult<()> {
        check_configuration(&self.header, config)
    }
}

/// Binary search a sorted entry slice for an endpoint
pub fn find_start(entries: &[ChainEntry], end: PasswordIndex) -> Option<PasswordIndex> {
    entries
        .binary_search_by_key(&end, |entry| entry.end)
        .ok()
        .map(|i| entries[i].start)
}
