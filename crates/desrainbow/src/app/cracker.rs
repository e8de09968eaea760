//! Crack workflow implementation
//!
//! This module recovers a password from its hash using a rainbow table.
//!
//! The target may sit at any column of some chain, so every position is
//! probed, from the deepest (L-1) to the first (0). A probe projects the
//! chain end the target would lead to, looks it up, and on a hit regenerates
//! the chain from its start to confirm the match. Unconfirmed hits are false
//! alarms and the search moves on to the next position.

use rayon::prelude::*;
use tracing::{debug, info};

use crate::domain::chain::{ChainEntry, endpoint_from_position, verify_chain};
use crate::domain::config::Configuration;
use crate::domain::hash::HashValue;
use crate::domain::password::Password;
use crate::domain::table::{RainbowTable, find_start};
use crate::error::{EncodingError, RainbowResult};

/// Crack a hash against sorted, endpoint-unique entries
///
/// Returns `Ok(None)` when no position yields a verified match. A returned
/// password always hashes to `target`.
pub fn crack(
    target: &HashValue,
    entries: &[ChainEntry],
    config: &Configuration,
) -> RainbowResult<Option<Password>> {
    for position in (0..config.chain_length()).rev() {
        if let Some(password) = probe_position(target, entries, config, position)? {
            info!(position, password = %password, "hash cracked");
            return Ok(Some(password));
        }
    }

    debug!("hash not covered by the table");
    Ok(None)
}

/// Crack a hash probing all positions in parallel
///
/// Positions are independent and the table is read-only, so they are
/// distributed with rayon. The deepest verified position wins, which is the
/// same answer `crack` gives.
pub fn crack_parallel(
    target: &HashValue,
    entries: &[ChainEntry],
    config: &Configuration,
) -> RainbowResult<Option<Password>> {
    let found = (0..config.chain_length())
        .into_par_iter()
        .rev()
        .find_map_first(|position| probe_position(target, entries, config, position).transpose())
        .transpose()?;

    match &found {
        Some(password) => info!(password = %password, "hash cracked"),
        None => debug!("hash not covered by the table"),
    }

    Ok(found)
}

/// Crack a hash against a table after checking it was built with `config`
///
/// Fails with `ConfigMismatch` before any lookup if the table parameters
/// differ from the request.
pub fn crack_table(
    target: &HashValue,
    table: &RainbowTable,
    config: &Configuration,
) -> RainbowResult<Option<Password>> {
    table.check_compatible(config)?;
    crack_parallel(target, table.entries(), config)
}

/// Assume the target hash occurred at `position` and check that assumption
fn probe_position(
    target: &HashValue,
    entries: &[ChainEntry],
    config: &Configuration,
    position: u32,
) -> Result<Option<Password>, EncodingError> {
    let space = config.space();
    let end = endpoint_from_position(config, target, position)?;

    let Some(start) = find_start(entries, space.index(&end)?) else {
        return Ok(None);
    };

    let found = verify_chain(config, &space.password(start), target)?;
    if found.is_none() {
        debug!(position, start, "false alarm");
    }

    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::chain::{compute_chain, enumerate_chain};
    use crate::error::RainbowError;
    use crate::infra::table_sort::merge_batches;

    fn config() -> Configuration {
        Configuration::new(3, 50).unwrap()
    }

    fn small_table(config: &Configuration) -> Vec<ChainEntry> {
        let entries: Vec<ChainEntry> = (0..300u64)
            .map(|i| compute_chain(config, i * 151).unwrap())
            .collect();
        merge_batches(vec![entries]).0
    }

    #[test]
    fn test_crack_chain_members() {
        let config = config();
        let entries = small_table(&config);
        let entry = entries[entries.len() / 2];
        let members = enumerate_chain(&config, &config.space().password(entry.start)).unwrap();

        for column in [0usize, 1, 25, 49] {
            let target = config.hash(&members[column]).unwrap();
            let found = crack(&target, &entries, &config).unwrap().unwrap();
            assert_eq!(config.hash(&found).unwrap(), target, "column {}", column);
        }
    }

    #[test]
    fn test_crack_parallel_matches_sequential() {
        let config = config();
        let entries = small_table(&config);

        for word in ["abc", "zz9", "q0q", "aaa"] {
            let target = config.hash(&config.space().parse(word).unwrap()).unwrap();
            assert_eq!(
                crack(&target, &entries, &config).unwrap(),
                crack_parallel(&target, &entries, &config).unwrap()
            );
        }
    }

    #[test]
    fn test_crack_empty_table() {
        let config = config();
        let target = config.hash(&config.space().parse("abc").unwrap()).unwrap();
        assert_eq!(crack(&target, &[], &config).unwrap(), None);
        assert_eq!(crack_parallel(&target, &[], &config).unwrap(), None);
    }

    #[test]
    fn test_crack_results_are_verified() {
        let config = config();
        let entries = small_table(&config);

        for i in 0..50u64 {
            let password = config.space().password(i * 997);
            let target = config.hash(&password).unwrap();
            if let Some(found) = crack(&target, &entries, &config).unwrap() {
                assert_eq!(config.hash(&found).unwrap(), target);
            }
        }
    }

    #[test]
    fn test_crack_table_config_mismatch() {
        let config = config();
        let table = RainbowTable::from_sorted(&config, small_table(&config));
        let other = Configuration::new(3, 25).unwrap();
        let target = config.hash(&config.space().parse("abc").unwrap()).unwrap();

        assert!(matches!(
            crack_table(&target, &table, &other),
            Err(RainbowError::ConfigMismatch { .. })
        ));
    }

    #[test]
    fn test_crack_chain_length_one() {
        let config = Configuration::new(2, 1).unwrap();
        let entries = merge_batches(vec![
            (0..config.space().size())
                .map(|i| compute_chain(&config, i).unwrap())
                .collect(),
        ])
        .0;

        let start = config.space().password(entries[0].start);
        let target = config.hash(&start).unwrap();
        assert_eq!(crack(&target, &entries, &config).unwrap(), Some(start));
    }
}
