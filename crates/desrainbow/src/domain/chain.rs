//! Chain operations implementation
//!
//! This module provides the chain entry structure and functions for
//! chain generation and verification in rainbow table operations.
//!
//! A chain of length L is `P0 -> H -> R_0 -> P1 -> H -> R_1 -> ... -> P_L`.
//! Only `P0` (start) and `P_L` (end) are ever stored.

use crate::domain::config::Configuration;
use crate::domain::hash::{HashValue, reduce_hash};
use crate::domain::password::{Password, PasswordIndex};
use crate::error::EncodingError;

/// Chain entry structure
///
/// File format: (start, end) as password ranks
/// Sort order: end ascending
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ChainEntry {
    /// Rank of the starting password
    pub start: PasswordIndex,
    /// Rank of the ending password
    pub end: PasswordIndex,
}

impl ChainEntry {
    /// Create a new chain entry
    pub fn new(start: PasswordIndex, end: PasswordIndex) -> Self {
        Self { start, end }
    }
}

/// One column of a chain walk
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChainStep {
    /// Column index (0-based)
    pub position: u32,
    /// Password at this column
    pub password: Password,
    /// H(password)
    pub hash: HashValue,
}

/// Lazy walk over the columns of a chain
///
/// Yields `(position, password, hash)` for positions `0..L`. Once exhausted,
/// `current()` is the chain's end.
pub struct ChainWalk<'a> {
    config: &'a Configuration,
    current: Password,
    position: u32,
    failed: bool,
}

impl<'a> ChainWalk<'a> {
    pub fn new(config: &'a Configuration, start: Password) -> Self {
        Self {
            config,
            current: start,
            position: 0,
            failed: false,
        }
    }

    /// Password the walk will hash next
    pub fn current(&self) -> Password {
        self.current
    }
}

impl Iterator for ChainWalk<'_> {
    type Item = Result<ChainStep, EncodingError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.position >= self.config.chain_length() {
            return None;
        }

        let hash = match self.config.hash(&self.current) {
            Ok(hash) => hash,
            Err(e) => {
                self.failed = true;
                return Some(Err(e));
            }
        };

        let step = ChainStep {
            position: self.position,
            password: self.current,
            hash,
        };

        self.current = reduce_hash(self.config.space(), &hash, self.position);
        self.position += 1;

        Some(Ok(step))
    }
}

/// Generate a chain and return its end password
///
/// Starting from `start`, repeat hash -> reduce `chain_length` times.
pub fn generate_chain(config: &Configuration, start: &Password) -> Result<Password, EncodingError> {
    let space = config.space();
    let mut current = *start;

    for position in 0..config.chain_length() {
        let hash = config.hash(&current)?;
        current = reduce_hash(space, &hash, position);
    }

    Ok(current)
}

/// Compute a single chain from a start rank
pub fn compute_chain(
    config: &Configuration,
    start: PasswordIndex,
) -> Result<ChainEntry, EncodingError> {
    let space = config.space();
    let end = generate_chain(config, &space.password(start))?;

    Ok(ChainEntry::new(start, space.index(&end)?))
}

/// Regenerate a chain and look for the target hash at every column
///
/// Returns the password whose hash equals `target`, or `None` when the chain
/// reaches its end without producing it (a false alarm).
pub fn verify_chain(
    config: &Configuration,
    start: &Password,
    target: &HashValue,
) -> Result<Option<Password>, EncodingError> {
    for step in ChainWalk::new(config, *start) {
        let step = step?;
        if step.hash == *target {
            return Ok(Some(step.password));
        }
    }

    Ok(None)
}

/// Compute the end a chain would have if `target` were its hash at `position`
///
/// Applies `R_position` to the target, then the remaining
/// `chain_length - 1 - position` hash/reduce steps.
pub fn endpoint_from_position(
    config: &Configuration,
    target: &HashValue,
    position: u32,
) -> Result<Password, EncodingError> {
    let space = config.space();
    let mut current = reduce_hash(space, target, position);

    for n in position + 1..config.chain_length() {
        let hash = config.hash(&current)?;
        current = reduce_hash(space, &hash, n);
    }

    Ok(current)
}

/// Enumerate all passwords of a chain
///
/// Returns `chain_length + 1` passwords, from start to end.
pub fn enumerate_chain(
    config: &Configuration,
    start: &Password,
) -> Result<Vec<Password>, EncodingError> {
    let mut passwords = Vec::with_capacity(config.chain_length() as usize + 1);
    let mut walk = ChainWalk::new(config, *start);

    for step in walk.by_ref() {
        passwords.push(step?.password);
    }
    passwords.push(walk.current());

    Ok(passwords)
}
