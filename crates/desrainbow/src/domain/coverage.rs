//! Password coverage bitmap and success probability
//!
//! The bitmap tracks which passwords of a space are hashed somewhere in a
//! table's chains, i.e. which hashes the table can crack. It uses atomic
//! operations for thread-safe concurrent access.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::constants::MAX_BITMAP_SPACE;
use crate::domain::password::PasswordIndex;
use crate::error::{RainbowError, RainbowResult};

/// Password reachability bitmap
///
/// One bit per password of the space. Memory usage is `size / 8` bytes,
/// so spaces above `MAX_BITMAP_SPACE` are rejected.
pub struct PasswordBitmap {
    bits: Vec<AtomicU64>,
    size: u64,
}

impl PasswordBitmap {
    /// Create a new bitmap with all bits set to 0
    pub fn new(size: u64) -> RainbowResult<Self> {
        if size > MAX_BITMAP_SPACE {
            return Err(RainbowError::InvalidConfig(format!(
                "password space of {} is too large for a coverage bitmap (max {})",
                size, MAX_BITMAP_SPACE
            )));
        }

        let words = size.div_ceil(64) as usize;
        let bits = (0..words).map(|_| AtomicU64::new(0)).collect();
        Ok(Self { bits, size })
    }

    /// Number of passwords tracked
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Set the bit for the specified password (thread-safe)
    #[inline]
    pub fn set(&self, index: PasswordIndex) {
        let word = (index / 64) as usize;
        let bit = 1u64 << (index % 64);
        self.bits[word].fetch_or(bit, Ordering::Relaxed);
    }

    /// Check if the specified password is reachable
    #[inline]
    pub fn is_set(&self, index: PasswordIndex) -> bool {
        if index >= self.size {
            return false;
        }
        let word = (index / 64) as usize;
        let bit = 1u64 << (index % 64);
        (self.bits[word].load(Ordering::Relaxed) & bit) != 0
    }

    /// Count the number of reachable passwords
    pub fn count_reachable(&self) -> u64 {
        self.bits
            .iter()
            .map(|atomic| atomic.load(Ordering::Relaxed).count_ones() as u64)
            .sum()
    }

    /// Count the number of missing passwords
    pub fn count_missing(&self) -> u64 {
        self.size - self.count_reachable()
    }

    /// Fraction of the space that is reachable
    pub fn coverage(&self) -> f64 {
        if self.size == 0 {
            return 0.0;
        }
        self.count_reachable() as f64 / self.size as f64
    }

    /// Extract up to `limit` missing passwords, in rank order
    pub fn missing_indices(&self, limit: usize) -> Vec<PasswordIndex> {
        let mut missing = Vec::new();

        for (i, atomic) in self.bits.iter().enumerate() {
            let bits = atomic.load(Ordering::Relaxed);
            if bits == u64::MAX {
                continue;
            }

            let base = (i as u64) * 64;
            for bit_pos in 0..64u64 {
                let index = base + bit_pos;
                if index >= self.size || missing.len() >= limit {
                    return missing;
                }
                if bits & (1u64 << bit_pos) == 0 {
                    missing.push(index);
                }
            }
        }

        missing
    }
}

/// Analytical success probability of a single rainbow table
///
/// With `m_1 = num_chains` distinct chain starts, the expected number of
/// distinct passwords in column `i + 1` is `m_{i+1} = N (1 - e^{-m_i / N})`.
/// The probability that a random password is hashed somewhere in the table
/// is `1 - prod_{i=1..t} (1 - m_i / N)`.
pub fn expected_success_rate(num_chains: u64, chain_length: u32, space_size: u64) -> f64 {
    if space_size == 0 || num_chains == 0 {
        return 0.0;
    }

    let n = space_size as f64;
    let mut m = (num_chains as f64).min(n);
    let mut miss = 1.0;

    for _ in 0..chain_length {
        miss *= 1.0 - m / n;
        m = n * (1.0 - (-m / n).exp());
    }

    1.0 - miss
}
