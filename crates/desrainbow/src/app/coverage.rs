//! Table coverage workflow
//!
//! This module measures how much of the password space a table can crack,
//! either exactly (by marking every password hashed in some chain) or
//! empirically (by cracking the hashes of random passwords).

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use rand::SeedableRng;
use rand::rngs::StdRng;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::app::cracker::crack_parallel;
use crate::domain::chain::{ChainEntry, ChainWalk};
use crate::domain::config::Configuration;
use crate::domain::coverage::{PasswordBitmap, expected_success_rate};
use crate::domain::password::PasswordIndex;
use crate::error::RainbowResult;

/// Result of an exact coverage analysis
#[derive(Debug, Clone)]
pub struct CoverageReport {
    /// Number of reachable passwords
    pub reachable_count: u64,
    /// Number of missing passwords
    pub missing_count: u64,
    /// Coverage ratio (0.0 to 1.0)
    pub coverage: f64,
    /// Coverage predicted from the table dimensions alone
    pub expected_coverage: f64,
    /// First missing passwords, in rank order
    pub missing_sample: Vec<PasswordIndex>,
}

/// Result of an empirical success-rate measurement
#[derive(Debug, Clone)]
pub struct SuccessRate {
    /// Number of random passwords tried
    pub samples: usize,
    /// Number of hashes cracked
    pub cracked: usize,
    /// Time spent cracking
    pub elapsed: Duration,
}

impl SuccessRate {
    /// Cracked fraction of the samples
    pub fn rate(&self) -> f64 {
        if self.samples == 0 {
            return 0.0;
        }
        self.cracked as f64 / self.samples as f64
    }

    /// Mean time per crack attempt
    pub fn mean_time(&self) -> Duration {
        if self.samples == 0 {
            return Duration::ZERO;
        }
        self.elapsed.div_f64(self.samples as f64)
    }
}

/// Build a password bitmap from the table
///
/// Marks every password that is hashed in some chain (columns `0..L`).
/// Chains are processed in parallel using rayon.
pub fn build_password_bitmap<F>(
    entries: &[ChainEntry],
    config: &Configuration,
    on_progress: F,
) -> RainbowResult<PasswordBitmap>
where
    F: Fn(u64, u64) + Sync,
{
    let space = config.space();
    let bitmap = PasswordBitmap::new(space.size())?;
    let total = entries.len() as u64;
    let progress = AtomicU64::new(0);

    entries.par_iter().try_for_each(|entry| -> RainbowResult<()> {
        for step in ChainWalk::new(config, space.password(entry.start)) {
            bitmap.set(space.index(&step?.password)?);
        }

        let count = progress.fetch_add(1, Ordering::Relaxed);
        if count % 10_000 == 0 {
            on_progress(count, total);
        }
        Ok(())
    })?;

    on_progress(total, total);
    Ok(bitmap)
}

/// Analyze the exact coverage of a table
pub fn analyze_coverage<F>(
    entries: &[ChainEntry],
    config: &Configuration,
    on_progress: F,
) -> RainbowResult<CoverageReport>
where
    F: Fn(u64, u64) + Sync,
{
    let bitmap = build_password_bitmap(entries, config, on_progress)?;

    let reachable_count = bitmap.count_reachable();
    let report = CoverageReport {
        reachable_count,
        missing_count: bitmap.count_missing(),
        coverage: bitmap.coverage(),
        expected_coverage: expected_success_rate(
            entries.len() as u64,
            config.chain_length(),
            config.space().size(),
        ),
        missing_sample: bitmap.missing_indices(10),
    };

    info!(
        reachable = report.reachable_count,
        missing = report.missing_count,
        coverage = report.coverage,
        expected = report.expected_coverage,
        "coverage analyzed"
    );

    Ok(report)
}

/// Crack the hashes of `samples` random passwords and count the successes
pub fn measure_success_rate(
    entries: &[ChainEntry],
    config: &Configuration,
    samples: usize,
    seed: u64,
) -> RainbowResult<SuccessRate> {
    let space = config.space();
    let mut rng = StdRng::seed_from_u64(seed);
    let mut cracked = 0;
    let started = Instant::now();

    for i in 0..samples {
        let password = space.random_password(&mut rng);
        let target = config.hash(&password)?;

        match crack_parallel(&target, entries, config)? {
            Some(found) => {
                debug!(sample = i, password = %password, found = %found, "sample cracked");
                cracked += 1;
            }
            None => debug!(sample = i, password = %password, "sample not found"),
        }
    }

    let result = SuccessRate {
        samples,
        cracked,
        elapsed: started.elapsed(),
    };

    if samples > 0 && cracked == 0 {
        warn!(samples, "no sample was cracked");
    }
    info!(
        samples,
        cracked,
        rate = result.rate(),
        elapsed_ms = result.elapsed.as_millis() as u64,
        "success rate measured"
    );

    Ok(result)
}
