//! Table generation workflow
//!
//! This module provides the `TableBuilder`, which fans chain generation out to
//! a fixed pool of worker threads and merges their results into a sorted,
//! endpoint-unique `RainbowTable`.
//!
//! Work is split into batches that are all enqueued on a task channel before
//! the workers start. Each worker owns its RNG for the batch it is running and
//! sends one report per finished batch back on a result channel. Nothing is
//! shared between workers during generation.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use crate::constants::{DEFAULT_BATCH_SIZE, DEFAULT_NUM_CHAINS};
use crate::domain::chain::{ChainEntry, compute_chain};
use crate::domain::config::Configuration;
use crate::domain::password::{Password, PasswordIndex};
use crate::domain::table::RainbowTable;
use crate::error::{EncodingError, RainbowError, RainbowResult};
use crate::infra::table_sort::merge_batches;

/// Counters describing a finished build
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BuildStats {
    /// Chains requested
    pub requested: u64,
    /// Chains successfully generated, before deduplication
    pub generated: u64,
    /// Chains dropped because generation failed
    pub failed_chains: u64,
    /// Batches whose results never reached the coordinator
    pub failed_batches: usize,
    /// Chains dropped because their endpoint was already present
    pub duplicates_removed: usize,
}

impl BuildStats {
    /// Chains stored in the final table
    pub fn stored(&self) -> u64 {
        self.generated - self.duplicates_removed as u64
    }
}

/// One unit of work for a worker
#[derive(Clone, Copy, Debug)]
struct Task {
    id: usize,
    /// First chain of the batch (offset into the explicit start list, if any)
    offset: u64,
    count: u64,
    seed: u64,
}

/// What a worker sends back for one finished batch
struct BatchReport {
    id: usize,
    entries: Vec<ChainEntry>,
    failed: u64,
}

/// A builder for a rainbow table.
#[derive(Clone, Debug)]
pub struct TableBuilder {
    config: Configuration,
    num_chains: u64,
    workers: usize,
    batch_size: usize,
    seed: Option<u64>,
    starts: Option<Vec<Password>>,
    cancel: Option<Arc<AtomicBool>>,
    timeout: Option<Duration>,
}

/// When workers have to stop early
#[derive(Clone, Copy)]
struct StopCondition<'a> {
    cancel: &'a AtomicBool,
    deadline: Option<Instant>,
}

impl StopCondition<'_> {
    /// Raises the cancel flag once the deadline has passed
    fn should_stop(&self) -> bool {
        if self.cancel.load(Ordering::Relaxed) {
            return true;
        }
        if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            self.cancel.store(true, Ordering::Relaxed);
            return true;
        }
        false
    }
}

impl TableBuilder {
    /// Creates a new TableBuilder for the given configuration.
    pub fn new(config: Configuration) -> Self {
        Self {
            config,
            num_chains: DEFAULT_NUM_CHAINS,
            workers: default_workers(),
            batch_size: DEFAULT_BATCH_SIZE,
            seed: None,
            starts: None,
            cancel: None,
            timeout: None,
        }
    }

    /// Sets the number of chains to generate.
    /// Ignored when explicit start passwords are given.
    pub fn num_chains(mut self, num_chains: u64) -> Self {
        self.num_chains = num_chains;

        self
    }

    /// Sets the number of worker threads.
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers;

        self
    }

    /// Sets the number of chains per task.
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;

        self
    }

    /// Sets the seed of the start password generator.
    /// Builds with the same seed and batch size produce the same table.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);

        self
    }

    /// Builds chains from these start passwords instead of random ones.
    pub fn start_passwords(mut self, starts: Vec<Password>) -> Self {
        self.starts = Some(starts);

        self
    }

    /// Sets a flag that aborts the build when raised.
    pub fn cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = Some(cancel);

        self
    }

    /// Sets a time limit for the build.
    /// Once it has passed, workers stop and the build fails with `Timeout`.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);

        self
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    /// Build the table
    pub fn build(&self) -> RainbowResult<(RainbowTable, BuildStats)> {
        self.build_with(compute_chain, |_, _| {})
    }

    /// Build the table, reporting `(chains done, chains total)` after every batch
    pub fn build_with_progress<P>(&self, on_progress: P) -> RainbowResult<(RainbowTable, BuildStats)>
    where
        P: FnMut(u64, u64),
    {
        self.build_with(compute_chain, on_progress)
    }

    /// Build the table with a custom chain function
    ///
    /// `chain_fn` maps a start rank to a chain entry. A failing chain is
    /// dropped and counted; a panicking chain loses the batch it belongs to.
    /// Losing only the batch requires unwinding panics: under the workspace
    /// release profile (`panic = "abort"`) a panic ends the process.
    pub fn build_with<F, P>(
        &self,
        chain_fn: F,
        mut on_progress: P,
    ) -> RainbowResult<(RainbowTable, BuildStats)>
    where
        F: Fn(&Configuration, PasswordIndex) -> Result<ChainEntry, EncodingError> + Sync,
        P: FnMut(u64, u64),
    {
        if self.workers == 0 {
            return Err(RainbowError::InvalidConfig(
                "worker count must be greater than 0".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(RainbowError::InvalidConfig(
                "batch size must be greater than 0".to_string(),
            ));
        }

        let started = Instant::now();
        let starts = self.start_indices()?;
        let total = match &starts {
            Some(starts) => starts.len() as u64,
            None => self.num_chains,
        };
        let tasks = self.plan_tasks(total);
        let num_batches = tasks.len();

        info!(
            chains = total,
            chain_length = self.config.chain_length(),
            password_length = self.config.password_length(),
            workers = self.workers,
            batches = num_batches,
            "building rainbow table"
        );

        let (task_tx, task_rx) = crossbeam_channel::unbounded::<Task>();
        for task in tasks {
            // the receiver is alive until the end of this function
            let _ = task_tx.send(task);
        }
        drop(task_tx);

        let (result_tx, result_rx) = crossbeam_channel::unbounded::<BatchReport>();
        let mut slots: Vec<Option<Vec<ChainEntry>>> = vec![None; num_batches];
        let mut stats = BuildStats {
            requested: total,
            ..BuildStats::default()
        };

        let config = &self.config;
        let chain_fn = &chain_fn;
        let starts = starts.as_deref();
        let local_cancel = AtomicBool::new(false);
        let stop = StopCondition {
            cancel: self.cancel.as_deref().unwrap_or(&local_cancel),
            deadline: self.timeout.and_then(|timeout| started.checked_add(timeout)),
        };

        thread::scope(|s| {
            let handles: Vec<_> = (0..self.workers.min(num_batches.max(1)))
                .map(|worker_id| {
                    let task_rx = task_rx.clone();
                    let result_tx = result_tx.clone();
                    s.spawn(move || {
                        run_worker(worker_id, config, task_rx, result_tx, starts, chain_fn, stop)
                    })
                })
                .collect();
            drop(result_tx);

            let mut done = 0u64;
            for report in result_rx.iter() {
                done += (report.entries.len() as u64) + report.failed;
                stats.generated += report.entries.len() as u64;
                stats.failed_chains += report.failed;
                slots[report.id] = Some(report.entries);
                on_progress(done, total);

                if stop.should_stop() {
                    break;
                }
            }

            for (worker_id, handle) in handles.into_iter().enumerate() {
                if handle.join().is_err() {
                    warn!(worker = worker_id, "worker panicked, its batch is lost");
                }
            }
        });

        if stop.cancel.load(Ordering::Relaxed) {
            if let Some(limit) = self.timeout.filter(|&limit| started.elapsed() >= limit) {
                warn!(limit_secs = limit.as_secs_f64(), "table build timed out");
                return Err(RainbowError::Timeout { limit });
            }
            info!("table build cancelled");
            return Err(RainbowError::Cancelled);
        }

        stats.failed_batches = slots.iter().filter(|slot| slot.is_none()).count();
        let batches: Vec<Vec<ChainEntry>> = slots.into_iter().flatten().collect();
        let (entries, removed) = merge_batches(batches);
        stats.duplicates_removed = removed;

        if total > 0 && entries.is_empty() {
            return Err(RainbowError::TableBuild {
                batches: num_batches,
                failed_batches: stats.failed_batches,
            });
        }

        if stats.failed_batches > 0 || stats.failed_chains > 0 {
            warn!(
                failed_batches = stats.failed_batches,
                failed_chains = stats.failed_chains,
                "some chains were lost during the build"
            );
        }
        info!(
            generated = stats.generated,
            duplicates = removed,
            stored = entries.len(),
            "rainbow table built"
        );

        Ok((RainbowTable::from_sorted(&self.config, entries), stats))
    }

    /// Ranks of the explicit start passwords, validated against the space
    fn start_indices(&self) -> RainbowResult<Option<Vec<PasswordIndex>>> {
        let Some(starts) = &self.starts else {
            return Ok(None);
        };

        let space = self.config.space();
        let indices = starts
            .iter()
            .map(|password| space.index(password))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(indices))
    }

    fn plan_tasks(&self, total: u64) -> Vec<Task> {
        let base_seed = self.seed.unwrap_or_else(rand::random);
        let batch_size = self.batch_size as u64;

        (0..total.div_ceil(batch_size))
            .map(|id| {
                let offset = id * batch_size;
                Task {
                    id: id as usize,
                    offset,
                    count: batch_size.min(total - offset),
                    seed: task_seed(base_seed, id),
                }
            })
            .collect()
    }
}

/// Number of workers used when none is configured
pub fn default_workers() -> usize {
    thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

fn task_seed(base: u64, id: u64) -> u64 {
    base ^ (id + 1).wrapping_mul(0x9e3779b97f4a7c15)
}

fn run_worker<F>(
    worker_id: usize,
    config: &Configuration,
    tasks: Receiver<Task>,
    results: Sender<BatchReport>,
    starts: Option<&[PasswordIndex]>,
    chain_fn: &F,
    stop: StopCondition<'_>,
) where
    F: Fn(&Configuration, PasswordIndex) -> Result<ChainEntry, EncodingError> + Sync,
{
    while let Ok(task) = tasks.recv() {
        let Some(report) = run_task(config, &task, starts, chain_fn, stop) else {
            break;
        };

        debug!(
            worker = worker_id,
            batch = task.id,
            chains = report.entries.len(),
            failed = report.failed,
            "batch done"
        );

        if results.send(report).is_err() {
            break;
        }
    }
}

/// Generate one batch; `None` if the build was stopped meanwhile
fn run_task<F>(
    config: &Configuration,
    task: &Task,
    starts: Option<&[PasswordIndex]>,
    chain_fn: &F,
    stop: StopCondition<'_>,
) -> Option<BatchReport>
where
    F: Fn(&Configuration, PasswordIndex) -> Result<ChainEntry, EncodingError>,
{
    let space = config.space();
    let mut rng = StdRng::seed_from_u64(task.seed);
    let mut entries = Vec::with_capacity(task.count as usize);
    let mut failed = 0;

    for i in 0..task.count {
        if stop.should_stop() {
            return None;
        }

        let start = match starts {
            Some(starts) => starts[(task.offset + i) as usize],
            None => rng.gen_range(0..space.size()),
        };

        match chain_fn(config, start) {
            Ok(entry) => entries.push(entry),
            Err(e) => {
                failed += 1;
                warn!(batch = task.id, start, error = %e, "chain dropped");
            }
        }
    }

    Some(BatchReport {
        id: task.id,
        entries,
        failed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::table_sort::is_sorted_unique;
    use std::sync::atomic::AtomicUsize;

    fn config() -> Configuration {
        Configuration::new(3, 20).unwrap()
    }

    fn builder() -> TableBuilder {
        TableBuilder::new(config())
            .num_chains(500)
            .workers(4)
            .batch_size(64)
            .seed(42)
    }

    #[test]
    fn test_build_sorted_unique() {
        let (table, stats) = builder().build().unwrap();

        assert!(is_sorted_unique(table.entries()));
        assert_eq!(stats.requested, 500);
        assert_eq!(stats.generated, 500);
        assert_eq!(stats.failed_batches, 0);
        assert_eq!(stats.stored(), table.len() as u64);
        assert_eq!(table.header().num_chains, table.len() as u64);
    }

    #[test]
    fn test_build_chains_are_reproducible() {
        let config = config();
        let (table, _) = builder().build().unwrap();

        for entry in table.entries() {
            assert_eq!(compute_chain(&config, entry.start).unwrap(), *entry);
        }
    }

    #[test]
    fn test_build_deterministic_with_seed() {
        let (a, _) = builder().build().unwrap();
        let (b, _) = builder().workers(1).build().unwrap();
        assert_eq!(a.entries(), b.entries());
    }

    #[test]
    fn test_build_zero_chains() {
        let (table, stats) = builder().num_chains(0).build().unwrap();
        assert!(table.is_empty());
        assert_eq!(stats.requested, 0);
    }

    #[test]
    fn test_build_rejects_zero_workers() {
        assert!(matches!(
            builder().workers(0).build(),
            Err(RainbowError::InvalidConfig(_))
        ));
        assert!(matches!(
            builder().batch_size(0).build(),
            Err(RainbowError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_build_from_start_passwords() {
        let config = config();
        let space = config.space();
        let starts: Vec<Password> = ["abc", "zzz", "a1b", "abc"]
            .iter()
            .map(|s| space.parse(s).unwrap())
            .collect();

        let (table, stats) = builder().start_passwords(starts.clone()).build().unwrap();

        assert_eq!(stats.requested, 4);
        // "abc" twice yields the same end
        assert!(stats.duplicates_removed >= 1);
        assert!(table.len() <= 3);

        let first = space.index(&starts[0]).unwrap();
        assert!(table.entries().iter().any(|e| e.start == first));
    }

    #[test]
    fn test_build_rejects_foreign_start_password() {
        let starts = vec![Password::from_bytes(b"ABC").unwrap()];
        assert!(matches!(
            builder().start_passwords(starts).build(),
            Err(RainbowError::Encoding(EncodingError::InvalidCharacter { .. }))
        ));
    }

    #[test]
    fn test_build_keeps_first_of_colliding_chains() {
        // every chain ends at rank 7
        let starts: Vec<Password> = (0..10).map(|i| config().space().password(i)).collect();
        let (table, stats) = builder()
            .start_passwords(starts)
            .batch_size(3)
            .build_with(|_, start| Ok(ChainEntry::new(start, 7)), |_, _| {})
            .unwrap();

        assert_eq!(table.entries(), &[ChainEntry::new(0, 7)]);
        assert_eq!(stats.duplicates_removed, 9);
    }

    #[test]
    fn test_build_all_chains_failing() {
        let result = builder().build_with(
            |_, _| Err(EncodingError::BlockLength { length: 9, min: 1, max: 8 }),
            |_, _| {},
        );

        assert!(matches!(
            result,
            Err(RainbowError::TableBuild { batches: 8, .. })
        ));
    }

    #[test]
    fn test_build_some_chains_failing() {
        let (table, stats) = builder()
            .build_with(
                |config, start| {
                    if start % 2 == 0 {
                        Err(EncodingError::BlockLength { length: 0, min: 1, max: 8 })
                    } else {
                        compute_chain(config, start)
                    }
                },
                |_, _| {},
            )
            .unwrap();

        assert!(stats.failed_chains > 0);
        assert_eq!(stats.generated + stats.failed_chains, 500);
        assert!(table.entries().iter().all(|e| e.start % 2 == 1));
    }

    #[test]
    fn test_build_worker_panic_loses_one_batch() {
        let starts: Vec<Password> = (0..100).map(|i| config().space().password(i)).collect();
        let (table, stats) = builder()
            .start_passwords(starts)
            .batch_size(10)
            .build_with(
                |config, start| {
                    if start == 15 {
                        panic!("injected failure");
                    }
                    compute_chain(config, start)
                },
                |_, _| {},
            )
            .unwrap();

        assert_eq!(stats.failed_batches, 1);
        assert_eq!(stats.generated, 90);
        assert!(table.entries().iter().all(|e| !(10..20).contains(&e.start)));
    }

    #[test]
    fn test_build_progress_reaches_total() {
        let calls = AtomicUsize::new(0);
        let mut last = (0, 0);

        builder()
            .build_with_progress(|done, total| {
                calls.fetch_add(1, Ordering::Relaxed);
                last = (done, total);
            })
            .unwrap();

        assert_eq!(calls.load(Ordering::Relaxed), 8);
        assert_eq!(last, (500, 500));
    }

    #[test]
    fn test_build_cancelled_before_start() {
        let cancel = Arc::new(AtomicBool::new(true));
        assert!(matches!(
            builder().cancel_flag(cancel).build(),
            Err(RainbowError::Cancelled)
        ));
    }

    #[test]
    fn test_build_cancelled_from_progress() {
        let cancel = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancel);

        let result = builder()
            .cancel_flag(cancel)
            .build_with_progress(move |_, _| flag.store(true, Ordering::Relaxed));

        assert!(matches!(result, Err(RainbowError::Cancelled)));
    }

    #[test]
    fn test_build_zero_timeout() {
        let result = builder().timeout(Duration::ZERO).build();
        assert!(matches!(
            result,
            Err(RainbowError::Timeout { limit }) if limit == Duration::ZERO
        ));
    }

    #[test]
    fn test_build_timeout_stops_slow_chains() {
        let cancel = Arc::new(AtomicBool::new(false));
        let started = Instant::now();

        let result = builder()
            .workers(2)
            .cancel_flag(Arc::clone(&cancel))
            .timeout(Duration::from_millis(50))
            .build_with(
                |config, start| {
                    thread::sleep(Duration::from_millis(5));
                    compute_chain(config, start)
                },
                |_, _| {},
            );

        assert!(matches!(result, Err(RainbowError::Timeout { .. })));
        assert!(cancel.load(Ordering::Relaxed));
        // 500 chains at 5 ms on 2 workers would take over a second
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_build_within_timeout() {
        let (table, stats) = builder()
            .timeout(Duration::from_secs(3600))
            .build()
            .unwrap();
        assert_eq!(stats.generated, 500);
        assert_eq!(stats.stored(), table.len() as u64);
    }
}
