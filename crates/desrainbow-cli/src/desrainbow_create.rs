//! Rainbow table creation CLI
//!
//! Example:
//!   desrainbow_create -n 100000 -l 3 -c 1000 -o table.rt
//!
//! Chains are generated by a pool of worker threads, deduplicated by
//! endpoint, sorted and written atomically to the output file. Ctrl-C or
//! `--timeout` stops the workers and leaves the output file untouched.

mod common;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use desrainbow::app::generator::default_workers;
use desrainbow::constants::{DEFAULT_BATCH_SIZE, DEFAULT_BUILD_TIMEOUT_SECS, DEFAULT_NUM_CHAINS};
use desrainbow::domain::coverage::expected_success_rate;
use desrainbow::infra::table_io::save_table;
use desrainbow::{Configuration, Password, TableBuilder};
use tracing::warn;

use common::{ConfigArgs, init_tracing, progress_logger};

/// Generate a rainbow table.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// The number of chains to generate.
    #[arg(short = 'n', long, default_value_t = DEFAULT_NUM_CHAINS)]
    chains: u64,

    #[command(flatten)]
    config: ConfigArgs,

    /// The number of worker threads (default: available parallelism).
    #[arg(short, long)]
    workers: Option<usize>,

    /// The number of chains handed to a worker at once.
    #[arg(short, long, default_value_t = DEFAULT_BATCH_SIZE)]
    batch_size: usize,

    /// Seed of the start password generator, for reproducible tables.
    #[arg(short, long)]
    seed: Option<u64>,

    /// Build from the start passwords listed in this file (one per line)
    /// instead of random ones.
    #[arg(long)]
    starts: Option<PathBuf>,

    /// Abort the build after this many seconds (0 disables the limit).
    #[arg(long, default_value_t = DEFAULT_BUILD_TIMEOUT_SECS)]
    timeout: u64,

    /// The output table file.
    #[arg(short, long)]
    output: PathBuf,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = cli.config.configuration()?;

    let cancel = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancel);
    ctrlc::set_handler(move || {
        warn!("interrupted, stopping the build");
        flag.store(true, Ordering::SeqCst);
    })
    .context("Cannot install the Ctrl-C handler")?;

    let mut builder = TableBuilder::new(config.clone())
        .num_chains(cli.chains)
        .workers(cli.workers.unwrap_or_else(default_workers))
        .batch_size(cli.batch_size)
        .cancel_flag(cancel);

    if cli.timeout > 0 {
        builder = builder.timeout(Duration::from_secs(cli.timeout));
    }

    if let Some(seed) = cli.seed {
        builder = builder.seed(seed);
    }
    if let Some(path) = &cli.starts {
        builder = builder.start_passwords(read_start_passwords(&config, path)?);
    }

    let start = Instant::now();
    let (table, stats) = builder
        .build_with_progress(progress_logger("Generation"))
        .context("Table generation failed, nothing was written")?;
    let gen_elapsed = start.elapsed();

    save_table(&cli.output, &table)
        .with_context(|| format!("Cannot write {}", cli.output.display()))?;

    let file_size = fs::metadata(&cli.output).map(|m| m.len()).unwrap_or(0);

    println!(
        "Generated {} chains in {:.2} seconds",
        stats.generated,
        gen_elapsed.as_secs_f64()
    );
    println!("Duplicates removed: {}", stats.duplicates_removed);
    if stats.failed_chains > 0 || stats.failed_batches > 0 {
        println!(
            "Lost: {} chains, {} batches",
            stats.failed_chains, stats.failed_batches
        );
    }
    println!("Stored chains: {}", table.len());
    println!(
        "Expected success rate: {:.2}%",
        expected_success_rate(
            table.len() as u64,
            config.chain_length(),
            config.space().size()
        ) * 100.0
    );
    println!(
        "Table written to {} ({:.2} MB)",
        cli.output.display(),
        file_size as f64 / (1024.0 * 1024.0)
    );

    Ok(())
}

fn read_start_passwords(config: &Configuration, path: &Path) -> Result<Vec<Password>> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Cannot read {}", path.display()))?;

    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .enumerate()
        .map(|(i, line)| {
            config
                .space()
                .parse(line)
                .with_context(|| format!("Invalid start password on line {}", i + 1))
        })
        .collect()
}
