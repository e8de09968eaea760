//! Table coverage CLI
//!
//! Measures the success rate of a table by cracking the hashes of random
//! passwords, and optionally computes its exact coverage.
//!
//! Example:
//!   desrainbow_coverage -t table.rt --samples 100 --bitmap

mod common;

use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::Parser;
use desrainbow::app::coverage::{analyze_coverage, measure_success_rate};
use desrainbow::domain::coverage::expected_success_rate;
use desrainbow::infra::table_io::load_table;

use common::{init_tracing, print_header, progress_logger};

/// Benchmark the success rate of a rainbow table.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// The rainbow table file.
    #[arg(short, long)]
    table: PathBuf,

    /// The number of random passwords to crack.
    #[arg(short = 'n', long, default_value_t = 50)]
    samples: usize,

    /// Seed of the random password generator.
    #[arg(short, long)]
    seed: Option<u64>,

    /// Also mark every password reachable from the table (small spaces only).
    #[arg(long)]
    bitmap: bool,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let table = load_table(&cli.table)
        .with_context(|| format!("Cannot load table {}", cli.table.display()))?;
    let config = table
        .header()
        .configuration()
        .context("The table header describes an invalid configuration")?;

    print_header(table.header());
    println!(
        "Expected success rate: {:.2}%",
        expected_success_rate(
            table.len() as u64,
            config.chain_length(),
            config.space().size()
        ) * 100.0
    );

    let seed = cli.seed.unwrap_or_else(rand::random);
    let result = measure_success_rate(table.entries(), &config, cli.samples, seed)?;
    println!(
        "Cracked {}/{} ({:.2}%), {:.3} ms per hash",
        result.cracked,
        result.samples,
        result.rate() * 100.0,
        result.mean_time().as_secs_f64() * 1000.0
    );

    if cli.bitmap {
        let log = Mutex::new(progress_logger("Bitmap"));
        let report = analyze_coverage(table.entries(), &config, |current, total| {
            if let Ok(mut log) = log.lock() {
                (*log)(current, total);
            }
        })?;

        println!(
            "Reachable passwords: {}/{} ({:.2}%)",
            report.reachable_count,
            report.reachable_count + report.missing_count,
            report.coverage * 100.0
        );
        if !report.missing_sample.is_empty() {
            let sample: Vec<String> = report
                .missing_sample
                .iter()
                .map(|&i| config.space().password(i).to_string())
                .collect();
            println!("First missing: {}", sample.join(", "));
        }
    }

    Ok(())
}
