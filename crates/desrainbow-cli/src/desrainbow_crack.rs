//! Hash cracking CLI
//!
//! Example:
//!   desrainbow_crack -H 6f2f3c5c1e4a9b07 -t table.rt -l 3 -c 1000
//!
//! The table must have been built with the same password length, chain
//! length, alphabet and key; otherwise the request is rejected before any
//! lookup.

mod common;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use desrainbow::{
    ChainEntry, Configuration, HashValue, Password, ValidationOptions, crack, crack_parallel,
    parse_hash_hex,
};
use tracing::info;

use common::{ConfigArgs, init_tracing};

/// Find the password producing a certain hash.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// The hash to crack, in hexadecimal.
    #[arg(short = 'H', long = "hash", value_parser = parse_hash_hex)]
    hash: HashValue,

    /// The rainbow table file.
    #[arg(short, long)]
    table: PathBuf,

    #[command(flatten)]
    config: ConfigArgs,

    /// Probe chain positions one after the other instead of in parallel.
    #[arg(long)]
    sequential: bool,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = cli.config.configuration()?;

    let start = Instant::now();
    let found = crack_file(&cli, &config)?;
    let elapsed = start.elapsed();

    match found {
        Some(password) => println!("Password found: {password}"),
        None => println!("Password not found in this table"),
    }
    println!("Elapsed: {:.3} seconds", elapsed.as_secs_f64());

    Ok(())
}

#[cfg(all(feature = "mmap", target_endian = "little"))]
fn crack_file(cli: &Cli, config: &Configuration) -> Result<Option<Password>> {
    use desrainbow::MappedTable;

    let table = MappedTable::open_validated(&cli.table, &ValidationOptions::for_crack(config))
        .with_context(|| format!("Cannot use table {}", cli.table.display()))?;
    info!(chains = table.len(), "table mapped");

    run(cli, table.as_slice(), config)
}

#[cfg(not(all(feature = "mmap", target_endian = "little")))]
fn crack_file(cli: &Cli, config: &Configuration) -> Result<Option<Password>> {
    use desrainbow::infra::table_io::load_table_validated;

    let table = load_table_validated(&cli.table, &ValidationOptions::for_crack(config))
        .with_context(|| format!("Cannot use table {}", cli.table.display()))?;
    info!(chains = table.len(), "table loaded");

    run(cli, table.entries(), config)
}

fn run(cli: &Cli, entries: &[ChainEntry], config: &Configuration) -> Result<Option<Password>> {
    let found = if cli.sequential {
        crack(&cli.hash, entries, config)?
    } else {
        crack_parallel(&cli.hash, entries, config)?
    };

    Ok(found)
}
