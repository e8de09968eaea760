//! Password hashing CLI
//!
//! Hash a single password:
//!   desrainbow_hash abc
//!
//! Or generate random passwords of the configured space with their hashes:
//!   desrainbow_hash --count 100 --out-prefix sample
//! which writes `sample_passwords.txt` and `sample_hashes.txt`.

mod common;

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use desrainbow::{Configuration, hash_password};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::info;

use common::{ConfigArgs, init_tracing};

/// Hash passwords with the DES one-way function of the rainbow tables.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// The password to hash.
    #[arg(required_unless_present = "count")]
    password: Option<String>,

    /// Generate this many random passwords and write them with their hashes.
    #[arg(short = 'n', long, conflicts_with = "password")]
    count: Option<usize>,

    /// Seed of the random password generator.
    #[arg(short, long)]
    seed: Option<u64>,

    /// Prefix of the files written by --count.
    #[arg(short, long, default_value = "sample")]
    out_prefix: String,

    #[command(flatten)]
    config: ConfigArgs,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = cli.config.configuration()?;

    if let Some(password) = &cli.password {
        let hash = hash_password(&config, password)
            .with_context(|| format!("Cannot hash {password:?}"))?;
        println!("{hash}");
    } else if let Some(count) = cli.count {
        write_samples(&config, count, cli.seed, &cli.out_prefix)?;
    } else {
        bail!("Either a password or --count is required");
    }

    Ok(())
}

fn write_samples(config: &Configuration, count: usize, seed: Option<u64>, prefix: &str) -> Result<()> {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let passwords_path = PathBuf::from(format!("{prefix}_passwords.txt"));
    let hashes_path = PathBuf::from(format!("{prefix}_hashes.txt"));

    let mut passwords = BufWriter::new(
        File::create(&passwords_path)
            .with_context(|| format!("Cannot create {}", passwords_path.display()))?,
    );
    let mut hashes = BufWriter::new(
        File::create(&hashes_path)
            .with_context(|| format!("Cannot create {}", hashes_path.display()))?,
    );

    for _ in 0..count {
        let password = config.space().random_password(&mut rng);
        let hash = config.hash(&password)?;
        writeln!(passwords, "{password}")?;
        writeln!(hashes, "{}", hex::encode(hash))?;
    }

    passwords.flush()?;
    hashes.flush()?;

    info!(count, "random passwords generated");
    println!("Passwords: {}", passwords_path.display());
    println!("Hashes:    {}", hashes_path.display());

    Ok(())
}
