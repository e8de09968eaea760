//! Pieces shared by the command line tools

#![allow(dead_code)]

use anyhow::{Context, Result, bail};
use clap::Args;
use desrainbow::constants::{
    DEFAULT_ALPHABET, DEFAULT_CHAIN_LENGTH, DEFAULT_PASSWORD_LENGTH, DES_KEY_SIZE,
};
use desrainbow::{Configuration, TableHeader};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Parameters every tool of a session must agree on.
#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    /// The fixed password length.
    #[arg(short = 'l', long = "length", default_value_t = DEFAULT_PASSWORD_LENGTH)]
    pub length: u8,

    /// The chain length.
    /// Increasing the chain length will reduce the memory used
    /// to store the table but increase the time taken to crack.
    #[arg(short = 'c', long, default_value_t = DEFAULT_CHAIN_LENGTH)]
    pub chain_length: u32,

    /// The characters passwords are made of.
    #[arg(long, default_value_t = String::from_utf8_lossy(DEFAULT_ALPHABET).to_string())]
    pub alphabet: String,

    /// The DES key, as 8 characters or 16 hexadecimal digits.
    #[arg(long, value_parser = parse_key, default_value = "RAINBOW1")]
    pub key: [u8; DES_KEY_SIZE],
}

impl ConfigArgs {
    pub fn configuration(&self) -> Result<Configuration> {
        Configuration::builder()
            .alphabet(self.alphabet.as_bytes())
            .password_length(self.length)
            .chain_length(self.chain_length)
            .key(self.key)
            .build()
            .context("Invalid configuration")
    }
}

/// Parse a DES key given as 8 raw characters or 16 hex digits.
pub fn parse_key(s: &str) -> Result<[u8; DES_KEY_SIZE]> {
    let bytes = match s.len() {
        DES_KEY_SIZE => s.as_bytes().to_vec(),
        16 => hex::decode(s).context("The key is not valid hexadecimal")?,
        n => bail!("The key must be 8 characters or 16 hex digits, got {n} characters"),
    };

    bytes
        .as_slice()
        .try_into()
        .context("The key must be exactly 8 bytes")
}

/// Install the tracing subscriber. `RUST_LOG` overrides the default `info` level.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Progress callback logging every 10% of `total`.
pub fn progress_logger(stage: &'static str) -> impl FnMut(u64, u64) {
    let mut last_decile = 0;

    move |current, total| {
        let decile = if total == 0 { 10 } else { current * 10 / total };
        if decile > last_decile {
            last_decile = decile;
            info!("[{stage}] {}% ({current}/{total})", decile * 10);
        }
    }
}

/// Print a table header in human readable form.
pub fn print_header(header: &TableHeader) {
    println!("Password length: {}", header.password_length);
    println!("Alphabet:        {}", String::from_utf8_lossy(&header.alphabet));
    println!("Chain length:    {}", header.chain_length);
    println!("Chains:          {}", header.num_chains);
    println!("Key:             {}", hex::encode(header.key));
}
