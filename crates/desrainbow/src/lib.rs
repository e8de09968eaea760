//! desrainbow - Rainbow tables for DES-hashed fixed-length passwords
//!
//! This crate provides functionality to:
//! - Hash passwords with the DES one-way function used by the tables
//! - Generate rainbow tables in parallel with endpoint deduplication
//! - Crack a hash back to its password by walking candidate chains
//! - Persist tables and measure their coverage

pub mod app;
pub mod constants;
pub mod domain;
pub mod error;
pub mod infra;

// Re-export commonly used types
pub use app::cracker::{crack, crack_parallel, crack_table};
pub use app::generator::{BuildStats, TableBuilder};
pub use constants::*;
pub use domain::chain::ChainEntry;
pub use domain::config::{Configuration, ConfigurationBuilder};
pub use domain::hash::{DesHash, HashValue, hash_password, parse_hash_hex, reduce_hash};
pub use domain::password::{Password, PasswordSpace};
pub use domain::table::RainbowTable;
pub use domain::table_format::{TableFormatError, TableHeader, ValidationOptions};
pub use error::{EncodingError, RainbowError, RainbowResult};

#[cfg(feature = "mmap")]
pub use infra::table_io::MappedTable;
