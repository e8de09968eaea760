use std::io;
use std::time::Duration;

use thiserror::Error;

use crate::domain::table_format::TableFormatError;

pub type RainbowResult<T> = std::result::Result<T, RainbowError>;

/// A password or hash that cannot be represented for the one-way function.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodingError {
    #[error("password length {length} does not fit a DES block (allowed {min}..={max})")]
    BlockLength { length: usize, min: u8, max: u8 },

    #[error("password has length {found} but the configured length is {expected}")]
    WrongLength { expected: u8, found: usize },

    #[error("character {character:?} at position {position} is not in the alphabet")]
    InvalidCharacter { character: char, position: usize },

    #[error("hash must be {expected} hexadecimal bytes: {reason}")]
    InvalidHash { expected: usize, reason: String },
}

#[derive(Error, Debug)]
pub enum RainbowError {
    #[error(transparent)]
    Encoding(#[from] EncodingError),

    #[error("configuration mismatch: table has {parameter} = {found}, request expects {expected}")]
    ConfigMismatch {
        parameter: &'static str,
        expected: String,
        found: String,
    },

    #[error("table build failed: no chain was produced ({failed_batches} of {batches} batches lost)")]
    TableBuild { batches: usize, failed_batches: usize },

    #[error("table build was cancelled")]
    Cancelled,

    #[error("table build exceeded its time limit of {limit:?}")]
    Timeout { limit: Duration },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    TableFormat(#[from] TableFormatError),

    #[error("Unable to access the table file: {0}")]
    Io(#[from] io::Error),
}
