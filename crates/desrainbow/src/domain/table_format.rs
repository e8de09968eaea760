//! Rainbow table file format definitions
//!
//! This module defines the single-file format for rainbow tables,
//! including header structure and metadata.
//!
//! Header layout (128 bytes, little-endian):
//!
//! | offset   | field                  |
//! |----------|------------------------|
//! | 0..8     | magic `DESRBWTB`       |
//! | 8..10    | format version         |
//! | 10       | password length        |
//! | 11       | alphabet length        |
//! | 12..16   | chain length           |
//! | 16..24   | number of chains       |
//! | 24..28   | flags                  |
//! | 28..32   | reserved               |
//! | 32..40   | creation time (unix s) |
//! | 40..48   | DES key                |
//! | 48..112  | alphabet bytes         |
//! | 112..128 | reserved               |

use std::time::{SystemTime, UNIX_EPOCH};

use byteorder::{ByteOrder, LittleEndian};
use thiserror::Error;

use crate::constants::{
    CHAIN_ENTRY_SIZE, DES_KEY_SIZE, FILE_FORMAT_VERSION, FILE_HEADER_SIZE, FLAG_SORTED,
    FLAG_UNIQUE, MAX_ALPHABET_LENGTH, TABLE_MAGIC,
};
use crate::domain::config::Configuration;
use crate::error::{RainbowError, RainbowResult};

const ALPHABET_OFFSET: usize = 48;

/// Table file header metadata
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableHeader {
    /// File format version
    pub version: u16,
    /// Fixed password length of the table
    pub password_length: u8,
    /// Alphabet the passwords are drawn from
    pub alphabet: Vec<u8>,
    /// Chain length (steps per chain)
    pub chain_length: u32,
    /// Number of chain records following the header
    pub num_chains: u64,
    /// Flags (sorted, unique)
    pub flags: u32,
    /// Creation timestamp (Unix epoch seconds)
    pub created_at: u64,
    /// DES key of the one-way function
    pub key: [u8; DES_KEY_SIZE],
}

impl TableHeader {
    /// Create a new header describing a table built with `config`
    pub fn new(config: &Configuration, num_chains: u64) -> Self {
        let created_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        Self {
            version: FILE_FORMAT_VERSION,
            password_length: config.password_length(),
            alphabet: config.space().alphabet().to_vec(),
            chain_length: config.chain_length(),
            num_chains,
            flags: FLAG_SORTED | FLAG_UNIQUE,
            created_at,
            key: config.key(),
        }
    }

    /// Check if table is sorted
    pub fn is_sorted(&self) -> bool {
        self.flags & FLAG_SORTED != 0
    }

    /// Check if table endpoints are unique
    pub fn is_unique(&self) -> bool {
        self.flags & FLAG_UNIQUE != 0
    }

    /// Set sorted flag
    pub fn set_sorted(&mut self, sorted: bool) {
        if sorted {
            self.flags |= FLAG_SORTED;
        } else {
            self.flags &= !FLAG_SORTED;
        }
    }

    /// Rebuild the configuration the table was generated with
    pub fn configuration(&self) -> RainbowResult<Configuration> {
        Configuration::builder()
            .alphabet(&self.alphabet)
            .password_length(self.password_length)
            .chain_length(self.chain_length)
            .key(self.key)
            .build()
    }

    /// Serialize header to bytes (128 bytes)
    pub fn to_bytes(&self) -> [u8; FILE_HEADER_SIZE] {
        let mut buf = [0u8; FILE_HEADER_SIZE];
        let alphabet_len = self.alphabet.len().min(MAX_ALPHABET_LENGTH);

        buf[0..8].copy_from_slice(&TABLE_MAGIC);
        LittleEndian::write_u16(&mut buf[8..10], self.version);
        buf[10] = self.password_length;
        buf[11] = alphabet_len as u8;
        LittleEndian::write_u32(&mut buf[12..16], self.chain_length);
        LittleEndian::write_u64(&mut buf[16..24], self.num_chains);
        LittleEndian::write_u32(&mut buf[24..28], self.flags);
        // 28..32 reserved
        LittleEndian::write_u64(&mut buf[32..40], self.created_at);
        buf[40..48].copy_from_slice(&self.key);
        buf[ALPHABET_OFFSET..ALPHABET_OFFSET + alphabet_len]
            .copy_from_slice(&self.alphabet[..alphabet_len]);
        // 112..128 reserved

        buf
    }

    /// Deserialize header from bytes
    pub fn from_bytes(buf: &[u8; FILE_HEADER_SIZE]) -> Result<Self, TableFormatError> {
        if buf[0..8] != TABLE_MAGIC {
            return Err(TableFormatError::InvalidMagic);
        }

        let version = LittleEndian::read_u16(&buf[8..10]);
        if version != FILE_FORMAT_VERSION {
            return Err(TableFormatError::UnsupportedVersion(version));
        }

        let alphabet_len = buf[11] as usize;
        if alphabet_len > MAX_ALPHABET_LENGTH {
            return Err(TableFormatError::InvalidHeader(format!(
                "alphabet length {} exceeds {}",
                alphabet_len, MAX_ALPHABET_LENGTH
            )));
        }

        let chain_length = LittleEndian::read_u32(&buf[12..16]);
        if chain_length == 0 {
            return Err(TableFormatError::InvalidHeader(
                "chain length is 0".to_string(),
            ));
        }

        let mut key = [0u8; DES_KEY_SIZE];
        key.copy_from_slice(&buf[40..48]);

        Ok(Self {
            version,
            password_length: buf[10],
            alphabet: buf[ALPHABET_OFFSET..ALPHABET_OFFSET + alphabet_len].to_vec(),
            chain_length,
            num_chains: LittleEndian::read_u64(&buf[16..24]),
            flags: LittleEndian::read_u32(&buf[24..28]),
            created_at: LittleEndian::read_u64(&buf[32..40]),
            key,
        })
    }
}

/// Validation options for table loading
#[derive(Clone, Debug, Default)]
pub struct ValidationOptions {
    /// Expected configuration (None = skip validation)
    pub expected: Option<Configuration>,
    /// Require sorted table
    pub require_sorted: bool,
}

impl ValidationOptions {
    /// Create options for cracking (requires sorted, validates configuration)
    pub fn for_crack(config: &Configuration) -> Self {
        Self {
            expected: Some(config.clone()),
            require_sorted: true,
        }
    }

    /// Create options for inspection (no validation)
    pub fn for_inspection() -> Self {
        Self::default()
    }
}

/// Table format errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TableFormatError {
    #[error("Invalid file format: not a rainbow table file")]
    InvalidMagic,

    #[error("Unsupported format version: {0}")]
    UnsupportedVersion(u16),

    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    #[error("Table is not sorted (required for cracking)")]
    TableNotSorted,

    #[error("Invalid file size: expected {expected} bytes, found {found} bytes")]
    InvalidFileSize { expected: u64, found: u64 },
}

/// Check that a table header matches the configuration of a request
///
/// Parameters are compared in the order password length, chain length,
/// alphabet, key; the first difference is reported.
pub fn check_configuration(header: &TableHeader, config: &Configuration) -> RainbowResult<()> {
    if header.password_length != config.password_length() {
        return Err(RainbowError::ConfigMismatch {
            parameter: "password length",
            expected: config.password_length().to_string(),
            found: header.password_length.to_string(),
        });
    }

    if header.chain_length != config.chain_length() {
        return Err(RainbowError::ConfigMismatch {
            parameter: "chain length",
            expected: config.chain_length().to_string(),
            found: header.chain_length.to_string(),
        });
    }

    if header.alphabet != config.space().alphabet() {
        return Err(RainbowError::ConfigMismatch {
            parameter: "alphabet",
            expected: String::from_utf8_lossy(config.space().alphabet()).into_owned(),
            found: String::from_utf8_lossy(&header.alphabet).into_owned(),
        });
    }

    if header.key != config.key() {
        return Err(RainbowError::ConfigMismatch {
            parameter: "key",
            expected: hex::encode(config.key()),
            found: hex::encode(header.key),
        });
    }

    Ok(())
}

/// Validate header against options
pub fn validate_header(header: &TableHeader, options: &ValidationOptions) -> RainbowResult<()> {
    if let Some(expected) = &options.expected {
        check_configuration(header, expected)?;
    }

    if options.require_sorted && !header.is_sorted() {
        return Err(TableFormatError::TableNotSorted.into());
    }

    Ok(())
}

/// Calculate expected file size from header
///
/// Fails with `InvalidHeader` if the chain count cannot describe a file.
pub fn expected_file_size(header: &TableHeader) -> Result<u64, TableFormatError> {
    header
        .num_chains
        .checked_mul(CHAIN_ENTRY_SIZE as u64)
        .and_then(|records| records.checked_add(FILE_HEADER_SIZE as u64))
        .ok_or_else(|| {
            TableFormatError::InvalidHeader(format!(
                "chain count {} is too large",
                header.num_chains
            ))
        })
}
