//! Rainbow table related constants
//!
//! These are defaults only. Every component reads its parameters from an
//! explicit `Configuration`, never from these values directly.

// =============================================================================
// Password space
// =============================================================================

/// Default alphabet (lowercase letters followed by digits)
pub const DEFAULT_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Minimum password length
pub const MIN_PASSWORD_LENGTH: u8 = 1;

/// Maximum password length (one DES block)
pub const MAX_PASSWORD_LENGTH: u8 = 8;

/// Default password length
pub const DEFAULT_PASSWORD_LENGTH: u8 = 3;

/// Smallest usable alphabet
pub const MIN_ALPHABET_LENGTH: usize = 2;

/// Largest alphabet that fits in the table header
pub const MAX_ALPHABET_LENGTH: usize = 64;

// =============================================================================
// One-way function parameters
// =============================================================================

/// DES block size in bytes
pub const DES_BLOCK_SIZE: usize = 8;

/// DES key size in bytes
pub const DES_KEY_SIZE: usize = 8;

/// Default fixed DES key
pub const DEFAULT_DES_KEY: [u8; DES_KEY_SIZE] = *b"RAINBOW1";

// =============================================================================
// Table generation parameters
// =============================================================================

/// Default chain length (t)
pub const DEFAULT_CHAIN_LENGTH: u32 = 1000;

/// Default number of chains requested per table (m)
pub const DEFAULT_NUM_CHAINS: u64 = 100_000;

/// Default number of chains handed to a worker per task
pub const DEFAULT_BATCH_SIZE: usize = 10_000;

/// Default time limit of a table build, in seconds (1 hour)
pub const DEFAULT_BUILD_TIMEOUT_SECS: u64 = 3600;

/// Largest password space for which an exact coverage bitmap is built (2^32)
pub const MAX_BITMAP_SPACE: u64 = 1u64 << 32;

// =============================================================================
// File format
// =============================================================================

/// Magic bytes at the start of every table file
pub const TABLE_MAGIC: [u8; 8] = *b"DESRBWTB";

/// Current file format version
pub const FILE_FORMAT_VERSION: u16 = 1;

/// Byte size of the file header
pub const FILE_HEADER_SIZE: usize = 128;

/// Byte size of a chain entry
pub const CHAIN_ENTRY_SIZE: usize = 16;

/// Header flag: entries are sorted by endpoint
pub const FLAG_SORTED: u32 = 1 << 0;

/// Header flag: endpoints are unique
pub const FLAG_UNIQUE: u32 = 1 << 1;
