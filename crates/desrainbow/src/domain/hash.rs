//! Hash function implementations
//!
//! This module provides the one-way function H (DES encryption of the padded
//! password under a fixed key) and the position-dependent reduction function R
//! that maps a hash back into the password space.

use std::fmt;

use byteorder::{BigEndian, ByteOrder};
use des::Des;
use des::cipher::generic_array::GenericArray;
use des::cipher::{BlockEncrypt, KeyInit};

use crate::constants::{DES_BLOCK_SIZE, DES_KEY_SIZE, MAX_PASSWORD_LENGTH, MIN_PASSWORD_LENGTH};
use crate::domain::config::Configuration;
use crate::domain::password::{Password, PasswordIndex, PasswordSpace};
use crate::error::{EncodingError, RainbowResult};

/// Output of the one-way function
pub type HashValue = [u8; DES_BLOCK_SIZE];

/// DES under a fixed key, used as a one-way function
///
/// The key schedule is computed once; hashing is then a single block
/// encryption.
#[derive(Clone)]
pub struct DesHash {
    cipher: Des,
    key: [u8; DES_KEY_SIZE],
}

impl DesHash {
    pub fn new(key: [u8; DES_KEY_SIZE]) -> Self {
        Self {
            cipher: Des::new(GenericArray::from_slice(&key)),
            key,
        }
    }

    pub fn key(&self) -> [u8; DES_KEY_SIZE] {
        self.key
    }

    /// Hash a password
    ///
    /// The password is PKCS#7 padded to whole blocks, encrypted in ECB mode,
    /// and the first ciphertext block is returned. Only the first block is
    /// kept, so the extra padding block of an 8-byte password is never
    /// encrypted.
    pub fn hash(&self, password: &[u8]) -> Result<HashValue, EncodingError> {
        let len = password.len();
        if len < MIN_PASSWORD_LENGTH as usize || len > MAX_PASSWORD_LENGTH as usize {
            return Err(EncodingError::BlockLength {
                length: len,
                min: MIN_PASSWORD_LENGTH,
                max: MAX_PASSWORD_LENGTH,
            });
        }

        let pad = (DES_BLOCK_SIZE - len % DES_BLOCK_SIZE) as u8;
        let mut buf = [pad; DES_BLOCK_SIZE];
        buf[..len].copy_from_slice(password);

        let mut block = GenericArray::clone_from_slice(&buf);
        self.cipher.encrypt_block(&mut block);

        let mut out = [0u8; DES_BLOCK_SIZE];
        out.copy_from_slice(&block);
        Ok(out)
    }
}

impl fmt::Debug for DesHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DesHash")
            .field("key", &String::from_utf8_lossy(&self.key))
            .finish()
    }
}

/// Reduce a hash value to a password rank
///
/// The essence of rainbow tables: the chain position is folded into the hash
/// before mixing, so the same hash produces different passwords at different
/// positions. The hash is rotated by the position and xored with a scaled
/// position, then passed through a SplitMix64 finalizer.
#[inline]
pub fn reduce_hash_index(hash: &HashValue, position: u32, space_size: u64) -> PasswordIndex {
    let mut h = BigEndian::read_u64(hash).rotate_left(position % 64)
        ^ (position as u64).wrapping_mul(0x9e3779b97f4a7c15);
    h = (h ^ (h >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
    h = (h ^ (h >> 27)).wrapping_mul(0x94d049bb133111eb);
    h ^= h >> 31;
    h % space_size
}

/// Reduce a hash value to a password of the space (R_position)
#[inline]
pub fn reduce_hash(space: &PasswordSpace, hash: &HashValue, position: u32) -> Password {
    space.password(reduce_hash_index(hash, position, space.size()))
}

/// Hash a password of the configured space and return it as lowercase hex
pub fn hash_password(config: &Configuration, password: &str) -> RainbowResult<String> {
    let password = config.space().parse(password)?;
    let hash = config.hash(&password)?;
    Ok(hex::encode(hash))
}

/// Parse a hexadecimal hash value
pub fn parse_hash_hex(s: &str) -> Result<HashValue, EncodingError> {
    let bytes = hex::decode(s.trim()).map_err(|e| EncodingError::InvalidHash {
        expected: DES_BLOCK_SIZE,
        reason: e.to_string(),
    })?;

    bytes
        .as_slice()
        .try_into()
        .map_err(|_| EncodingError::InvalidHash {
            expected: DES_BLOCK_SIZE,
            reason: format!("got {} bytes", bytes.len()),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{DEFAULT_ALPHABET, DEFAULT_DES_KEY};
    use std::collections::HashSet;

    fn hasher() -> DesHash {
        DesHash::new(DEFAULT_DES_KEY)
    }

    #[test]
    fn test_des_known_answer() {
        // FIPS 46 worked example
        let key = [0x13, 0x34, 0x57, 0x79, 0x9b, 0xbc, 0xdf, 0xf1];
        let plaintext = [0x01, 0x23, 0x45, 0x67, 0x89, 0xab, 0xcd, 0xef];
        let hash = DesHash::new(key).hash(&plaintext).unwrap();
        assert_eq!(hash, [0x85, 0xe8, 0x13, 0x54, 0x0f, 0x0a, 0xb4, 0x05]);
    }

    #[test]
    fn test_hash_deterministic() {
        assert_eq!(hasher().hash(b"abc"), hasher().hash(b"abc"));
    }

    #[test]
    fn test_hash_applies_padding() {
        // "abc" padded with five 0x05 bytes
        let padded = [b'a', b'b', b'c', 5, 5, 5, 5, 5];
        assert_eq!(hasher().hash(b"abc"), hasher().hash(&padded));
    }

    #[test]
    fn test_hash_different_passwords() {
        assert_ne!(hasher().hash(b"abc").unwrap(), hasher().hash(b"abd").unwrap());
    }

    #[test]
    fn test_hash_different_keys() {
        let other = DesHash::new(*b"OTHERKEY");
        assert_ne!(hasher().hash(b"abc").unwrap(), other.hash(b"abc").unwrap());
    }

    #[test]
    fn test_hash_rejects_oversized_password() {
        assert!(matches!(
            hasher().hash(b"123456789"),
            Err(EncodingError::BlockLength { length: 9, .. })
        ));
        assert!(hasher().hash(b"").is_err());
    }

    #[test]
    fn test_reduce_hash_deterministic() {
        let space = PasswordSpace::new(DEFAULT_ALPHABET, 3).unwrap();
        let hash = hasher().hash(b"abc").unwrap();

        for position in 0..100 {
            assert_eq!(
                reduce_hash(&space, &hash, position),
                reduce_hash(&space, &hash, position)
            );
        }
    }

    #[test]
    fn test_reduce_hash_range() {
        let space = PasswordSpace::new(DEFAULT_ALPHABET, 4).unwrap();
        let h = hasher();

        for i in 0..200u64 {
            let hash = h.hash(space.password(i * 7919).as_bytes()).unwrap();
            let password = reduce_hash(&space, &hash, i as u32);
            assert_eq!(password.len(), 4);
            assert!(space.contains(&password));
        }
    }

    #[test]
    fn test_reduce_hash_position_dependent() {
        let space = PasswordSpace::new(DEFAULT_ALPHABET, 6).unwrap();
        let hash = hasher().hash(b"abcdef").unwrap();

        let distinct: HashSet<_> = (0..256).map(|i| reduce_hash(&space, &hash, i)).collect();
        assert!(distinct.len() > 250, "only {} distinct", distinct.len());
    }

    #[test]
    fn test_reduce_hash_short_hash_still_position_dependent() {
        // all-zero hash: the position alone must drive the result
        let zero = [0u8; DES_BLOCK_SIZE];
        assert_ne!(
            reduce_hash_index(&zero, 0, 46_656),
            reduce_hash_index(&zero, 1, 46_656)
        );
    }

    #[test]
    fn test_reduce_hash_position_max() {
        let hash = [0xffu8; DES_BLOCK_SIZE];
        assert!(reduce_hash_index(&hash, u32::MAX, 36) < 36);
    }

    #[test]
    fn test_parse_hash_hex() {
        let hash = hasher().hash(b"abc").unwrap();
        assert_eq!(parse_hash_hex(&hex::encode(hash)).unwrap(), hash);
        assert!(parse_hash_hex("abcd").is_err());
        assert!(parse_hash_hex("zz00000000000000").is_err());
    }
}
