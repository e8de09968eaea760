//! Passwords and the password space
//!
//! A password space is a fixed alphabet combined with a fixed length. Every
//! password in the space has a rank (its index) given by a mixed-radix digit
//! expansion over the alphabet, most significant character first. Table files
//! store ranks instead of raw passwords.

use std::fmt;
use std::str::FromStr;

use rand::Rng;

use crate::constants::{
    MAX_ALPHABET_LENGTH, MAX_PASSWORD_LENGTH, MIN_ALPHABET_LENGTH, MIN_PASSWORD_LENGTH,
};
use crate::error::{EncodingError, RainbowError, RainbowResult};

/// Rank of a password inside its password space
pub type PasswordIndex = u64;

const NO_RANK: u8 = u8::MAX;

/// A password of at most one DES block, stored inline
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Password {
    len: u8,
    bytes: [u8; MAX_PASSWORD_LENGTH as usize],
}

impl Password {
    /// Create a password from raw bytes
    ///
    /// Fails if the bytes do not fit into a single DES block.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, EncodingError> {
        if bytes.len() < MIN_PASSWORD_LENGTH as usize || bytes.len() > MAX_PASSWORD_LENGTH as usize
        {
            return Err(EncodingError::BlockLength {
                length: bytes.len(),
                min: MIN_PASSWORD_LENGTH,
                max: MAX_PASSWORD_LENGTH,
            });
        }

        let mut buf = [0u8; MAX_PASSWORD_LENGTH as usize];
        buf[..bytes.len()].copy_from_slice(bytes);

        Ok(Self {
            len: bytes.len() as u8,
            bytes: buf,
        })
    }

    /// Raw password bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl FromStr for Password {
    type Err = EncodingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_bytes(s.as_bytes())
    }
}

impl fmt::Display for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(self.as_bytes()))
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Password({:?})", String::from_utf8_lossy(self.as_bytes()))
    }
}

/// Fixed alphabet and password length
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordSpace {
    alphabet: Vec<u8>,
    length: u8,
    size: u64,
    /// Character -> digit lookup, `NO_RANK` for characters outside the alphabet
    ranks: [u8; 256],
}

impl PasswordSpace {
    /// Create a password space
    ///
    /// The alphabet must hold 2 to 64 distinct printable ASCII characters and
    /// `alphabet.len() ^ length` must fit in a `u64`.
    pub fn new(alphabet: &[u8], length: u8) -> RainbowResult<Self> {
        if !(MIN_PASSWORD_LENGTH..=MAX_PASSWORD_LENGTH).contains(&length) {
            return Err(RainbowError::InvalidConfig(format!(
                "password length must be between {} and {}, got {}",
                MIN_PASSWORD_LENGTH, MAX_PASSWORD_LENGTH, length
            )));
        }

        if !(MIN_ALPHABET_LENGTH..=MAX_ALPHABET_LENGTH).contains(&alphabet.len()) {
            return Err(RainbowError::InvalidConfig(format!(
                "alphabet must contain between {} and {} characters, got {}",
                MIN_ALPHABET_LENGTH,
                MAX_ALPHABET_LENGTH,
                alphabet.len()
            )));
        }

        let mut ranks = [NO_RANK; 256];
        for (rank, &c) in alphabet.iter().enumerate() {
            if !c.is_ascii_graphic() {
                return Err(RainbowError::InvalidConfig(format!(
                    "alphabet character {:#04x} is not printable ASCII",
                    c
                )));
            }
            if ranks[c as usize] != NO_RANK {
                return Err(RainbowError::InvalidConfig(format!(
                    "alphabet contains {:?} more than once",
                    c as char
                )));
            }
            ranks[c as usize] = rank as u8;
        }

        let size = (alphabet.len() as u64)
            .checked_pow(length as u32)
            .ok_or_else(|| {
                RainbowError::InvalidConfig("password space does not fit in 64 bits".to_string())
            })?;

        Ok(Self {
            alphabet: alphabet.to_vec(),
            length,
            size,
            ranks,
        })
    }

    pub fn alphabet(&self) -> &[u8] {
        &self.alphabet
    }

    /// Password length of every member of the space
    pub fn length(&self) -> u8 {
        self.length
    }

    /// Number of passwords in the space
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Map a rank to its password
    ///
    /// Ranks at or above `size()` wrap around.
    pub fn password(&self, index: PasswordIndex) -> Password {
        let base = self.alphabet.len() as u64;
        let mut rem = index % self.size;
        let mut bytes = [0u8; MAX_PASSWORD_LENGTH as usize];

        for slot in bytes[..self.length as usize].iter_mut().rev() {
            *slot = self.alphabet[(rem % base) as usize];
            rem /= base;
        }

        Password {
            len: self.length,
            bytes,
        }
    }

    /// Map a password back to its rank
    pub fn index(&self, password: &Password) -> Result<PasswordIndex, EncodingError> {
        self.check(password.as_bytes())?;

        let base = self.alphabet.len() as u64;
        Ok(password
            .as_bytes()
            .iter()
            .fold(0u64, |acc, &c| acc * base + self.ranks[c as usize] as u64))
    }

    /// Parse a password and check that it belongs to this space
    pub fn parse(&self, s: &str) -> Result<Password, EncodingError> {
        self.check(s.as_bytes())?;
        Password::from_bytes(s.as_bytes())
    }

    /// Whether the password belongs to this space
    pub fn contains(&self, password: &Password) -> bool {
        self.check(password.as_bytes()).is_ok()
    }

    /// Draw a uniformly random rank
    pub fn random_index<R: Rng + ?Sized>(&self, rng: &mut R) -> PasswordIndex {
        rng.gen_range(0..self.size)
    }

    /// Draw a uniformly random password
    pub fn random_password<R: Rng + ?Sized>(&self, rng: &mut R) -> Password {
        self.password(self.random_index(rng))
    }

    fn check(&self, bytes: &[u8]) -> Result<(), EncodingError> {
        if bytes.len() != self.length as usize {
            return Err(EncodingError::WrongLength {
                expected: self.length,
                found: bytes.len(),
            });
        }

        match bytes
            .iter()
            .position(|&c| self.ranks[c as usize] == NO_RANK)
        {
            Some(position) => Err(EncodingError::InvalidCharacter {
                character: bytes[position] as char,
                position,
            }),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for PasswordSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordSpace")
            .field("alphabet", &String::from_utf8_lossy(&self.alphabet))
            .field("length", &self.length)
            .field("size", &self.size)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::DEFAULT_ALPHABET;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn space(length: u8) -> PasswordSpace {
        PasswordSpace::new(DEFAULT_ALPHABET, length).unwrap()
    }

    #[test]
    fn test_space_size() {
        assert_eq!(space(1).size(), 36);
        assert_eq!(space(3).size(), 46_656);
        assert_eq!(space(8).size(), 36u64.pow(8));
    }

    #[test]
    fn test_password_first_and_last() {
        let s = space(3);
        assert_eq!(s.password(0).as_bytes(), b"aaa");
        assert_eq!(s.password(1).as_bytes(), b"aab");
        assert_eq!(s.password(36).as_bytes(), b"aba");
        assert_eq!(s.password(s.size() - 1).as_bytes(), b"999");
    }

    #[test]
    fn test_password_index_bijection() {
        let s = space(3);
        for index in [0, 1, 35, 36, 1295, 1296, 20_000, 46_655] {
            let password = s.password(index);
            assert_eq!(s.index(&password).unwrap(), index);
        }
    }

    #[test]
    fn test_index_order_matches_alphabet_order() {
        let s = space(2);
        let a = s.index(&s.parse("az").unwrap()).unwrap();
        let b = s.index(&s.parse("a0").unwrap()).unwrap();
        let c = s.index(&s.parse("ba").unwrap()).unwrap();
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn test_password_wraps_out_of_range_index() {
        let s = space(2);
        assert_eq!(s.password(s.size()), s.password(0));
    }

    #[test]
    fn test_parse_rejects_wrong_length() {
        let s = space(3);
        assert_eq!(
            s.parse("abcd"),
            Err(EncodingError::WrongLength {
                expected: 3,
                found: 4
            })
        );
    }

    #[test]
    fn test_parse_rejects_foreign_character() {
        let s = space(3);
        assert_eq!(
            s.parse("aBc"),
            Err(EncodingError::InvalidCharacter {
                character: 'B',
                position: 1
            })
        );
    }

    #[test]
    fn test_password_from_bytes_block_bounds() {
        assert!(Password::from_bytes(b"").is_err());
        assert!(Password::from_bytes(b"12345678").is_ok());
        assert!(matches!(
            Password::from_bytes(b"123456789"),
            Err(EncodingError::BlockLength { length: 9, .. })
        ));
    }

    #[test]
    fn test_password_display() {
        let password: Password = "abc".parse().unwrap();
        assert_eq!(password.to_string(), "abc");
        assert_eq!(password.len(), 3);
    }

    #[test]
    fn test_new_rejects_bad_alphabets() {
        assert!(PasswordSpace::new(b"a", 3).is_err());
        assert!(PasswordSpace::new(b"aab", 3).is_err());
        assert!(PasswordSpace::new(b"a b", 3).is_err());
        assert!(PasswordSpace::new(&[b'x'; 65], 3).is_err());
    }

    #[test]
    fn test_new_rejects_bad_lengths() {
        assert!(PasswordSpace::new(DEFAULT_ALPHABET, 0).is_err());
        assert!(PasswordSpace::new(DEFAULT_ALPHABET, 9).is_err());
    }

    #[test]
    fn test_random_password_in_space() {
        let s = space(5);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let password = s.random_password(&mut rng);
            assert!(s.contains(&password));
        }
    }
}
