//! Session configuration
//!
//! Every component receives the alphabet, password length, chain length and
//! DES key through an explicit `Configuration` value.

use std::fmt;

use crate::constants::{
    DEFAULT_ALPHABET, DEFAULT_CHAIN_LENGTH, DEFAULT_DES_KEY, DEFAULT_PASSWORD_LENGTH, DES_KEY_SIZE,
};
use crate::domain::hash::{DesHash, HashValue};
use crate::domain::password::{Password, PasswordSpace};
use crate::error::{EncodingError, RainbowError, RainbowResult};

/// A builder for a configuration.
#[derive(Clone, Debug)]
pub struct ConfigurationBuilder {
    alphabet: Vec<u8>,
    password_length: u8,
    chain_length: u32,
    key: [u8; DES_KEY_SIZE],
}

impl Default for ConfigurationBuilder {
    fn default() -> Self {
        Self {
            alphabet: DEFAULT_ALPHABET.to_vec(),
            password_length: DEFAULT_PASSWORD_LENGTH,
            chain_length: DEFAULT_CHAIN_LENGTH,
            key: DEFAULT_DES_KEY,
        }
    }
}

impl ConfigurationBuilder {
    /// Creates a new ConfigurationBuilder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the alphabet passwords are drawn from.
    pub fn alphabet(mut self, alphabet: &[u8]) -> Self {
        self.alphabet = alphabet.to_vec();

        self
    }

    /// Sets the fixed password length.
    pub fn password_length(mut self, password_length: u8) -> Self {
        self.password_length = password_length;

        self
    }

    /// Sets the length of the chains.
    /// Increasing the chain length will reduce the memory used
    /// to store the table but increase the time taken to crack.
    pub fn chain_length(mut self, chain_length: u32) -> Self {
        self.chain_length = chain_length;

        self
    }

    /// Sets the DES key used by the one-way function.
    pub fn key(mut self, key: [u8; DES_KEY_SIZE]) -> Self {
        self.key = key;

        self
    }

    /// Builds a Configuration with the specified parameters.
    pub fn build(self) -> RainbowResult<Configuration> {
        if self.chain_length == 0 {
            return Err(RainbowError::InvalidConfig(
                "chain length must be greater than 0".to_string(),
            ));
        }

        Ok(Configuration {
            space: PasswordSpace::new(&self.alphabet, self.password_length)?,
            chain_length: self.chain_length,
            hasher: DesHash::new(self.key),
        })
    }
}

/// Immutable parameters shared by generation and cracking
#[derive(Clone)]
pub struct Configuration {
    space: PasswordSpace,
    chain_length: u32,
    hasher: DesHash,
}

impl Configuration {
    /// Configuration with the default alphabet and key
    pub fn new(password_length: u8, chain_length: u32) -> RainbowResult<Self> {
        ConfigurationBuilder::new()
            .password_length(password_length)
            .chain_length(chain_length)
            .build()
    }

    pub fn builder() -> ConfigurationBuilder {
        ConfigurationBuilder::new()
    }

    pub fn space(&self) -> &PasswordSpace {
        &self.space
    }

    pub fn password_length(&self) -> u8 {
        self.space.length()
    }

    /// Number of H/R steps per chain (L)
    pub fn chain_length(&self) -> u32 {
        self.chain_length
    }

    pub fn key(&self) -> [u8; DES_KEY_SIZE] {
        self.hasher.key()
    }

    /// Apply the one-way function H
    #[inline]
    pub fn hash(&self, password: &Password) -> Result<HashValue, EncodingError> {
        self.hasher.hash(password.as_bytes())
    }
}

impl PartialEq for Configuration {
    fn eq(&self, other: &Self) -> bool {
        self.space == other.space
            && self.chain_length == other.chain_length
            && self.key() == other.key()
    }
}

impl Eq for Configuration {}

impl fmt::Debug for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Configuration")
            .field("space", &self.space)
            .field("chain_length", &self.chain_length)
            .field("hasher", &self.hasher)
            .finish()
    }
}
