//! Domain layer - Pure computational logic
//!
//! This module contains pure functions and algorithms without I/O dependencies.

pub mod chain;
pub mod config;
pub mod coverage;
pub mod hash;
pub mod password;
pub mod table;
pub mod table_format;
