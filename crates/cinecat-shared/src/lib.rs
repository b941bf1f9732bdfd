//! # cinecat-shared
//!
//! Identifiers, domain enums and tuning constants shared by the store and
//! client crates.

pub mod constants;
pub mod types;

pub use types::*;
