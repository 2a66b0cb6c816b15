//! # Listing Audit Common Library
//!
//! Shared code for the listing audit crates:
//! - Error types
//! - Configuration loading and API key resolution
//! - Timestamp utilities

pub mod config;
pub mod error;
pub mod time;

pub use error::{Error, Result};
