//! Test Helper Utilities
//!
//! Shared utilities for testing listing-audit

#![allow(dead_code)]

pub mod fakes;
pub mod fixtures;
pub mod log_capture;

// Re-export commonly used items
pub use fakes::{FakeAutocomplete, FakeClassifier, FakeValidator, PanickingCheck};
pub use fixtures::{clean_listing, fixed_now, spike_timestamps, suspicious_listing};
pub use log_capture::{capture_logs, LogCapture};
