//! Listing checks
//!
//! Every heuristic implements [`ListingCheck`](crate::types::ListingCheck):
//!
//! - `rules`: pure, synchronous field rules
//! - `reviews`: time-windowed review spike detection
//! - `semantic`: classifier-backed category relevance and policy screening
//! - `address`: address authenticity via validation or autocomplete

pub mod address;
pub mod reviews;
pub mod rules;
pub mod semantic;

pub use address::{AddressBackend, FakeAddressCheck};
pub use reviews::{ReviewSpikeCheck, ReviewWindowStats};
pub use rules::{CategoryOverloadCheck, ExcessServiceAreasCheck, MissingOperationalInfoCheck};
pub use semantic::{CategoryRelevanceCheck, PolicyViolationCheck};
