//! listing-audit library interface
//!
//! Evaluates business listings against independent integrity heuristics and
//! persists a tri-state verdict per heuristic.
//!
//! Flow: raw message → [`record`] → [`orchestrator`] (all [`checks`] in
//! parallel) → [`aggregator`] → [`store`]. [`batch`] drives that flow for a
//! whole queue delivery.

pub mod aggregator;
pub mod batch;
pub mod checks;
pub mod clients;
pub mod error;
pub mod orchestrator;
pub mod record;
pub mod store;
pub mod types;

pub use crate::aggregator::PersistencePayload;
pub use crate::batch::{parse_batch, BatchReport, ListingAuditor, RecordOutcome};
pub use crate::error::{AuditError, AuditResult};
pub use crate::orchestrator::{CheckOrchestrator, OrchestratorConfig};
pub use crate::record::{Field, ListingRecord};
pub use crate::types::{AggregatedVerdict, CheckName, CheckOutcome, CheckResult, ListingCheck};
