//! Core Types and Trait Definitions for listing checks
//!
//! Defines the tri-state check result, the fixed set of check names, the
//! per-record verdict, and the `ListingCheck` trait every heuristic
//! implements for uniform concurrent execution.

use crate::record::ListingRecord;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

// ============================================================================
// Check identity
// ============================================================================

/// Fixed set of listing checks
///
/// Each check owns exactly one boolean column in the persisted payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckName {
    CategoryOverload,
    CategoryRelevance,
    ExcessServiceAreas,
    MissingOperationalInfo,
    SuspiciousReviews,
    PolicyViolation,
    FakeAddress,
}

impl CheckName {
    /// All checks, in reporting order
    pub const ALL: [CheckName; 7] = [
        CheckName::CategoryOverload,
        CheckName::CategoryRelevance,
        CheckName::ExcessServiceAreas,
        CheckName::MissingOperationalInfo,
        CheckName::SuspiciousReviews,
        CheckName::PolicyViolation,
        CheckName::FakeAddress,
    ];

    /// Short name used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckName::CategoryOverload => "category_overload",
            CheckName::CategoryRelevance => "category_relevance",
            CheckName::ExcessServiceAreas => "excess_service_areas",
            CheckName::MissingOperationalInfo => "missing_operational_info",
            CheckName::SuspiciousReviews => "suspicious_reviews",
            CheckName::PolicyViolation => "policy_violation",
            CheckName::FakeAddress => "fake_address",
        }
    }

    /// Persistence column carrying this check's verdict
    pub fn column(&self) -> &'static str {
        match self {
            CheckName::CategoryOverload => "is_more_than_3_categories",
            CheckName::CategoryRelevance => "is_not_relevant_categories",
            CheckName::ExcessServiceAreas => "is_more_than_5_service_areas",
            CheckName::MissingOperationalInfo => "is_missing_hours_web_description",
            CheckName::SuspiciousReviews => "is_suspicious_reviews",
            CheckName::PolicyViolation => "is_policy_violations",
            CheckName::FakeAddress => "is_fake_address",
        }
    }

    /// Reverse lookup from a persistence column
    pub fn from_column(column: &str) -> Option<CheckName> {
        CheckName::ALL.into_iter().find(|c| c.column() == column)
    }
}

impl fmt::Display for CheckName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Tri-state result
// ============================================================================

/// Outcome of a single check
///
/// `Indeterminate` and `NotApplicable` are deliberately separate: the first
/// means the check ran and could not conclude, the second means its input
/// was never supplied and the check was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckResult {
    True,
    False,
    Indeterminate,
    NotApplicable,
}

impl CheckResult {
    pub fn from_bool(value: bool) -> Self {
        if value {
            CheckResult::True
        } else {
            CheckResult::False
        }
    }

    /// Boolean view; `None` for the two non-conclusive states
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CheckResult::True => Some(true),
            CheckResult::False => Some(false),
            CheckResult::Indeterminate | CheckResult::NotApplicable => None,
        }
    }

    pub fn is_conclusive(&self) -> bool {
        self.as_bool().is_some()
    }
}

impl fmt::Display for CheckResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckResult::True => write!(f, "true"),
            CheckResult::False => write!(f, "false"),
            CheckResult::Indeterminate => write!(f, "indeterminate"),
            CheckResult::NotApplicable => write!(f, "not_applicable"),
        }
    }
}

/// Check result plus optional rationale and diagnostic
///
/// `rationale` is user-facing and persisted (policy note); `diagnostic` only
/// explains an inconclusive result in logs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckOutcome {
    pub result: CheckResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<String>,
}

impl CheckOutcome {
    pub fn new(result: CheckResult) -> Self {
        Self {
            result,
            rationale: None,
            diagnostic: None,
        }
    }

    pub fn from_bool(value: bool) -> Self {
        Self::new(CheckResult::from_bool(value))
    }

    pub fn not_applicable() -> Self {
        Self::new(CheckResult::NotApplicable)
    }

    /// Inconclusive result with the reason it could not conclude
    pub fn indeterminate(diagnostic: impl Into<String>) -> Self {
        Self::new(CheckResult::Indeterminate).with_diagnostic(diagnostic)
    }

    pub fn with_rationale(mut self, rationale: impl Into<String>) -> Self {
        self.rationale = Some(rationale.into());
        self
    }

    pub fn with_diagnostic(mut self, diagnostic: impl Into<String>) -> Self {
        self.diagnostic = Some(diagnostic.into());
        self
    }
}

// ============================================================================
// Check trait
// ============================================================================

/// Per-evaluation context shared (read-only) by every check of one record
#[derive(Debug, Clone)]
pub struct CheckContext {
    pub listing_id: String,
    /// Reference instant for time-windowed checks
    pub now: DateTime<Utc>,
}

/// Listing check trait
///
/// All checks implement this trait for uniform concurrent execution by the
/// orchestrator. A check must not depend on any other check's result.
///
/// Returning `Err` is always safe: the orchestrator converts it into an
/// `Indeterminate` outcome for this check alone and logs it.
///
/// # Example
/// ```rust,ignore
/// use listing_audit::types::{CheckContext, CheckError, CheckName, CheckOutcome, ListingCheck};
///
/// pub struct AlwaysClean;
///
/// #[async_trait::async_trait]
/// impl ListingCheck for AlwaysClean {
///     fn name(&self) -> CheckName { CheckName::PolicyViolation }
///
///     async fn evaluate(&self, _record: &ListingRecord, _ctx: &CheckContext)
///         -> Result<CheckOutcome, CheckError> {
///         Ok(CheckOutcome::from_bool(false))
///     }
/// }
/// ```
#[async_trait]
pub trait ListingCheck: Send + Sync {
    /// Check identity (also selects the persistence column)
    fn name(&self) -> CheckName;

    /// Evaluate one record
    ///
    /// # Errors
    /// Returns `CheckError` when the check cannot run to completion
    /// (collaborator failure, internal error). Expected input problems
    /// (absent or malformed fields) are reported through the outcome instead.
    async fn evaluate(
        &self,
        record: &ListingRecord,
        ctx: &CheckContext,
    ) -> Result<CheckOutcome, CheckError>;
}

// ============================================================================
// Aggregated verdict
// ============================================================================

/// All check outcomes for one listing
#[derive(Debug, Clone, Serialize)]
pub struct AggregatedVerdict {
    pub listing_id: String,
    pub evaluated_at: DateTime<Utc>,
    outcomes: BTreeMap<CheckName, CheckOutcome>,
}

impl AggregatedVerdict {
    pub fn new(listing_id: impl Into<String>, evaluated_at: DateTime<Utc>) -> Self {
        Self {
            listing_id: listing_id.into(),
            evaluated_at,
            outcomes: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, name: CheckName, outcome: CheckOutcome) {
        self.outcomes.insert(name, outcome);
    }

    pub fn outcome(&self, name: CheckName) -> Option<&CheckOutcome> {
        self.outcomes.get(&name)
    }

    /// Result of a check; a check that was never registered reads as `NotApplicable`
    pub fn result(&self, name: CheckName) -> CheckResult {
        self.outcomes
            .get(&name)
            .map(|o| o.result)
            .unwrap_or(CheckResult::NotApplicable)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CheckName, &CheckOutcome)> {
        self.outcomes.iter()
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Failure talking to an external collaborator
#[derive(Debug, Error)]
pub enum CollaboratorError {
    /// Network communication error (includes client-side timeouts)
    #[error("Network error: {0}")]
    Network(String),

    /// Collaborator answered with an error status
    #[error("API error: {0}")]
    Api(String),

    /// Reply could not be decoded
    #[error("Parse error: {0}")]
    Parse(String),

    /// Collaborator missing configuration (e.g. API key)
    #[error("Not configured: {0}")]
    NotConfigured(String),
}

/// Per-check failure; always degraded to `Indeterminate` by the orchestrator
#[derive(Debug, Error)]
pub enum CheckError {
    #[error("Collaborator failure: {0}")]
    Collaborator(#[from] CollaboratorError),

    #[error("Check timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Check panicked: {0}")]
    Panicked(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

// ============================================================================
// Tests
// ============================================================================
