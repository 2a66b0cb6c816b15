//! Check Orchestrator
//!
//! Runs every registered check concurrently against one record and collects
//! an [`AggregatedVerdict`].
//!
//! # Failure isolation
//! Each check runs under its own timeout and panic boundary. An error, a
//! timeout, or a panic turns into `Indeterminate` for that check alone; the
//! join never fails fast and sibling checks always complete.

use crate::checks::{
    AddressBackend, CategoryOverloadCheck, CategoryRelevanceCheck, ExcessServiceAreasCheck,
    FakeAddressCheck, MissingOperationalInfoCheck, PolicyViolationCheck, ReviewSpikeCheck,
};
use crate::clients::{Classifier, SamplingConfig};
use crate::error::{AuditError, AuditResult};
use crate::record::ListingRecord;
use crate::types::{AggregatedVerdict, CheckContext, CheckError, CheckOutcome, ListingCheck};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use futures::FutureExt;
use listing_common::config::OrchestratorSettings;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Orchestration limits
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Upper bound on one check, external calls included
    pub check_timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            check_timeout: Duration::from_secs(30),
        }
    }
}

impl From<&OrchestratorSettings> for OrchestratorConfig {
    fn from(settings: &OrchestratorSettings) -> Self {
        Self {
            check_timeout: Duration::from_millis(settings.check_timeout_ms),
        }
    }
}

/// Concurrent check runner
pub struct CheckOrchestrator {
    checks: Vec<Arc<dyn ListingCheck>>,
    config: OrchestratorConfig,
}

impl CheckOrchestrator {
    pub fn new(config: OrchestratorConfig) -> Self {
        Self {
            checks: Vec::new(),
            config,
        }
    }

    pub fn with_checks(config: OrchestratorConfig, checks: Vec<Arc<dyn ListingCheck>>) -> Self {
        Self { checks, config }
    }

    /// The seven production checks over the injected collaborators
    pub fn standard(
        config: OrchestratorConfig,
        classifier: Arc<dyn Classifier>,
        sampling: SamplingConfig,
        address: AddressBackend,
    ) -> Self {
        let checks: Vec<Arc<dyn ListingCheck>> = vec![
            Arc::new(CategoryOverloadCheck),
            Arc::new(CategoryRelevanceCheck::new(
                Arc::clone(&classifier),
                sampling.clone(),
            )),
            Arc::new(ExcessServiceAreasCheck),
            Arc::new(MissingOperationalInfoCheck),
            Arc::new(ReviewSpikeCheck),
            Arc::new(PolicyViolationCheck::new(classifier, sampling)),
            Arc::new(FakeAddressCheck::new(address)),
        ];
        Self::with_checks(config, checks)
    }

    pub fn register(&mut self, check: Arc<dyn ListingCheck>) {
        self.checks.push(check);
    }

    pub fn count(&self) -> usize {
        self.checks.len()
    }

    /// Evaluate a record against the current clock
    pub async fn evaluate(&self, record: &ListingRecord) -> AggregatedVerdict {
        self.evaluate_at(record, listing_common::time::now()).await
    }

    /// Evaluate a record with an injected reference instant
    pub async fn evaluate_at(&self, record: &ListingRecord, now: DateTime<Utc>) -> AggregatedVerdict {
        let ctx = CheckContext {
            listing_id: record.listing_id.clone(),
            now,
        };

        let runs = self
            .checks
            .iter()
            .map(|check| self.run_check(Arc::clone(check), record, &ctx));
        let outcomes = join_all(runs).await;

        let mut verdict = AggregatedVerdict::new(record.listing_id.clone(), now);
        for (check, outcome) in self.checks.iter().zip(outcomes) {
            verdict.insert(check.name(), outcome);
        }

        debug!(
            listing_id = %record.listing_id,
            checks = verdict.len(),
            "Record evaluated"
        );
        verdict
    }

    /// Evaluate a record, abandoning in-flight checks if `cancel` fires
    pub async fn evaluate_with_cancel(
        &self,
        record: &ListingRecord,
        now: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> AuditResult<AggregatedVerdict> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(AuditError::Cancelled {
                listing_id: record.listing_id.clone(),
            }),
            verdict = self.evaluate_at(record, now) => Ok(verdict),
        }
    }

    async fn run_check(
        &self,
        check: Arc<dyn ListingCheck>,
        record: &ListingRecord,
        ctx: &CheckContext,
    ) -> CheckOutcome {
        let name = check.name();
        let timeout = self.config.check_timeout;
        let guarded = AssertUnwindSafe(check.evaluate(record, ctx)).catch_unwind();

        let result = match tokio::time::timeout(timeout, guarded).await {
            Ok(Ok(result)) => result,
            Ok(Err(payload)) => Err(CheckError::Panicked(panic_message(payload))),
            Err(_) => Err(CheckError::Timeout {
                timeout_ms: timeout.as_millis() as u64,
            }),
        };

        match result {
            Ok(outcome) => {
                debug!(
                    check = name.as_str(),
                    listing_id = %ctx.listing_id,
                    result = %outcome.result,
                    "Check complete"
                );
                outcome
            }
            Err(e) => {
                warn!(
                    check = name.as_str(),
                    listing_id = %ctx.listing_id,
                    error = %e,
                    "Check failed (per-check error isolation)"
                );
                CheckOutcome::indeterminate(e.to_string())
            }
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CheckName, CheckResult};
    use async_trait::async_trait;

    struct Fixed(CheckName, CheckResult);

    #[async_trait]
    impl ListingCheck for Fixed {
        fn name(&self) -> CheckName {
            self.0
        }

        async fn evaluate(
            &self,
            _record: &ListingRecord,
            _ctx: &CheckContext,
        ) -> Result<CheckOutcome, CheckError> {
            Ok(CheckOutcome::new(self.1))
        }
    }

    struct Failing;

    #[async_trait]
    impl ListingCheck for Failing {
        fn name(&self) -> CheckName {
            CheckName::PolicyViolation
        }

        async fn evaluate(
            &self,
            _record: &ListingRecord,
            _ctx: &CheckContext,
        ) -> Result<CheckOutcome, CheckError> {
            Err(CheckError::Internal("boom".into()))
        }
    }

    #[tokio::test]
    async fn test_error_becomes_indeterminate() {
        let mut orchestrator = CheckOrchestrator::new(OrchestratorConfig::default());
        orchestrator.register(Arc::new(Fixed(CheckName::FakeAddress, CheckResult::True)));
        orchestrator.register(Arc::new(Failing));
        assert_eq!(orchestrator.count(), 2);

        let verdict = orchestrator.evaluate(&ListingRecord::new("abc")).await;
        assert_eq!(verdict.result(CheckName::FakeAddress), CheckResult::True);
        assert_eq!(
            verdict.result(CheckName::PolicyViolation),
            CheckResult::Indeterminate
        );
        assert!(verdict
            .outcome(CheckName::PolicyViolation)
            .and_then(|o| o.diagnostic.as_deref())
            .is_some_and(|d| d.contains("boom")));
    }

    #[test]
    fn test_panic_message_extraction() {
        assert_eq!(panic_message(Box::new("static")), "static");
        assert_eq!(panic_message(Box::new(String::from("owned"))), "owned");
        assert_eq!(panic_message(Box::new(7u8)), "non-string panic payload");
    }

    #[test]
    fn test_config_from_settings() {
        let settings = OrchestratorSettings {
            check_timeout_ms: 250,
            max_concurrent_records: 1,
        };
        let config = OrchestratorConfig::from(&settings);
        assert_eq!(config.check_timeout, Duration::from_millis(250));
    }
}
