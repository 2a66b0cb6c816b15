//! Batch processing
//!
//! Accepts a batch document, evaluates each listing independently and
//! persists its payload. Every message yields exactly one [`RecordOutcome`];
//! a bad message fails alone and never aborts its siblings.
//!
//! Accepted documents:
//! - queue envelope: `{"Records": [{"messageId": "..", "body": "<json>"}]}`
//! - a JSON array of listing objects (or JSON-encoded listing strings)
//! - a single listing object

use crate::aggregator::PersistencePayload;
use crate::error::{AuditError, AuditResult};
use crate::orchestrator::CheckOrchestrator;
use crate::record::ListingRecord;
use crate::store::ListingStore;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use uuid::Uuid;

/// Queue delivery envelope
#[derive(Debug, Deserialize)]
pub struct QueueEnvelope {
    #[serde(rename = "Records")]
    pub records: Vec<QueueMessage>,
}

/// One queued message; `body` is a JSON-encoded listing
#[derive(Debug, Deserialize)]
pub struct QueueMessage {
    #[serde(rename = "messageId", default)]
    pub message_id: Option<String>,
    pub body: String,
}

/// One message ready for evaluation
#[derive(Debug, Clone, PartialEq)]
pub struct BatchItem {
    pub message_id: Option<String>,
    pub body: Value,
}

impl BatchItem {
    fn from_encoded(message_id: Option<String>, body: String) -> Self {
        // Undecodable bodies stay as text and fail per record
        let body = serde_json::from_str(&body).unwrap_or(Value::String(body));
        Self { message_id, body }
    }
}

/// Split a batch document into items
///
/// # Errors
/// `InvalidMessage` when the document is neither an envelope, an array, nor
/// an object.
pub fn parse_batch(document: &str) -> AuditResult<Vec<BatchItem>> {
    let value: Value = serde_json::from_str(document)
        .map_err(|e| AuditError::InvalidMessage(format!("batch document: {}", e)))?;

    if value.get("Records").is_some() {
        let envelope: QueueEnvelope = serde_json::from_value(value)
            .map_err(|e| AuditError::InvalidMessage(format!("queue envelope: {}", e)))?;
        return Ok(envelope
            .records
            .into_iter()
            .map(|m| BatchItem::from_encoded(m.message_id, m.body))
            .collect());
    }

    match value {
        Value::Array(items) => Ok(items
            .into_iter()
            .map(|item| match item {
                Value::String(encoded) => BatchItem::from_encoded(None, encoded),
                body => BatchItem {
                    message_id: None,
                    body,
                },
            })
            .collect()),
        body @ Value::Object(_) => Ok(vec![BatchItem {
            message_id: None,
            body,
        }]),
        other => Err(AuditError::InvalidMessage(format!(
            "batch document must be an envelope, array or object, found {}",
            other
        ))),
    }
}

/// Result for one message
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RecordOutcome {
    Success {
        listing_id: String,
        checks: PersistencePayload,
    },
    Failure {
        #[serde(skip_serializing_if = "Option::is_none")]
        message_id: Option<String>,
        error: String,
        record: Value,
    },
}

impl RecordOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RecordOutcome::Success { .. })
    }
}

/// Summary of one batch run
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub batch_id: Uuid,
    pub processed_at: DateTime<Utc>,
    pub succeeded: usize,
    pub failed: usize,
    /// One entry per input message, in input order
    pub results: Vec<RecordOutcome>,
}

/// Evaluates and persists listings
pub struct ListingAuditor {
    orchestrator: Arc<CheckOrchestrator>,
    store: Arc<dyn ListingStore>,
    max_concurrent_records: usize,
    cancel: CancellationToken,
}

impl ListingAuditor {
    pub fn new(orchestrator: Arc<CheckOrchestrator>, store: Arc<dyn ListingStore>) -> Self {
        Self {
            orchestrator,
            store,
            max_concurrent_records: 8,
            cancel: CancellationToken::new(),
        }
    }

    /// Records evaluated at the same time (minimum 1)
    pub fn with_max_concurrent_records(mut self, limit: usize) -> Self {
        self.max_concurrent_records = limit.max(1);
        self
    }

    /// Token that abandons in-flight evaluations when cancelled
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Normalize, evaluate and persist one listing
    pub async fn process_record(
        &self,
        body: &Value,
        now: DateTime<Utc>,
    ) -> AuditResult<(String, PersistencePayload)> {
        let record = ListingRecord::from_json(body)?;
        info!(listing_id = %record.listing_id, "Processing listing");

        let verdict = self
            .orchestrator
            .evaluate_with_cancel(&record, now, &self.cancel)
            .await?;
        let payload = PersistencePayload::from_verdict(&verdict);
        self.store.upsert(&record.listing_id, &payload).await?;

        info!(
            listing_id = %record.listing_id,
            columns = payload.len(),
            store = self.store.name(),
            "Listing checks stored"
        );
        Ok((record.listing_id, payload))
    }

    /// Process every item; output order matches input order
    pub async fn process_batch(&self, items: Vec<BatchItem>) -> BatchReport {
        self.process_batch_at(items, listing_common::time::now()).await
    }

    /// Process every item against an injected reference instant
    pub async fn process_batch_at(&self, items: Vec<BatchItem>, now: DateTime<Utc>) -> BatchReport {
        let batch_id = Uuid::new_v4();
        info!(batch_id = %batch_id, messages = items.len(), "Processing batch");

        let results: Vec<RecordOutcome> = stream::iter(items)
            .map(|item| async move {
                match self.process_record(&item.body, now).await {
                    Ok((listing_id, checks)) => RecordOutcome::Success { listing_id, checks },
                    Err(e) => {
                        error!(
                            batch_id = %batch_id,
                            message_id = item.message_id.as_deref().unwrap_or("-"),
                            error = %e,
                            "Error processing record"
                        );
                        RecordOutcome::Failure {
                            message_id: item.message_id,
                            error: e.to_string(),
                            record: item.body,
                        }
                    }
                }
            })
            .buffered(self.max_concurrent_records)
            .collect()
            .await;

        let succeeded = results.iter().filter(|r| r.is_success()).count();
        let failed = results.len() - succeeded;
        info!(batch_id = %batch_id, succeeded, failed, "Batch complete");

        BatchReport {
            batch_id,
            processed_at: now,
            succeeded,
            failed,
            results,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_envelope() {
        let doc = json!({
            "Records": [
                { "messageId": "m-1", "body": "{\"gmb_id\": \"a\"}" },
                { "messageId": "m-2", "body": "not json" }
            ]
        })
        .to_string();

        let items = parse_batch(&doc).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].message_id.as_deref(), Some("m-1"));
        assert_eq!(items[0].body, json!({ "gmb_id": "a" }));
        assert_eq!(items[1].body, json!("not json"));
    }

    #[test]
    fn test_parse_plain_array_and_object() {
        let items = parse_batch(r#"[{"gmb_id": "a"}, "{\"gmb_id\": \"b\"}"]"#).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].body, json!({ "gmb_id": "b" }));

        let single = parse_batch(r#"{"gmb_id": "a"}"#).unwrap();
        assert_eq!(single.len(), 1);
    }

    #[test]
    fn test_parse_rejects_scalars() {
        assert!(matches!(
            parse_batch("42"),
            Err(AuditError::InvalidMessage(_))
        ));
        assert!(matches!(
            parse_batch("{oops"),
            Err(AuditError::InvalidMessage(_))
        ));
    }

    #[test]
    fn test_failure_outcome_serialization() {
        let outcome = RecordOutcome::Failure {
            message_id: None,
            error: AuditError::MissingIdentifier.to_string(),
            record: json!({ "primary_category": "Bakery" }),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "failure");
        assert_eq!(json["error"], "Invalid listing data: missing gmb_id");
        assert!(json.get("message_id").is_none());
    }
}
