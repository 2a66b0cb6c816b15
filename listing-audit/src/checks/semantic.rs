//! Semantic Classifiers
//!
//! Category relevance and policy screening, both backed by the injected
//! [`Classifier`]. Call failures and unreadable replies surface as
//! `Indeterminate`; nothing here propagates an error for a bad reply.

use crate::clients::{ClassificationRequest, Classifier, SamplingConfig};
use crate::record::{Field, ListingRecord};
use crate::types::{CheckContext, CheckError, CheckName, CheckOutcome, CheckResult, ListingCheck};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

/// Rationale recorded when a listing has nothing to screen
pub const NO_CONTENT_RATIONALE: &str = "no content provided";

// ============================================================================
// Category relevance
// ============================================================================

/// Prompt asking whether the categories belong to one business
pub fn relevance_prompt(categories: &[&str]) -> String {
    format!(
        "Analyze the following business categories and determine if they are relevant to each other for a single business: {}\n\n\
         Categories are considered NOT RELEVANT if they represent completely different business types that would be unusual or impossible for one business to operate (e.g., taxi company and plumber, restaurant and auto repair).\n\n\
         Respond with only \"true\" if the categories are NOT RELEVANT to each other, or \"false\" if they are relevant or could reasonably belong to the same business.",
        categories.join(", ")
    )
}

/// Read a relevance reply; `None` when it says both or neither
pub fn interpret_relevance_reply(reply: &str) -> Option<bool> {
    let reply = reply.trim().to_lowercase();
    match (reply.contains("true"), reply.contains("false")) {
        (true, false) => Some(true),
        (false, true) => Some(false),
        _ => None,
    }
}

/// Categories that do not belong to a single business
pub struct CategoryRelevanceCheck {
    classifier: Arc<dyn Classifier>,
    sampling: SamplingConfig,
}

impl CategoryRelevanceCheck {
    pub fn new(classifier: Arc<dyn Classifier>, sampling: SamplingConfig) -> Self {
        Self {
            classifier,
            sampling,
        }
    }
}

#[async_trait]
impl ListingCheck for CategoryRelevanceCheck {
    fn name(&self) -> CheckName {
        CheckName::CategoryRelevance
    }

    async fn evaluate(
        &self,
        record: &ListingRecord,
        ctx: &CheckContext,
    ) -> Result<CheckOutcome, CheckError> {
        let additional = match &record.additional_categories {
            Field::Absent => return Ok(CheckOutcome::not_applicable()),
            Field::Malformed(reason) => {
                return Ok(CheckOutcome::indeterminate(format!(
                    "additional_categories: {}",
                    reason
                )))
            }
            Field::Value(additional) => additional,
        };

        // A single category cannot be irrelevant to itself
        if additional.is_empty() {
            return Ok(CheckOutcome::from_bool(false));
        }

        let mut categories: Vec<&str> = Vec::with_capacity(additional.len() + 1);
        if let Some(primary) = record.primary_category.non_blank() {
            categories.push(primary);
        }
        categories.extend(additional.iter().map(String::as_str));

        let request = ClassificationRequest {
            prompt: relevance_prompt(&categories),
            sampling: self.sampling.clone(),
        };
        let reply = self.classifier.classify(&request).await?;

        debug!(
            listing_id = %ctx.listing_id,
            classifier = self.classifier.name(),
            reply = %reply.trim(),
            "Category relevance reply"
        );

        Ok(match interpret_relevance_reply(&reply) {
            Some(irrelevant) => CheckOutcome::from_bool(irrelevant),
            None => CheckOutcome::indeterminate(format!("ambiguous reply: {}", reply.trim())),
        })
    }
}

// ============================================================================
// Policy screening
// ============================================================================

/// Labelled blob of the listing's non-empty free text
pub fn policy_content_blob(record: &ListingRecord) -> Option<String> {
    let sections: Vec<String> = [
        ("Description", &record.description),
        ("Posts", &record.posts_text),
        ("Answers", &record.answers_text),
    ]
    .into_iter()
    .filter_map(|(label, field)| field.non_blank().map(|text| format!("{}: {}", label, text)))
    .collect();

    if sections.is_empty() {
        None
    } else {
        Some(sections.join("\n\n"))
    }
}

/// Reasons for every free-text field that arrived malformed
pub fn malformed_policy_fields(record: &ListingRecord) -> Vec<String> {
    [
        ("description", &record.description),
        ("posts_text", &record.posts_text),
        ("answers_text", &record.answers_text),
    ]
    .into_iter()
    .filter_map(|(name, field)| match field {
        Field::Malformed(reason) => Some(format!("{}: {}", name, reason)),
        _ => None,
    })
    .collect()
}

/// Prompt asking for a structured policy verdict
pub fn policy_prompt(content: &str) -> String {
    format!(
        "Analyze the following business information for Google My Business policy violations. Look for content that includes prohibited items such as:\n\
         - Regulated products (alcohol, firearms, drugs, tobacco)\n\
         - Adult content\n\
         - Illegal services\n\
         - Misleading or deceptive content\n\
         - Spam or irrelevant content\n\n\
         Business Information:\n{}\n\n\
         Respond with only a JSON object of the form {{\"violation\": true|false, \"rationale\": \"<one sentence>\"}}.",
        content
    )
}

/// Structured policy verdict
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PolicyReply {
    #[serde(alias = "is_policy_violation", alias = "isPolicyViolations")]
    pub violation: bool,
    #[serde(default)]
    pub rationale: String,
}

/// Body of the first fenced-code block, or the trimmed reply when unfenced
///
/// The fence may be preceded by prose and may carry a language tag with or
/// without a line break after it.
pub fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(open) = trimmed.find("```") else {
        return trimmed;
    };
    let rest = trimmed[open + 3..].trim_start_matches(|c: char| c.is_ascii_alphanumeric());
    let body = match rest.find("```") {
        Some(close) => &rest[..close],
        None => rest,
    };
    body.trim()
}

/// Tolerant decode of a policy reply
pub fn decode_policy_reply(reply: &str) -> Result<PolicyReply, serde_json::Error> {
    serde_json::from_str(strip_code_fence(reply))
}

/// Content that breaks listing policy
pub struct PolicyViolationCheck {
    classifier: Arc<dyn Classifier>,
    sampling: SamplingConfig,
}

impl PolicyViolationCheck {
    pub fn new(classifier: Arc<dyn Classifier>, sampling: SamplingConfig) -> Self {
        Self {
            classifier,
            sampling,
        }
    }
}

#[async_trait]
impl ListingCheck for PolicyViolationCheck {
    fn name(&self) -> CheckName {
        CheckName::PolicyViolation
    }

    async fn evaluate(
        &self,
        record: &ListingRecord,
        ctx: &CheckContext,
    ) -> Result<CheckOutcome, CheckError> {
        let Some(content) = policy_content_blob(record) else {
            let malformed = malformed_policy_fields(record);
            if !malformed.is_empty() {
                return Ok(CheckOutcome::indeterminate(malformed.join("; ")));
            }
            return Ok(CheckOutcome::new(CheckResult::Indeterminate)
                .with_rationale(NO_CONTENT_RATIONALE));
        };

        let request = ClassificationRequest {
            prompt: policy_prompt(&content),
            sampling: self.sampling.clone(),
        };
        let reply = self.classifier.classify(&request).await?;

        match decode_policy_reply(&reply) {
            Ok(decoded) => {
                debug!(
                    listing_id = %ctx.listing_id,
                    violation = decoded.violation,
                    "Policy screening reply"
                );
                let outcome = CheckOutcome::from_bool(decoded.violation);
                let rationale = decoded.rationale.trim();
                Ok(if rationale.is_empty() {
                    outcome
                } else {
                    outcome.with_rationale(rationale)
                })
            }
            Err(e) => Ok(CheckOutcome::indeterminate(format!(
                "unreadable policy reply: {}",
                e
            ))),
        }
    }
}
