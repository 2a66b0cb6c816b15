//! Fake collaborators
//!
//! Scriptable stand-ins for the classifier, the address services, and a
//! misbehaving check. Each fake counts its calls so tests can assert that a
//! short-circuit really skipped the network.

use async_trait::async_trait;
use listing_audit::clients::{
    AddressAutocomplete, AddressComponents, AddressSuggestion, AddressValidator,
    ClassificationRequest, Classifier, ValidationSignals,
};
use listing_audit::record::ListingRecord;
use listing_audit::types::{
    CheckContext, CheckError, CheckName, CheckOutcome, CollaboratorError, ListingCheck,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

// ============================================================================
// Classifier
// ============================================================================

/// Classifier answering by prompt kind
pub struct FakeClassifier {
    relevance_reply: String,
    policy_reply: String,
    delay: Option<Duration>,
    failure: Option<String>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl FakeClassifier {
    /// Relevant categories, compliant content
    pub fn clean() -> Self {
        Self::replying("false", r#"{"violation": false, "rationale": ""}"#)
    }

    pub fn replying(relevance_reply: &str, policy_reply: &str) -> Self {
        Self {
            relevance_reply: relevance_reply.to_string(),
            policy_reply: policy_reply.to_string(),
            delay: None,
            failure: None,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Every call fails with a network error
    pub fn failing(message: &str) -> Self {
        let mut fake = Self::clean();
        fake.failure = Some(message.to_string());
        fake
    }

    /// Every call sleeps before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Classifier for FakeClassifier {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn classify(&self, request: &ClassificationRequest) -> Result<String, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(request.prompt.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = &self.failure {
            return Err(CollaboratorError::Network(message.clone()));
        }

        if request.prompt.contains("business categories") {
            Ok(self.relevance_reply.clone())
        } else {
            Ok(self.policy_reply.clone())
        }
    }
}

// ============================================================================
// Address services
// ============================================================================

/// Autocomplete returning a fixed answer
pub struct FakeAutocomplete {
    answer: Result<Vec<AddressSuggestion>, String>,
    calls: AtomicUsize,
    queries: Mutex<Vec<String>>,
}

impl FakeAutocomplete {
    pub fn suggesting(descriptions: &[&str]) -> Self {
        Self::with_answer(Ok(descriptions
            .iter()
            .map(|d| AddressSuggestion {
                description: d.to_string(),
                place_id: None,
            })
            .collect()))
    }

    pub fn empty() -> Self {
        Self::with_answer(Ok(Vec::new()))
    }

    pub fn failing(message: &str) -> Self {
        Self::with_answer(Err(message.to_string()))
    }

    fn with_answer(answer: Result<Vec<AddressSuggestion>, String>) -> Self {
        Self {
            answer,
            calls: AtomicUsize::new(0),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl AddressAutocomplete for FakeAutocomplete {
    fn name(&self) -> &'static str {
        "fake_autocomplete"
    }

    async fn suggest(&self, query: &str) -> Result<Vec<AddressSuggestion>, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().unwrap().push(query.to_string());
        self.answer.clone().map_err(CollaboratorError::Api)
    }
}

/// Validator returning fixed signals
pub struct FakeValidator {
    answer: Result<ValidationSignals, String>,
    calls: AtomicUsize,
}

impl FakeValidator {
    pub fn new(has_unconfirmed_components: bool, address_complete: bool) -> Self {
        Self::with_answer(Ok(ValidationSignals {
            has_unconfirmed_components,
            address_complete,
            formatted_address: None,
            missing_component_types: Vec::new(),
        }))
    }

    /// Every call fails with an API error
    pub fn failing(message: &str) -> Self {
        Self::with_answer(Err(message.to_string()))
    }

    pub fn with_formatted_address(mut self, formatted: &str) -> Self {
        if let Ok(signals) = &mut self.answer {
            signals.formatted_address = Some(formatted.to_string());
        }
        self
    }

    fn with_answer(answer: Result<ValidationSignals, String>) -> Self {
        Self {
            answer,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AddressValidator for FakeValidator {
    fn name(&self) -> &'static str {
        "fake_validator"
    }

    async fn validate(
        &self,
        _address: &AddressComponents,
    ) -> Result<ValidationSignals, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answer.clone().map_err(CollaboratorError::Api)
    }
}

// ============================================================================
// Misbehaving check
// ============================================================================

/// Check that panics mid-evaluation
pub struct PanickingCheck(pub CheckName);

#[async_trait]
impl ListingCheck for PanickingCheck {
    fn name(&self) -> CheckName {
        self.0
    }

    async fn evaluate(
        &self,
        _record: &ListingRecord,
        _ctx: &CheckContext,
    ) -> Result<CheckOutcome, CheckError> {
        panic!("check blew up");
    }
}
