//! External collaborator interfaces
//!
//! Checks depend only on the traits defined here; production HTTP clients
//! live in the submodules and are injected as `Arc<dyn ...>`.

pub mod google_maps;
pub mod openai;

use crate::types::CollaboratorError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use google_maps::{GoogleAddressValidationClient, GooglePlacesAutocompleteClient};
pub use openai::OpenAiClassifier;

// ============================================================================
// Classification
// ============================================================================

/// Sampling parameters for a classification call
#[derive(Debug, Clone, PartialEq)]
pub struct SamplingConfig {
    pub model: String,
    pub temperature: f32,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4.1-nano".to_string(),
            temperature: 0.2,
        }
    }
}

/// One prompt plus its sampling parameters
#[derive(Debug, Clone)]
pub struct ClassificationRequest {
    pub prompt: String,
    pub sampling: SamplingConfig,
}

/// Text-in, text-out language-model classifier
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Collaborator name for logs
    fn name(&self) -> &'static str;

    /// Return the raw reply text
    async fn classify(&self, request: &ClassificationRequest) -> Result<String, CollaboratorError>;
}

// ============================================================================
// Address services
// ============================================================================

/// Structured address handed to the validation service
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressComponents {
    pub address_lines: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locality: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub administrative_area: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sublocality: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    pub region_code: String,
}

/// Confidence signals returned by the validation service
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationSignals {
    pub has_unconfirmed_components: bool,
    pub address_complete: bool,
    pub formatted_address: Option<String>,
    pub missing_component_types: Vec<String>,
}

/// One autocomplete prediction
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AddressSuggestion {
    pub description: String,
    #[serde(default)]
    pub place_id: Option<String>,
}

/// Structured address validation
#[async_trait]
pub trait AddressValidator: Send + Sync {
    fn name(&self) -> &'static str;

    async fn validate(
        &self,
        address: &AddressComponents,
    ) -> Result<ValidationSignals, CollaboratorError>;
}

/// Free-text address autocomplete
///
/// An empty `Vec` is a successful "no suggestions" answer, not a failure.
#[async_trait]
pub trait AddressAutocomplete: Send + Sync {
    fn name(&self) -> &'static str;

    async fn suggest(&self, query: &str) -> Result<Vec<AddressSuggestion>, CollaboratorError>;
}
