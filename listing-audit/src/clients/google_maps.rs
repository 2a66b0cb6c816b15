//! Google Maps address clients
//!
//! - Address Validation: structured address in, verdict signals out
//! - Places Autocomplete: free-text query in, predictions out
//!
//! # API Reference
//! - https://addressvalidation.googleapis.com/v1:validateAddress
//! - https://maps.googleapis.com/maps/api/place/autocomplete/json

use super::{AddressAutocomplete, AddressComponents, AddressSuggestion, AddressValidator, ValidationSignals};
use crate::types::CollaboratorError;
use async_trait::async_trait;
use listing_common::config::{resolve_api_key, AddressConfig, ADDRESS_KEY_ENV};
use listing_common::time::millis_to_duration;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

const VALIDATION_API_URL: &str = "https://addressvalidation.googleapis.com/v1:validateAddress";
const AUTOCOMPLETE_API_URL: &str = "https://maps.googleapis.com/maps/api/place/autocomplete/json";

fn build_http_client(timeout_ms: u64) -> Result<Client, CollaboratorError> {
    Client::builder()
        .timeout(millis_to_duration(timeout_ms))
        .build()
        .map_err(|e| CollaboratorError::NotConfigured(format!("HTTP client: {}", e)))
}

fn resolve_key(config: &AddressConfig) -> listing_common::Result<String> {
    resolve_api_key(ADDRESS_KEY_ENV, config.api_key.as_deref(), "Google Maps")
}

async fn read_body(response: reqwest::Response, service: &str) -> Result<String, CollaboratorError> {
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| CollaboratorError::Network(format!("{} body: {}", service, e)))?;
    if !status.is_success() {
        return Err(CollaboratorError::Api(format!(
            "{} returned {}: {}",
            service,
            status,
            text.chars().take(200).collect::<String>()
        )));
    }
    Ok(text)
}

// ============================================================================
// Address Validation
// ============================================================================

#[derive(Debug, Serialize)]
struct ValidationRequest<'a> {
    address: &'a AddressComponents,
}

#[derive(Debug, Deserialize)]
struct ValidationResponse {
    result: Option<ValidationResult>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ValidationResult {
    verdict: ValidationVerdict,
    address: ValidatedAddress,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ValidationVerdict {
    has_unconfirmed_components: bool,
    address_complete: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ValidatedAddress {
    formatted_address: Option<String>,
    missing_component_types: Vec<String>,
}

/// Read verdict signals from a validation response body
pub fn parse_validation_response(body: &str) -> Result<ValidationSignals, CollaboratorError> {
    let response: ValidationResponse = serde_json::from_str(body)
        .map_err(|e| CollaboratorError::Parse(format!("address validation: {}", e)))?;
    let result = response
        .result
        .ok_or_else(|| CollaboratorError::Parse("address validation: missing result".to_string()))?;

    Ok(ValidationSignals {
        has_unconfirmed_components: result.verdict.has_unconfirmed_components,
        address_complete: result.verdict.address_complete,
        formatted_address: result.address.formatted_address,
        missing_component_types: result.address.missing_component_types,
    })
}

/// Google Address Validation client
pub struct GoogleAddressValidationClient {
    http_client: Client,
    api_key: String,
    endpoint: String,
}

impl GoogleAddressValidationClient {
    pub fn new(api_key: String, timeout_ms: u64) -> Result<Self, CollaboratorError> {
        Ok(Self {
            http_client: build_http_client(timeout_ms)?,
            api_key,
            endpoint: VALIDATION_API_URL.to_string(),
        })
    }

    pub fn from_config(config: &AddressConfig) -> listing_common::Result<Self> {
        let api_key = resolve_key(config)?;
        Self::new(api_key, config.timeout_ms)
            .map_err(|e| listing_common::Error::Config(e.to_string()))
    }

    /// Point the client at a different endpoint (local stub servers)
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl AddressValidator for GoogleAddressValidationClient {
    fn name(&self) -> &'static str {
        "google_address_validation"
    }

    async fn validate(
        &self,
        address: &AddressComponents,
    ) -> Result<ValidationSignals, CollaboratorError> {
        debug!(region = %address.region_code, "Validating address");

        let response = self
            .http_client
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&ValidationRequest { address })
            .send()
            .await
            .map_err(|e| CollaboratorError::Network(format!("address validation request: {}", e)))?;

        let body = read_body(response, "address validation").await?;
        parse_validation_response(&body)
    }
}

// ============================================================================
// Places Autocomplete
// ============================================================================

#[derive(Debug, Deserialize)]
struct AutocompleteResponse {
    status: String,
    #[serde(default)]
    predictions: Vec<AddressSuggestion>,
    #[serde(default)]
    error_message: Option<String>,
}

/// Read predictions from an autocomplete body
///
/// `ZERO_RESULTS` is a successful empty answer; any other non-`OK` status is
/// a failure.
pub fn parse_autocomplete_response(body: &str) -> Result<Vec<AddressSuggestion>, CollaboratorError> {
    let response: AutocompleteResponse = serde_json::from_str(body)
        .map_err(|e| CollaboratorError::Parse(format!("autocomplete: {}", e)))?;

    match response.status.as_str() {
        "OK" => Ok(response.predictions),
        "ZERO_RESULTS" => Ok(Vec::new()),
        status => Err(CollaboratorError::Api(format!(
            "autocomplete status {}{}",
            status,
            response
                .error_message
                .map(|m| format!(": {}", m))
                .unwrap_or_default()
        ))),
    }
}

/// Google Places Autocomplete client
pub struct GooglePlacesAutocompleteClient {
    http_client: Client,
    api_key: String,
    endpoint: String,
}

impl GooglePlacesAutocompleteClient {
    pub fn new(api_key: String, timeout_ms: u64) -> Result<Self, CollaboratorError> {
        Ok(Self {
            http_client: build_http_client(timeout_ms)?,
            api_key,
            endpoint: AUTOCOMPLETE_API_URL.to_string(),
        })
    }

    pub fn from_config(config: &AddressConfig) -> listing_common::Result<Self> {
        let api_key = resolve_key(config)?;
        Self::new(api_key, config.timeout_ms)
            .map_err(|e| listing_common::Error::Config(e.to_string()))
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl AddressAutocomplete for GooglePlacesAutocompleteClient {
    fn name(&self) -> &'static str {
        "google_places_autocomplete"
    }

    async fn suggest(&self, query: &str) -> Result<Vec<AddressSuggestion>, CollaboratorError> {
        let response = self
            .http_client
            .get(&self.endpoint)
            .query(&[("input", query), ("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| CollaboratorError::Network(format!("autocomplete request: {}", e)))?;

        let body = read_body(response, "autocomplete").await?;
        parse_autocomplete_response(&body)
    }
}
