//! OpenAI-compatible chat-completions classifier
//!
//! Sends one user message per classification and returns the first choice's
//! text. The request timeout bounds a single HTTP call; the orchestrator's
//! per-check timeout still bounds the check as a whole.
//!
//! # API Reference
//! - Endpoint: `{base_url}/chat/completions`
//! - Auth: bearer token

use super::{ClassificationRequest, Classifier, SamplingConfig};
use crate::types::CollaboratorError;
use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use listing_common::config::{resolve_api_key, ClassifierConfig, CLASSIFIER_KEY_ENV};
use listing_common::time::millis_to_duration;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use tracing::debug;

type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Chat-completions request body
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

/// Chat-completions response (only the fields we read)
#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

/// Language-model classifier over HTTP
pub struct OpenAiClassifier {
    http_client: Client,
    api_key: String,
    base_url: String,
    rate_limiter: Option<DirectLimiter>,
}

impl OpenAiClassifier {
    /// Build a client from explicit settings
    ///
    /// `requests_per_second` of `None` or `0` disables client-side limiting.
    pub fn new(
        api_key: String,
        base_url: impl Into<String>,
        timeout_ms: u64,
        requests_per_second: Option<u32>,
    ) -> Result<Self, CollaboratorError> {
        let http_client = Client::builder()
            .timeout(millis_to_duration(timeout_ms))
            .build()
            .map_err(|e| CollaboratorError::NotConfigured(format!("HTTP client: {}", e)))?;

        let rate_limiter = requests_per_second
            .and_then(NonZeroU32::new)
            .map(|rps| RateLimiter::direct(Quota::per_second(rps)));

        Ok(Self {
            http_client,
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            rate_limiter,
        })
    }

    /// Build a client from configuration, resolving the API key (ENV → TOML)
    pub fn from_config(config: &ClassifierConfig) -> listing_common::Result<Self> {
        let api_key = resolve_api_key(CLASSIFIER_KEY_ENV, config.api_key.as_deref(), "OpenAI")?;
        Self::new(
            api_key,
            config.base_url.clone(),
            config.timeout_ms,
            config.requests_per_second,
        )
        .map_err(|e| listing_common::Error::Config(e.to_string()))
    }

    /// Sampling parameters configured for this client
    pub fn sampling_from(config: &ClassifierConfig) -> SamplingConfig {
        SamplingConfig {
            model: config.model.clone(),
            temperature: config.temperature,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

/// Extract the first choice's text from a chat-completions body
pub fn parse_chat_completion(body: &str) -> Result<String, CollaboratorError> {
    let response: ChatResponse = serde_json::from_str(body)
        .map_err(|e| CollaboratorError::Parse(format!("chat completion: {}", e)))?;

    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| CollaboratorError::Parse("chat completion has no content".to_string()))
}

#[async_trait]
impl Classifier for OpenAiClassifier {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn classify(&self, request: &ClassificationRequest) -> Result<String, CollaboratorError> {
        if let Some(limiter) = &self.rate_limiter {
            limiter.until_ready().await;
        }

        let body = ChatRequest {
            model: &request.sampling.model,
            temperature: request.sampling.temperature,
            messages: vec![ChatMessage {
                role: "user",
                content: &request.prompt,
            }],
        };

        debug!(model = %request.sampling.model, "Sending classification request");

        let response = self
            .http_client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| CollaboratorError::Network(format!("classification request: {}", e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| CollaboratorError::Network(format!("classification body: {}", e)))?;

        if !status.is_success() {
            return Err(CollaboratorError::Api(format!(
                "classification service returned {}: {}",
                status,
                text.chars().take(200).collect::<String>()
            )));
        }

        parse_chat_completion(&text)
    }
}
