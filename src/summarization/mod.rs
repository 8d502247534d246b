//! Client for the hosted summarization model.
//!
//! Each chunk is wrapped in a fixed instruction, posted to the Hugging Face inference endpoint
//! with deterministic generation settings, and the response is validated before its summary
//! text is handed back. Transport failures, non-success statuses and malformed bodies are kept
//! apart so callers can report them differently.

use crate::config::Config;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Instruction placed in front of every chunk.
pub const SUMMARY_PROMPT_PREFIX: &str = "Summarize the following content briefly and clearly:";

/// Errors surfaced while summarizing a single chunk.
#[derive(Debug, Error)]
pub enum SummaryError {
    /// The service answered with a non-success status.
    #[error("Hugging Face API error: {status} - {body}")]
    RemoteService {
        /// HTTP status code returned by the service.
        status: u16,
        /// Raw response body.
        body: String,
    },
    /// The service answered successfully but the body was not a list of summaries.
    #[error("Unexpected response from HF API")]
    UnexpectedResponseShape {
        /// Response body as JSON (or a JSON string when it was not JSON at all).
        raw: Value,
    },
    /// The request did not complete within the configured deadline.
    #[error("Summarization request timed out after {0:?}")]
    Timeout(Duration),
    /// The request could not be sent or the response could not be read.
    #[error("Failed to reach summarization service: {0}")]
    Transport(String),
}

/// Interface implemented by summarization backends.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Summarize one chunk of text.
    async fn summarize(&self, text: &str) -> Result<String, SummaryError>;
}

/// Generation constraints sent with every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GenerationParameters {
    /// Upper bound on summary length.
    pub max_length: u32,
    /// Lower bound on summary length.
    pub min_length: u32,
    /// Sampling toggle; always `false` so output is greedy and repeatable.
    pub do_sample: bool,
}

#[derive(Debug, Serialize)]
struct InferenceRequest {
    inputs: String,
    parameters: GenerationParameters,
    options: InferenceOptions,
}

#[derive(Debug, Serialize)]
struct InferenceOptions {
    // Block until a cold model is loaded instead of answering 503.
    wait_for_model: bool,
}

/// Wrap a chunk in the summarization instruction.
pub fn build_prompt(chunk: &str) -> String {
    format!("{SUMMARY_PROMPT_PREFIX}\n\n{chunk}")
}

/// Validate a successful response body and pull out the summary text.
///
/// The only accepted shape is a non-empty array whose first element is an object with a string
/// `summary_text`. Anything else is returned as [`SummaryError::UnexpectedResponseShape`] with the
/// body preserved for diagnostics.
pub fn parse_summary_response(body: &str) -> Result<String, SummaryError> {
    let raw: Value =
        serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string()));

    let summary = raw
        .as_array()
        .and_then(|items| items.first())
        .and_then(|first| first.get("summary_text"))
        .and_then(Value::as_str)
        .map(str::to_string);

    summary.ok_or(SummaryError::UnexpectedResponseShape { raw })
}

/// Summarizer backed by the Hugging Face inference API.
pub struct HuggingFaceSummarizer {
    http: Client,
    endpoint: String,
    api_token: String,
    parameters: GenerationParameters,
    timeout: Duration,
}

impl HuggingFaceSummarizer {
    /// Build a client from the injected configuration.
    pub fn from_config(config: &Config) -> Result<Self, SummaryError> {
        let http = Client::builder()
            .user_agent(concat!("docsum/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|error| SummaryError::Transport(error.to_string()))?;

        Ok(Self {
            http,
            endpoint: config.hf_api_url.clone(),
            api_token: config.hf_api_token.clone(),
            parameters: GenerationParameters {
                max_length: config.summary_max_length,
                min_length: config.summary_min_length,
                do_sample: false,
            },
            timeout: config.summary_timeout,
        })
    }

    fn classify(&self, error: reqwest::Error) -> SummaryError {
        if error.is_timeout() {
            SummaryError::Timeout(self.timeout)
        } else {
            SummaryError::Transport(error.to_string())
        }
    }
}

#[async_trait]
impl Summarizer for HuggingFaceSummarizer {
    async fn summarize(&self, text: &str) -> Result<String, SummaryError> {
        let request = InferenceRequest {
            inputs: build_prompt(text),
            parameters: self.parameters,
            options: InferenceOptions {
                wait_for_model: true,
            },
        };

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_token)
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|error| self.classify(error))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| self.classify(error))?;

        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "Summarization service returned an error");
            return Err(SummaryError::RemoteService {
                status: status.as_u16(),
                body,
            });
        }

        parse_summary_response(&body)
    }
}
