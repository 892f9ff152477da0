//! AI Bridge - Generative vulnerability report
//!
//! Serializes the session log, sends one `generateContent` request with a
//! required JSON output schema, and parses the reply into an
//! [`AnalysisResult`]. Any failure degrades to the fixed fallback record.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use super::log_store::transcript;
use super::types::{AnalysisResult, LogEntry};
use crate::constants;

// ============================================================================
// ERROR HANDLING
// ============================================================================

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Analysis service returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Analysis service returned no text")]
    EmptyResponse,

    #[error("Failed to parse analysis response: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Analysis response violates schema: {0}")]
    Schema(String),

    #[error("Analysis provider not configured: {0}")]
    NotConfigured(String),
}

// ============================================================================
// REQUEST
// ============================================================================

/// Everything the provider needs for one report
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRequest {
    pub system_instruction: String,
    pub prompt: String,
    pub response_schema: Value,
}

impl AnalysisRequest {
    pub fn from_logs(entries: &[LogEntry]) -> Self {
        Self {
            system_instruction: constants::ANALYST_PERSONA.to_string(),
            prompt: format!("{}\n\n{}", constants::ANALYSIS_PROMPT_HEADER, transcript(entries)),
            response_schema: response_schema(),
        }
    }
}

/// Required output schema (Gemini OpenAPI subset)
pub fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "vulnerabilityScore": {
                "type": "NUMBER",
                "description": "Overall exposure score from 0 (none) to 100 (critical)"
            },
            "threatType": {
                "type": "STRING",
                "description": "Short classification of the demonstrated attack"
            },
            "recommendations": {
                "type": "ARRAY",
                "items": { "type": "STRING" },
                "description": "Mitigations in priority order"
            },
            "summary": {
                "type": "STRING",
                "description": "Plain-language summary of the attack chain"
            }
        },
        "required": ["vulnerabilityScore", "threatType", "recommendations", "summary"],
        "propertyOrdering": ["vulnerabilityScore", "threatType", "recommendations", "summary"]
    })
}

/// Parse the model's text reply and enforce the score range.
///
/// Tolerates a surrounding markdown code fence.
pub fn parse_report(text: &str) -> Result<AnalysisResult, AnalysisError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(AnalysisError::EmptyResponse);
    }

    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .unwrap_or(trimmed)
        .trim();

    let result: AnalysisResult = serde_json::from_str(body)?;
    if !result.score_in_range() {
        return Err(AnalysisError::Schema(format!(
            "vulnerabilityScore {} outside 0-100",
            result.vulnerability_score
        )));
    }

    Ok(result)
}

// ============================================================================
// PROVIDER
// ============================================================================

/// External report generator. Implemented by [`GeminiProvider`] and by
/// fakes in tests.
#[async_trait]
pub trait AnalysisProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult, AnalysisError>;
}

#[derive(Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout_seconds: u64,
}

impl std::fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &if self.api_key.is_empty() { "<unset>" } else { "<redacted>" })
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: constants::get_api_key().unwrap_or_default(),
            model: constants::get_model(),
            base_url: constants::get_base_url(),
            timeout_seconds: constants::get_analysis_timeout(),
        }
    }
}

/// Google Gemini `generateContent` client
pub struct GeminiProvider {
    config: GeminiConfig,
    http_client: reqwest::Client,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    system_instruction: Content,
    contents: Vec<Content>,
    generation_config: GenerationConfig<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    response_mime_type: &'static str,
    response_schema: &'a Value,
}

#[derive(Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

impl GeminiProvider {
    pub fn new(config: GeminiConfig) -> Result<Self, AnalysisError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self { config, http_client })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }
}

#[async_trait]
impl AnalysisProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult, AnalysisError> {
        if self.config.api_key.is_empty() {
            return Err(AnalysisError::NotConfigured("GEMINI_API_KEY is not set".to_string()));
        }

        let body = GenerateContentRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part { text: Some(request.system_instruction.clone()) }],
            },
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part { text: Some(request.prompt.clone()) }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_schema: &request.response_schema,
            },
        };

        log::info!("Requesting vulnerability report from {} ({})", self.name(), self.config.model);

        let response = self
            .http_client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AnalysisError::Status { status: status.as_u16(), body });
        }

        let reply: GenerateContentResponse = response.json().await?;
        let text: String = reply
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        parse_report(&text)
    }
}

// ============================================================================
// REQUESTER
// ============================================================================

/// Result of one analysis request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisOutcome {
    pub result: AnalysisResult,
    /// Set when the fallback record was substituted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
}

impl AnalysisOutcome {
    pub fn is_fallback(&self) -> bool {
        self.fallback_reason.is_some()
    }
}

#[derive(Clone)]
pub struct AnalysisRequester {
    provider: Arc<dyn AnalysisProvider>,
}

impl AnalysisRequester {
    pub fn new(provider: Arc<dyn AnalysisProvider>) -> Self {
        Self { provider }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// One independent request. `None` for an empty log (no call is made);
    /// failures never propagate, they yield the fallback record.
    pub async fn analyze(&self, logs: &[LogEntry]) -> Option<AnalysisOutcome> {
        if logs.is_empty() {
            return None;
        }

        let request = AnalysisRequest::from_logs(logs);
        let outcome = match self.provider.analyze(&request).await {
            Ok(result) => AnalysisOutcome { result, fallback_reason: None },
            Err(e) => {
                log::error!("Vulnerability analysis failed ({}), using fallback report", e);
                AnalysisOutcome {
                    result: AnalysisResult::fallback(),
                    fallback_reason: Some(e.to_string()),
                }
            }
        };

        Some(outcome)
    }
}

// ============================================================================
// UNIT TESTS
// ============================================================================
