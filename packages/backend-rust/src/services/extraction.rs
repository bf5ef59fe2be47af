//! Concept extraction collaborator.
//!
//! Thin client for the hosted LLM that turns note text into structured
//! gap candidates and practice questions. The backend only transports and
//! decodes; all semantic judgment stays on the provider side, and the
//! scoring core treats everything arriving here as untrusted input.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::sleep;
use tracing::warn;

const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_API_ENDPOINT: &str = "https://api.openai.com/v1";
const DEFAULT_TIMEOUT_MS: u64 = 60_000;
const MAX_RETRIES: usize = 3;
const BASE_BACKOFF_MS: u64 = 200;

const GAP_SYSTEM_PROMPT: &str = "You analyze a learner's study notes and identify knowledge gaps. \
Respond with a JSON array; each element has fields: concept (string), \
gapType (one of prerequisite, reinforcement, connection, general), \
userMastery (number 0-1), description (string).";

const QUESTION_SYSTEM_PROMPT: &str = "You write practice questions for a learner's study notes. \
Respond with a JSON array; each element has fields: concept (string), \
prompt (string), answer (string).";

#[derive(Debug, Clone)]
pub struct ExtractionConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub api_endpoint: String,
    pub timeout: Duration,
}

/// Raw gap candidate as the provider emits it. Fields are optional on
/// purpose: the scorer defaults whatever the model leaves out or mangles.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GapCandidate {
    pub concept: String,
    pub gap_type: Option<String>,
    pub user_mastery: Option<f64>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticeQuestion {
    pub concept: String,
    pub prompt: String,
    pub answer: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

impl ChatResponse {
    fn first_content(&self) -> Option<&str> {
        self.choices.first().map(|c| c.message.content.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("extraction service not configured: {0}")]
    NotConfigured(&'static str),
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("HTTP {status}: {body}")]
    HttpStatus {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("JSON decode failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("empty response")]
    EmptyChoices,
}

#[derive(Clone)]
pub struct ExtractionClient {
    config: ExtractionConfig,
    client: reqwest::Client,
    mock: bool,
}

impl ExtractionClient {
    pub fn from_env() -> Self {
        let api_key = env_string("LLM_API_KEY");
        let model = env_string("LLM_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let api_endpoint = normalize_endpoint(
            env_string("LLM_API_ENDPOINT").unwrap_or_else(|| DEFAULT_API_ENDPOINT.to_string()),
        );
        let timeout = Duration::from_millis(env_u64("LLM_TIMEOUT").unwrap_or(DEFAULT_TIMEOUT_MS));
        let mock = std::env::var("LLM_MOCK")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            config: ExtractionConfig {
                api_key,
                model,
                api_endpoint,
                timeout,
            },
            client,
            mock,
        }
    }

    pub fn is_available(&self) -> bool {
        self.mock
            || (self
                .config
                .api_key
                .as_deref()
                .is_some_and(|v| !v.trim().is_empty())
                && !self.config.model.trim().is_empty())
    }

    pub fn is_mock(&self) -> bool {
        self.mock
    }

    /// Gap candidates for a chunk of note text.
    pub async fn gap_candidates(
        &self,
        note_text: &str,
    ) -> Result<Vec<GapCandidate>, ExtractionError> {
        if self.mock {
            return Ok(mock_gap_candidates(note_text));
        }

        let content = self.complete(GAP_SYSTEM_PROMPT, note_text).await?;
        let parsed = serde_json::from_str(strip_code_fences(&content))?;
        Ok(parsed)
    }

    /// Practice questions for a chunk of note text.
    pub async fn practice_questions(
        &self,
        note_text: &str,
    ) -> Result<Vec<PracticeQuestion>, ExtractionError> {
        if self.mock {
            return Ok(mock_practice_questions(note_text));
        }

        let content = self.complete(QUESTION_SYSTEM_PROMPT, note_text).await?;
        let parsed = serde_json::from_str(strip_code_fences(&content))?;
        Ok(parsed)
    }

    async fn complete(&self, system: &str, user: &str) -> Result<String, ExtractionError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|v| !v.trim().is_empty())
            .ok_or(ExtractionError::NotConfigured("LLM_API_KEY"))?;

        let url = format!(
            "{}/chat/completions",
            self.config.api_endpoint.trim_end_matches('/')
        );
        let messages = [
            ChatMessage {
                role: "system".into(),
                content: system.into(),
            },
            ChatMessage {
                role: "user".into(),
                content: user.into(),
            },
        ];
        let payload = serde_json::json!({
            "model": self.config.model,
            "messages": messages,
            "stream": false
        });

        let response = self.post_with_retry(&url, api_key, &payload).await?;
        response
            .first_content()
            .map(|s| s.to_string())
            .ok_or(ExtractionError::EmptyChoices)
    }

    async fn post_with_retry(
        &self,
        url: &str,
        api_key: &str,
        payload: &serde_json::Value,
    ) -> Result<ChatResponse, ExtractionError> {
        let mut last_error: Option<ExtractionError> = None;

        for retry in 0..=MAX_RETRIES {
            match self
                .client
                .post(url)
                .bearer_auth(api_key)
                .json(payload)
                .send()
                .await
            {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        return Ok(resp.json::<ChatResponse>().await?);
                    }
                    let body = resp.text().await.unwrap_or_default();
                    let err = ExtractionError::HttpStatus { status, body };
                    if retry < MAX_RETRIES && is_retryable(status) {
                        let backoff = Duration::from_millis(BASE_BACKOFF_MS * (1 << retry));
                        warn!(retry, ?status, "extraction request failed, retrying");
                        sleep(backoff).await;
                        last_error = Some(err);
                        continue;
                    }
                    return Err(err);
                }
                Err(e) => {
                    let err = ExtractionError::Request(e);
                    if retry < MAX_RETRIES {
                        let backoff = Duration::from_millis(BASE_BACKOFF_MS * (1 << retry));
                        warn!(retry, "extraction request error, retrying");
                        sleep(backoff).await;
                        last_error = Some(err);
                        continue;
                    }
                    return Err(err);
                }
            }
        }
        Err(last_error.unwrap_or(ExtractionError::NotConfigured("unknown")))
    }
}

/// Deterministic stand-in used in tests and local development: one general
/// gap per distinct capitalized term, mastery fixed at the midpoint.
fn mock_gap_candidates(note_text: &str) -> Vec<GapCandidate> {
    let mut seen = Vec::new();
    for word in note_text.split_whitespace() {
        let term: String = word.chars().filter(|c| c.is_alphanumeric()).collect();
        if term.len() > 2
            && term.chars().next().is_some_and(|c| c.is_uppercase())
            && !seen.contains(&term)
        {
            seen.push(term);
        }
        if seen.len() >= 8 {
            break;
        }
    }
    seen.into_iter()
        .map(|concept| GapCandidate {
            concept,
            gap_type: Some("general".to_string()),
            user_mastery: Some(0.5),
            description: None,
        })
        .collect()
}

fn mock_practice_questions(note_text: &str) -> Vec<PracticeQuestion> {
    mock_gap_candidates(note_text)
        .into_iter()
        .map(|candidate| PracticeQuestion {
            prompt: format!("Explain: {}", candidate.concept),
            answer: candidate.concept.clone(),
            concept: candidate.concept,
        })
        .collect()
}

/// Providers often wrap JSON in markdown fences; tolerate that.
fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_u64(key: &str) -> Option<u64> {
    env_string(key)?.parse().ok()
}

fn normalize_endpoint(endpoint: String) -> String {
    let trimmed = endpoint.trim().trim_end_matches('/');
    if trimmed.ends_with("/v1") || trimmed.contains("/v1/") {
        trimmed.to_string()
    } else {
        format!("{trimmed}/v1")
    }
}

fn is_retryable(status: reqwest::StatusCode) -> bool {
    status == reqwest::StatusCode::TOO_MANY_REQUESTS
        || status == reqwest::StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
}
