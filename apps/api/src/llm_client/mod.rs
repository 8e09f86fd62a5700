//! LLM client — the only module that talks to the Anthropic Messages API.
//!
//! Other modules build prompts and call [`LlmClient::complete_json`]; they never
//! issue HTTP requests to the model provider themselves.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod prompts;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
/// Model used for document extraction. Pinned so extraction output stays stable.
pub const MODEL: &str = "claude-sonnet-4-5";
const MAX_TOKENS: u32 = 4096;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("gave up after {attempts} attempts")]
    Exhausted { attempts: u32 },

    #[error("LLM returned empty content")]
    EmptyContent,
}

/// Retry schedule for rate limits, 5xx responses and transport failures.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    /// Delay before `attempt` (0-based); doubles each time.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            Duration::ZERO
        } else {
            self.base_delay * (1u32 << (attempt - 1).min(16))
        }
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: [Message<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct LlmResponse {
    pub content: Vec<ContentBlock>,
    pub usage: Usage,
}

#[derive(Debug, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl LlmResponse {
    /// Concatenated text of all text blocks.
    pub fn text(&self) -> Option<String> {
        let text: String = self
            .content
            .iter()
            .filter(|b| b.block_type == "text")
            .filter_map(|b| b.text.as_deref())
            .collect();
        (!text.trim().is_empty()).then_some(text)
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// Outcome of one HTTP attempt.
enum Attempt {
    Done(LlmResponse),
    Retry(LlmError),
}

#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
    retry: RetryPolicy,
}

impl LlmClient {
    pub fn new(api_key: String) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            api_key,
            retry: RetryPolicy::default(),
        })
    }

    /// Sends one user message and returns the raw response, retrying transient failures.
    pub async fn complete(&self, prompt: &str, system: &str) -> Result<LlmResponse, LlmError> {
        let body = MessagesRequest {
            model: MODEL,
            max_tokens: MAX_TOKENS,
            system,
            messages: [Message {
                role: "user",
                content: prompt,
            }],
        };

        let mut last_error = None;
        for attempt in 0..self.retry.max_attempts {
            let delay = self.retry.delay_for(attempt);
            if !delay.is_zero() {
                warn!(
                    "LLM attempt {attempt} failed, retrying in {}ms",
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            match self.send_once(&body).await? {
                Attempt::Done(response) => {
                    debug!(
                        "LLM call succeeded: input_tokens={}, output_tokens={}",
                        response.usage.input_tokens, response.usage.output_tokens
                    );
                    return Ok(response);
                }
                Attempt::Retry(err) => last_error = Some(err),
            }
        }

        Err(last_error.unwrap_or(LlmError::Exhausted {
            attempts: self.retry.max_attempts,
        }))
    }

    async fn send_once(&self, body: &MessagesRequest<'_>) -> Result<Attempt, LlmError> {
        let response = match self
            .client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(body)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => return Ok(Attempt::Retry(LlmError::Http(e))),
        };

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            let message = response.text().await.unwrap_or_default();
            warn!("LLM API returned {status}: {message}");
            return Ok(Attempt::Retry(LlmError::Api {
                status: status.as_u16(),
                message,
            }));
        }
        if !status.is_success() {
            let raw = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorEnvelope>(&raw)
                .map(|e| e.error.message)
                .unwrap_or(raw);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(Attempt::Done(response.json().await?))
    }

    /// Calls the model and decodes its text output as JSON.
    pub async fn complete_json<T: DeserializeOwned>(
        &self,
        prompt: &str,
        system: &str,
    ) -> Result<T, LlmError> {
        let response = self.complete(prompt, system).await?;
        let text = response.text().ok_or(LlmError::EmptyContent)?;
        serde_json::from_str(extract_json(&text)).map_err(LlmError::Parse)
    }
}

/// Strips code fences and any prose around the outermost JSON object.
fn extract_json(text: &str) -> &str {
    let mut text = text.trim();
    if let Some(rest) = text
        .strip_prefix("```json")
        .or(text.strip_prefix("```"))
    {
        text = rest.trim();
        if let Some(inner) = text.strip_suffix("```") {
            text = inner.trim();
        }
    }
    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => text,
    }
}
