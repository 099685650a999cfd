//! LLM client: the single point of entry for all Claude API calls in Joba.
//!
//! ARCHITECTURAL RULE: No other module may call the Anthropic API directly.
//! Resume extraction, resume scoring, cover-letter writing and keyword
//! generation all go through this module.
use std::time::{Duration, Instant};

use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

pub mod prompts;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
/// The model used for all LLM calls. Hardcoded to prevent drift.
pub const MODEL: &str = "claude-3-7-sonnet-20250219";
const MAX_TOKENS: u32 = 4000;
const MAX_ATTEMPTS: u32 = 3;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Still rate limited after {attempts} attempts")]
    RateLimited { attempts: u32 },

    #[error("LLM returned empty content")]
    EmptyContent,

    #[error("LLM response contained no JSON object")]
    NoJson,
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "str::is_empty")]
    system: &'a str,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
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
    /// Extracts the text content from the first non-empty text block.
    pub fn text(&self) -> Option<&str> {
        self.content
            .iter()
            .filter(|b| b.block_type == "text")
            .filter_map(|b| b.text.as_deref())
            .find(|t| !t.trim().is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: AnthropicErrorBody,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorBody {
    message: String,
}

/// How often and how patiently a failed call is retried.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles for each further attempt.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Delay before attempt number `attempt` (0-based); the first attempt is immediate.
    fn delay_before(&self, attempt: u32) -> Duration {
        match attempt {
            0 => Duration::ZERO,
            n => self.base_delay * (1 << (n - 1).min(16)),
        }
    }
}

/// Outcome of a single HTTP round trip.
enum Attempt {
    Done(LlmResponse),
    /// 429, 5xx or a transport failure.
    Retryable(LlmError),
    Fatal(LlmError),
}

/// The single LLM client used by all services in Joba.
/// Wraps the Anthropic Messages API with retry logic and structured output helpers.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
    endpoint: String,
    retry: RetryPolicy,
}

impl LlmClient {
    pub fn new(api_key: String) -> Result<Self, LlmError> {
        Self::with_endpoint(api_key, ANTHROPIC_API_URL.to_string(), RetryPolicy::default())
    }

    /// Client for an arbitrary Messages-compatible endpoint.
    pub fn with_endpoint(
        api_key: String,
        endpoint: String,
        retry: RetryPolicy,
    ) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .pool_max_idle_per_host(5)
            .build()?;
        Ok(Self {
            client,
            api_key,
            endpoint,
            retry,
        })
    }

    /// Makes a raw call to the Claude API, returning the full response object.
    /// 429, 5xx and transport errors are retried with exponential backoff;
    /// any other non-2xx status fails at once.
    pub async fn call(&self, prompt: &str, system: &str) -> Result<LlmResponse, LlmError> {
        let body = AnthropicRequest {
            model: MODEL,
            max_tokens: MAX_TOKENS,
            system,
            messages: vec![AnthropicMessage {
                role: "user",
                content: prompt,
            }],
        };

        let started = Instant::now();
        let mut last_error = None;

        for attempt in 0..self.retry.max_attempts {
            let delay = self.retry.delay_before(attempt);
            if !delay.is_zero() {
                warn!(attempt, delay_ms = delay.as_millis() as u64, "Retrying LLM call");
                tokio::time::sleep(delay).await;
            }

            match self.attempt(&body).await {
                Attempt::Done(response) => {
                    info!(
                        elapsed_s = started.elapsed().as_secs_f64(),
                        attempts = attempt + 1,
                        prompt_chars = prompt.len(),
                        input_tokens = response.usage.input_tokens,
                        output_tokens = response.usage.output_tokens,
                        "LLM call completed"
                    );
                    return Ok(response);
                }
                Attempt::Fatal(e) => return Err(e),
                Attempt::Retryable(e) => {
                    warn!("LLM call attempt {} failed: {e}", attempt + 1);
                    last_error = Some(e);
                }
            }
        }

        Err(match last_error {
            Some(LlmError::Api { status: 429, .. }) | None => LlmError::RateLimited {
                attempts: self.retry.max_attempts,
            },
            Some(e) => e,
        })
    }

    async fn attempt(&self, body: &AnthropicRequest<'_>) -> Attempt {
        let sent = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(body)
            .send()
            .await;
        let response = match sent {
            Ok(r) => r,
            Err(e) => return Attempt::Retryable(LlmError::Http(e)),
        };

        let status = response.status();
        if status.is_success() {
            return match response.json::<LlmResponse>().await {
                Ok(parsed) => Attempt::Done(parsed),
                Err(e) => Attempt::Fatal(LlmError::Http(e)),
            };
        }

        let raw = response.text().await.unwrap_or_default();
        let error = LlmError::Api {
            status: status.as_u16(),
            message: serde_json::from_str::<AnthropicError>(&raw)
                .map(|e| e.error.message)
                .unwrap_or(raw),
        };
        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            Attempt::Retryable(error)
        } else {
            Attempt::Fatal(error)
        }
    }

    /// Calls the LLM and returns the trimmed text of the reply.
    pub async fn call_text(&self, prompt: &str, system: &str) -> Result<String, LlmError> {
        let response = self.call(prompt, system).await?;
        response
            .text()
            .map(|t| t.trim().to_string())
            .ok_or(LlmError::EmptyContent)
    }

    /// Calls the LLM and deserializes the JSON object found in its reply.
    /// The prompt must instruct the model to return a JSON object.
    pub async fn call_json<T: DeserializeOwned>(
        &self,
        prompt: &str,
        system: &str,
    ) -> Result<T, LlmError> {
        let response = self.call(prompt, system).await?;
        let text = response.text().ok_or(LlmError::EmptyContent)?;
        parse_json_reply(text)
    }
}

/// Parses the JSON object embedded in a model reply. Accepts fenced blocks and
/// prose around the object; retries once with control characters removed.
pub fn parse_json_reply<T: DeserializeOwned>(text: &str) -> Result<T, LlmError> {
    let candidate = extract_json_object(text).ok_or(LlmError::NoJson)?;
    match serde_json::from_str(candidate) {
        Ok(value) => Ok(value),
        Err(first_err) => {
            let cleaned = strip_control_chars(candidate);
            if cleaned.len() == candidate.len() {
                return Err(LlmError::Parse(first_err));
            }
            debug!("Retrying JSON parse after removing control characters");
            serde_json::from_str(&cleaned).map_err(LlmError::Parse)
        }
    }
}

/// Returns the slice from the first `{` to the last `}` after removing code fences.
fn extract_json_object(text: &str) -> Option<&str> {
    let text = strip_json_fences(text);
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

fn strip_control_chars(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_control() || matches!(c, '\n' | '\r' | '\t'))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_strip_json_fences_with_json_tag() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_without_tag() {
        let input = "```\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_no_fences() {
        let input = "{\"key\": \"value\"}";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_parse_json_reply_ignores_surrounding_prose() {
        let reply = "Here is the analysis you asked for:\n{\"score\": 42}\nLet me know!";
        let value: Value = parse_json_reply(reply).unwrap();
        assert_eq!(value["score"], 42);
    }

    #[test]
    fn test_parse_json_reply_keeps_nested_objects() {
        let reply = "```json\n{\"outer\": {\"inner\": [1, 2]}}\n```";
        let value: Value = parse_json_reply(reply).unwrap();
        assert_eq!(value["outer"]["inner"][1], 2);
    }

    #[test]
    fn test_parse_json_reply_recovers_from_control_characters() {
        let reply = "{\"name\": \"Ada\u{0007} Lovelace\"}";
        let value: Value = parse_json_reply(reply).unwrap();
        assert_eq!(value["name"], "Ada Lovelace");
    }

    #[test]
    fn test_parse_json_reply_without_object_is_no_json() {
        let err = parse_json_reply::<Value>("I cannot help with that.").unwrap_err();
        assert!(matches!(err, LlmError::NoJson));
    }

    #[test]
    fn test_parse_json_reply_invalid_json_is_parse_error() {
        let err = parse_json_reply::<Value>("{not json}").unwrap_err();
        assert!(matches!(err, LlmError::Parse(_)));
    }

    #[test]
    fn test_response_text_skips_empty_blocks() {
        let response: LlmResponse = serde_json::from_str(
            r#"{
                "content": [
                    {"type": "text", "text": "   "},
                    {"type": "text", "text": "Dear hiring manager"}
                ],
                "usage": {"input_tokens": 10, "output_tokens": 4}
            }"#,
        )
        .unwrap();
        assert_eq!(response.text(), Some("Dear hiring manager"));
    }

    #[test]
    fn test_backoff_doubles_after_immediate_first_attempt() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_before(0), Duration::ZERO);
        assert_eq!(policy.delay_before(1), Duration::from_secs(1));
        assert_eq!(policy.delay_before(2), Duration::from_secs(2));
        assert_eq!(policy.delay_before(3), Duration::from_secs(4));
    }

    #[test]
    fn test_empty_system_prompt_is_omitted() {
        let body = AnthropicRequest {
            model: MODEL,
            max_tokens: MAX_TOKENS,
            system: "",
            messages: vec![AnthropicMessage {
                role: "user",
                content: "hi",
            }],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("system").is_none());
        assert_eq!(json["max_tokens"], 4000);
    }

    mod retries {
        use std::time::Duration;

        use serde_json::json;
        use wiremock::matchers::{header, method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        use super::*;

        fn client(server: &MockServer) -> LlmClient {
            LlmClient::with_endpoint(
                "sk-ant-test".to_string(),
                format!("{}/v1/messages", server.uri()),
                RetryPolicy {
                    max_attempts: 3,
                    base_delay: Duration::from_millis(1),
                },
            )
            .unwrap()
        }

        fn reply(text: &str) -> ResponseTemplate {
            ResponseTemplate::new(200).set_body_json(json!({
                "content": [{"type": "text", "text": text}],
                "usage": {"input_tokens": 12, "output_tokens": 3}
            }))
        }

        #[tokio::test]
        async fn test_rate_limit_is_retried_until_success() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/v1/messages"))
                .respond_with(ResponseTemplate::new(429))
                .up_to_n_times(1)
                .expect(1)
                .mount(&server)
                .await;
            Mock::given(method("POST"))
                .and(path("/v1/messages"))
                .and(header("x-api-key", "sk-ant-test"))
                .and(header("anthropic-version", ANTHROPIC_VERSION))
                .respond_with(reply("Dear hiring manager"))
                .expect(1)
                .mount(&server)
                .await;

            let text = client(&server).call_text("write", "").await.unwrap();
            assert_eq!(text, "Dear hiring manager");
        }

        #[tokio::test]
        async fn test_client_error_fails_without_retry() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                    "type": "error",
                    "error": {"type": "invalid_request_error", "message": "max_tokens too large"}
                })))
                .expect(1)
                .mount(&server)
                .await;

            let err = client(&server).call("write", "").await.unwrap_err();
            match err {
                LlmError::Api { status, message } => {
                    assert_eq!(status, 400);
                    assert_eq!(message, "max_tokens too large");
                }
                other => panic!("unexpected error: {other}"),
            }
        }

        #[tokio::test]
        async fn test_server_errors_stop_after_max_attempts() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
                .expect(3)
                .mount(&server)
                .await;

            let err = client(&server).call("write", "").await.unwrap_err();
            assert!(matches!(err, LlmError::Api { status: 503, .. }), "got: {err}");
        }

        #[tokio::test]
        async fn test_persistent_rate_limit_reports_rate_limited() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .respond_with(ResponseTemplate::new(429))
                .expect(3)
                .mount(&server)
                .await;

            let err = client(&server).call("write", "").await.unwrap_err();
            assert!(matches!(err, LlmError::RateLimited { attempts: 3 }), "got: {err}");
        }

        #[tokio::test]
        async fn test_call_json_parses_fenced_reply() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .respond_with(reply("```json\n{\"query\": \"Rust\"}\n```"))
                .mount(&server)
                .await;

            let value: serde_json::Value = client(&server).call_json("keywords", "").await.unwrap();
            assert_eq!(value["query"], "Rust");
        }
    }
}
