//! LLM completion providers
//!
//! Three backends share the [`CompletionProvider`] capability:
//! - [`AzureOpenAiProvider`]: primary, quota-limited deployment
//! - [`OpenRouterProvider`]: hosted fallback
//! - [`OllamaProvider`]: local fallback
//!
//! Every provider validates the response shape and reports quota exhaustion as
//! [`LlmError::RateLimited`] so the summary engine can fall through.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, warn};

use super::prompts::BlogPrompt;
use super::rate_limiter::ProviderLimiter;

const AZURE_API_VERSION: &str = "2024-12-01-preview";
const AZURE_MAX_COMPLETION_TOKENS: u32 = 10_000;
const OPENROUTER_API_URL: &str = "https://openrouter.ai/api/v1";
const OPENROUTER_TITLE: &str = "Blog Automator Wizard";
const DEFAULT_APP_URL: &str = "http://localhost:3005";
const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

pub const DEFAULT_OPENROUTER_MODEL: &str = "mistralai/mixtral-8x7b-instruct";
pub const DEFAULT_OLLAMA_MODEL: &str = "llama3";

/// Completions can take minutes for long transcripts
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("{0} credentials not configured")]
    NotConfigured(&'static str),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response structure from {0}")]
    InvalidResponse(String),
}

impl LlmError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, LlmError::RateLimited(_))
    }

    /// Classify a failed HTTP exchange
    ///
    /// Status 429, or a message mentioning "429" / "exceeded call rate limit",
    /// is a quota signal; everything else is a plain API error.
    pub fn from_status(status: u16, message: String) -> Self {
        let lower = message.to_lowercase();
        if status == 429 || lower.contains("429") || lower.contains("exceeded call rate limit") {
            LlmError::RateLimited(message)
        } else {
            LlmError::Api { status, message }
        }
    }
}

/// Capability shared by all summary backends
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Display name used in logs and responses
    fn name(&self) -> &str;

    /// Produce completion text for `prompt`
    async fn complete(&self, prompt: &BlogPrompt) -> Result<String, LlmError>;
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

/// Extract `choices[0].message.content`
fn chat_content(body: &str, provider: &str) -> Result<String, LlmError> {
    let parsed: ChatCompletionResponse = serde_json::from_str(body)
        .map_err(|_| LlmError::InvalidResponse(provider.to_string()))?;

    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message)
        .and_then(|message| message.content)
        .ok_or_else(|| LlmError::InvalidResponse(provider.to_string()))
}

/// Best-effort `error.message` from an error body, else the raw body
fn error_message(body: &str, fallback: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                fallback.to_string()
            } else {
                body.to_string()
            }
        })
}

fn build_http_client() -> Result<reqwest::Client, LlmError> {
    reqwest::Client::builder()
        .user_agent(ytblog_common::config::get_user_agent())
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| LlmError::Network(e.to_string()))
}

/// Send a JSON request and return the body of a 2xx response
async fn send_json(request: reqwest::RequestBuilder, body: serde_json::Value) -> Result<String, LlmError> {
    let response = request
        .json(&body)
        .send()
        .await
        .map_err(|e| LlmError::Network(e.to_string()))?;

    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| LlmError::Network(e.to_string()))?;

    if !status.is_success() {
        let reason = status.canonical_reason().unwrap_or("request failed");
        return Err(LlmError::from_status(status.as_u16(), error_message(&text, reason)));
    }
    Ok(text)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Azure OpenAI chat deployment
pub struct AzureOpenAiProvider {
    http_client: reqwest::Client,
    api_key: Option<String>,
    endpoint: Option<String>,
    deployment: Option<String>,
}

impl AzureOpenAiProvider {
    pub fn new(
        api_key: Option<String>,
        endpoint: Option<String>,
        deployment: Option<String>,
    ) -> Result<Self, LlmError> {
        Ok(Self {
            http_client: build_http_client()?,
            api_key: non_empty(api_key),
            endpoint: non_empty(endpoint),
            deployment: non_empty(deployment),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some() && self.endpoint.is_some() && self.deployment.is_some()
    }
}

#[async_trait]
impl CompletionProvider for AzureOpenAiProvider {
    fn name(&self) -> &str {
        "Azure OpenAI"
    }

    async fn complete(&self, prompt: &BlogPrompt) -> Result<String, LlmError> {
        let (Some(api_key), Some(endpoint), Some(deployment)) =
            (&self.api_key, &self.endpoint, &self.deployment)
        else {
            return Err(LlmError::NotConfigured("Azure OpenAI"));
        };

        let url = format!(
            "{}/openai/deployments/{}/chat/completions",
            endpoint.trim_end_matches('/'),
            deployment
        );
        debug!(deployment = %deployment, "Sending request to Azure OpenAI");

        let body = json!({
            "messages": [
                { "role": "system", "content": prompt.system },
                { "role": "user", "content": prompt.user },
            ],
            "max_completion_tokens": AZURE_MAX_COMPLETION_TOKENS,
        });

        let request = self
            .http_client
            .post(&url)
            .query(&[("api-version", AZURE_API_VERSION)])
            .header("api-key", api_key);

        let text = send_json(request, body).await?;
        chat_content(&text, self.name())
    }
}

/// OpenRouter chat completions
pub struct OpenRouterProvider {
    http_client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    app_url: String,
}

impl OpenRouterProvider {
    pub fn new(api_key: Option<String>, model: Option<String>, app_url: Option<String>) -> Result<Self, LlmError> {
        Self::with_base_url(OPENROUTER_API_URL, api_key, model, app_url)
    }

    pub fn with_base_url(
        base_url: impl Into<String>,
        api_key: Option<String>,
        model: Option<String>,
        app_url: Option<String>,
    ) -> Result<Self, LlmError> {
        Ok(Self {
            http_client: build_http_client()?,
            base_url: base_url.into(),
            api_key: non_empty(api_key),
            model: non_empty(model).unwrap_or_else(|| DEFAULT_OPENROUTER_MODEL.to_string()),
            app_url: non_empty(app_url).unwrap_or_else(|| DEFAULT_APP_URL.to_string()),
        })
    }
}

#[async_trait]
impl CompletionProvider for OpenRouterProvider {
    fn name(&self) -> &str {
        "OpenRouter"
    }

    async fn complete(&self, prompt: &BlogPrompt) -> Result<String, LlmError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(LlmError::NotConfigured("OpenRouter"))?;

        debug!(model = %self.model, "Sending request to OpenRouter");

        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": prompt.system },
                { "role": "user", "content": prompt.user },
            ],
        });

        let request = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .header("HTTP-Referer", &self.app_url)
            .header("X-Title", OPENROUTER_TITLE);

        let text = send_json(request, body).await?;
        chat_content(&text, self.name())
    }
}

#[derive(Debug, Deserialize)]
struct OllamaGenerateResponse {
    response: Option<String>,
}

/// Local Ollama server (`/api/generate`, non-streaming)
pub struct OllamaProvider {
    http_client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaProvider {
    pub fn new(base_url: Option<String>, model: Option<String>) -> Result<Self, LlmError> {
        Ok(Self {
            http_client: build_http_client()?,
            base_url: non_empty(base_url)
                .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            model: non_empty(model).unwrap_or_else(|| DEFAULT_OLLAMA_MODEL.to_string()),
        })
    }
}

#[async_trait]
impl CompletionProvider for OllamaProvider {
    fn name(&self) -> &str {
        "Ollama"
    }

    async fn complete(&self, prompt: &BlogPrompt) -> Result<String, LlmError> {
        debug!(model = %self.model, base_url = %self.base_url, "Sending request to Ollama");

        let body = json!({
            "model": self.model,
            "prompt": prompt.flattened(),
            "stream": false,
        });

        let request = self.http_client.post(format!("{}/api/generate", self.base_url));
        let text = send_json(request, body).await?;

        serde_json::from_str::<OllamaGenerateResponse>(&text)
            .ok()
            .and_then(|r| r.response)
            .ok_or_else(|| LlmError::InvalidResponse(self.name().to_string()))
    }
}

/// Provider whose calls go through a [`ProviderLimiter`]
pub struct RateLimitedProvider<P> {
    inner: P,
    limiter: ProviderLimiter,
}

impl<P: CompletionProvider> RateLimitedProvider<P> {
    pub fn new(inner: P, limiter: ProviderLimiter) -> Self {
        Self { inner, limiter }
    }
}

#[async_trait]
impl<P: CompletionProvider> CompletionProvider for RateLimitedProvider<P> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn complete(&self, prompt: &BlogPrompt) -> Result<String, LlmError> {
        let result = self.limiter.schedule(self.inner.complete(prompt)).await;
        if let Err(e) = &result {
            if e.is_rate_limited() {
                warn!(provider = self.inner.name(), "Provider reported rate limit");
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::prompts::general_blog_prompt;
    use crate::services::rate_limiter::LimiterSettings;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[test]
    fn test_rate_limit_classification() {
        assert!(LlmError::from_status(429, "Too Many Requests".into()).is_rate_limited());
        assert!(LlmError::from_status(400, "Requests have exceeded call rate limit".into()).is_rate_limited());
        assert!(LlmError::from_status(500, "upstream said 429".into()).is_rate_limited());
        assert!(!LlmError::from_status(401, "bad key".into()).is_rate_limited());
        assert!(!LlmError::Network("timeout".into()).is_rate_limited());
    }

    #[test]
    fn test_chat_content_requires_message_content() {
        let ok = r##"{"choices":[{"message":{"role":"assistant","content":"# Blog"}}]}"##;
        assert_eq!(chat_content(ok, "x").unwrap(), "# Blog");

        for bad in [r#"{"choices":[]}"#, r#"{"choices":[{}]}"#, r#"{"choices":[{"message":{}}]}"#, "{}", "nope"] {
            assert!(
                matches!(chat_content(bad, "x"), Err(LlmError::InvalidResponse(_))),
                "expected invalid response for {}",
                bad
            );
        }
    }

    #[test]
    fn test_error_message_prefers_error_field() {
        assert_eq!(error_message(r#"{"error":{"message":"quota"}}"#, "x"), "quota");
        assert_eq!(error_message("plain", "x"), "plain");
        assert_eq!(error_message("", "Bad Gateway"), "Bad Gateway");
    }

    #[tokio::test]
    async fn test_unconfigured_providers_report_not_configured() {
        let prompt = general_blog_prompt("t");

        let azure = AzureOpenAiProvider::new(Some("key".into()), None, Some("gpt".into())).unwrap();
        assert!(!azure.is_configured());
        assert!(matches!(azure.complete(&prompt).await, Err(LlmError::NotConfigured(_))));

        let openrouter = OpenRouterProvider::new(Some("  ".into()), None, None).unwrap();
        assert!(matches!(openrouter.complete(&prompt).await, Err(LlmError::NotConfigured(_))));
    }

    #[tokio::test]
    async fn test_openrouter_429_is_rate_limited() {
        let router = Router::new().route(
            "/chat/completions",
            post(|| async {
                (
                    StatusCode::TOO_MANY_REQUESTS,
                    Json(json!({ "error": { "message": "slow down" } })),
                )
            }),
        );
        let base = serve(router).await;

        let provider = OpenRouterProvider::with_base_url(base, Some("k".into()), None, None).unwrap();
        let err = provider.complete(&general_blog_prompt("t")).await.unwrap_err();

        assert!(err.is_rate_limited());
        assert!(err.to_string().contains("slow down"));
    }

    #[tokio::test]
    async fn test_openrouter_sends_attribution_headers() {
        let router = Router::new().route(
            "/chat/completions",
            post(|headers: axum::http::HeaderMap| async move {
                let referer = headers["http-referer"].to_str().unwrap().to_string();
                let title = headers["x-title"].to_str().unwrap().to_string();
                Json(json!({ "choices": [{ "message": { "content": format!("{}|{}", referer, title) } }] }))
            }),
        );
        let base = serve(router).await;

        let provider = OpenRouterProvider::with_base_url(base, Some("k".into()), None, None).unwrap();
        let text = provider.complete(&general_blog_prompt("t")).await.unwrap();

        assert_eq!(text, "http://localhost:3005|Blog Automator Wizard");
    }

    #[tokio::test]
    async fn test_ollama_reads_response_field() {
        let router = Router::new().route(
            "/api/generate",
            post(|Json(body): Json<serde_json::Value>| async move {
                assert_eq!(body["stream"], false);
                assert_eq!(body["model"], DEFAULT_OLLAMA_MODEL);
                Json(json!({ "response": "local summary", "done": true }))
            }),
        );
        let base = serve(router).await;

        let provider = OllamaProvider::new(Some(format!("{}/", base)), None).unwrap();
        assert_eq!(provider.complete(&general_blog_prompt("t")).await.unwrap(), "local summary");
    }

    #[tokio::test]
    async fn test_ollama_missing_response_is_invalid() {
        let router = Router::new().route("/api/generate", post(|| async { Json(json!({ "done": true })) }));
        let base = serve(router).await;

        let provider = OllamaProvider::new(Some(base), None).unwrap();
        assert!(matches!(
            provider.complete(&general_blog_prompt("t")).await,
            Err(LlmError::InvalidResponse(_))
        ));
    }

    /// Records when each call reached the wrapped provider
    #[derive(Default)]
    struct StampingProvider {
        calls: std::sync::Mutex<Vec<std::time::Instant>>,
    }

    #[async_trait]
    impl CompletionProvider for StampingProvider {
        fn name(&self) -> &str {
            "stamping"
        }

        async fn complete(&self, _prompt: &BlogPrompt) -> Result<String, LlmError> {
            self.calls.lock().unwrap().push(std::time::Instant::now());
            Ok("ok".to_string())
        }
    }

    #[tokio::test]
    async fn test_rate_limited_provider_spaces_calls() {
        let provider = RateLimitedProvider::new(
            StampingProvider::default(),
            ProviderLimiter::new(&LimiterSettings {
                min_spacing: Some(Duration::from_millis(200)),
                reservoir: None,
                max_concurrent: 1,
            }),
        );
        let prompt = general_blog_prompt("t");

        assert_eq!(provider.complete(&prompt).await.unwrap(), "ok");
        assert_eq!(provider.complete(&prompt).await.unwrap(), "ok");

        let calls = provider.inner.calls.lock().unwrap().clone();
        assert_eq!(calls.len(), 2);
        let gap = calls[1] - calls[0];
        assert!(gap >= Duration::from_millis(150), "second call ran after {:?}", gap);
        assert_eq!(provider.name(), "stamping");
    }
}
