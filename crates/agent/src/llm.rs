//! Hosted and local language model clients behind one `complete` call.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use guardian_core::config::{LlmConfig, LlmProvider};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use tracing::{info, warn};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_OUTPUT_TOKENS: u32 = 1024;
const RETRY_BACKOFF_MS: u64 = 250;

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String>;
}

/// Returns `None` when no provider is configured or a hosted provider lacks a key.
pub fn build_llm_client(config: &LlmConfig) -> Option<Arc<dyn LlmClient>> {
    if config.provider == LlmProvider::None {
        info!(event_name = "agent.llm.disabled", "no llm provider configured; keyword routing only");
        return None;
    }

    let has_key =
        config.api_key.as_ref().is_some_and(|key| !key.expose_secret().trim().is_empty());
    if config.provider.requires_api_key() && !has_key {
        warn!(
            event_name = "agent.llm.disabled",
            provider = config.provider.as_str(),
            "llm provider configured without an api key; keyword routing only"
        );
        return None;
    }

    info!(
        event_name = "agent.llm.enabled",
        provider = config.provider.as_str(),
        model = %config.model,
        "llm client configured"
    );
    Some(Arc::new(HttpLlmClient::new(config)))
}

pub fn default_base_url(provider: LlmProvider) -> &'static str {
    match provider {
        LlmProvider::Gemini => "https://generativelanguage.googleapis.com/v1beta",
        LlmProvider::OpenAi => "https://api.openai.com/v1",
        LlmProvider::Anthropic => "https://api.anthropic.com/v1",
        LlmProvider::Ollama | LlmProvider::None => "http://localhost:11434",
    }
}

pub struct HttpLlmClient {
    client: reqwest::Client,
    provider: LlmProvider,
    base_url: String,
    model: String,
    api_key: Option<SecretString>,
    max_retries: u32,
}

impl HttpLlmClient {
    pub fn new(config: &LlmConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| default_base_url(config.provider).to_string());

        Self {
            client,
            provider: config.provider,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            max_retries: config.max_retries,
        }
    }

    fn key(&self) -> &str {
        self.api_key.as_ref().map(|key| key.expose_secret()).unwrap_or_default()
    }

    async fn attempt(&self, system: &str, prompt: &str) -> Result<String> {
        let request = match self.provider {
            LlmProvider::Gemini => self
                .client
                .post(format!("{}/models/{}:generateContent", self.base_url, self.model))
                .query(&[("key", self.key())])
                .json(&json!({
                    "system_instruction": {"parts": [{"text": system}]},
                    "contents": [{"role": "user", "parts": [{"text": prompt}]}],
                    "generationConfig": {"temperature": 0.2, "maxOutputTokens": MAX_OUTPUT_TOKENS}
                })),
            LlmProvider::OpenAi => self
                .client
                .post(format!("{}/chat/completions", self.base_url))
                .bearer_auth(self.key())
                .json(&json!({
                    "model": self.model,
                    "temperature": 0.2,
                    "messages": [
                        {"role": "system", "content": system},
                        {"role": "user", "content": prompt}
                    ]
                })),
            LlmProvider::Anthropic => self
                .client
                .post(format!("{}/messages", self.base_url))
                .header("x-api-key", self.key())
                .header("anthropic-version", ANTHROPIC_VERSION)
                .json(&json!({
                    "model": self.model,
                    "max_tokens": MAX_OUTPUT_TOKENS,
                    "system": system,
                    "messages": [{"role": "user", "content": prompt}]
                })),
            LlmProvider::Ollama => self.client.post(format!("{}/api/chat", self.base_url)).json(
                &json!({
                    "model": self.model,
                    "stream": false,
                    "messages": [
                        {"role": "system", "content": system},
                        {"role": "user", "content": prompt}
                    ]
                }),
            ),
            LlmProvider::None => bail!("llm provider is disabled"),
        };

        let response = request.send().await.context("llm request failed")?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("llm returned status {}: {}", status.as_u16(), body.chars().take(200).collect::<String>());
        }

        let payload: Value = response.json().await.context("llm response was not json")?;
        extract_text(self.provider, &payload)
    }
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String> {
        let mut attempt = 0;
        loop {
            match self.attempt(system, prompt).await {
                Ok(text) => return Ok(text),
                Err(error) if attempt < self.max_retries => {
                    attempt += 1;
                    warn!(
                        event_name = "agent.llm.retry",
                        provider = self.provider.as_str(),
                        attempt,
                        error = %error,
                        "llm call failed; retrying"
                    );
                    tokio::time::sleep(Duration::from_millis(RETRY_BACKOFF_MS * u64::from(attempt)))
                        .await;
                }
                Err(error) => return Err(error),
            }
        }
    }
}

fn extract_text(provider: LlmProvider, payload: &Value) -> Result<String> {
    let text = match provider {
        LlmProvider::Gemini => payload["candidates"][0]["content"]["parts"][0]["text"].as_str(),
        LlmProvider::OpenAi => payload["choices"][0]["message"]["content"].as_str(),
        LlmProvider::Anthropic => payload["content"][0]["text"].as_str(),
        LlmProvider::Ollama => payload["message"]["content"].as_str(),
        LlmProvider::None => None,
    };
    text.map(str::to_string)
        .ok_or_else(|| anyhow!("{} response carried no text", provider.as_str()))
}

#[cfg(test)]
mod tests {
    use guardian_core::config::{LlmConfig, LlmProvider};
    use secrecy::SecretString;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::{build_llm_client, HttpLlmClient, LlmClient};

    fn config(provider: LlmProvider, base_url: Option<String>, key: Option<&str>) -> LlmConfig {
        LlmConfig {
            provider,
            api_key: key.map(SecretString::from),
            base_url,
            model: "test-model".to_string(),
            timeout_secs: 2,
            max_retries: 1,
        }
    }

    #[test]
    fn hosted_provider_without_key_disables_llm() {
        assert!(build_llm_client(&config(LlmProvider::None, None, None)).is_none());
        assert!(build_llm_client(&config(LlmProvider::Gemini, None, None)).is_none());
        assert!(build_llm_client(&config(LlmProvider::Anthropic, None, Some("  "))).is_none());
        assert!(build_llm_client(&config(LlmProvider::Ollama, None, None)).is_some());
    }

    #[tokio::test]
    async fn gemini_sends_key_and_reads_first_candidate() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/test-model:generateContent"))
            .and(query_param("key", "gem-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{"content": {"parts": [{"text": "ops"}]}}]
            })))
            .mount(&server)
            .await;

        let client =
            HttpLlmClient::new(&config(LlmProvider::Gemini, Some(server.uri()), Some("gem-key")));
        assert_eq!(client.complete("route", "stock levels").await.expect("completion"), "ops");
    }

    #[tokio::test]
    async fn anthropic_uses_version_header() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages"))
            .and(header("x-api-key", "ant-key"))
            .and(header("anthropic-version", "2023-06-01"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": [{"type": "text", "text": "{\"answer\": \"done\"}"}]
            })))
            .mount(&server)
            .await;

        let client =
            HttpLlmClient::new(&config(LlmProvider::Anthropic, Some(server.uri()), Some("ant-key")));
        let text = client.complete("system", "prompt").await.expect("completion");
        assert_eq!(text, "{\"answer\": \"done\"}");
    }

    #[tokio::test]
    async fn failures_are_retried_then_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
            .expect(2)
            .mount(&server)
            .await;

        let client =
            HttpLlmClient::new(&config(LlmProvider::OpenAi, Some(server.uri()), Some("oa-key")));
        let error = client.complete("system", "prompt").await.expect_err("500 twice");
        assert!(error.to_string().contains("500"));
    }
}
