use anyhow::{anyhow, Result};
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use shared::agent_api::{ChatMessage, StreamChunk};
use shared::error::AssistantError;
use shared::settings::{ModelProvider, ProviderAuth};
use std::env;
use std::sync::LazyLock;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

use crate::router::GenerationOptions;

static SHARED_HTTP: LazyLock<Client> = LazyLock::new(|| {
    Client::builder()
        .timeout(Duration::from_secs(120))
        .pool_max_idle_per_host(2)
        .build()
        .unwrap_or_default()
});

pub const OPENAI_BASE_URL: &str = "https://api.openai.com";
pub const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api";

// ── Request types ────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

// ── Non-streaming response types ─────────────────────────────────────

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

// ── Streaming response types ─────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct StreamResponse {
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

// ── Client ───────────────────────────────────────────────────────────

/// Client for any OpenAI-compatible `/v1/chat/completions` endpoint
/// (OpenAI itself, OpenRouter).
pub struct OpenAIClient {
    http: Client,
    auth_token: String,
    model: String,
    base_url: String,
    label: &'static str,
    extra_headers: Vec<(&'static str, String)>,
    options: GenerationOptions,
}

fn resolve_token(auth: &ProviderAuth, env_var: &str, label: &str) -> Result<String> {
    if let Some(api_key) = auth.api_key.as_ref().filter(|k| !k.trim().is_empty()) {
        return Ok(api_key.clone());
    }
    env::var(env_var).map_err(|_| anyhow!("No {} API key configured ({} not set)", label, env_var))
}

impl OpenAIClient {
    pub fn openai(config: &ModelProvider, model: &str, options: GenerationOptions) -> Result<Self> {
        let auth_token = resolve_token(&config.openai_auth, "OPENAI_API_KEY", "OpenAI")?;
        Ok(Self {
            http: SHARED_HTTP.clone(),
            auth_token,
            model: model.to_string(),
            base_url: normalize_base(config.openai_base_url.as_deref(), OPENAI_BASE_URL),
            label: "openai",
            extra_headers: Vec::new(),
            options,
        })
    }

    pub fn openrouter(
        config: &ModelProvider,
        model: &str,
        options: GenerationOptions,
    ) -> Result<Self> {
        let auth_token =
            resolve_token(&config.openrouter_auth, "OPENROUTER_API_KEY", "OpenRouter")?;
        let mut extra_headers = Vec::new();
        if let Some(site) = &config.site_url {
            extra_headers.push(("HTTP-Referer", site.clone()));
        }
        if let Some(title) = &config.site_title {
            extra_headers.push(("X-Title", title.clone()));
        }
        Ok(Self {
            http: SHARED_HTTP.clone(),
            auth_token,
            model: model.to_string(),
            base_url: normalize_base(config.openrouter_base_url.as_deref(), OPENROUTER_BASE_URL),
            label: "openrouter",
            extra_headers,
            options,
        })
    }

    fn request(&self, body: &CompletionRequest<'_>) -> reqwest::RequestBuilder {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let mut req = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.auth_token))
            .header("Content-Type", "application/json");
        for (name, value) in &self.extra_headers {
            req = req.header(*name, value);
        }
        req.json(body)
    }

    pub async fn generate(&self, messages: Vec<ChatMessage>) -> Result<String> {
        let body = CompletionRequest {
            model: &self.model,
            messages: &messages,
            stream: None,
            temperature: self.options.temperature,
            max_tokens: self.options.max_tokens,
        };
        let resp = self.request(&body).send().await?;
        if !resp.status().is_success() {
            return Err(self.http_error(resp).await);
        }
        let body: CompletionResponse = resp.json().await?;
        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| anyhow!("{} returned no completion choices", self.label))
    }

    /// Contract: fails with `Err` only before the first chunk is sent; once
    /// streaming starts, failures arrive as `StreamChunk::Error`.
    pub async fn generate_stream(
        &self,
        messages: Vec<ChatMessage>,
        tx: UnboundedSender<StreamChunk>,
    ) -> Result<()> {
        let body = CompletionRequest {
            model: &self.model,
            messages: &messages,
            stream: Some(true),
            temperature: self.options.temperature,
            max_tokens: self.options.max_tokens,
        };
        let resp = self.request(&body).send().await?;
        if !resp.status().is_success() {
            return Err(self.http_error(resp).await);
        }

        let mut parser = crate::sse::SseParser::new();
        let mut stream = resp.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let bytes = match chunk {
                Ok(bytes) => bytes,
                Err(e) => {
                    let _ = tx.send(StreamChunk::Error(format!("stream read error: {}", e)));
                    return Ok(());
                }
            };
            for event in parser.feed(&bytes) {
                if event.is_done() {
                    let _ = tx.send(StreamChunk::Done { stop_reason: None });
                    return Ok(());
                }
                // Keep-alives and vendor comments are not completion payloads
                let Ok(parsed) = serde_json::from_str::<StreamResponse>(&event.data) else {
                    continue;
                };
                let Some(choice) = parsed.choices.into_iter().next() else {
                    continue;
                };
                if let Some(content) = choice.delta.content.filter(|c| !c.is_empty()) {
                    let _ = tx.send(StreamChunk::Text(content));
                }
                if let Some(reason) = choice.finish_reason {
                    let _ = tx.send(StreamChunk::Done {
                        stop_reason: Some(reason),
                    });
                    return Ok(());
                }
            }
        }

        let _ = tx.send(StreamChunk::Done { stop_reason: None });
        Ok(())
    }

    async fn http_error(&self, resp: reqwest::Response) -> anyhow::Error {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        let detail: String = body.chars().take(800).collect();
        let detail = if detail.trim().is_empty() {
            format!("{} error: {}", self.label, status)
        } else {
            format!("{} error: {}\n{}", self.label, status, detail)
        };
        AssistantError::Upstream {
            status: status.as_u16(),
            detail,
        }
        .into()
    }
}

fn normalize_base(configured: Option<&str>, default: &str) -> String {
    configured
        .filter(|u| !u.trim().is_empty())
        .unwrap_or(default)
        .trim_end_matches('/')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization_skips_unset_options() {
        let messages = vec![ChatMessage::user("hi")];
        let body = CompletionRequest {
            model: "m",
            messages: &messages,
            stream: None,
            temperature: Some(0.2),
            max_tokens: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "m");
        assert_eq!(json["messages"][0]["role"], "user");
        assert!(json.get("stream").is_none());
        assert!(json.get("max_tokens").is_none());
    }

    #[test]
    fn test_openrouter_headers_and_base() {
        let config = ModelProvider {
            openrouter_auth: ProviderAuth {
                api_key: Some("sk-test".into()),
            },
            openrouter_base_url: Some("https://proxy.local/api/".into()),
            site_url: Some("https://folio.example".into()),
            site_title: Some("Folio".into()),
            ..Default::default()
        };
        let client =
            OpenAIClient::openrouter(&config, "some/model", GenerationOptions::default()).unwrap();
        assert_eq!(client.base_url, "https://proxy.local/api");
        assert_eq!(client.extra_headers.len(), 2);
        assert_eq!(client.extra_headers[1], ("X-Title", "Folio".to_string()));
    }

    #[test]
    fn test_stream_payload_decoding() {
        let data = r#"{"choices":[{"delta":{"content":"Hel"},"finish_reason":null}]}"#;
        let parsed: StreamResponse = serde_json::from_str(data).unwrap();
        assert_eq!(parsed.choices[0].delta.content.as_deref(), Some("Hel"));
        assert!(parsed.choices[0].finish_reason.is_none());
    }
}
