use anyhow::{anyhow, Result};
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use shared::agent_api::{ChatMessage, StreamChunk};
use shared::error::AssistantError;
use std::env;
use std::sync::LazyLock;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

use crate::router::GenerationOptions;
use crate::sse::LineBuffer;

static SHARED_HTTP: LazyLock<Client> = LazyLock::new(|| {
    Client::builder()
        .timeout(Duration::from_secs(120))
        .pool_max_idle_per_host(2)
        .build()
        .unwrap_or_default()
});

#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: OllamaMessage,
}

/// Streaming response: each line is one of these JSON objects.
#[derive(Debug, Deserialize)]
struct OllamaStreamLine {
    message: Option<OllamaMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    done_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OllamaMessage {
    content: String,
}

/// Local model served by Ollama
pub struct OllamaClient {
    http: Client,
    base: String,
    model: String,
    options: GenerationOptions,
}

impl OllamaClient {
    pub fn new(model: String, options: GenerationOptions) -> Self {
        let base =
            env::var("OLLAMA_BASE_URL").unwrap_or_else(|_| "http://127.0.0.1:11434".to_string());
        Self {
            http: SHARED_HTTP.clone(),
            base,
            model,
            options,
        }
    }

    fn request_options(&self) -> Option<OllamaOptions> {
        if self.options.temperature.is_none() && self.options.max_tokens.is_none() {
            return None;
        }
        Some(OllamaOptions {
            temperature: self.options.temperature,
            num_predict: self.options.max_tokens,
        })
    }

    pub async fn generate(&self, messages: Vec<ChatMessage>) -> Result<String> {
        let url = format!("{}/api/chat", self.base);
        let req = OllamaChatRequest {
            model: &self.model,
            messages: &messages,
            stream: false,
            options: self.request_options(),
        };
        let resp = self.http.post(url).json(&req).send().await?;
        if !resp.status().is_success() {
            return Err(AssistantError::Upstream {
                status: resp.status().as_u16(),
                detail: format!("ollama error: {}", resp.status()),
            }
            .into());
        }
        let body: OllamaChatResponse = resp.json().await?;
        Ok(body.message.content)
    }

    pub async fn generate_stream(
        &self,
        messages: Vec<ChatMessage>,
        tx: UnboundedSender<StreamChunk>,
    ) -> Result<()> {
        let url = format!("{}/api/chat", self.base);
        let req = OllamaChatRequest {
            model: &self.model,
            messages: &messages,
            stream: true,
            options: self.request_options(),
        };
        let resp = self.http.post(url).json(&req).send().await?;
        if !resp.status().is_success() {
            return Err(AssistantError::Upstream {
                status: resp.status().as_u16(),
                detail: format!("ollama error: {}", resp.status()),
            }
            .into());
        }

        // Ollama streams line-delimited JSON
        let mut stream = resp.bytes_stream();
        let mut lines = LineBuffer::new();

        while let Some(chunk) = stream.next().await {
            let bytes = chunk.map_err(|e| anyhow!("stream read error: {}", e))?;
            lines.push(&bytes);

            while let Some(line) = lines.next_line() {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                match serde_json::from_str::<OllamaStreamLine>(line) {
                    Ok(parsed) => {
                        if let Some(msg) = parsed.message.filter(|m| !m.content.is_empty()) {
                            let _ = tx.send(StreamChunk::Text(msg.content));
                        }
                        if parsed.done {
                            let _ = tx.send(StreamChunk::Done {
                                stop_reason: parsed.done_reason,
                            });
                            return Ok(());
                        }
                    }
                    Err(e) => {
                        let _ = tx.send(StreamChunk::Error(format!(
                            "Failed to parse Ollama stream: {}",
                            e
                        )));
                        return Ok(());
                    }
                }
            }
        }

        let _ = tx.send(StreamChunk::Done { stop_reason: None });
        Ok(())
    }
}
