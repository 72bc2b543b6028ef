use crate::ollama::OllamaClient;
use crate::openai::OpenAIClient;
use anyhow::{anyhow, Result};
use shared::agent_api::{ChatMessage, StreamChunk};
use shared::settings::ModelProvider;
use tokio::sync::mpsc::UnboundedSender;

/// Sampling knobs forwarded to whichever provider answers
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GenerationOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

/// Which cloud model to ask, and how
#[derive(Debug, Clone, PartialEq)]
pub struct ModelProfile {
    pub model: String,
    pub options: GenerationOptions,
}

impl ModelProfile {
    /// Conversational answers: deterministic sampling
    pub fn chat(config: &ModelProvider) -> Self {
        Self {
            model: config.chat_model.clone(),
            options: GenerationOptions {
                temperature: Some(config.chat_temperature),
                max_tokens: None,
            },
        }
    }

    /// Theme directives: dedicated model with a bounded reply
    pub fn theme(config: &ModelProvider) -> Self {
        Self {
            model: config.theme_model.clone(),
            options: GenerationOptions {
                temperature: Some(config.theme_temperature),
                max_tokens: Some(config.theme_max_tokens),
            },
        }
    }
}

enum Provider {
    OpenRouter(OpenAIClient),
    OpenAI(OpenAIClient),
    Local(OllamaClient),
}

impl Provider {
    async fn generate(&self, messages: Vec<ChatMessage>) -> Result<String> {
        match self {
            Provider::OpenRouter(c) | Provider::OpenAI(c) => c.generate(messages).await,
            Provider::Local(c) => c.generate(messages).await,
        }
    }

    async fn generate_stream(
        &self,
        messages: Vec<ChatMessage>,
        tx: UnboundedSender<StreamChunk>,
    ) -> Result<()> {
        match self {
            Provider::OpenRouter(c) | Provider::OpenAI(c) => c.generate_stream(messages, tx).await,
            Provider::Local(c) => c.generate_stream(messages, tx).await,
        }
    }
}

pub struct ProviderRouter {
    config: ModelProvider,
    profile: ModelProfile,
}

impl ProviderRouter {
    pub fn new(config: ModelProvider, profile: ModelProfile) -> Self {
        Self { config, profile }
    }

    /// Returns the name of the first configured provider.
    pub fn active_provider(&self) -> Option<&str> {
        self.config.provider_preference.first().map(|s| s.as_str())
    }

    fn build(&self, name: &str) -> Result<Provider> {
        let opts = self.profile.options;
        match name {
            "openrouter" => Ok(Provider::OpenRouter(OpenAIClient::openrouter(
                &self.config,
                &self.profile.model,
                opts,
            )?)),
            "openai" => Ok(Provider::OpenAI(OpenAIClient::openai(
                &self.config,
                &self.profile.model,
                opts,
            )?)),
            "local" => Ok(Provider::Local(OllamaClient::new(
                self.config.local_model.clone(),
                opts,
            ))),
            other => Err(anyhow!("Unknown provider: {}", other)),
        }
    }

    pub async fn generate(&self, messages: Vec<ChatMessage>) -> Result<String> {
        let mut last_error = None;

        // Try providers in order of preference, falling back on failure
        for name in self.config.provider_preference.iter() {
            let result = match self.build(name) {
                Ok(provider) => provider.generate(messages.clone()).await,
                Err(e) => Err(e),
            };

            match result {
                Ok(response) => return Ok(response),
                Err(e) => {
                    tracing::warn!(provider = %name, error = %e, "provider failed, trying next");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow!("No providers configured")))
    }

    /// Streaming generation with provider fallback.
    ///
    /// Fallback only happens while no chunk has been sent; once a provider
    /// starts streaming, its failures arrive as `StreamChunk::Error`.
    pub async fn generate_stream(
        &self,
        messages: Vec<ChatMessage>,
        tx: UnboundedSender<StreamChunk>,
    ) -> Result<()> {
        let mut last_error = None;

        for name in self.config.provider_preference.iter() {
            let result = match self.build(name) {
                Ok(provider) => provider.generate_stream(messages.clone(), tx.clone()).await,
                Err(e) => Err(e),
            };

            match result {
                Ok(()) => return Ok(()),
                Err(e) => {
                    tracing::warn!(provider = %name, error = %e, "provider stream failed, trying next");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow!("No providers configured")))
    }
}
