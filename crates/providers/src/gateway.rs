//! Provider-agnostic "turns in, text out" seam used by chat and theme flows.

use async_trait::async_trait;
use shared::agent_api::{ChatMessage, StreamChunk};
use shared::error::AssistantError;
use shared::settings::ModelProvider;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

use crate::router::{ModelProfile, ProviderRouter};

#[async_trait]
pub trait ModelGateway: Send + Sync {
    /// One request/response completion.
    async fn complete(
        &self,
        turns: &[ChatMessage],
        system_preamble: &str,
    ) -> Result<String, AssistantError>;

    /// Streamed completion. Deltas go to `tx`, terminated by `Done` or `Error`.
    ///
    /// The default sends the whole answer as one delta, which is a valid
    /// stream for gateways without incremental output.
    async fn complete_stream(
        &self,
        turns: &[ChatMessage],
        system_preamble: &str,
        tx: UnboundedSender<StreamChunk>,
    ) -> Result<(), AssistantError> {
        let text = self.complete(turns, system_preamble).await?;
        let _ = tx.send(StreamChunk::Text(text));
        let _ = tx.send(StreamChunk::Done { stop_reason: None });
        Ok(())
    }
}

/// Prepend the system preamble to the outgoing turn list.
pub fn compose_messages(turns: &[ChatMessage], system_preamble: &str) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(turns.len() + 1);
    if !system_preamble.trim().is_empty() {
        messages.push(ChatMessage::system(system_preamble));
    }
    messages.extend(turns.iter().cloned());
    messages
}

/// Gateway over the provider router with a bounded wait per call.
pub struct RouterGateway {
    router: ProviderRouter,
    timeout: Duration,
}

impl RouterGateway {
    pub fn new(config: ModelProvider, profile: ModelProfile) -> Self {
        let timeout = Duration::from_secs(config.request_timeout_secs.max(1));
        Self {
            router: ProviderRouter::new(config, profile),
            timeout,
        }
    }

    pub fn chat(config: &ModelProvider) -> Self {
        Self::new(config.clone(), ModelProfile::chat(config))
    }

    pub fn theme(config: &ModelProvider) -> Self {
        Self::new(config.clone(), ModelProfile::theme(config))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn timeout_error(&self) -> AssistantError {
        AssistantError::UpstreamTimeout {
            seconds: self.timeout.as_secs(),
        }
    }
}

/// Map a provider failure onto the gateway error contract.
pub fn classify_error(err: anyhow::Error, timeout: Duration) -> AssistantError {
    if let Some(e) = err.downcast_ref::<AssistantError>() {
        return e.clone();
    }
    if let Some(e) = err.downcast_ref::<reqwest::Error>() {
        if e.is_timeout() {
            return AssistantError::UpstreamTimeout {
                seconds: timeout.as_secs(),
            };
        }
        return AssistantError::Upstream {
            status: e.status().map(|s| s.as_u16()).unwrap_or(0),
            detail: e.to_string(),
        };
    }
    AssistantError::Upstream {
        status: 0,
        detail: err.to_string(),
    }
}

#[async_trait]
impl ModelGateway for RouterGateway {
    async fn complete(
        &self,
        turns: &[ChatMessage],
        system_preamble: &str,
    ) -> Result<String, AssistantError> {
        let messages = compose_messages(turns, system_preamble);
        match tokio::time::timeout(self.timeout, self.router.generate(messages)).await {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(e)) => Err(classify_error(e, self.timeout)),
            Err(_) => {
                tracing::warn!(timeout_secs = self.timeout.as_secs(), "model call timed out");
                Err(self.timeout_error())
            }
        }
    }

    async fn complete_stream(
        &self,
        turns: &[ChatMessage],
        system_preamble: &str,
        tx: UnboundedSender<StreamChunk>,
    ) -> Result<(), AssistantError> {
        let messages = compose_messages(turns, system_preamble);
        match tokio::time::timeout(self.timeout, self.router.generate_stream(messages, tx)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(classify_error(e, self.timeout)),
            Err(_) => {
                tracing::warn!(timeout_secs = self.timeout.as_secs(), "model stream timed out");
                Err(self.timeout_error())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    #[async_trait]
    impl ModelGateway for Echo {
        async fn complete(
            &self,
            turns: &[ChatMessage],
            system_preamble: &str,
        ) -> Result<String, AssistantError> {
            Ok(format!(
                "{}|{}",
                system_preamble,
                turns.last().map(|t| t.content.as_str()).unwrap_or("")
            ))
        }
    }

    #[test]
    fn test_preamble_goes_first() {
        let turns = vec![ChatMessage::user("hello")];
        let messages = compose_messages(&turns, "be brief");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0], ChatMessage::system("be brief"));

        assert_eq!(compose_messages(&turns, "  ").len(), 1);
    }

    #[test]
    fn test_typed_errors_survive_anyhow() {
        let err: anyhow::Error = AssistantError::Upstream {
            status: 502,
            detail: "bad gateway".into(),
        }
        .into();
        let mapped = classify_error(err, Duration::from_secs(30));
        assert_eq!(
            mapped,
            AssistantError::Upstream {
                status: 502,
                detail: "bad gateway".into()
            }
        );

        let other = classify_error(anyhow::anyhow!("dns failure"), Duration::from_secs(30));
        assert!(matches!(other, AssistantError::Upstream { status: 0, .. }));
    }

    #[tokio::test]
    async fn test_default_stream_sends_whole_answer() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        Echo.complete_stream(&[ChatMessage::user("hi")], "sys", tx)
            .await
            .unwrap();

        assert_eq!(rx.recv().await, Some(StreamChunk::Text("sys|hi".into())));
        assert!(matches!(rx.recv().await, Some(StreamChunk::Done { .. })));
    }

    #[tokio::test]
    async fn test_unreachable_provider_maps_to_upstream_error() {
        let config = ModelProvider {
            provider_preference: vec!["nowhere".into()],
            ..Default::default()
        };
        let gateway = RouterGateway::chat(&config).with_timeout(Duration::from_secs(5));
        let err = gateway
            .complete(&[ChatMessage::user("hi")], "sys")
            .await
            .unwrap_err();
        assert!(matches!(err, AssistantError::Upstream { status: 0, .. }));
    }
}
