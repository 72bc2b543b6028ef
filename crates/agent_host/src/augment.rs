//! Optional web-search grounding for chat turns.

use services::search::SearchProvider;
use shared::agent_api::ChatMessage;
use shared::search_types::SearchResult;
use shared::settings::SearchSettings;
use std::sync::Arc;
use std::time::Duration;

/// Result of a search attempt. Failures never fail the turn.
#[derive(Debug, Clone, PartialEq)]
pub enum Augmentation {
    Results(Vec<SearchResult>),
    Unavailable(String),
}

pub struct SearchAugmenter {
    provider: Option<Arc<dyn SearchProvider>>,
    keywords: Vec<String>,
    max_results: usize,
    timeout: Duration,
}

impl SearchAugmenter {
    pub fn new(provider: Option<Arc<dyn SearchProvider>>, settings: &SearchSettings) -> Self {
        Self {
            provider,
            keywords: settings
                .keywords
                .iter()
                .map(|k| k.to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
            max_results: settings.max_results.max(1),
            timeout: Duration::from_secs(settings.timeout_secs.max(1)),
        }
    }

    pub fn from_settings(settings: &SearchSettings) -> Self {
        Self::new(services::search::from_settings(settings), settings)
    }

    /// Without a provider, augmentation is off.
    pub fn disabled() -> Self {
        Self::new(None, &SearchSettings::default())
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.provider.is_some()
    }

    /// Any trigger keyword appears in the message, case-insensitively.
    pub fn should_augment(&self, text: &str) -> bool {
        if self.provider.is_none() {
            return false;
        }
        let lower = text.to_lowercase();
        self.keywords.iter().any(|k| lower.contains(k.as_str()))
    }

    pub async fn augment(&self, query: &str) -> Augmentation {
        let Some(provider) = &self.provider else {
            return Augmentation::Unavailable("no search provider configured".into());
        };

        match tokio::time::timeout(self.timeout, provider.search(query, self.max_results)).await {
            Ok(Ok(results)) => {
                tracing::debug!(
                    provider = provider.name(),
                    count = results.len(),
                    "search results fetched"
                );
                Augmentation::Results(results)
            }
            Ok(Err(e)) => {
                tracing::warn!(provider = provider.name(), error = %e, "search failed, continuing without it");
                Augmentation::Unavailable(e.to_string())
            }
            Err(_) => {
                tracing::warn!(
                    provider = provider.name(),
                    timeout_secs = self.timeout.as_secs(),
                    "search timed out, continuing without it"
                );
                Augmentation::Unavailable("search timed out".into())
            }
        }
    }
}

/// Serialize results into the system block that precedes the turn list.
pub fn context_block(results: &[SearchResult]) -> Option<ChatMessage> {
    if results.is_empty() {
        return None;
    }
    let mut block = String::from(
        "Here are some recent web search results related to the user's question. \
         Use these results if helpful; you are not required to use them.\n",
    );
    for (i, r) in results.iter().enumerate() {
        block.push_str(&format!("\n{}. {}\n", i + 1, r.title));
        if !r.snippet.is_empty() {
            block.push_str(&format!("   {}\n", r.snippet));
        }
        if !r.url.is_empty() {
            block.push_str(&format!("   Source: {}\n", r.url));
        }
    }
    Some(ChatMessage::system(block))
}
