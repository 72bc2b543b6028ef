//! Agent Host - the portfolio assistant core
//!
//! This crate wires the pieces a conversation needs:
//! - Intent routing between persona chat and `Theme:` directives
//! - Optional web-search augmentation of chat turns
//! - Structured card extraction from model replies
//! - Declarative theme changes applied to the live page, with history

pub mod augment;
pub mod fence;
pub mod intent;
pub mod prompts;
pub mod session;
pub mod structured;
pub mod suggestions;
pub mod theme;

pub use augment::{Augmentation, SearchAugmenter};
pub use intent::{classify, Intent};
pub use session::{ConversationSession, InputOrigin, SessionSnapshot, SessionView, SubmitOutcome, UserInput};
pub use suggestions::{suggestions, PromptCategory, PromptSuggestion};
pub use theme::{ExecutionReport, SafeMutationExecutor, ThemeDirectiveProcessor};

use providers::{ModelGateway, RouterGateway};
use services::theme_store::{FileSlot, MemorySlot, ThemeHistoryStore, ThemeSlot};
use shared::document::SharedDocument;
use shared::error::AssistantError;
use shared::settings::AssistantSettings;
use shared::theme::ThemeStatus;
use std::sync::Arc;

/// Owns the long-lived collaborators and hands out sessions over them
pub struct AgentHost {
    pub settings: AssistantSettings,
    chat_gateway: Arc<dyn ModelGateway>,
    augmenter: Arc<SearchAugmenter>,
    theme: Arc<ThemeDirectiveProcessor>,
    document: SharedDocument,
    biography: String,
}

impl AgentHost {
    /// Build against the configured providers and durable theme slot.
    pub fn from_settings(
        settings: AssistantSettings,
        document: SharedDocument,
        biography: impl Into<String>,
    ) -> Self {
        let chat: Arc<dyn ModelGateway> = Arc::new(RouterGateway::chat(&settings.model));
        let theme: Arc<dyn ModelGateway> = Arc::new(RouterGateway::theme(&settings.model));
        let augmenter = SearchAugmenter::from_settings(&settings.search);
        Self::with_parts(settings, document, biography, chat, theme, augmenter)
    }

    /// Build with explicit gateways and search; the theme slot still follows settings.
    pub fn with_parts(
        settings: AssistantSettings,
        document: SharedDocument,
        biography: impl Into<String>,
        chat_gateway: Arc<dyn ModelGateway>,
        theme_gateway: Arc<dyn ModelGateway>,
        augmenter: SearchAugmenter,
    ) -> Self {
        let slot: Arc<dyn ThemeSlot> = if settings.theme.persist {
            Arc::new(FileSlot::for_client(&settings.theme.client_key))
        } else {
            Arc::new(MemorySlot::new())
        };
        let store = Arc::new(ThemeHistoryStore::open(slot));
        Self::with_store(settings, document, biography, chat_gateway, theme_gateway, augmenter, store)
    }

    pub fn with_store(
        settings: AssistantSettings,
        document: SharedDocument,
        biography: impl Into<String>,
        chat_gateway: Arc<dyn ModelGateway>,
        theme_gateway: Arc<dyn ModelGateway>,
        augmenter: SearchAugmenter,
        store: Arc<ThemeHistoryStore>,
    ) -> Self {
        let executor = Arc::new(
            SafeMutationExecutor::new(document.clone())
                .with_max_changes(settings.theme.max_changes_per_directive),
        );
        let theme = Arc::new(ThemeDirectiveProcessor::new(
            theme_gateway,
            executor,
            store,
            &settings.theme,
        ));

        Self {
            settings,
            chat_gateway,
            augmenter: Arc::new(augmenter),
            theme,
            document,
            biography: biography.into(),
        }
    }

    pub fn open_session(&self) -> ConversationSession {
        ConversationSession::new(
            self.chat_gateway.clone(),
            self.augmenter.clone(),
            self.theme.clone(),
            &self.settings.persona,
            &self.biography,
            &self.settings.session,
        )
    }

    pub fn document(&self) -> &SharedDocument {
        &self.document
    }

    pub fn theme_status(&self) -> ThemeStatus {
        self.theme.store().status()
    }

    /// Re-apply saved theme history after the page (re)loads.
    pub fn restore_theme(&self) -> ExecutionReport {
        let report = self.theme.replay();
        if !report.applied.is_empty() {
            tracing::info!(applied = report.applied.len(), "restored saved theme");
        }
        report
    }

    /// Forget the saved theme and put the page back to its baseline.
    pub fn reset_theme(&self) -> Result<(), AssistantError> {
        let _reload = self.theme.store().reset()?;
        self.document.lock().reload();
        Ok(())
    }
}
