//! The turn-taking state machine behind the assistant surface.
//!
//! A session holds the transcript and at most one in-flight turn. Submitting
//! from idle appends the user message and a `"..."` placeholder before any
//! network activity; the placeholder is then replaced in place by the answer,
//! the theme summary, or a rendered error. The transcript only ever grows.

use parking_lot::Mutex;
use providers::ModelGateway;
use services::theme_store::ReloadRequest;
use shared::agent_api::{ChatMessage, StreamChunk};
use shared::chat::Message;
use shared::error::{AssistantError, ErrorInfo};
use shared::events::{SessionEvent, TurnOutcome, TurnPhase};
use shared::settings::{PersonaSettings, SessionSettings};
use shared::theme::{ThemeResult, ThemeStatus};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedSender};
use uuid::Uuid;

use crate::augment::{context_block, Augmentation, SearchAugmenter};
use crate::intent::{classify, Intent};
use crate::prompts::persona_preamble;
use crate::structured;
use crate::theme::{render_result, ThemeDirectiveProcessor};

const EMPTY_ANSWER: &str = "I don't have an answer for that right now. Contact me directly!";

/// Where a submission came from. Only genuine user gestures are processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputOrigin {
    UserGesture,
    Scripted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserInput {
    pub text: String,
    pub origin: InputOrigin,
}

impl UserInput {
    pub fn typed(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            origin: InputOrigin::UserGesture,
        }
    }

    pub fn scripted(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            origin: InputOrigin::Scripted,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Answered,
    ThemeApplied(ThemeResult),
    Failed(ErrorInfo),
    /// The input was not user-initiated; a rejection was recorded.
    Rejected,
    /// A turn is already in flight; nothing changed.
    Busy,
    /// Blank input; nothing changed.
    Ignored,
}

/// Point-in-time copy of the session for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub messages: Vec<Message>,
    pub phase: TurnPhase,
    pub is_loading_turn: bool,
    pub is_searching: bool,
    pub last_error: Option<ErrorInfo>,
}

struct SessionState {
    messages: Vec<Message>,
    phase: TurnPhase,
    is_searching: bool,
    last_error: Option<ErrorInfo>,
}

impl SessionState {
    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            messages: self.messages.clone(),
            phase: self.phase,
            is_loading_turn: !self.phase.is_idle(),
            is_searching: self.is_searching,
            last_error: self.last_error.clone(),
        }
    }
}

/// Read-only handle for observers on other tasks.
#[derive(Clone)]
pub struct SessionView {
    state: Arc<Mutex<SessionState>>,
}

impl SessionView {
    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.lock().snapshot()
    }

    pub fn is_searching(&self) -> bool {
        self.state.lock().is_searching
    }

    pub fn is_loading_turn(&self) -> bool {
        !self.state.lock().phase.is_idle()
    }
}

enum TurnReply {
    Chat,
    Theme(ThemeResult),
}

pub struct ConversationSession {
    state: Arc<Mutex<SessionState>>,
    chat_gateway: Arc<dyn ModelGateway>,
    augmenter: Arc<SearchAugmenter>,
    theme: Arc<ThemeDirectiveProcessor>,
    preamble: String,
    persona_name: String,
    history_window: usize,
    turn_timeout: Duration,
    streaming: bool,
    events: Option<UnboundedSender<SessionEvent>>,
}

impl ConversationSession {
    pub fn new(
        chat_gateway: Arc<dyn ModelGateway>,
        augmenter: Arc<SearchAugmenter>,
        theme: Arc<ThemeDirectiveProcessor>,
        persona: &PersonaSettings,
        biography: &str,
        settings: &SessionSettings,
    ) -> Self {
        let greeting = Message::assistant(persona.greeting.clone());
        Self {
            state: Arc::new(Mutex::new(SessionState {
                messages: vec![greeting],
                phase: TurnPhase::Idle,
                is_searching: false,
                last_error: None,
            })),
            chat_gateway,
            augmenter,
            theme,
            preamble: persona_preamble(persona, biography),
            persona_name: persona.name.clone(),
            history_window: settings.history_window,
            turn_timeout: Duration::from_secs(settings.turn_timeout_secs.max(1)),
            streaming: true,
            events: None,
        }
    }

    pub fn with_events(mut self, tx: UnboundedSender<SessionEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    /// Single-shot completions instead of folding a stream into the placeholder.
    pub fn with_streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }

    pub fn with_turn_timeout(mut self, timeout: Duration) -> Self {
        self.turn_timeout = timeout;
        self
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.lock().snapshot()
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            state: self.state.clone(),
        }
    }

    pub fn persona_name(&self) -> &str {
        &self.persona_name
    }

    pub fn theme_status(&self) -> ThemeStatus {
        self.theme.store().status()
    }

    /// Forget every saved theme change. The host must reload the page.
    pub fn reset_theme(&self) -> Result<ReloadRequest, AssistantError> {
        let reload = self.theme.store().reset()?;
        self.emit(SessionEvent::ReloadRequested);
        Ok(reload)
    }

    pub async fn submit(&self, input: UserInput) -> SubmitOutcome {
        let text = input.text.trim().to_string();
        if text.is_empty() {
            return SubmitOutcome::Ignored;
        }

        let intent = classify(&text);
        let turn_id = Uuid::new_v4();
        let (index, history) = {
            let mut state = self.state.lock();
            if !state.phase.is_idle() {
                tracing::debug!("submit ignored, a turn is in flight");
                return SubmitOutcome::Busy;
            }

            if input.origin != InputOrigin::UserGesture {
                let err = AssistantError::AutomatedInteractionRejected;
                state.messages.push(Message::user(text));
                state.messages.push(Message::assistant(err.render()));
                state.last_error = Some(err.info());
                let index = state.messages.len() - 1;
                drop(state);
                tracing::warn!("rejected a submission that was not user-initiated");
                self.emit(SessionEvent::MessageUpdated { index });
                return SubmitOutcome::Rejected;
            }

            let history = self.history(&state.messages);
            state.messages.push(Message::user(text.clone()));
            state.messages.push(Message::placeholder());
            state.phase = TurnPhase::AwaitingModel {
                theme: intent == Intent::Theme,
            };
            state.last_error = None;
            (state.messages.len() - 1, history)
        };

        tracing::info!(turn = %turn_id, theme = intent == Intent::Theme, "turn started");
        self.emit(SessionEvent::TurnStarted {
            turn_id,
            theme: intent == Intent::Theme,
        });
        self.emit(SessionEvent::PhaseChanged {
            turn_id,
            phase: TurnPhase::AwaitingModel {
                theme: intent == Intent::Theme,
            },
        });
        self.emit(SessionEvent::MessageUpdated { index });

        let turn = async {
            match intent {
                Intent::Theme => self.run_theme_turn(turn_id, index, &text).await,
                Intent::Chat => self.run_chat_turn(turn_id, index, &text, history).await,
            }
        };
        let result = match tokio::time::timeout(self.turn_timeout, turn).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(turn = %turn_id, timeout_secs = self.turn_timeout.as_secs(), "turn timed out");
                Err(AssistantError::UpstreamTimeout {
                    seconds: self.turn_timeout.as_secs(),
                })
            }
        };

        self.finish(turn_id, index, result)
    }

    /// Completed messages to send back as context, oldest first.
    fn history(&self, messages: &[Message]) -> Vec<ChatMessage> {
        let usable: Vec<&Message> = messages
            .iter()
            .filter(|m| !m.is_placeholder() && !m.is_error())
            .collect();
        let skip = usable.len().saturating_sub(self.history_window);
        usable[skip..].iter().map(|m| m.to_chat_message()).collect()
    }

    async fn run_theme_turn(
        &self,
        turn_id: Uuid,
        index: usize,
        text: &str,
    ) -> Result<TurnReply, AssistantError> {
        let plan = self.theme.fetch_plan(text).await?;
        self.set_phase(turn_id, TurnPhase::ApplyingMutations);
        let result = self.theme.apply_plan(plan);

        if !result.changes.is_empty() {
            self.emit(SessionEvent::ThemeApplied {
                turn_id,
                applied: result.changes.len(),
            });
        }
        let rendered = render_result(&result);
        self.update_message(index, |m| m.text = rendered);
        Ok(TurnReply::Theme(result))
    }

    async fn run_chat_turn(
        &self,
        turn_id: Uuid,
        index: usize,
        text: &str,
        history: Vec<ChatMessage>,
    ) -> Result<TurnReply, AssistantError> {
        let mut turns = Vec::with_capacity(history.len() + 2);

        if self.augmenter.should_augment(text) {
            self.set_phase(turn_id, TurnPhase::AwaitingSearch);
            self.state.lock().is_searching = true;
            let augmentation = self.augmenter.augment(text).await;
            self.state.lock().is_searching = false;

            match augmentation {
                Augmentation::Results(results) => turns.extend(context_block(&results)),
                Augmentation::Unavailable(reason) => {
                    self.emit(SessionEvent::SearchDegraded { turn_id, reason })
                }
            }
            self.set_phase(turn_id, TurnPhase::AwaitingModel { theme: false });
        }

        turns.extend(history);
        turns.push(ChatMessage::user(text));

        let reply = if self.streaming {
            self.stream_into_placeholder(index, &turns).await?
        } else {
            self.chat_gateway.complete(&turns, &self.preamble).await?
        };

        let (display, content) = structured::extract(&reply);
        let display = if display.trim().is_empty() {
            EMPTY_ANSWER.to_string()
        } else {
            display
        };
        self.update_message(index, |m| {
            m.text = display;
            m.structured_content = content;
        });
        Ok(TurnReply::Chat)
    }

    /// Fold streamed deltas into the placeholder; returns the full text.
    async fn stream_into_placeholder(
        &self,
        index: usize,
        turns: &[ChatMessage],
    ) -> Result<String, AssistantError> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let producer = self.chat_gateway.complete_stream(turns, &self.preamble, tx);
        let consumer = async {
            let mut text = String::new();
            while let Some(chunk) = rx.recv().await {
                match chunk {
                    StreamChunk::Text(delta) => {
                        text.push_str(&delta);
                        let so_far = text.clone();
                        self.update_message(index, |m| m.text = so_far);
                    }
                    StreamChunk::Done { .. } => return Ok(text),
                    StreamChunk::Error(detail) => {
                        return Err(AssistantError::Upstream { status: 0, detail })
                    }
                }
            }
            Ok(text)
        };

        let (produced, consumed) = tokio::join!(producer, consumer);
        produced?;
        consumed
    }

    fn finish(
        &self,
        turn_id: Uuid,
        index: usize,
        result: Result<TurnReply, AssistantError>,
    ) -> SubmitOutcome {
        let (outcome, submit) = {
            let mut state = self.state.lock();
            state.phase = TurnPhase::Idle;
            state.is_searching = false;
            match result {
                Ok(TurnReply::Chat) => (TurnOutcome::Answered, SubmitOutcome::Answered),
                Ok(TurnReply::Theme(result)) => {
                    (TurnOutcome::ThemeApplied, SubmitOutcome::ThemeApplied(result))
                }
                Err(err) => {
                    tracing::warn!(turn = %turn_id, error = %err, "turn failed");
                    if let Some(message) = state.messages.get_mut(index) {
                        // Partial streamed text stays visible above the error
                        if message.is_placeholder() || message.text.is_empty() {
                            message.text = err.render();
                        } else {
                            message.text = format!("{}\n\n{}", message.text, err.render());
                        }
                        message.structured_content = None;
                    }
                    let info = err.info();
                    state.last_error = Some(info.clone());
                    (TurnOutcome::Failed, SubmitOutcome::Failed(info))
                }
            }
        };

        self.emit(SessionEvent::MessageUpdated { index });
        self.emit(SessionEvent::PhaseChanged {
            turn_id,
            phase: TurnPhase::Idle,
        });
        self.emit(SessionEvent::TurnFinished { turn_id, outcome });
        tracing::info!(turn = %turn_id, outcome = ?outcome, "turn finished");
        submit
    }

    fn set_phase(&self, turn_id: Uuid, phase: TurnPhase) {
        self.state.lock().phase = phase;
        self.emit(SessionEvent::PhaseChanged { turn_id, phase });
    }

    fn update_message(&self, index: usize, f: impl FnOnce(&mut Message)) {
        {
            let mut state = self.state.lock();
            if let Some(message) = state.messages.get_mut(index) {
                f(message);
            }
        }
        self.emit(SessionEvent::MessageUpdated { index });
    }

    fn emit(&self, event: SessionEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }
}
