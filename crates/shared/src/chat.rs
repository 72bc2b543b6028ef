//! Conversation transcript types shared between the core and its presentation surface.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::agent_api::ChatMessage;
use crate::structured::StructuredContent;

/// Text of the provisional Assistant message while a turn is pending
pub const PLACEHOLDER_TEXT: &str = "...";

/// Prefix of every user-visible failure rendered into the transcript
pub const ERROR_MARKER: &str = "Error:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// A single transcript entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub role: Role,
    pub text: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured_content: Option<StructuredContent>,
}

impl Message {
    fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            text: text.into(),
            created_at: Utc::now(),
            structured_content: None,
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, text)
    }

    /// The "thinking" Assistant message appended before any network activity
    pub fn placeholder() -> Self {
        Self::new(Role::Assistant, PLACEHOLDER_TEXT)
    }

    pub fn is_placeholder(&self) -> bool {
        self.role == Role::Assistant && self.text == PLACEHOLDER_TEXT
    }

    pub fn is_error(&self) -> bool {
        self.role == Role::Assistant && self.text.starts_with(ERROR_MARKER)
    }

    /// Whether a UI should render the structured card for this message.
    ///
    /// Simple "who made you" answers mention the persona together with a
    /// creation verb; cards under those answers are noise.
    pub fn renders_structured_content(&self, persona_name: &str) -> bool {
        if self.structured_content.is_none() {
            return false;
        }
        let text = self.text.to_lowercase();
        let persona = persona_name.trim().to_lowercase();
        let is_basic_question = self.role == Role::Assistant
            && !persona.is_empty()
            && text.contains(&persona)
            && ["created", "made", "developer"]
                .iter()
                .any(|w| text.contains(w));
        !is_basic_question
    }

    pub fn to_chat_message(&self) -> ChatMessage {
        ChatMessage {
            role: self.role.as_str().to_string(),
            content: self.text.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structured::{ContactInfo, StructuredContent};

    #[test]
    fn test_placeholder_detection() {
        assert!(Message::placeholder().is_placeholder());
        assert!(!Message::user("...").is_placeholder());
        assert!(!Message::assistant("done").is_placeholder());
    }

    #[test]
    fn test_error_marker() {
        assert!(Message::assistant("Error: upstream timed out").is_error());
        assert!(!Message::assistant("No errors here").is_error());
    }

    #[test]
    fn test_creator_answers_hide_cards() {
        let mut msg = Message::assistant("Ada Lovelace made me as a developer showcase.");
        msg.structured_content = Some(StructuredContent::Contact(ContactInfo {
            email: "ada@example.com".into(),
            ..Default::default()
        }));
        assert!(!msg.renders_structured_content("Ada Lovelace"));

        msg.text = "You can reach me by email.".into();
        assert!(msg.renders_structured_content("Ada Lovelace"));
    }

    #[test]
    fn test_chat_message_roles() {
        assert_eq!(Message::user("hi").to_chat_message().role, "user");
        assert_eq!(Message::assistant("hey").to_chat_message().role, "assistant");
    }
}
