//! Error taxonomy of the assistant core.

use serde::{Deserialize, Serialize};

use crate::chat::ERROR_MARKER;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AssistantError {
    #[error("Upstream error (status {status}): {detail}")]
    Upstream { status: u16, detail: String },

    #[error("Upstream timed out after {seconds}s")]
    UpstreamTimeout { seconds: u64 },

    #[error("Search unavailable: {0}")]
    SearchUnavailable(String),

    #[error("Could not parse {what}: {reason}")]
    Parse { what: String, reason: String },

    #[error("Mutation failed: {0}")]
    Mutation(String),

    #[error("Automated interaction rejected")]
    AutomatedInteractionRejected,

    #[error("Storage error: {0}")]
    Storage(String),
}

/// Coarse error category exposed to the presentation surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    Upstream,
    UpstreamTimeout,
    SearchUnavailable,
    Parse,
    Mutation,
    AutomatedInteractionRejected,
    Storage,
}

/// Last failure of a session, as the UI sees it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub kind: ErrorKind,
    pub message: String,
}

impl AssistantError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AssistantError::Upstream { .. } => ErrorKind::Upstream,
            AssistantError::UpstreamTimeout { .. } => ErrorKind::UpstreamTimeout,
            AssistantError::SearchUnavailable(_) => ErrorKind::SearchUnavailable,
            AssistantError::Parse { .. } => ErrorKind::Parse,
            AssistantError::Mutation(_) => ErrorKind::Mutation,
            AssistantError::AutomatedInteractionRejected => ErrorKind::AutomatedInteractionRejected,
            AssistantError::Storage(_) => ErrorKind::Storage,
        }
    }

    pub fn info(&self) -> ErrorInfo {
        ErrorInfo {
            kind: self.kind(),
            message: self.to_string(),
        }
    }

    /// Friendly explanation, without the error marker
    pub fn user_message(&self) -> String {
        match self {
            AssistantError::Upstream { status, detail } => {
                let detail_lower = detail.to_lowercase();
                if *status == 401 || *status == 403 || detail_lower.contains("invalid api key") {
                    format!(
                        "I couldn't reach the AI service - there may be an issue with the API key. ({})",
                        self
                    )
                } else if *status == 429 || detail_lower.contains("rate limit") {
                    "The AI service is temporarily busy. Please wait a moment and try again."
                        .to_string()
                } else if detail_lower.contains("quota") || detail_lower.contains("billing") {
                    "The AI service quota may have been exceeded. Please try again later."
                        .to_string()
                } else if *status == 0 {
                    format!(
                        "I'm having trouble connecting to the AI service. ({})",
                        detail
                    )
                } else {
                    format!("Sorry, I ran into an issue. {}", self)
                }
            }
            AssistantError::UpstreamTimeout { seconds } => format!(
                "The AI service took longer than {}s to answer. Please try again.",
                seconds
            ),
            AssistantError::AutomatedInteractionRejected => {
                "This message didn't come from a real user action, so I ignored it.".to_string()
            }
            other => format!("Sorry, I ran into an issue. {}", other),
        }
    }

    /// Text written into the transcript in place of an answer
    pub fn render(&self) -> String {
        format!("{} {}", ERROR_MARKER, self.user_message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_starts_with_marker() {
        let err = AssistantError::UpstreamTimeout { seconds: 45 };
        assert!(err.render().starts_with("Error:"));
        assert!(err.render().contains("45s"));
    }

    #[test]
    fn test_rate_limit_message() {
        let err = AssistantError::Upstream {
            status: 429,
            detail: "Too Many Requests".into(),
        };
        assert!(err.user_message().contains("busy"));
        assert_eq!(err.kind(), ErrorKind::Upstream);
    }

    #[test]
    fn test_info_carries_display() {
        let info = AssistantError::Storage("disk full".into()).info();
        assert_eq!(info.kind, ErrorKind::Storage);
        assert_eq!(info.message, "Storage error: disk full");
    }
}
