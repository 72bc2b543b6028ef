pub mod chat;
pub mod document;
pub mod error;
pub mod events;
pub mod structured;
pub mod theme;

pub mod settings {
    use serde::{Deserialize, Serialize};

    fn default_true() -> bool {
        true
    }

    #[derive(Debug, Clone, Serialize, Deserialize, Default)]
    pub struct ProviderAuth {
        pub api_key: Option<String>,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    #[serde(default)]
    pub struct ModelProvider {
        pub provider_preference: Vec<String>, // e.g., ["openrouter", "openai", "local"]
        pub chat_model: String,               // e.g., "meta-llama/llama-3.1-70b-instruct"
        pub theme_model: String,              // model used for theme directives
        pub local_model: String,              // e.g., "llama3.2:3b" for Ollama
        pub openrouter_auth: ProviderAuth,
        pub openai_auth: ProviderAuth,
        pub openrouter_base_url: Option<String>,
        pub openai_base_url: Option<String>,
        /// Sent as `HTTP-Referer` to OpenRouter
        pub site_url: Option<String>,
        /// Sent as `X-Title` to OpenRouter
        pub site_title: Option<String>,
        pub chat_temperature: f32,
        pub theme_temperature: f32,
        pub theme_max_tokens: u32,
        /// Bounded wait for a single model call
        pub request_timeout_secs: u64,
    }

    impl Default for ModelProvider {
        fn default() -> Self {
            Self {
                provider_preference: vec!["openrouter".into(), "openai".into(), "local".into()],
                chat_model: "meta-llama/llama-3.1-70b-instruct".into(),
                theme_model: "deepseek/deepseek-chat-v3-0324:free".into(),
                local_model: "llama3.2:3b".into(),
                openrouter_auth: ProviderAuth::default(),
                openai_auth: ProviderAuth::default(),
                openrouter_base_url: None,
                openai_base_url: None,
                site_url: None,
                site_title: None,
                chat_temperature: 0.0,
                theme_temperature: 0.2,
                theme_max_tokens: 2000,
                request_timeout_secs: 45,
            }
        }
    }

    /// Web search augmentation settings
    #[derive(Debug, Clone, Serialize, Deserialize)]
    #[serde(default)]
    pub struct SearchSettings {
        pub enabled: bool,
        /// "tavily" or "duckduckgo"
        pub provider: String,
        pub tavily_api_key: Option<String>,
        pub max_results: usize,
        pub timeout_secs: u64,
        /// Case-insensitive substrings that trigger augmentation
        pub keywords: Vec<String>,
    }

    impl Default for SearchSettings {
        fn default() -> Self {
            Self {
                enabled: true,
                provider: "tavily".into(),
                tavily_api_key: None,
                max_results: 3,
                timeout_secs: 8,
                keywords: [
                    "current",
                    "latest",
                    "recent",
                    "news",
                    "today",
                    "update",
                    "weather",
                    "price",
                    "stock",
                    "event",
                    "happened",
                    "when did",
                    "when will",
                    "how much is",
                    "what is the",
                    "who is",
                    "where is",
                    "2023",
                    "2024",
                    "2025",
                    "sui",
                    "solana",
                    "erebrus.io",
                    "erebrus",
                    "netsepio",
                    "netsepio.com",
                    "search",
                    "deepseek",
                ]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            }
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    #[serde(default)]
    pub struct ThemeSettings {
        /// Descriptors beyond this count in one directive are dropped
        pub max_changes_per_directive: usize,
        /// Selectors the theme prompt advertises to the model
        pub known_targets: Vec<String>,
        /// Key of the durable slot holding this client's theme history
        pub client_key: String,
        #[serde(default = "default_true")]
        pub persist: bool,
    }

    impl Default for ThemeSettings {
        fn default() -> Self {
            Self {
                max_changes_per_directive: 64,
                known_targets: [
                    "#page-background-base",
                    "#gradient-background",
                    "#gradient-blob-1",
                    "#gradient-blob-2",
                    "#navbar",
                    "#main-content",
                    "#home",
                    "#about",
                    "#experience",
                    "#skills",
                    "#projects",
                    "#github",
                    "#contact",
                ]
                .iter()
                .map(|s| s.to_string())
                .collect(),
                client_key: "default".into(),
                persist: true,
            }
        }
    }

    /// Who the assistant speaks as
    #[derive(Debug, Clone, Serialize, Deserialize)]
    #[serde(default)]
    pub struct PersonaSettings {
        pub name: String,
        pub greeting: String,
        /// Plain-text biography/resume used as grounding content
        pub biography_path: Option<String>,
    }

    impl Default for PersonaSettings {
        fn default() -> Self {
            Self {
                name: "Portfolio Owner".into(),
                greeting: "Hi! I'm the AI version of the owner of this portfolio. Ask me about my skills, projects or experience, or start with \"Theme:\" to restyle the page.".into(),
                biography_path: None,
            }
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    #[serde(default)]
    pub struct SessionSettings {
        /// Outer bound on a whole turn, including search and streaming
        pub turn_timeout_secs: u64,
        /// How many completed messages are sent back as context
        pub history_window: usize,
    }

    impl Default for SessionSettings {
        fn default() -> Self {
            Self {
                turn_timeout_secs: 60,
                history_window: 12,
            }
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize, Default)]
    pub struct AssistantSettings {
        #[serde(default)]
        pub model: ModelProvider,
        #[serde(default)]
        pub search: SearchSettings,
        #[serde(default)]
        pub theme: ThemeSettings,
        #[serde(default)]
        pub persona: PersonaSettings,
        #[serde(default)]
        pub session: SessionSettings,
    }
}

pub mod agent_api {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct ChatMessage {
        pub role: String, // "system" | "user" | "assistant"
        pub content: String,
    }

    impl ChatMessage {
        pub fn system(content: impl Into<String>) -> Self {
            Self {
                role: "system".into(),
                content: content.into(),
            }
        }

        pub fn user(content: impl Into<String>) -> Self {
            Self {
                role: "user".into(),
                content: content.into(),
            }
        }

        pub fn assistant(content: impl Into<String>) -> Self {
            Self {
                role: "assistant".into(),
                content: content.into(),
            }
        }
    }

    /// One increment of a streamed completion.
    #[derive(Debug, Clone, PartialEq)]
    pub enum StreamChunk {
        Text(String),
        Done { stop_reason: Option<String> },
        Error(String),
    }
}

pub mod search_types {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct SearchResult {
        pub title: String,
        pub snippet: String,
        pub url: String,
    }
}

#[cfg(test)]
mod tests {
    use super::settings::AssistantSettings;

    #[test]
    fn test_partial_settings_fill_defaults() {
        let json = r#"{"search": {"max_results": 5}, "persona": {"name": "Ada"}}"#;
        let settings: AssistantSettings = serde_json::from_str(json).unwrap();

        assert_eq!(settings.search.max_results, 5);
        assert!(settings.search.keywords.iter().any(|k| k == "latest"));
        assert_eq!(settings.persona.name, "Ada");
        assert_eq!(settings.model.theme_max_tokens, 2000);
        assert_eq!(settings.session.turn_timeout_secs, 60);
    }
}
