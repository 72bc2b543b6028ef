//! Canned prompts offered next to the input box.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptCategory {
    Theme,
    Info,
    Contact,
}

impl PromptCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            PromptCategory::Theme => "theme",
            PromptCategory::Info => "info",
            PromptCategory::Contact => "contact",
        }
    }

    /// `"all"` and unknown names mean no filter.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "theme" => Some(PromptCategory::Theme),
            "info" => Some(PromptCategory::Info),
            "contact" => Some(PromptCategory::Contact),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptSuggestion {
    pub text: &'static str,
    pub category: PromptCategory,
}

const fn suggestion(text: &'static str, category: PromptCategory) -> PromptSuggestion {
    PromptSuggestion { text, category }
}

pub static PREDEFINED_PROMPTS: &[PromptSuggestion] = &[
    suggestion("Theme: Make the site dark with neon green accents", PromptCategory::Theme),
    suggestion("Theme: Hide the gradient background", PromptCategory::Theme),
    suggestion("Theme: Change the page background to a deep navy blue", PromptCategory::Theme),
    suggestion("Theme: Move the contact section to the top", PromptCategory::Theme),
    suggestion("What are your main skills?", PromptCategory::Info),
    suggestion("Tell me about your recent projects", PromptCategory::Info),
    suggestion("Where have you worked before?", PromptCategory::Info),
    suggestion("What are the latest updates on Erebrus?", PromptCategory::Info),
    suggestion("How can I contact you?", PromptCategory::Contact),
    suggestion("Share your GitHub and LinkedIn links", PromptCategory::Contact),
];

/// Suggestions for a category; `None` means all of them.
pub fn suggestions(category: Option<PromptCategory>) -> Vec<PromptSuggestion> {
    PREDEFINED_PROMPTS
        .iter()
        .filter(|p| category.map_or(true, |c| p.category == c))
        .copied()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::{classify, Intent};

    #[test]
    fn test_filtering() {
        assert_eq!(suggestions(None).len(), PREDEFINED_PROMPTS.len());
        assert!(suggestions(PromptCategory::parse("contact"))
            .iter()
            .all(|p| p.category == PromptCategory::Contact));
        assert_eq!(PromptCategory::parse("all"), None);
    }

    #[test]
    fn test_theme_suggestions_are_directives() {
        for p in suggestions(Some(PromptCategory::Theme)) {
            assert_eq!(classify(p.text), Intent::Theme, "{}", p.text);
        }
        for p in suggestions(Some(PromptCategory::Info)) {
            assert_eq!(classify(p.text), Intent::Chat, "{}", p.text);
        }
    }
}
