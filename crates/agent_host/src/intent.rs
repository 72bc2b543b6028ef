//! Routing of raw user text: theme directive or conversation.

pub const THEME_PREFIX: &str = "theme:";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Theme,
    Chat,
}

/// `Theme` iff the trimmed text starts with `theme:` in any case.
pub fn classify(text: &str) -> Intent {
    let trimmed = text.trim_start();
    match trimmed.get(..THEME_PREFIX.len()) {
        Some(head) if head.eq_ignore_ascii_case(THEME_PREFIX) => Intent::Theme,
        _ => Intent::Chat,
    }
}

/// The user's intent without the directive token, e.g. `"Theme: dark"` -> `"dark"`.
pub fn strip_directive(text: &str) -> &str {
    let trimmed = text.trim();
    match trimmed.get(..THEME_PREFIX.len()) {
        Some(head) if head.eq_ignore_ascii_case(THEME_PREFIX) => {
            trimmed[THEME_PREFIX.len()..].trim_start()
        }
        _ => trimmed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(classify("Theme: dark mode"), Intent::Theme);
        assert_eq!(classify("  THEME:make it pink"), Intent::Theme);
        assert_eq!(classify("theme:"), Intent::Theme);
        assert_eq!(classify("what theme do you use"), Intent::Chat);
        assert_eq!(classify("theme dark"), Intent::Chat);
        assert_eq!(classify(""), Intent::Chat);
        assert_eq!(classify("thé"), Intent::Chat);
    }

    #[test]
    fn test_strip_directive() {
        assert_eq!(strip_directive("Theme: hide navbar"), "hide navbar");
        assert_eq!(strip_directive("  theme:   neon  "), "neon");
        assert_eq!(strip_directive("hello"), "hello");
    }
}
