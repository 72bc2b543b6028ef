//! Fenced code block scanning for model replies.

use regex::Regex;
use std::ops::Range;
use std::sync::OnceLock;

static FENCE_REGEX: OnceLock<Option<Regex>> = OnceLock::new();

#[derive(Debug, Clone, PartialEq)]
pub struct Fence<'a> {
    /// Lowercased language tag, empty when the fence has none
    pub lang: String,
    pub body: &'a str,
    /// Byte range of the whole fence including the backticks
    pub span: Range<usize>,
}

impl Fence<'_> {
    pub fn is_json(&self) -> bool {
        self.lang == "json"
    }
}

/// Every closed ``` fence in `text`, in order.
pub fn fences(text: &str) -> Vec<Fence<'_>> {
    let re = FENCE_REGEX
        .get_or_init(|| Regex::new(r"(?s)```([A-Za-z0-9_+\-]*)[ \t]*\r?\n?(.*?)```").ok());
    let Some(re) = re.as_ref() else {
        return Vec::new();
    };
    re.captures_iter(text)
        .filter_map(|cap| {
            let whole = cap.get(0)?;
            Some(Fence {
                lang: cap.get(1).map(|m| m.as_str().to_lowercase()).unwrap_or_default(),
                body: cap.get(2).map(|m| m.as_str()).unwrap_or(""),
                span: whole.range(),
            })
        })
        .collect()
}

pub fn first_json_fence(text: &str) -> Option<Fence<'_>> {
    fences(text).into_iter().find(Fence::is_json)
}
