//! Extraction of typed card payloads from assistant text.
//!
//! Structured content is an enhancement over the plain text: every failure
//! here degrades to "no payload" and is never surfaced to the caller.

use shared::structured::StructuredContent;

use crate::fence::first_json_fence;

/// The payload of the first ```json fence, if it decodes.
pub fn parse(text: &str) -> Option<StructuredContent> {
    let fence = first_json_fence(text)?;
    match serde_json::from_str::<StructuredContent>(fence.body.trim()) {
        Ok(content) => Some(content),
        Err(e) => {
            tracing::debug!(error = %e, "json fence is not structured content");
            None
        }
    }
}

/// Split a reply into display text and payload.
///
/// The fence is removed from the text only when it decoded; if nothing but
/// the fence was said, the original reply is kept so the message is never empty.
pub fn extract(text: &str) -> (String, Option<StructuredContent>) {
    let Some(fence) = first_json_fence(text) else {
        return (text.to_string(), None);
    };
    let Ok(content) = serde_json::from_str::<StructuredContent>(fence.body.trim()) else {
        return (text.to_string(), None);
    };

    let mut display = String::with_capacity(text.len());
    display.push_str(text[..fence.span.start].trim_end());
    let tail = text[fence.span.end..].trim_start();
    if !display.is_empty() && !tail.is_empty() {
        display.push_str("\n\n");
    }
    display.push_str(tail);

    if display.trim().is_empty() {
        (text.to_string(), Some(content))
    } else {
        (display, Some(content))
    }
}

/// Inverse of [`parse`]: a fenced block the parser accepts.
pub fn to_fenced_block(content: &StructuredContent) -> String {
    let json = serde_json::to_string_pretty(content).unwrap_or_else(|_| "{}".to_string());
    format!("```json\n{}\n```", json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::structured::{ContactInfo, ExperienceEntry, LinkEntry, ProjectEntry, SkillEntry};

    #[test]
    fn test_round_trip_through_fence() {
        let samples = vec![
            StructuredContent::Skills(vec![SkillEntry {
                name: "Rust".into(),
                category: Some("Languages".into()),
                level: None,
            }]),
            StructuredContent::Projects(vec![ProjectEntry {
                title: "Erebrus".into(),
                description: "Decentralised VPN".into(),
                technologies: vec!["Go".into(), "Solana".into()],
                link: None,
                github: Some("https://github.com/example/erebrus".into()),
            }]),
            StructuredContent::Experience(vec![ExperienceEntry {
                company: "NetSepio".into(),
                role: "Lead Engineer".into(),
                period: "2022 - present".into(),
                description: "Built the node operator stack".into(),
            }]),
            StructuredContent::Contact(ContactInfo {
                email: "me@example.com".into(),
                discord: Some("me#0001".into()),
                ..Default::default()
            }),
            StructuredContent::Links(vec![
                LinkEntry {
                    title: "Blog".into(),
                    url: "https://example.com/blog".into(),
                    description: Some("Notes on networking".into()),
                },
                LinkEntry {
                    title: "Talks".into(),
                    url: "https://example.com/talks".into(),
                    description: None,
                },
            ]),
            StructuredContent::General(serde_json::json!({"note": "anything"})),
        ];
        for content in samples {
            let text = format!("Here you go:\n{}", to_fenced_block(&content));
            assert_eq!(parse(&text), Some(content));
        }
    }

    #[test]
    fn test_malformed_or_missing_fence_yields_none() {
        assert_eq!(parse("plain answer"), None);
        assert_eq!(parse("```json\n{\"type\": \"skills\", \"data\": [\n```"), None);
        assert_eq!(parse("```json\n{\"type\": \"weather\", \"data\": 1}\n```"), None);
        assert_eq!(parse("```rust\nfn main() {}\n```"), None);
    }

    #[test]
    fn test_extract_strips_fence_from_display_text() {
        let reply = "I mostly write Rust.\n```json\n{\"type\":\"skills\",\"data\":[{\"name\":\"Rust\"}]}\n```\nAsk me more!";
        let (text, content) = extract(reply);
        assert_eq!(text, "I mostly write Rust.\n\nAsk me more!");
        assert!(matches!(content, Some(StructuredContent::Skills(ref s)) if s.len() == 1));

        let bare = "```json\n{\"type\":\"links\",\"data\":[]}\n```";
        let (text, content) = extract(bare);
        assert_eq!(text, bare);
        assert!(content.is_some());

        let broken = "see ```json\n{oops}\n```";
        assert_eq!(extract(broken), (broken.to_string(), None));
    }
}
