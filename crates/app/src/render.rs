//! Plain-text rendering of transcript messages and their cards.

use shared::chat::{Message, Role};
use shared::structured::{ContentKind, StructuredContent};
use std::collections::HashMap;

type CardRenderer = fn(&StructuredContent) -> String;

/// Dispatch table keyed by [`ContentKind`]; kinds without an entry fall back
/// to pretty-printed JSON.
pub struct Renderer {
    persona_name: String,
    cards: HashMap<ContentKind, CardRenderer>,
}

impl Renderer {
    pub fn new(persona_name: impl Into<String>) -> Self {
        let mut cards: HashMap<ContentKind, CardRenderer> = HashMap::new();
        cards.insert(ContentKind::Skills, skills_card);
        cards.insert(ContentKind::Projects, projects_card);
        cards.insert(ContentKind::Experience, experience_card);
        cards.insert(ContentKind::Contact, contact_card);
        cards.insert(ContentKind::Links, links_card);
        Self {
            persona_name: persona_name.into(),
            cards,
        }
    }

    pub fn message(&self, message: &Message) -> String {
        let speaker = match message.role {
            Role::User => "you",
            Role::Assistant => self.persona_name.as_str(),
        };
        let mut out = format!("{}> {}", speaker, message.text);

        if let Some(content) = message.structured_content.as_ref() {
            if message.renders_structured_content(&self.persona_name) {
                out.push('\n');
                out.push_str(&self.card(content));
            }
        }
        out
    }

    pub fn card(&self, content: &StructuredContent) -> String {
        let body = match self.cards.get(&content.kind()) {
            Some(render) => render(content),
            None => general_card(content),
        };
        format!("  [{}]\n{}", content.kind().as_str(), body)
    }
}

fn bullet(line: impl AsRef<str>) -> String {
    format!("  - {}", line.as_ref())
}

fn skills_card(content: &StructuredContent) -> String {
    let StructuredContent::Skills(skills) = content else {
        return String::new();
    };
    skills
        .iter()
        .map(|s| {
            let mut line = s.name.clone();
            if let Some(level) = &s.level {
                line.push_str(&format!(" ({})", level));
            }
            if let Some(category) = &s.category {
                line.push_str(&format!(" - {}", category));
            }
            bullet(line)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn projects_card(content: &StructuredContent) -> String {
    let StructuredContent::Projects(projects) = content else {
        return String::new();
    };
    let mut lines = Vec::new();
    for p in projects {
        lines.push(bullet(format!("{}: {}", p.title, p.description)));
        if !p.technologies.is_empty() {
            lines.push(format!("      {}", p.technologies.join(", ")));
        }
        for url in [&p.link, &p.github].into_iter().flatten() {
            lines.push(format!("      {}", url));
        }
    }
    lines.join("\n")
}

fn experience_card(content: &StructuredContent) -> String {
    let StructuredContent::Experience(entries) = content else {
        return String::new();
    };
    entries
        .iter()
        .map(|e| {
            let head = bullet(format!("{} at {} ({})", e.role, e.company, e.period));
            if e.description.is_empty() {
                head
            } else {
                format!("{}\n      {}", head, e.description)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn contact_card(content: &StructuredContent) -> String {
    let StructuredContent::Contact(contact) = content else {
        return String::new();
    };
    let optional = [
        ("LinkedIn", &contact.linkedin),
        ("GitHub", &contact.github),
        ("Phone", &contact.phone),
        ("Discord", &contact.discord),
    ];
    let mut lines = vec![bullet(format!("Email: {}", contact.email))];
    for (label, value) in optional {
        if let Some(value) = value {
            lines.push(bullet(format!("{}: {}", label, value)));
        }
    }
    lines.join("\n")
}

fn links_card(content: &StructuredContent) -> String {
    let StructuredContent::Links(links) = content else {
        return String::new();
    };
    links
        .iter()
        .map(|l| match &l.description {
            Some(d) => bullet(format!("{} <{}> {}", l.title, l.url, d)),
            None => bullet(format!("{} <{}>", l.title, l.url)),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn general_card(content: &StructuredContent) -> String {
    let value = match content {
        StructuredContent::General(value) => value.clone(),
        other => serde_json::to_value(other).unwrap_or_default(),
    };
    serde_json::to_string_pretty(&value)
        .unwrap_or_default()
        .lines()
        .map(|l| format!("    {}", l))
        .collect::<Vec<_>>()
        .join("\n")
}
