//! Typed payloads the model may attach to an answer.
//!
//! Wire shape: `{"type": "<kind>", "data": <payload>}` inside a fenced `json` block.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum StructuredContent {
    Skills(Vec<SkillEntry>),
    Projects(Vec<ProjectEntry>),
    Experience(Vec<ExperienceEntry>),
    Contact(ContactInfo),
    Links(Vec<LinkEntry>),
    General(serde_json::Value),
}

/// Discriminant of [`StructuredContent`], used by renderers as a dispatch key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentKind {
    Skills,
    Projects,
    Experience,
    Contact,
    Links,
    General,
}

impl StructuredContent {
    pub fn kind(&self) -> ContentKind {
        match self {
            StructuredContent::Skills(_) => ContentKind::Skills,
            StructuredContent::Projects(_) => ContentKind::Projects,
            StructuredContent::Experience(_) => ContentKind::Experience,
            StructuredContent::Contact(_) => ContentKind::Contact,
            StructuredContent::Links(_) => ContentKind::Links,
            StructuredContent::General(_) => ContentKind::General,
        }
    }
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Skills => "skills",
            ContentKind::Projects => "projects",
            ContentKind::Experience => "experience",
            ContentKind::Contact => "contact",
            ContentKind::Links => "links",
            ContentKind::General => "general",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillEntry {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectEntry {
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub technologies: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperienceEntry {
    pub company: String,
    pub role: String,
    pub period: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ContactInfo {
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linkedin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discord: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkEntry {
    pub title: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contact_wire_shape() {
        let json = r#"{"type":"contact","data":{"email":"me@example.com","github":"https://github.com/me"}}"#;
        let content: StructuredContent = serde_json::from_str(json).unwrap();

        assert_eq!(content.kind(), ContentKind::Contact);
        match content {
            StructuredContent::Contact(c) => {
                assert_eq!(c.email, "me@example.com");
                assert_eq!(c.github.as_deref(), Some("https://github.com/me"));
                assert!(c.linkedin.is_none());
            }
            other => panic!("unexpected content: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let json = r#"{"type":"weather","data":{}}"#;
        assert!(serde_json::from_str::<StructuredContent>(json).is_err());
    }

    #[test]
    fn test_general_accepts_any_payload() {
        let json = r#"{"type":"general","data":{"note":"anything goes","n":[1,2]}}"#;
        let content: StructuredContent = serde_json::from_str(json).unwrap();
        assert_eq!(content.kind().as_str(), "general");
    }
}
