//! Declarative page mutations produced by theme directives.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisibilityAction {
    Show,
    Hide,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassAction {
    Add,
    Remove,
}

/// Where a moved element lands relative to its destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    /// Sibling immediately before the destination
    Before,
    /// Sibling immediately after the destination
    After,
    /// First child of the destination
    #[serde(alias = "start")]
    Prepend,
    /// Last child of the destination
    #[serde(alias = "end")]
    Append,
}

/// One self-contained mutation. Re-applying a descriptor leaves the page as
/// applying it once did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ThemeChangeDescriptor {
    #[serde(rename = "style")]
    StyleSet {
        selector: String,
        property: String,
        value: String,
    },
    Visibility {
        selector: String,
        action: VisibilityAction,
    },
    #[serde(rename = "attribute")]
    AttributeSet {
        selector: String,
        attribute: String,
        value: String,
    },
    #[serde(rename = "class")]
    ClassToggle {
        selector: String,
        class: String,
        action: ClassAction,
    },
    Move {
        selector: String,
        destination: String,
        position: Position,
    },
    Reorder {
        parent: String,
        order: Vec<String>,
    },
}

impl ThemeChangeDescriptor {
    /// The selector whose matches this descriptor mutates
    pub fn target(&self) -> &str {
        match self {
            ThemeChangeDescriptor::StyleSet { selector, .. }
            | ThemeChangeDescriptor::Visibility { selector, .. }
            | ThemeChangeDescriptor::AttributeSet { selector, .. }
            | ThemeChangeDescriptor::ClassToggle { selector, .. }
            | ThemeChangeDescriptor::Move { selector, .. } => selector,
            ThemeChangeDescriptor::Reorder { parent, .. } => parent,
        }
    }

    /// Human-readable change log line
    pub fn describe(&self) -> String {
        match self {
            ThemeChangeDescriptor::StyleSet {
                selector,
                property,
                value,
            } => format!("Set {} of {} to {}", property, selector, value),
            ThemeChangeDescriptor::Visibility { selector, action } => match action {
                VisibilityAction::Show => format!("Showed {}", selector),
                VisibilityAction::Hide => format!("Hid {}", selector),
            },
            ThemeChangeDescriptor::AttributeSet {
                selector,
                attribute,
                value,
            } => format!("Set attribute {}=\"{}\" on {}", attribute, value, selector),
            ThemeChangeDescriptor::ClassToggle {
                selector,
                class,
                action,
            } => match action {
                ClassAction::Add => format!("Added class {} to {}", class, selector),
                ClassAction::Remove => format!("Removed class {} from {}", class, selector),
            },
            ThemeChangeDescriptor::Move {
                selector,
                destination,
                position,
            } => {
                let where_ = match position {
                    Position::Before => "before",
                    Position::After => "after",
                    Position::Prepend => "to the start of",
                    Position::Append => "to the end of",
                };
                format!("Moved {} {} {}", selector, where_, destination)
            }
            ThemeChangeDescriptor::Reorder { parent, order } => {
                format!("Reordered {} as {}", parent, order.join(", "))
            }
        }
    }
}

/// Outcome of one theme directive
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThemeResult {
    pub summary: String,
    pub changes: Vec<ThemeChangeDescriptor>,
    #[serde(default)]
    pub descriptions: Vec<String>,
    #[serde(default)]
    pub errors: Vec<String>,
    /// Non-fatal skips, e.g. selectors that matched nothing
    #[serde(default)]
    pub notes: Vec<String>,
}

/// "Custom theme active (N changes)" indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ThemeStatus {
    pub active: bool,
    pub change_count: usize,
}

impl ThemeStatus {
    pub fn label(&self) -> Option<String> {
        if !self.active {
            return None;
        }
        let noun = if self.change_count == 1 {
            "change"
        } else {
            "changes"
        };
        Some(format!(
            "Custom theme active ({} {})",
            self.change_count, noun
        ))
    }
}
