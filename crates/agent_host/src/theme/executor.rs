//! Closed interpreter for theme change descriptors.
//!
//! Model output is untrusted. It is decoded value by value into the six
//! descriptor kinds and applied through the [`LiveDocument`] trait only; there
//! is no path from a payload to code execution. A bad descriptor is recorded
//! and skipped, the rest of the batch still runs.

use regex::Regex;
use serde_json::Value;
use shared::document::{DocumentError, LiveDocument, NodeId, SharedDocument};
use shared::theme::{ClassAction, Position, ThemeChangeDescriptor, VisibilityAction};
use std::sync::OnceLock;

pub const DEFAULT_MAX_CHANGES: usize = 64;
const MAX_VALUE_LEN: usize = 512;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionReport {
    pub applied: Vec<ThemeChangeDescriptor>,
    pub descriptions: Vec<String>,
    pub errors: Vec<String>,
    pub notes: Vec<String>,
}

enum Outcome {
    Applied,
    NoMatch(String),
}

pub struct SafeMutationExecutor {
    document: SharedDocument,
    max_changes: usize,
}

impl SafeMutationExecutor {
    pub fn new(document: SharedDocument) -> Self {
        Self {
            document,
            max_changes: DEFAULT_MAX_CHANGES,
        }
    }

    pub fn with_max_changes(mut self, max_changes: usize) -> Self {
        self.max_changes = max_changes.max(1);
        self
    }

    pub fn document(&self) -> &SharedDocument {
        &self.document
    }

    /// Decode and apply raw payload entries in order.
    pub fn execute(&self, payload: &[Value]) -> ExecutionReport {
        let mut report = ExecutionReport::default();
        let mut descriptors = Vec::with_capacity(payload.len().min(self.max_changes));

        for (i, raw) in payload.iter().enumerate() {
            match serde_json::from_value::<ThemeChangeDescriptor>(raw.clone()) {
                Ok(d) => descriptors.push(d),
                Err(e) => report
                    .errors
                    .push(format!("Change {} is malformed: {}", i + 1, e)),
            }
        }

        self.apply_all(descriptors, &mut report);
        report
    }

    /// Apply already-typed descriptors, e.g. when replaying history.
    pub fn execute_descriptors(&self, descriptors: &[ThemeChangeDescriptor]) -> ExecutionReport {
        let mut report = ExecutionReport::default();
        self.apply_all(descriptors.to_vec(), &mut report);
        report
    }

    fn apply_all(&self, mut descriptors: Vec<ThemeChangeDescriptor>, report: &mut ExecutionReport) {
        if descriptors.len() > self.max_changes {
            report.notes.push(format!(
                "Only the first {} of {} changes were considered",
                self.max_changes,
                descriptors.len()
            ));
            descriptors.truncate(self.max_changes);
        }

        // One lock for the whole batch keeps the changes from interleaving
        // with any other writer.
        let mut doc = self.document.lock();
        for descriptor in descriptors {
            if let Err(reason) = validate(&descriptor) {
                report
                    .errors
                    .push(format!("{}: {}", descriptor.describe(), reason));
                continue;
            }
            match apply(&mut *doc, &descriptor) {
                Ok(Outcome::Applied) => {
                    report.descriptions.push(descriptor.describe());
                    report.applied.push(descriptor);
                }
                Ok(Outcome::NoMatch(selector)) => report
                    .notes
                    .push(format!("No element matches {}; skipped", selector)),
                Err(e) => report
                    .errors
                    .push(format!("{}: {}", descriptor.describe(), e)),
            }
        }
        drop(doc);

        tracing::debug!(
            applied = report.applied.len(),
            errors = report.errors.len(),
            notes = report.notes.len(),
            "theme batch executed"
        );
    }
}

// ── Safety checks ────────────────────────────────────────────────────

static NAME_REGEX: OnceLock<Option<Regex>> = OnceLock::new();

fn is_safe_name(name: &str) -> bool {
    NAME_REGEX
        .get_or_init(|| Regex::new(r"^-{0,2}[a-z][a-z0-9_:\-]*$").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(name))
}

/// Lowercased with whitespace and control characters removed, the way
/// browsers normalise URL schemes.
fn squash(value: &str) -> String {
    value
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .flat_map(char::to_lowercase)
        .collect()
}

fn has_script_url(value: &str) -> bool {
    let squashed = squash(value);
    ["javascript:", "vbscript:", "data:text/html"]
        .iter()
        .any(|scheme| squashed.contains(scheme))
}

fn check_css_value(value: &str) -> Result<(), String> {
    if value.len() > MAX_VALUE_LEN {
        return Err("value is too long".into());
    }
    let squashed = squash(value);
    if squashed.contains("expression(") || has_script_url(value) {
        return Err("script in CSS values is not allowed".into());
    }
    if value.contains('<') || value.contains('>') {
        return Err("markup in CSS values is not allowed".into());
    }
    Ok(())
}

fn validate(descriptor: &ThemeChangeDescriptor) -> Result<(), String> {
    match descriptor {
        ThemeChangeDescriptor::StyleSet {
            property, value, ..
        } => {
            let property = property.trim().to_ascii_lowercase();
            if !is_safe_name(&property) {
                return Err(format!("'{}' is not a CSS property name", property));
            }
            if property == "behavior" || property == "-moz-binding" {
                return Err(format!("'{}' is not allowed", property));
            }
            check_css_value(value)
        }
        ThemeChangeDescriptor::AttributeSet {
            attribute, value, ..
        } => {
            let attribute = attribute.trim().to_ascii_lowercase();
            if !is_safe_name(&attribute) || attribute.starts_with('-') {
                return Err(format!("'{}' is not an attribute name", attribute));
            }
            if attribute.starts_with("on") {
                return Err("event handler attributes are not allowed".into());
            }
            if attribute == "srcdoc" {
                return Err("srcdoc is not allowed".into());
            }
            if value.len() > MAX_VALUE_LEN {
                return Err("value is too long".into());
            }
            if has_script_url(value) {
                return Err("script URLs are not allowed".into());
            }
            if attribute == "style" {
                check_css_value(value)?;
            }
            Ok(())
        }
        ThemeChangeDescriptor::ClassToggle { class, .. } => {
            if class.trim().is_empty() || class.chars().any(char::is_whitespace) {
                return Err(format!("'{}' is not a single class name", class));
            }
            Ok(())
        }
        ThemeChangeDescriptor::Visibility { .. }
        | ThemeChangeDescriptor::Move { .. }
        | ThemeChangeDescriptor::Reorder { .. } => Ok(()),
    }
}

// ── Interpreter ──────────────────────────────────────────────────────

fn apply(doc: &mut dyn LiveDocument, descriptor: &ThemeChangeDescriptor) -> Result<Outcome, DocumentError> {
    match descriptor {
        ThemeChangeDescriptor::StyleSet {
            selector,
            property,
            value,
        } => for_each_match(doc, selector, |doc, n| doc.set_style(n, property, value)),
        ThemeChangeDescriptor::Visibility { selector, action } => {
            let visible = *action == VisibilityAction::Show;
            for_each_match(doc, selector, |doc, n| doc.set_visible(n, visible))
        }
        ThemeChangeDescriptor::AttributeSet {
            selector,
            attribute,
            value,
        } => for_each_match(doc, selector, |doc, n| doc.set_attribute(n, attribute, value)),
        ThemeChangeDescriptor::ClassToggle {
            selector,
            class,
            action,
        } => for_each_match(doc, selector, |doc, n| match action {
            ClassAction::Add => doc.add_class(n, class.trim()),
            ClassAction::Remove => doc.remove_class(n, class.trim()),
        }),
        ThemeChangeDescriptor::Move {
            selector,
            destination,
            position,
        } => apply_move(doc, selector, destination, *position),
        ThemeChangeDescriptor::Reorder { parent, order } => apply_reorder(doc, parent, order),
    }
}

fn for_each_match<F>(doc: &mut dyn LiveDocument, selector: &str, mut f: F) -> Result<Outcome, DocumentError>
where
    F: FnMut(&mut dyn LiveDocument, NodeId) -> Result<(), DocumentError>,
{
    let nodes = doc.select(selector)?;
    if nodes.is_empty() {
        return Ok(Outcome::NoMatch(selector.to_string()));
    }
    for node in nodes {
        f(doc, node)?;
    }
    Ok(Outcome::Applied)
}

fn apply_move(
    doc: &mut dyn LiveDocument,
    selector: &str,
    destination: &str,
    position: Position,
) -> Result<Outcome, DocumentError> {
    let Some(dest) = doc.select(destination)?.into_iter().next() else {
        return Ok(Outcome::NoMatch(destination.to_string()));
    };
    let mut nodes = doc.select(selector)?;
    if nodes.is_empty() {
        return Ok(Outcome::NoMatch(selector.to_string()));
    }
    nodes.retain(|n| *n != dest);
    // All or nothing: one bad target rejects the whole descriptor
    for node in &nodes {
        doc.check_move(*node, dest, position)?;
    }
    // Insert so the moved elements keep their document order at the target
    if matches!(position, Position::Prepend | Position::After) {
        nodes.reverse();
    }
    for node in nodes {
        doc.move_node(node, dest, position)?;
    }
    Ok(Outcome::Applied)
}

fn apply_reorder(doc: &mut dyn LiveDocument, parent: &str, order: &[String]) -> Result<Outcome, DocumentError> {
    let Some(parent_node) = doc.select(parent)?.into_iter().next() else {
        return Ok(Outcome::NoMatch(parent.to_string()));
    };
    let children = doc.children(parent_node);
    let mut ordered: Vec<NodeId> = Vec::with_capacity(order.len());
    for selector in order {
        let matched = doc
            .select(selector)?
            .into_iter()
            .find(|n| children.contains(n) && !ordered.contains(n));
        if let Some(node) = matched {
            ordered.push(node);
        }
    }
    if ordered.is_empty() {
        return Ok(Outcome::NoMatch(order.join(", ")));
    }
    doc.reorder_children(parent_node, &ordered)?;
    Ok(Outcome::Applied)
}
