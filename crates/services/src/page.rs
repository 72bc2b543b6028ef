//! In-memory page model implementing [`LiveDocument`].
//!
//! The page is declared once as an [`ElementSpec`] tree (built in code or
//! parsed from markup); that declaration is the baseline `reload` returns to.
//! Elements live in an arena indexed by [`NodeId`], and since mutations never
//! add or remove elements, ids stay stable across moves and reloads.
//!
//! Selector matching is done by `scraper`: the arena is rendered to markup
//! with every element stamped with its arena index, and matches are mapped
//! back through the stamp.

use std::collections::BTreeMap;

use scraper::{ElementRef, Html, Selector};
use shared::document::{DocumentError, LiveDocument, NodeId};
use shared::theme::Position;

/// Attribute carrying the arena index in rendered markup.
const STAMP: &str = "data-folio-node";

const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Declarative description of an element and its subtree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElementSpec {
    pub tag: String,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub attributes: Vec<(String, String)>,
    pub styles: Vec<(String, String)>,
    pub text: Option<String>,
    pub children: Vec<ElementSpec>,
}

impl ElementSpec {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            ..Default::default()
        }
    }

    pub fn id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn class(mut self, class: &str) -> Self {
        self.classes.push(class.to_string());
        self
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attributes
            .push((name.to_ascii_lowercase(), value.to_string()));
        self
    }

    pub fn style(mut self, property: &str, value: &str) -> Self {
        self.styles
            .push((property.to_ascii_lowercase(), value.to_string()));
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = Some(text.to_string());
        self
    }

    pub fn child(mut self, child: ElementSpec) -> Self {
        self.children.push(child);
        self
    }

    fn from_element(element: ElementRef) -> Self {
        let value = element.value();
        let mut spec = ElementSpec::new(value.name());
        spec.id = value.id().map(str::to_string);
        spec.classes = value.classes().map(str::to_string).collect();
        for (name, attr) in value.attrs() {
            match name {
                "id" | "class" | STAMP => {}
                "style" => spec.styles = parse_declarations(attr),
                _ => spec.attributes.push((name.to_ascii_lowercase(), attr.to_string())),
            }
        }

        let mut text = String::new();
        for child in element.children() {
            if let Some(t) = child.value().as_text() {
                text.push_str(t);
            } else if let Some(el) = ElementRef::wrap(child) {
                spec.children.push(ElementSpec::from_element(el));
            }
        }
        let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
        if !text.is_empty() {
            spec.text = Some(text);
        }
        spec
    }
}

/// `a: b; c: d` into lowercased property/value pairs, skipping empty ones.
fn parse_declarations(value: &str) -> Vec<(String, String)> {
    value
        .split(';')
        .filter_map(|decl| {
            let (k, v) = decl.split_once(':')?;
            let (k, v) = (k.trim(), v.trim());
            (!k.is_empty() && !v.is_empty()).then(|| (k.to_ascii_lowercase(), v.to_string()))
        })
        .collect()
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn escape_attr(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}

fn invalid_selector(selector: &str, reason: impl Into<String>) -> DocumentError {
    DocumentError::InvalidSelector {
        selector: selector.to_string(),
        reason: reason.into(),
    }
}

#[derive(Debug, Clone)]
struct Element {
    tag: String,
    id: Option<String>,
    classes: Vec<String>,
    attributes: BTreeMap<String, String>,
    styles: BTreeMap<String, String>,
    text: Option<String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    /// `display` value to restore when a hidden element is shown again
    hidden_display: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PageDocument {
    baseline: ElementSpec,
    nodes: Vec<Element>,
}

impl PageDocument {
    pub fn new(root: ElementSpec) -> Self {
        let mut doc = Self {
            baseline: root,
            nodes: Vec::new(),
        };
        doc.rebuild();
        doc
    }

    /// Parse markup into a page whose root is the `<body>` element.
    pub fn from_html(markup: &str) -> Self {
        let html = Html::parse_document(markup);
        let root = Selector::parse("body")
            .ok()
            .and_then(|body| html.select(&body).next())
            .map(ElementSpec::from_element)
            .unwrap_or_else(|| ElementSpec::new("body"));
        Self::new(root)
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    fn rebuild(&mut self) {
        let baseline = self.baseline.clone();
        self.nodes.clear();
        self.insert(&baseline, None);
    }

    fn insert(&mut self, element: &ElementSpec, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Element {
            tag: element.tag.clone(),
            id: element.id.clone(),
            classes: element.classes.clone(),
            attributes: element.attributes.iter().cloned().collect(),
            styles: element.styles.iter().cloned().collect(),
            text: element.text.clone(),
            parent,
            children: Vec::new(),
            hidden_display: None,
        });
        for child in &element.children {
            let child_id = self.insert(child, Some(id));
            self.nodes[id.0].children.push(child_id);
        }
        id
    }

    fn node(&self, node: NodeId) -> Result<&Element, DocumentError> {
        self.nodes.get(node.0).ok_or(DocumentError::UnknownNode(node))
    }

    fn node_mut(&mut self, node: NodeId) -> Result<&mut Element, DocumentError> {
        self.nodes
            .get_mut(node.0)
            .ok_or(DocumentError::UnknownNode(node))
    }

    /// The current tree as a full HTML document, each element stamped.
    fn render(&self) -> String {
        let mut out = String::from("<!DOCTYPE html><html><head></head>");
        if self.nodes.first().is_some_and(|root| root.tag != "body") {
            out.push_str("<body>");
        }
        self.render_into(self.root(), &mut out);
        out.push_str("</html>");
        out
    }

    fn render_into(&self, node: NodeId, out: &mut String) {
        let el = &self.nodes[node.0];
        out.push_str(&format!("<{} {}=\"{}\"", el.tag, STAMP, node.0));
        if let Some(id) = &el.id {
            out.push_str(&format!(" id=\"{}\"", escape_attr(id)));
        }
        if !el.classes.is_empty() {
            out.push_str(&format!(" class=\"{}\"", escape_attr(&el.classes.join(" "))));
        }
        for (name, value) in el.attributes.iter().filter(|(name, _)| *name != STAMP) {
            out.push_str(&format!(" {}=\"{}\"", name, escape_attr(value)));
        }
        if !el.styles.is_empty() {
            let styles: Vec<String> = el.styles.iter().map(|(k, v)| format!("{}: {}", k, v)).collect();
            out.push_str(&format!(" style=\"{}\"", escape_attr(&styles.join("; "))));
        }
        out.push('>');
        if VOID_TAGS.contains(&el.tag.as_str()) {
            return;
        }
        if let Some(text) = &el.text {
            out.push_str(&escape_text(text));
        }
        for child in &el.children {
            self.render_into(*child, out);
        }
        out.push_str(&format!("</{}>", el.tag));
    }

    fn is_ancestor_or_self(&self, candidate: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if n == candidate {
                return true;
            }
            current = self.nodes.get(n.0).and_then(|e| e.parent);
        }
        false
    }

    fn detach(&mut self, node: NodeId) {
        if let Some(parent) = self.nodes[node.0].parent.take() {
            self.nodes[parent.0].children.retain(|c| *c != node);
        }
    }

    pub fn text(&self, node: NodeId) -> Option<&str> {
        self.nodes.get(node.0)?.text.as_deref()
    }

    /// Indented one-line-per-element rendering of the current tree.
    pub fn outline(&self) -> String {
        let mut out = String::new();
        self.outline_into(self.root(), 0, &mut out);
        out
    }

    fn outline_into(&self, node: NodeId, depth: usize, out: &mut String) {
        let el = &self.nodes[node.0];
        out.push_str(&"  ".repeat(depth));
        out.push_str(&el.tag);
        if let Some(id) = &el.id {
            out.push('#');
            out.push_str(id);
        }
        for class in &el.classes {
            out.push('.');
            out.push_str(class);
        }
        if !el.styles.is_empty() {
            let styles: Vec<String> = el
                .styles
                .iter()
                .map(|(k, v)| format!("{}: {}", k, v))
                .collect();
            out.push_str(&format!(" {{{}}}", styles.join("; ")));
        }
        if let Some(text) = &el.text {
            out.push_str(&format!(" \"{}\"", text));
        }
        out.push('\n');
        for child in &el.children {
            self.outline_into(*child, depth + 1, out);
        }
    }
}

impl LiveDocument for PageDocument {
    fn select(&self, selector: &str) -> Result<Vec<NodeId>, DocumentError> {
        if selector.trim().is_empty() {
            return Err(invalid_selector(selector, "empty selector"));
        }
        let parsed = Selector::parse(selector).map_err(|e| invalid_selector(selector, e.to_string()))?;
        let html = Html::parse_document(&self.render());
        Ok(html
            .select(&parsed)
            .filter_map(|el| el.value().attr(STAMP)?.parse().ok())
            .map(NodeId)
            .filter(|n: &NodeId| n.0 < self.nodes.len())
            .collect())
    }

    fn set_style(&mut self, node: NodeId, property: &str, value: &str) -> Result<(), DocumentError> {
        let el = self.node_mut(node)?;
        let property = property.trim().to_ascii_lowercase();
        let value = value.trim();
        if value.is_empty() {
            el.styles.remove(&property);
        } else {
            el.styles.insert(property, value.to_string());
        }
        Ok(())
    }

    fn style(&self, node: NodeId, property: &str) -> Option<String> {
        self.nodes
            .get(node.0)?
            .styles
            .get(&property.to_ascii_lowercase())
            .cloned()
    }

    fn set_visible(&mut self, node: NodeId, visible: bool) -> Result<(), DocumentError> {
        let el = self.node_mut(node)?;
        let hidden = el.styles.get("display").is_some_and(|d| d == "none");
        match (visible, hidden) {
            (false, false) => {
                el.hidden_display = el.styles.get("display").cloned();
                el.styles.insert("display".into(), "none".into());
            }
            (true, true) => match el.hidden_display.take() {
                Some(display) => {
                    el.styles.insert("display".into(), display);
                }
                None => {
                    el.styles.remove("display");
                }
            },
            _ => {}
        }
        Ok(())
    }

    fn is_visible(&self, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            let Some(el) = self.nodes.get(n.0) else {
                return false;
            };
            if el.styles.get("display").is_some_and(|d| d == "none") {
                return false;
            }
            current = el.parent;
        }
        true
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> Result<(), DocumentError> {
        let el = self.node_mut(node)?;
        let name = name.trim().to_ascii_lowercase();
        match name.as_str() {
            "id" => el.id = Some(value.to_string()),
            "class" => {
                el.classes = value.split_whitespace().map(str::to_string).collect();
            }
            "style" => el.styles = parse_declarations(value).into_iter().collect(),
            _ => {
                el.attributes.insert(name, value.to_string());
            }
        }
        Ok(())
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        let el = self.nodes.get(node.0)?;
        match name.to_ascii_lowercase().as_str() {
            "id" => el.id.clone(),
            "class" => (!el.classes.is_empty()).then(|| el.classes.join(" ")),
            other => el.attributes.get(other).cloned(),
        }
    }

    fn add_class(&mut self, node: NodeId, class: &str) -> Result<(), DocumentError> {
        let el = self.node_mut(node)?;
        if !el.classes.iter().any(|c| c == class) {
            el.classes.push(class.to_string());
        }
        Ok(())
    }

    fn remove_class(&mut self, node: NodeId, class: &str) -> Result<(), DocumentError> {
        self.node_mut(node)?.classes.retain(|c| c != class);
        Ok(())
    }

    fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.nodes
            .get(node.0)
            .is_some_and(|e| e.classes.iter().any(|c| c == class))
    }

    fn check_move(
        &self,
        node: NodeId,
        destination: NodeId,
        position: Position,
    ) -> Result<(), DocumentError> {
        self.node(node)?;
        let dest = self.node(destination)?;
        if node == self.root() {
            return Err(DocumentError::RootImmutable);
        }
        if self.is_ancestor_or_self(node, destination) {
            return Err(DocumentError::CycleDetected);
        }
        if matches!(position, Position::Before | Position::After) && dest.parent.is_none() {
            return Err(DocumentError::RootImmutable);
        }
        Ok(())
    }

    fn move_node(
        &mut self,
        node: NodeId,
        destination: NodeId,
        position: Position,
    ) -> Result<(), DocumentError> {
        self.check_move(node, destination, position)?;

        let (parent, anchor) = match position {
            Position::Prepend | Position::Append => (destination, None),
            Position::Before | Position::After => {
                let parent = self.nodes[destination.0]
                    .parent
                    .ok_or(DocumentError::RootImmutable)?;
                (parent, Some(destination))
            }
        };

        self.detach(node);
        let siblings = &mut self.nodes[parent.0].children;
        let index = match (position, anchor) {
            (Position::Prepend, _) => 0,
            (Position::Append, _) => siblings.len(),
            (Position::Before, Some(a)) => siblings.iter().position(|c| *c == a).unwrap_or(0),
            (Position::After, Some(a)) => siblings
                .iter()
                .position(|c| *c == a)
                .map(|i| i + 1)
                .unwrap_or(siblings.len()),
            _ => siblings.len(),
        };
        siblings.insert(index, node);
        self.nodes[node.0].parent = Some(parent);
        Ok(())
    }

    fn reorder_children(&mut self, parent: NodeId, order: &[NodeId]) -> Result<(), DocumentError> {
        let current = self.node(parent)?.children.clone();
        let mut front: Vec<NodeId> = Vec::with_capacity(order.len());
        for child in order {
            if !current.contains(child) {
                return Err(DocumentError::NotAChild {
                    parent,
                    child: *child,
                });
            }
            if !front.contains(child) {
                front.push(*child);
            }
        }
        let rest: Vec<NodeId> = current.into_iter().filter(|c| !front.contains(c)).collect();
        front.extend(rest);
        self.nodes[parent.0].children = front;
        Ok(())
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.nodes
            .get(node.0)
            .map(|e| e.children.clone())
            .unwrap_or_default()
    }

    fn reload(&mut self) {
        self.rebuild();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> PageDocument {
        PageDocument::new(
            ElementSpec::new("body")
                .child(ElementSpec::new("nav").id("navbar").class("sticky"))
                .child(
                    ElementSpec::new("main")
                        .id("main-content")
                        .child(ElementSpec::new("section").id("about").class("card"))
                        .child(ElementSpec::new("section").id("skills").class("card"))
                        .child(
                            ElementSpec::new("section")
                                .id("projects")
                                .class("card")
                                .style("display", "grid"),
                        ),
                ),
        )
    }

    fn one(doc: &PageDocument, selector: &str) -> NodeId {
        doc.select(selector).unwrap()[0]
    }

    fn ids(doc: &PageDocument, nodes: Vec<NodeId>) -> Vec<String> {
        nodes
            .into_iter()
            .filter_map(|n| doc.attribute(n, "id"))
            .collect()
    }

    #[test]
    fn test_select_in_document_order() {
        let doc = page();
        let cards = doc.select("main > .card").unwrap();
        assert_eq!(ids(&doc, cards), vec!["about", "skills", "projects"]);
        assert!(doc.select("#missing").unwrap().is_empty());
        assert!(matches!(
            doc.select("a[href"),
            Err(DocumentError::InvalidSelector { .. })
        ));
        assert!(doc.select("  ").is_err());
    }

    #[test]
    fn test_hide_and_show_restore_display() {
        let mut doc = page();
        let projects = one(&doc, "#projects");
        let main = one(&doc, "#main-content");

        doc.set_visible(main, false).unwrap();
        doc.set_visible(main, false).unwrap();
        assert!(!doc.is_visible(projects));

        doc.set_visible(projects, false).unwrap();
        doc.set_visible(main, true).unwrap();
        assert!(!doc.is_visible(projects));
        doc.set_visible(projects, true).unwrap();
        assert_eq!(doc.style(projects, "display").as_deref(), Some("grid"));
        assert_eq!(doc.style(main, "display"), None);
    }

    #[test]
    fn test_attribute_and_class_edits() {
        let mut doc = page();
        let nav = one(&doc, "nav");
        doc.set_attribute(nav, "data-theme", "dark").unwrap();
        doc.add_class(nav, "glass").unwrap();
        doc.add_class(nav, "glass").unwrap();
        doc.remove_class(nav, "sticky").unwrap();

        assert_eq!(doc.attribute(nav, "DATA-THEME").as_deref(), Some("dark"));
        assert_eq!(ids(&doc, doc.select("[data-theme=dark].glass").unwrap()), vec!["navbar"]);
        assert!(!doc.has_class(nav, "sticky"));
        assert_eq!(doc.attribute(nav, "id").as_deref(), Some("navbar"));
    }

    #[test]
    fn test_move_is_idempotent_and_rejects_cycles() {
        let mut doc = page();
        let nav = one(&doc, "#navbar");
        let main = one(&doc, "#main-content");
        let about = one(&doc, "#about");

        doc.move_node(nav, main, Position::Append).unwrap();
        doc.move_node(nav, main, Position::Append).unwrap();
        assert_eq!(
            ids(&doc, doc.children(main)),
            vec!["about", "skills", "projects", "navbar"]
        );

        doc.move_node(nav, about, Position::Before).unwrap();
        assert_eq!(
            ids(&doc, doc.children(main)),
            vec!["navbar", "about", "skills", "projects"]
        );

        assert_eq!(
            doc.move_node(main, about, Position::Append),
            Err(DocumentError::CycleDetected)
        );
        assert_eq!(
            doc.move_node(doc.root(), main, Position::Append),
            Err(DocumentError::RootImmutable)
        );
        assert_eq!(
            doc.move_node(nav, doc.root(), Position::After),
            Err(DocumentError::RootImmutable)
        );
    }

    #[test]
    fn test_reorder_children() {
        let mut doc = page();
        let main = one(&doc, "#main-content");
        let projects = one(&doc, "#projects");
        let skills = one(&doc, "#skills");

        doc.reorder_children(main, &[projects, skills]).unwrap();
        doc.reorder_children(main, &[projects, skills]).unwrap();
        assert_eq!(
            ids(&doc, doc.children(main)),
            vec!["projects", "skills", "about"]
        );

        let nav = one(&doc, "#navbar");
        assert!(matches!(
            doc.reorder_children(main, &[nav]),
            Err(DocumentError::NotAChild { .. })
        ));
    }

    #[test]
    fn test_reload_restores_baseline() {
        let mut doc = page();
        let before = doc.outline();
        let nav = one(&doc, "#navbar");
        let main = one(&doc, "#main-content");

        doc.set_style(nav, "background-color", "black").unwrap();
        doc.move_node(nav, main, Position::Prepend).unwrap();
        assert_ne!(doc.outline(), before);

        doc.reload();
        assert_eq!(doc.outline(), before);
        assert_eq!(one(&doc, "#navbar"), nav);
    }

    #[test]
    fn test_structural_and_sibling_selectors() {
        let doc = page();
        assert_eq!(ids(&doc, doc.select("#about + section").unwrap()), vec!["skills"]);
        assert_eq!(ids(&doc, doc.select("#about ~ .card").unwrap()), vec!["skills", "projects"]);
        assert_eq!(ids(&doc, doc.select("main > :last-child").unwrap()), vec!["projects"]);
        assert_eq!(
            ids(&doc, doc.select("section:not(#skills)").unwrap()),
            vec!["about", "projects"]
        );
        assert_eq!(ids(&doc, doc.select("section, nav").unwrap()), vec!["navbar", "about", "skills", "projects"]);
    }

    #[test]
    fn test_selection_follows_moves() {
        let mut doc = page();
        let nav = one(&doc, "#navbar");
        let skills = one(&doc, "#skills");
        doc.move_node(nav, skills, Position::After).unwrap();
        assert_eq!(ids(&doc, doc.select("main > *").unwrap()), vec!["about", "skills", "navbar", "projects"]);
        assert!(doc.select("body > nav").unwrap().is_empty());
    }

    #[test]
    fn test_check_move_leaves_tree_untouched() {
        let doc = page();
        let before = doc.outline();
        let main = one(&doc, "#main-content");
        let about = one(&doc, "#about");
        let nav = one(&doc, "#navbar");

        assert_eq!(doc.check_move(main, about, Position::Prepend), Err(DocumentError::CycleDetected));
        assert_eq!(doc.check_move(nav, about, Position::Prepend), Ok(()));
        assert_eq!(
            doc.check_move(nav, NodeId(99), Position::Append),
            Err(DocumentError::UnknownNode(NodeId(99)))
        );
        assert_eq!(doc.outline(), before);
    }

    #[test]
    fn test_from_html() {
        let doc = PageDocument::from_html(
            r#"<!DOCTYPE html><html><body>
                <nav id="navbar" class="sticky top"><a href="/x?a=1&amp;b=2">Home &amp; away</a></nav>
                <main id="main-content" style="color: red; margin:0">
                    <section id="about"><h2>About</h2></section>
                    <img id="avatar" src="me.png">
                </main>
            </body></html>"#,
        );
        let nav = one(&doc, "#navbar");
        assert!(doc.has_class(nav, "top"));
        let link = one(&doc, "nav > a");
        assert_eq!(doc.attribute(link, "href").as_deref(), Some("/x?a=1&b=2"));
        assert_eq!(doc.text(link), Some("Home & away"));

        let main = one(&doc, "main");
        assert_eq!(doc.style(main, "margin").as_deref(), Some("0"));
        assert_eq!(ids(&doc, doc.children(main)), vec!["about", "avatar"]);
        assert_eq!(ids(&doc, doc.select("img + *, #about ~ img").unwrap()), vec!["avatar"]);
    }

    #[test]
    fn test_style_attribute_replaces_inline_styles() {
        let mut doc = page();
        let about = one(&doc, "#about");
        doc.set_attribute(about, "style", "color: red; ; margin:0").unwrap();
        assert_eq!(doc.style(about, "color").as_deref(), Some("red"));
        assert_eq!(doc.style(about, "margin").as_deref(), Some("0"));

        doc.set_style(about, "color", "").unwrap();
        assert_eq!(doc.style(about, "color"), None);
    }
}
