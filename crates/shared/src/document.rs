//! The live page the theme executor mutates.
//!
//! Implementations own the element tree; the executor only reaches it through
//! this trait, so generated instructions never touch anything else.

use parking_lot::Mutex;
use std::sync::Arc;

use crate::theme::Position;

/// Opaque handle to an element of a [`LiveDocument`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DocumentError {
    #[error("Invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("Unknown element {0:?}")]
    UnknownNode(NodeId),

    #[error("Cannot move an element into itself or its descendants")]
    CycleDetected,

    #[error("Element {child:?} is not a child of {parent:?}")]
    NotAChild { parent: NodeId, child: NodeId },

    #[error("Operation not permitted on the document root")]
    RootImmutable,
}

pub trait LiveDocument: Send {
    /// All elements matching `selector`, in document order.
    fn select(&self, selector: &str) -> Result<Vec<NodeId>, DocumentError>;

    /// Set an inline style property. An empty value removes the property.
    fn set_style(&mut self, node: NodeId, property: &str, value: &str) -> Result<(), DocumentError>;

    fn style(&self, node: NodeId, property: &str) -> Option<String>;

    fn set_visible(&mut self, node: NodeId, visible: bool) -> Result<(), DocumentError>;

    /// False when the element or any ancestor is hidden.
    fn is_visible(&self, node: NodeId) -> bool;

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> Result<(), DocumentError>;

    fn attribute(&self, node: NodeId, name: &str) -> Option<String>;

    fn add_class(&mut self, node: NodeId, class: &str) -> Result<(), DocumentError>;

    fn remove_class(&mut self, node: NodeId, class: &str) -> Result<(), DocumentError>;

    fn has_class(&self, node: NodeId, class: &str) -> bool;

    /// Whether `move_node` with these arguments would succeed. Never mutates.
    fn check_move(
        &self,
        node: NodeId,
        destination: NodeId,
        position: Position,
    ) -> Result<(), DocumentError>;

    fn move_node(
        &mut self,
        node: NodeId,
        destination: NodeId,
        position: Position,
    ) -> Result<(), DocumentError>;

    /// Put the listed children of `parent` first, in the given order; other
    /// children keep their relative order after them.
    fn reorder_children(&mut self, parent: NodeId, order: &[NodeId]) -> Result<(), DocumentError>;

    fn children(&self, node: NodeId) -> Vec<NodeId>;

    /// Discard every mutation and return to the declared baseline.
    fn reload(&mut self);
}

/// The process-wide document handle. Writers serialize on the lock.
pub type SharedDocument = Arc<Mutex<dyn LiveDocument>>;
