//! The graph host: the diagram editor the splicer mutates.

use crate::model::{Attrs, Inputs, NodeModel};

/// Reference to a node owned by a graph host (its current element id).
pub type NodeRef = String;

/// Properties applied to a node through [`GraphHost::set_properties`].
///
/// Empty fields leave the node untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Properties {
    /// Domain attributes merged onto the node.
    pub attrs: Attrs,
    /// Host the node is attached to (boundary attachments).
    pub attached_to: Option<NodeRef>,
    /// Expanded marker of container nodes.
    pub expanded: Option<bool>,
    /// Entries merged into the node's input-parameter extension.
    pub inputs: Inputs,
}

impl Properties {
    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty() && self.attached_to.is_none() && self.expanded.is_none() && self.inputs.is_empty()
    }
}

/// Capabilities the transformation needs from a diagram.
///
/// Every mutation reports failure as `None`/`false` instead of an error;
/// the splicer turns a refused operation into a failed sub-insertion.
pub trait GraphHost {
    /// Current tree of the diagram, rooted at the process node.
    fn root(&self) -> NodeModel;

    /// Creates a node of `type` under `parent`.
    fn create_node(
        &mut self,
        r#type: &str,
        parent: &NodeRef,
    ) -> Option<NodeRef>;

    /// Replaces `existing` in place by a fresh node of `type`, keeping its
    /// containment, connections and attachments.
    fn replace_node(
        &mut self,
        existing: &NodeRef,
        r#type: &str,
    ) -> Option<NodeRef>;

    /// Connects `source` to `target` with an edge of `type`.
    fn connect(
        &mut self,
        source: &NodeRef,
        target: &NodeRef,
        r#type: &str,
    ) -> Option<NodeRef>;

    fn set_properties(
        &mut self,
        node: &NodeRef,
        props: &Properties,
    ) -> bool;
}
