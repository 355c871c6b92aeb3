//! Structural classification of node type tags.

use serde::{Deserialize, Serialize};

/// Type tags of edge kinds.
pub const EDGE_TYPES: &[&str] = &[
    "bpmn:SequenceFlow",
    "bpmn:MessageFlow",
    "bpmn:Association",
    "bpmn:DataInputAssociation",
    "bpmn:DataOutputAssociation",
];
/// Edge type tags that connect artifacts and are placed beside them.
pub const ARTIFACT_EDGE_TYPES: &[&str] = &["bpmn:Association"];
/// Type tags of boundary attachments.
pub const BOUNDARY_TYPES: &[&str] = &["bpmn:BoundaryEvent"];
/// Type tags of container kinds holding nested flow.
pub const CONTAINER_TYPES: &[&str] = &["bpmn:Process", "bpmn:SubProcess", "bpmn:Transaction", "bpmn:AdHocSubProcess"];
/// Type tags of auxiliary nodes that are not part of the primary flow.
pub const ARTIFACT_TYPES: &[&str] = &["bpmn:TextAnnotation", "bpmn:Group"];

/// Default namespace of domain-specific task kinds.
pub const DEFAULT_DOMAIN_PREFIX: &str = "quantme:";

/// Structural kind of a node.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, strum::AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NodeKind {
    /// Plain flow node (tasks, events, gateways, domain-specific tasks).
    Flow,
    /// Sub-graph holding nested children.
    Container,
    /// Node attached to the boundary of a host node.
    Boundary,
    /// Connection between two nodes.
    Edge,
    /// Auxiliary node outside the primary flow.
    Artifact,
}

impl NodeKind {
    pub fn of(type_tag: &str) -> Self {
        if EDGE_TYPES.contains(&type_tag) {
            NodeKind::Edge
        } else if BOUNDARY_TYPES.contains(&type_tag) {
            NodeKind::Boundary
        } else if CONTAINER_TYPES.contains(&type_tag) {
            NodeKind::Container
        } else if ARTIFACT_TYPES.contains(&type_tag) {
            NodeKind::Artifact
        } else {
            NodeKind::Flow
        }
    }

    /// Whether a node of this kind counts as a top-level flow node of a fragment.
    pub fn is_flow_element(self) -> bool {
        matches!(self, NodeKind::Flow | NodeKind::Container)
    }
}

/// Recognises domain-specific node kinds by their type-tag namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classifier {
    domain_prefix: String,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(DEFAULT_DOMAIN_PREFIX)
    }
}

impl Classifier {
    pub fn new(domain_prefix: impl Into<String>) -> Self {
        Self {
            domain_prefix: domain_prefix.into(),
        }
    }

    pub fn domain_prefix(&self) -> &str {
        &self.domain_prefix
    }

    pub fn is_domain(
        &self,
        type_tag: &str,
    ) -> bool {
        !self.domain_prefix.is_empty() && type_tag.starts_with(&self.domain_prefix) && type_tag.len() > self.domain_prefix.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_kind_of() {
        assert_eq!(NodeKind::of("bpmn:SequenceFlow"), NodeKind::Edge);
        assert_eq!(NodeKind::of("bpmn:BoundaryEvent"), NodeKind::Boundary);
        assert_eq!(NodeKind::of("bpmn:SubProcess"), NodeKind::Container);
        assert_eq!(NodeKind::of("bpmn:TextAnnotation"), NodeKind::Artifact);
        assert_eq!(NodeKind::of("quantme:DataPreparationTask"), NodeKind::Flow);
        assert_eq!(NodeKind::of("bpmn:ServiceTask").as_ref(), "flow");
    }

    #[test]
    fn test_classifier_is_domain() {
        let classifier = Classifier::default();
        assert!(classifier.is_domain("quantme:QuantumCircuitLoadingTask"));
        assert!(!classifier.is_domain("bpmn:ServiceTask"));
        assert!(!classifier.is_domain("quantme:"));

        let classifier = Classifier::new("");
        assert!(!classifier.is_domain("quantme:QuantumCircuitLoadingTask"));
    }
}
