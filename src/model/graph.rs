use serde::{Deserialize, Serialize};

use crate::{
    ActformError, Result,
    graph::NodeKind,
    model::NodeModel,
};

/// A graph fragment: an ordered list of top-level nodes.
///
/// Template detectors and replacements are fragments holding exactly one
/// top-level flow node; artifacts and edges at the top level do not count.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphModel {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub nodes: Vec<NodeModel>,
}

impl GraphModel {
    pub fn from_json(s: &str) -> Result<Self> {
        serde_json::from_str::<GraphModel>(s).map_err(|e| ActformError::Convert(format!("invalid graph fragment: {}", e)))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Fragment holding a single top-level node.
    pub fn single(node: NodeModel) -> Self {
        Self {
            id: String::new(),
            nodes: vec![node],
        }
    }

    /// Top-level nodes that take part in the primary flow.
    pub fn flow_nodes(&self) -> impl Iterator<Item = &NodeModel> {
        self.nodes.iter().filter(|n| NodeKind::of(&n.r#type).is_flow_element())
    }

    /// The only top-level flow node, `None` when there are zero or several.
    pub fn single_flow_node(&self) -> Option<&NodeModel> {
        let mut flow_nodes = self.flow_nodes();
        match (flow_nodes.next(), flow_nodes.next()) {
            (Some(node), None) => Some(node),
            _ => None,
        }
    }
}
