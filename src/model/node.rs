use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Domain attributes of a node. A `None` value is an attribute that is
/// declared but left undefined.
pub type Attrs = BTreeMap<String, Option<String>>;

/// Input parameters carried by a node's parameter extension.
pub type Inputs = BTreeMap<String, String>;

/// A typed graph vertex.
///
/// Flow elements, containers, boundary attachments, artifacts and edges all
/// share this shape; edges use `source_ref`/`target_ref` and boundary
/// attachments use `attached_to_ref`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeModel {
    pub id: String,
    #[serde(rename = "type")]
    pub r#type: String,
    #[serde(default, skip_serializing_if = "Attrs::is_empty")]
    pub attrs: Attrs,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeModel>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<NodeModel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attached_to_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_expanded: Option<bool>,
    #[serde(default, skip_serializing_if = "Inputs::is_empty")]
    pub inputs: Inputs,
}

impl NodeModel {
    pub fn new(
        id: impl Into<String>,
        r#type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            r#type: r#type.into(),
            ..Default::default()
        }
    }

    /// An edge of the given type between two node ids.
    pub fn edge(
        id: impl Into<String>,
        r#type: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            source_ref: Some(source.into()),
            target_ref: Some(target.into()),
            ..Self::new(id, r#type)
        }
    }

    /// A boundary attachment hosted by `host`.
    pub fn boundary(
        id: impl Into<String>,
        r#type: impl Into<String>,
        host: impl Into<String>,
    ) -> Self {
        Self {
            attached_to_ref: Some(host.into()),
            ..Self::new(id, r#type)
        }
    }

    pub fn with_attr(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.attrs.insert(key.into(), Some(value.into()));
        self
    }

    /// Declares an attribute without a value.
    pub fn with_undefined(
        mut self,
        key: impl Into<String>,
    ) -> Self {
        self.attrs.insert(key.into(), None);
        self
    }

    pub fn with_child(
        mut self,
        child: NodeModel,
    ) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_artifact(
        mut self,
        artifact: NodeModel,
    ) -> Self {
        self.artifacts.push(artifact);
        self
    }

    pub fn expanded(
        mut self,
        expanded: bool,
    ) -> Self {
        self.is_expanded = Some(expanded);
        self
    }

    /// Defined value of an attribute, `None` when absent or undefined.
    pub fn attr(
        &self,
        key: &str,
    ) -> Option<&str> {
        self.attrs.get(key).and_then(|v| v.as_deref())
    }

    /// Attributes that carry a value.
    pub fn defined_attrs(&self) -> impl Iterator<Item = (&String, &String)> {
        self.attrs.iter().filter_map(|(k, v)| v.as_ref().map(|v| (k, v)))
    }

    /// Depth-first search for a node by id, including this node.
    pub fn find(
        &self,
        id: &str,
    ) -> Option<&NodeModel> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().chain(self.artifacts.iter()).find_map(|n| n.find(id))
    }

    /// Id of the node that directly contains `id` as a child or artifact.
    pub fn parent_of(
        &self,
        id: &str,
    ) -> Option<&str> {
        if self.children.iter().chain(self.artifacts.iter()).any(|n| n.id == id) {
            return Some(&self.id);
        }
        self.children.iter().chain(self.artifacts.iter()).find_map(|n| n.parent_of(id))
    }
}
