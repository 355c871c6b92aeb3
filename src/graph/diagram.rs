//! In-memory diagram backed by a petgraph arena.
//!
//! Every element (including edges) is an arena node. Containment, artifacts,
//! edge endpoints and boundary attachments are arena links, so an element
//! replaced in place keeps every reference pointing at it.

use std::collections::HashMap;

use petgraph::{
    Direction,
    graph::{DiGraph, NodeIndex},
    visit::EdgeRef,
};
use tracing::{trace, warn};

use crate::{
    ActformError, Result,
    graph::{ARTIFACT_EDGE_TYPES, GraphHost, NodeKind, NodeRef, Properties},
    model::{Attrs, Inputs, NodeModel},
    utils,
};

/// Arena element: the per-node payload of a [`Diagram`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Element {
    pub id: String,
    pub r#type: String,
    pub attrs: Attrs,
    pub inputs: Inputs,
    pub expanded: Option<bool>,
}

impl Element {
    fn new(
        id: String,
        r#type: &str,
    ) -> Self {
        Self {
            id,
            r#type: r#type.to_string(),
            ..Default::default()
        }
    }

    fn from_model(node: &NodeModel) -> Self {
        Self {
            id: node.id.clone(),
            r#type: node.r#type.clone(),
            attrs: node.attrs.clone(),
            inputs: node.inputs.clone(),
            expanded: node.is_expanded,
        }
    }
}

/// Arena link between two elements. Ordered links carry an insertion rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Link {
    Child(usize),
    Artifact(usize),
    Source,
    Target,
    AttachedTo,
}

/// In-memory graph host.
#[derive(Debug, Clone)]
pub struct Diagram {
    graph: DiGraph<Element, Link>,
    ids: HashMap<String, NodeIndex>,
    root: NodeIndex,
    rank: usize,
}

impl Diagram {
    /// Builds a diagram from a process tree.
    ///
    /// Fails on empty or duplicate ids and on references that do not resolve.
    pub fn from_model(root: &NodeModel) -> Result<Self> {
        if root.id.is_empty() {
            return Err(ActformError::Graph("missing id in root node".into()));
        }
        let mut graph = DiGraph::new();
        let root_idx = graph.add_node(Element::from_model(root));
        let mut diagram = Self {
            graph,
            ids: HashMap::from([(root.id.clone(), root_idx)]),
            root: root_idx,
            rank: 0,
        };

        diagram.insert_tree(root_idx, root)?;
        diagram.link_refs(root)?;
        Ok(diagram)
    }

    pub fn from_json(s: &str) -> Result<Self> {
        let root = serde_json::from_str::<NodeModel>(s).map_err(|e| ActformError::Graph(format!("invalid diagram: {}", e)))?;
        Self::from_model(&root)
    }

    /// Renders the diagram back into a tree, references by current ids.
    pub fn to_model(&self) -> NodeModel {
        self.render(self.root)
    }

    pub fn root_id(&self) -> &str {
        &self.graph[self.root].id
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn contains(
        &self,
        id: &str,
    ) -> bool {
        self.ids.contains_key(id)
    }

    /// get element by id
    pub fn element(
        &self,
        id: &str,
    ) -> Option<&Element> {
        self.ids.get(id).map(|idx| &self.graph[*idx])
    }

    /// Id of the element containing `id`.
    pub fn parent(
        &self,
        id: &str,
    ) -> Option<&str> {
        let idx = *self.ids.get(id)?;
        self.graph
            .edges_directed(idx, Direction::Incoming)
            .find(|e| matches!(e.weight(), Link::Child(_) | Link::Artifact(_)))
            .map(|e| self.graph[e.source()].id.as_str())
    }

    /// Ids of the children of `id`, in insertion order.
    pub fn children(
        &self,
        id: &str,
    ) -> Vec<&str> {
        self.ids.get(id).map(|idx| self.ordered(*idx, false).into_iter().map(|c| self.graph[c].id.as_str()).collect()).unwrap_or_default()
    }

    /// Source and target ids of an edge element.
    pub fn endpoints(
        &self,
        id: &str,
    ) -> Option<(&str, &str)> {
        let idx = *self.ids.get(id)?;
        let source = self.linked(idx, Link::Source)?;
        let target = self.linked(idx, Link::Target)?;
        Some((self.graph[source].id.as_str(), self.graph[target].id.as_str()))
    }

    /// Id of the host a boundary element is attached to.
    pub fn attached_to(
        &self,
        id: &str,
    ) -> Option<&str> {
        let idx = *self.ids.get(id)?;
        self.linked(idx, Link::AttachedTo).map(|host| self.graph[host].id.as_str())
    }

    /// Ids of the edges ending at `id`.
    pub fn incoming(
        &self,
        id: &str,
    ) -> Vec<&str> {
        self.referrers(id, Link::Target)
    }

    /// Ids of the edges starting at `id`.
    pub fn outgoing(
        &self,
        id: &str,
    ) -> Vec<&str> {
        self.referrers(id, Link::Source)
    }

    /// Output a human-readable representation of the diagram
    pub fn schema(&self) -> String {
        let mut lines = Vec::new();

        lines.push("=== Diagram ===".to_string());
        lines.push(format!("Elements: {}", self.graph.node_count()));
        lines.push(String::new());

        lines.push("--- Elements ---".to_string());
        for idx in self.graph.node_indices() {
            let element = &self.graph[idx];
            let parent = self.parent(&element.id).unwrap_or("-");
            lines.push(format!("[{}] {} (parent: {})", element.id, element.r#type, parent));
        }
        lines.push(String::new());

        lines.push("--- Connections ---".to_string());
        for idx in self.graph.node_indices() {
            let element = &self.graph[idx];
            if let Some((source, target)) = self.endpoints(&element.id) {
                lines.push(format!("{} --[{}]--> {}", source, element.id, target));
            }
            if let Some(host) = self.attached_to(&element.id) {
                lines.push(format!("{} @ {}", element.id, host));
            }
        }

        lines.join("\n")
    }

    fn next_rank(&mut self) -> usize {
        self.rank += 1;
        self.rank
    }

    fn add_element(
        &mut self,
        element: Element,
    ) -> Result<NodeIndex> {
        if element.id.is_empty() {
            return Err(ActformError::Graph(format!("missing id in node of type {}", element.r#type)));
        }
        if self.ids.contains_key(&element.id) {
            return Err(ActformError::Graph(format!("duplicate node id {}", element.id)));
        }
        let id = element.id.clone();
        let idx = self.graph.add_node(element);
        self.ids.insert(id, idx);
        Ok(idx)
    }

    fn insert_tree(
        &mut self,
        parent: NodeIndex,
        node: &NodeModel,
    ) -> Result<()> {
        for child in node.children.iter() {
            let idx = self.add_element(Element::from_model(child))?;
            let rank = self.next_rank();
            self.graph.add_edge(parent, idx, Link::Child(rank));
            self.insert_tree(idx, child)?;
        }
        for artifact in node.artifacts.iter() {
            let idx = self.add_element(Element::from_model(artifact))?;
            let rank = self.next_rank();
            self.graph.add_edge(parent, idx, Link::Artifact(rank));
            self.insert_tree(idx, artifact)?;
        }
        Ok(())
    }

    fn link_refs(
        &mut self,
        node: &NodeModel,
    ) -> Result<()> {
        for n in node.children.iter().chain(node.artifacts.iter()) {
            let from = self.ids[&n.id];
            for (reference, link) in [(&n.source_ref, Link::Source), (&n.target_ref, Link::Target), (&n.attached_to_ref, Link::AttachedTo)] {
                let Some(reference) = reference else {
                    continue;
                };
                let to = *self.ids.get(reference).ok_or_else(|| ActformError::ReferenceIntegrity {
                    node_id: n.id.clone(),
                    reference: reference.clone(),
                })?;
                self.graph.add_edge(from, to, link);
            }
            self.link_refs(n)?;
        }
        Ok(())
    }

    fn ordered(
        &self,
        idx: NodeIndex,
        artifacts: bool,
    ) -> Vec<NodeIndex> {
        let mut ranked: Vec<(usize, NodeIndex)> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .filter_map(|e| match (*e.weight(), artifacts) {
                (Link::Child(rank), false) | (Link::Artifact(rank), true) => Some((rank, e.target())),
                _ => None,
            })
            .collect();
        ranked.sort_by_key(|(rank, _)| *rank);
        ranked.into_iter().map(|(_, idx)| idx).collect()
    }

    fn linked(
        &self,
        idx: NodeIndex,
        link: Link,
    ) -> Option<NodeIndex> {
        self.graph.edges_directed(idx, Direction::Outgoing).find(|e| *e.weight() == link).map(|e| e.target())
    }

    fn referrers(
        &self,
        id: &str,
        link: Link,
    ) -> Vec<&str> {
        let Some(idx) = self.ids.get(id) else {
            return Vec::new();
        };
        let mut referrers: Vec<&str> =
            self.graph.edges_directed(*idx, Direction::Incoming).filter(|e| *e.weight() == link).map(|e| self.graph[e.source()].id.as_str()).collect();
        referrers.sort_unstable();
        referrers
    }

    fn render(
        &self,
        idx: NodeIndex,
    ) -> NodeModel {
        let element = &self.graph[idx];
        let reference = |link| self.linked(idx, link).map(|to| self.graph[to].id.clone());

        NodeModel {
            id: element.id.clone(),
            r#type: element.r#type.clone(),
            attrs: element.attrs.clone(),
            children: self.ordered(idx, false).into_iter().map(|c| self.render(c)).collect(),
            artifacts: self.ordered(idx, true).into_iter().map(|a| self.render(a)).collect(),
            source_ref: reference(Link::Source),
            target_ref: reference(Link::Target),
            attached_to_ref: reference(Link::AttachedTo),
            is_expanded: element.expanded,
            inputs: element.inputs.clone(),
        }
    }
}

impl GraphHost for Diagram {
    fn root(&self) -> NodeModel {
        self.to_model()
    }

    fn create_node(
        &mut self,
        r#type: &str,
        parent: &NodeRef,
    ) -> Option<NodeRef> {
        let Some(parent_idx) = self.ids.get(parent).copied() else {
            warn!(parent = %parent, "create_node: unknown parent");
            return None;
        };
        let kind = NodeKind::of(r#type);
        if kind == NodeKind::Edge {
            warn!(type_tag = r#type, "create_node: edges must be created through connect");
            return None;
        }

        let idx = self.add_element(Element::new(utils::element_id(r#type), r#type)).ok()?;
        let rank = self.next_rank();
        let link = if kind == NodeKind::Artifact { Link::Artifact(rank) } else { Link::Child(rank) };
        self.graph.add_edge(parent_idx, idx, link);

        let id = self.graph[idx].id.clone();
        trace!("diagram::create_node({}, {}) -> {}", r#type, parent, id);
        Some(id)
    }

    fn replace_node(
        &mut self,
        existing: &NodeRef,
        r#type: &str,
    ) -> Option<NodeRef> {
        let Some(idx) = self.ids.get(existing).copied() else {
            warn!(node = %existing, "replace_node: unknown node");
            return None;
        };
        if idx == self.root || NodeKind::of(r#type) == NodeKind::Edge {
            warn!(node = %existing, type_tag = r#type, "replace_node: node cannot be replaced by this type");
            return None;
        }

        let id = utils::element_id(r#type);
        self.ids.remove(existing);
        self.ids.insert(id.clone(), idx);
        self.graph[idx] = Element::new(id.clone(), r#type);

        trace!("diagram::replace_node({}, {}) -> {}", existing, r#type, id);
        Some(id)
    }

    fn connect(
        &mut self,
        source: &NodeRef,
        target: &NodeRef,
        r#type: &str,
    ) -> Option<NodeRef> {
        if NodeKind::of(r#type) != NodeKind::Edge {
            warn!(type_tag = r#type, "connect: not an edge type");
            return None;
        }
        let (Some(source_idx), Some(target_idx)) = (self.ids.get(source).copied(), self.ids.get(target).copied()) else {
            warn!(source = %source, target = %target, "connect: unknown endpoint");
            return None;
        };
        let Some(parent) = self.parent(source).map(|p| self.ids[p]) else {
            warn!(source = %source, "connect: source has no container");
            return None;
        };

        let idx = self.add_element(Element::new(utils::element_id(r#type), r#type)).ok()?;
        let rank = self.next_rank();
        let link = if ARTIFACT_EDGE_TYPES.contains(&r#type) { Link::Artifact(rank) } else { Link::Child(rank) };
        self.graph.add_edge(parent, idx, link);
        self.graph.add_edge(idx, source_idx, Link::Source);
        self.graph.add_edge(idx, target_idx, Link::Target);

        let id = self.graph[idx].id.clone();
        trace!("diagram::connect({}, {}, {}) -> {}", source, target, r#type, id);
        Some(id)
    }

    fn set_properties(
        &mut self,
        node: &NodeRef,
        props: &Properties,
    ) -> bool {
        let Some(idx) = self.ids.get(node).copied() else {
            warn!(node = %node, "set_properties: unknown node");
            return false;
        };
        let host = match &props.attached_to {
            Some(host) => match self.ids.get(host) {
                Some(host_idx) if *host_idx != idx => Some(*host_idx),
                _ => {
                    warn!(node = %node, host = %host, "set_properties: invalid attachment host");
                    return false;
                }
            },
            None => None,
        };

        if let Some(host) = host {
            loop {
                let stale = self.graph.edges_directed(idx, Direction::Outgoing).find(|e| *e.weight() == Link::AttachedTo).map(|e| e.id());
                let Some(stale) = stale else {
                    break;
                };
                self.graph.remove_edge(stale);
            }
            self.graph.add_edge(idx, host, Link::AttachedTo);
        }

        let element = &mut self.graph[idx];
        element.attrs.extend(props.attrs.iter().map(|(k, v)| (k.clone(), v.clone())));
        element.inputs.extend(props.inputs.iter().map(|(k, v)| (k.clone(), v.clone())));
        if props.expanded.is_some() {
            element.expanded = props.expanded;
        }
        true
    }
}

impl TryFrom<&NodeModel> for Diagram {
    type Error = ActformError;

    fn try_from(model: &NodeModel) -> Result<Self> {
        Self::from_model(model)
    }
}
