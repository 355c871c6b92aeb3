//! Fragment splicing: inserting a replacement fragment into a target graph.
//!
//! The fragment tree is walked depth-first, pre-order. At every container
//! level children are inserted plain nodes first, then boundary attachments,
//! then edges, so each reference is resolvable through the [`IdentifierMap`]
//! by the time it is needed. A failed child marks the splice as failed but
//! the remaining siblings are still inserted.

mod ident;

use tracing::{debug, warn};

pub use ident::IdentifierMap;

use crate::{
    ActformError, Result,
    graph::{GraphHost, NodeKind, NodeRef, Properties},
    model::{GraphModel, Inputs, NodeModel},
    parser::FragmentParser,
};

/// Result of splicing one fragment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpliceOutcome {
    /// Every insertion, connection and property update succeeded.
    pub success: bool,
    /// Target-graph id of the inserted fragment root.
    pub root: Option<NodeRef>,
    /// Fragment-local ids mapped to their target-graph ids.
    pub ids: IdentifierMap,
}

/// Splices serialized replacement fragments into a graph host.
pub struct FragmentSplicer<'a> {
    parser: &'a dyn FragmentParser,
}

impl<'a> FragmentSplicer<'a> {
    pub fn new(parser: &'a dyn FragmentParser) -> Self {
        Self {
            parser,
        }
    }

    /// Parses `fragment` and splices it under `parent`, replacing `anchor`
    /// when one is given.
    ///
    /// Fails without touching the host when the fragment cannot be parsed or
    /// does not hold exactly one top-level flow node.
    pub async fn splice<H>(
        &self,
        host: &mut H,
        anchor: Option<&NodeModel>,
        fragment: &str,
        parent: &NodeRef,
    ) -> Result<SpliceOutcome>
    where
        H: GraphHost + ?Sized,
    {
        let fragment = self.parser.parse(fragment).await?;
        splice_graph(host, anchor, &fragment, parent)
    }
}

/// Splices an already parsed fragment.
pub fn splice_graph<H>(
    host: &mut H,
    anchor: Option<&NodeModel>,
    fragment: &GraphModel,
    parent: &NodeRef,
) -> Result<SpliceOutcome>
where
    H: GraphHost + ?Sized,
{
    let root = fragment.single_flow_node().ok_or_else(|| {
        ActformError::MalformedFragment(format!("fragment '{}' must hold exactly one top-level flow node, found {}", fragment.id, fragment.flow_nodes().count()))
    })?;

    let mut ids = IdentifierMap::new();
    let inserted = insert_node(host, root, anchor.map(|a| &a.id), parent, &mut ids);
    let mut success = inserted.success;

    if let (Some(anchor), Some(root_ref)) = (anchor, inserted.node.as_ref()) {
        success &= carry_over(host, anchor, root_ref);
    }

    debug!(fragment = %fragment.id, root = ?inserted.node, inserted = ids.len(), success, "fragment spliced");
    Ok(SpliceOutcome {
        success,
        root: inserted.node,
        ids,
    })
}

struct Inserted {
    success: bool,
    node: Option<NodeRef>,
}

impl Inserted {
    fn failed() -> Self {
        Self {
            success: false,
            node: None,
        }
    }
}

fn insert_node<H>(
    host: &mut H,
    node: &NodeModel,
    anchor: Option<&NodeRef>,
    parent: &NodeRef,
    ids: &mut IdentifierMap,
) -> Inserted
where
    H: GraphHost + ?Sized,
{
    let kind = NodeKind::of(&node.r#type);
    let created = match anchor {
        Some(existing) if !matches!(kind, NodeKind::Edge | NodeKind::Boundary) => host.replace_node(existing, &node.r#type),
        _ => host.create_node(&node.r#type, parent),
    };
    let Some(created) = created else {
        warn!(node = %node.id, type_tag = %node.r#type, parent = %parent, "host refused to insert node");
        return Inserted::failed();
    };
    ids.insert(node.id.clone(), created.clone());

    let mut success = true;
    let mut props = Properties {
        attrs: node.attrs.clone(),
        inputs: node.inputs.clone(),
        ..Default::default()
    };
    if kind == NodeKind::Container {
        props.expanded = node.is_expanded;
    }
    if kind == NodeKind::Boundary {
        match ids.resolve(node.attached_to_ref.as_deref()) {
            Some(attached_to) => props.attached_to = Some(attached_to.clone()),
            None => {
                warn!(node = %node.id, reference = ?node.attached_to_ref, "boundary host not inserted");
                success = false;
            }
        }
    }
    if !props.is_empty() && !host.set_properties(&created, &props) {
        warn!(node = %node.id, created = %created, "host refused node properties");
        success = false;
    }

    success &= insert_children(host, &node.children, &created, ids);
    success &= insert_artifacts(host, &node.artifacts, &created, ids);

    Inserted {
        success,
        node: Some(created),
    }
}

fn insert_children<H>(
    host: &mut H,
    children: &[NodeModel],
    parent: &NodeRef,
    ids: &mut IdentifierMap,
) -> bool
where
    H: GraphHost + ?Sized,
{
    let (edges, nodes): (Vec<&NodeModel>, Vec<&NodeModel>) = children.iter().partition(|c| NodeKind::of(&c.r#type) == NodeKind::Edge);
    let (boundaries, plain): (Vec<&NodeModel>, Vec<&NodeModel>) = nodes.into_iter().partition(|c| NodeKind::of(&c.r#type) == NodeKind::Boundary);

    let mut success = true;
    for child in plain.into_iter().chain(boundaries) {
        success &= insert_node(host, child, None, parent, ids).success;
    }
    for edge in edges {
        success &= insert_edge(host, edge, ids);
    }
    success
}

/// Artifacts are always inserted fresh; connecting artifacts go last.
fn insert_artifacts<H>(
    host: &mut H,
    artifacts: &[NodeModel],
    parent: &NodeRef,
    ids: &mut IdentifierMap,
) -> bool
where
    H: GraphHost + ?Sized,
{
    let (edges, nodes): (Vec<&NodeModel>, Vec<&NodeModel>) = artifacts.iter().partition(|a| NodeKind::of(&a.r#type) == NodeKind::Edge);

    let mut success = true;
    for artifact in nodes {
        success &= insert_node(host, artifact, None, parent, ids).success;
    }
    for edge in edges {
        success &= insert_edge(host, edge, ids);
    }
    success
}

fn insert_edge<H>(
    host: &mut H,
    edge: &NodeModel,
    ids: &mut IdentifierMap,
) -> bool
where
    H: GraphHost + ?Sized,
{
    let source = ids.resolve(edge.source_ref.as_deref()).cloned();
    let target = ids.resolve(edge.target_ref.as_deref()).cloned();
    let (Some(source), Some(target)) = (source, target) else {
        warn!(edge = %edge.id, source = ?edge.source_ref, target = ?edge.target_ref, "edge endpoint not inserted");
        return false;
    };

    let Some(created) = host.connect(&source, &target, &edge.r#type) else {
        warn!(edge = %edge.id, source = %source, target = %target, "host refused connection");
        return false;
    };
    ids.insert(edge.id.clone(), created.clone());

    let props = Properties {
        attrs: edge.attrs.clone(),
        ..Default::default()
    };
    if !props.is_empty() && !host.set_properties(&created, &props) {
        warn!(edge = %edge.id, created = %created, "host refused edge properties");
        return false;
    }
    true
}

/// Moves the attributes of the replaced task into the input parameters of
/// the fragment root so no task data is lost by the substitution.
fn carry_over<H>(
    host: &mut H,
    anchor: &NodeModel,
    root: &NodeRef,
) -> bool
where
    H: GraphHost + ?Sized,
{
    let inputs: Inputs = anchor.defined_attrs().map(|(k, v)| (k.clone(), v.clone())).collect();
    if inputs.is_empty() {
        return true;
    }

    let props = Properties {
        inputs,
        ..Default::default()
    };
    if !host.set_properties(root, &props) {
        warn!(task = %anchor.id, root = %root, "host refused carried-over inputs");
        return false;
    }
    true
}
