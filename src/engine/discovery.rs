use crate::{
    graph::{Classifier, NodeKind, NodeRef},
    model::NodeModel,
};

/// A domain-specific task together with its immediate container.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveredTask {
    pub task: NodeModel,
    pub parent: NodeRef,
}

/// Collects every domain-specific flow node below `root`, pre-order.
///
/// Nested containers are walked; a task is always paired with the container
/// that directly holds it.
pub fn discover(
    root: &NodeModel,
    classifier: &Classifier,
) -> Vec<DiscoveredTask> {
    let mut tasks = Vec::new();
    walk(root, classifier, &mut tasks);
    tasks
}

fn walk(
    node: &NodeModel,
    classifier: &Classifier,
    tasks: &mut Vec<DiscoveredTask>,
) {
    for child in node.children.iter() {
        if classifier.is_domain(&child.r#type) && NodeKind::of(&child.r#type).is_flow_element() {
            tasks.push(DiscoveredTask {
                task: child.clone(),
                parent: node.id.clone(),
            });
        }
        walk(child, classifier, tasks);
    }
}
