use std::collections::HashMap;

use crate::graph::NodeRef;

/// Maps fragment-local node ids to the ids assigned in the target graph.
///
/// Scoped to a single splice; edges and boundary attachments of the fragment
/// are resolved through it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentifierMap {
    ids: HashMap<String, NodeRef>,
}

impl IdentifierMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        local: impl Into<String>,
        assigned: NodeRef,
    ) {
        self.ids.insert(local.into(), assigned);
    }

    pub fn get(
        &self,
        local: &str,
    ) -> Option<&NodeRef> {
        self.ids.get(local)
    }

    /// Resolves an optional reference; an absent reference never resolves.
    pub fn resolve(
        &self,
        local: Option<&str>,
    ) -> Option<&NodeRef> {
        local.and_then(|l| self.ids.get(l))
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &NodeRef)> {
        self.ids.iter()
    }
}
