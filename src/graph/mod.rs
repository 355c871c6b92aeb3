//! Graph model: node-kind classification, the graph-host capabilities the
//! splicer relies on, and an in-memory arena host.

mod diagram;
mod host;
mod kind;

pub use diagram::{Diagram, Element};
pub use host::{GraphHost, NodeRef, Properties};
pub use kind::{ARTIFACT_EDGE_TYPES, ARTIFACT_TYPES, BOUNDARY_TYPES, CONTAINER_TYPES, Classifier, DEFAULT_DOMAIN_PREFIX, EDGE_TYPES, NodeKind};
