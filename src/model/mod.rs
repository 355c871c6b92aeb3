mod graph;
mod node;
mod template;

pub use graph::GraphModel;
pub use node::{Attrs, Inputs, NodeModel};
pub use template::Template;
