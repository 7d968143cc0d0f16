mod build;
mod hierarchy;
mod node;
mod resolve;

pub use hierarchy::Hierarchy;
pub use node::{Node, NodeId, NodeKind};
pub use resolve::{Resolution, Target};
