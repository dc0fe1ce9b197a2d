//! xgbsql tree model
//!
//! Decodes the per-tree JSON dump of a gradient-boosted ensemble and flattens
//! each tree into an arena keyed by the node ids the booster assigned.
//! Node ids are only meaningful inside the arena of their own tree.

mod arena;
mod dump;
mod error;

pub use arena::{Node, NodeKind, Side, Split, TreeArena, DEFAULT_THRESHOLD};
pub use dump::{read_document, read_document_from_path, read_fragments, TreeDump};
pub use error::DumpError;

/// Identifier the booster assigns to a node, unique within one tree.
pub type NodeId = u32;
