//! Errors raised while decoding and indexing tree dumps

use thiserror::Error;

use crate::NodeId;

#[derive(Debug, Error)]
pub enum DumpError {
    #[error("Malformed tree fragment {index}: {source}")]
    MalformedFragment {
        index: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Malformed ensemble document: {0}")]
    MalformedDocument(#[source] serde_json::Error),

    #[error("Failed to read tree dump: {0}")]
    Io(#[from] std::io::Error),

    #[error("Tree {tree}: {} is missing required field `{field}`", describe(.node))]
    MissingField {
        tree: usize,
        node: Option<NodeId>,
        field: &'static str,
    },

    #[error("Tree {tree} has no nodes")]
    EmptyTree { tree: usize },

    #[error("Tree {tree}: node {node} appears more than once")]
    DuplicateNode { tree: usize, node: NodeId },

    #[error("Tree {tree}: node {node} does not own child {child} as one of exactly two children")]
    DanglingChild {
        tree: usize,
        node: NodeId,
        child: NodeId,
    },

    #[error("Tree {tree}: leaf node {node} has children")]
    LeafWithChildren { tree: usize, node: NodeId },

    #[error("Tree {tree}: node {node} routes missing values to {target}, which is neither child")]
    InvalidMissingTarget {
        tree: usize,
        node: NodeId,
        target: NodeId,
    },
}

fn describe(node: &Option<NodeId>) -> String {
    match node {
        Some(id) => format!("node {}", id),
        None => "a node".to_string(),
    }
}
