//! Compilation errors

use thiserror::Error;
use xgbsql_tree::{DumpError, NodeId};

/// Corrupt parent chains found while walking from a leaf to the root.
///
/// Reaching a node without a parent is the normal end of a walk and is not
/// an error; every variant here means the arena disagrees with itself.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathError {
    #[error("Tree {tree}: node {node} is not in the tree")]
    UnknownNode { tree: usize, node: NodeId },

    #[error("Tree {tree}: parent {parent} of node {node} is not in the tree")]
    UnresolvedParent {
        tree: usize,
        node: NodeId,
        parent: NodeId,
    },

    #[error("Tree {tree}: parent {parent} of node {node} is a leaf")]
    ParentNotSplit {
        tree: usize,
        node: NodeId,
        parent: NodeId,
    },

    #[error("Tree {tree}: node {node} is neither branch of its parent {parent}")]
    NotAChild {
        tree: usize,
        node: NodeId,
        parent: NodeId,
    },

    #[error("Tree {tree}: parent chain of node {node} never reaches the root")]
    Cycle { tree: usize, node: NodeId },
}

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("Tree dump error: {0}")]
    Dump(#[from] DumpError),

    #[error("Path reconstruction failed: {0}")]
    Path(#[from] PathError),

    #[error("Ensemble contains no trees")]
    EmptyEnsemble,

    #[error("Invalid option: {0}")]
    InvalidOption(String),
}
