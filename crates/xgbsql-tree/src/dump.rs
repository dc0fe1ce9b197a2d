//! Tree dump reader
//!
//! The booster emits one JSON object per tree. Internal nodes carry `split`,
//! `yes`, `no` and optionally `split_condition` and `missing`; leaves carry
//! `leaf`. Statistics such as `depth`, `gain` and `cover` are ignored.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::{DumpError, NodeId};

/// One node of a tree dump, with its subtree nested under `children`.
///
/// Every field is optional at decode time so that structural gaps surface as
/// [`DumpError::MissingField`] during indexing instead of as decoder noise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeDump {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nodeid: Option<NodeId>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub split: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub split_condition: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub yes: Option<NodeId>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub no: Option<NodeId>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing: Option<NodeId>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub leaf: Option<f64>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeDump>,
}

impl TreeDump {
    /// Build a leaf node
    pub fn leaf(nodeid: NodeId, value: f64) -> Self {
        Self {
            nodeid: Some(nodeid),
            split: None,
            split_condition: None,
            yes: None,
            no: None,
            missing: None,
            leaf: Some(value),
            children: vec![],
        }
    }

    /// Build an internal node whose first child is the `yes` (less-than) branch
    pub fn split(
        nodeid: NodeId,
        column: impl Into<String>,
        threshold: Option<f64>,
        missing: Option<NodeId>,
        yes: TreeDump,
        no: TreeDump,
    ) -> Self {
        Self {
            nodeid: Some(nodeid),
            split: Some(column.into()),
            split_condition: threshold,
            yes: yes.nodeid,
            no: no.nodeid,
            missing,
            leaf: None,
            children: vec![yes, no],
        }
    }
}

/// Decode the per-tree fragments of an ensemble, preserving their order.
pub fn read_fragments<S: AsRef<str>>(fragments: &[S]) -> Result<Vec<TreeDump>, DumpError> {
    let trees = fragments
        .iter()
        .enumerate()
        .map(|(index, fragment)| {
            serde_json::from_str(fragment.as_ref())
                .map_err(|source| DumpError::MalformedFragment { index, source })
        })
        .collect::<Result<Vec<TreeDump>, _>>()?;

    tracing::debug!(trees = trees.len(), "decoded tree dump fragments");
    Ok(trees)
}

/// Decode a whole-ensemble document: a JSON array with one object per tree.
pub fn read_document(document: &str) -> Result<Vec<TreeDump>, DumpError> {
    let trees: Vec<TreeDump> =
        serde_json::from_str(document).map_err(DumpError::MalformedDocument)?;

    tracing::debug!(trees = trees.len(), "decoded ensemble document");
    Ok(trees)
}

pub fn read_document_from_path<P: AsRef<Path>>(path: P) -> Result<Vec<TreeDump>, DumpError> {
    let contents = std::fs::read_to_string(path)?;
    read_document(&contents)
}
