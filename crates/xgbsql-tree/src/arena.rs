//! Node indexer - flattens a nested tree dump into a per-tree arena

use std::collections::HashMap;

use crate::{DumpError, NodeId, TreeDump};

/// Threshold used when a split carries no `split_condition` (indicator features).
pub const DEFAULT_THRESHOLD: f64 = 1.0;

/// Which child of a split a row is routed to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// `column < threshold`
    Less,
    /// `column >= threshold`
    GreaterEqual,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Split {
    pub column: String,
    pub threshold: Option<f64>,
    pub less_than: NodeId,
    pub greater_equal: NodeId,
    /// Child receiving rows where `column` is null, if the booster recorded one
    pub missing: Option<NodeId>,
}

impl Split {
    pub fn has_null_branch(&self) -> bool {
        self.missing.is_some()
    }

    pub fn threshold_or_default(&self) -> f64 {
        self.threshold.unwrap_or(DEFAULT_THRESHOLD)
    }

    /// Side through which `child` hangs off this split, if it is a child at all
    pub fn side_of(&self, child: NodeId) -> Option<Side> {
        if child == self.less_than {
            Some(Side::Less)
        } else if child == self.greater_equal {
            Some(Side::GreaterEqual)
        } else {
            None
        }
    }

    /// Side that null values are routed to
    pub fn null_side(&self) -> Option<Side> {
        self.missing.and_then(|id| self.side_of(id))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Split(Split),
    Leaf(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub parent: Option<NodeId>,
    pub kind: NodeKind,
}

impl Node {
    pub fn as_split(&self) -> Option<&Split> {
        match &self.kind {
            NodeKind::Split(split) => Some(split),
            NodeKind::Leaf(_) => None,
        }
    }

    pub fn leaf_value(&self) -> Option<f64> {
        match self.kind {
            NodeKind::Leaf(value) => Some(value),
            NodeKind::Split(_) => None,
        }
    }
}

/// All nodes of one tree, in depth-first discovery order, addressable by id.
#[derive(Debug, Clone)]
pub struct TreeArena {
    tree: usize,
    nodes: Vec<Node>,
    slots: HashMap<NodeId, usize>,
}

impl TreeArena {
    /// Index the tree at position `tree` of the ensemble.
    ///
    /// Parent links are recorded before a node's children are visited, so the
    /// arena is complete for every node once this returns.
    pub fn index(tree: usize, dump: &TreeDump) -> Result<Self, DumpError> {
        let mut arena = Self {
            tree,
            nodes: Vec::new(),
            slots: HashMap::new(),
        };

        let mut stack: Vec<(&TreeDump, Option<NodeId>)> = vec![(dump, None)];
        while let Some((raw, parent)) = stack.pop() {
            let node = arena.decode(raw, parent)?;
            let id = node.id;

            if arena.slots.insert(id, arena.nodes.len()).is_some() {
                return Err(DumpError::DuplicateNode { tree, node: id });
            }
            arena.nodes.push(node);

            // Reverse so the first listed child is visited first
            for child in raw.children.iter().rev() {
                stack.push((child, Some(id)));
            }
        }

        tracing::trace!(tree, nodes = arena.nodes.len(), leaves = arena.leaf_count(), "indexed tree");
        Ok(arena)
    }

    /// Build an arena from nodes that are already flat, root first.
    ///
    /// Only emptiness and id uniqueness are checked. Parent links and child
    /// references are taken as given; path reconstruction reports any that
    /// do not agree.
    pub fn from_nodes(tree: usize, nodes: Vec<Node>) -> Result<Self, DumpError> {
        if nodes.is_empty() {
            return Err(DumpError::EmptyTree { tree });
        }

        let mut slots = HashMap::with_capacity(nodes.len());
        for (slot, node) in nodes.iter().enumerate() {
            if slots.insert(node.id, slot).is_some() {
                return Err(DumpError::DuplicateNode { tree, node: node.id });
            }
        }

        Ok(Self { tree, nodes, slots })
    }

    fn decode(&self, raw: &TreeDump, parent: Option<NodeId>) -> Result<Node, DumpError> {
        let tree = self.tree;
        let id = raw.nodeid.ok_or(DumpError::MissingField {
            tree,
            node: None,
            field: "nodeid",
        })?;
        let missing_field = |field| DumpError::MissingField { tree, node: Some(id), field };

        // A split column is what makes a node internal, never the absence of `leaf`
        let kind = match &raw.split {
            Some(column) => {
                let less_than = raw.yes.ok_or_else(|| missing_field("yes"))?;
                let greater_equal = raw.no.ok_or_else(|| missing_field("no"))?;
                let split = Split {
                    column: column.clone(),
                    threshold: raw.split_condition,
                    less_than,
                    greater_equal,
                    missing: raw.missing,
                };
                self.check_children(id, &split, &raw.children)?;

                if let Some(target) = split.missing {
                    if split.side_of(target).is_none() {
                        return Err(DumpError::InvalidMissingTarget { tree, node: id, target });
                    }
                }
                NodeKind::Split(split)
            }
            None => {
                if !raw.children.is_empty() {
                    return Err(DumpError::LeafWithChildren { tree, node: id });
                }
                NodeKind::Leaf(raw.leaf.ok_or_else(|| missing_field("leaf"))?)
            }
        };

        Ok(Node { id, parent, kind })
    }

    /// An internal node owns exactly its `yes` and `no` children
    fn check_children(&self, id: NodeId, split: &Split, children: &[TreeDump]) -> Result<(), DumpError> {
        let tree = self.tree;
        let dangling = |child| DumpError::DanglingChild { tree, node: id, child };

        if split.less_than == split.greater_equal {
            return Err(dangling(split.greater_equal));
        }

        let child_ids = children
            .iter()
            .map(|child| {
                child.nodeid.ok_or(DumpError::MissingField {
                    tree,
                    node: None,
                    field: "nodeid",
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        for expected in [split.less_than, split.greater_equal] {
            if !child_ids.contains(&expected) {
                return Err(dangling(expected));
            }
        }
        if let Some(&extra) = child_ids.iter().find(|&&c| split.side_of(c).is_none()) {
            return Err(dangling(extra));
        }
        if child_ids.len() != 2 {
            return Err(dangling(child_ids[0]));
        }

        Ok(())
    }

    /// Position of this tree within its ensemble
    pub fn tree(&self) -> usize {
        self.tree
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.slots.get(&id).map(|&slot| &self.nodes[slot])
    }

    pub fn root(&self) -> &Node {
        &self.nodes[0]
    }

    /// `(leaf id, leaf value)` pairs in depth-first order
    pub fn leaves(&self) -> impl Iterator<Item = (NodeId, f64)> + '_ {
        self.nodes
            .iter()
            .filter_map(|node| node.leaf_value().map(|value| (node.id, value)))
    }

    pub fn leaf_count(&self) -> usize {
        self.nodes.iter().filter(|node| node.leaf_value().is_some()).count()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}
