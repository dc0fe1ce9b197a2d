//! Path reconstructor - turns a leaf into the conjunction of splits above it

use xgbsql_sql::Expr;
use xgbsql_tree::{NodeId, Side, Split, TreeArena};

use crate::PathError;

/// Split clauses from the root down to one leaf, implicitly ANDed
#[derive(Debug, Clone, PartialEq)]
pub struct PathPredicate {
    pub clauses: Vec<Expr>,
}

impl PathPredicate {
    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn into_expr(self) -> Expr {
        Expr::and(self.clauses)
    }
}

/// Clause a row satisfies when `split` routes it to `side`.
///
/// Nulls follow the `missing` child, so only that side carries `IS NULL`.
pub fn split_clause(split: &Split, side: Side) -> Expr {
    let column = Expr::column(split.column.as_str());
    let threshold = Expr::number(split.threshold_or_default());

    let comparison = match side {
        Side::Less => column.clone().lt(threshold),
        Side::GreaterEqual => column.clone().ge(threshold),
    };

    if split.null_side() == Some(side) {
        comparison.or(column.is_null())
    } else {
        comparison
    }
}

/// Walk from `leaf` up the parent links of `arena`, collecting one clause per
/// split on the way. The result is ordered root-first.
pub fn reconstruct(arena: &TreeArena, leaf: NodeId) -> Result<PathPredicate, PathError> {
    let tree = arena.tree();
    let mut node = arena.get(leaf).ok_or(PathError::UnknownNode { tree, node: leaf })?;
    let mut clauses = Vec::new();

    while let Some(parent_id) = node.parent {
        if clauses.len() >= arena.node_count() {
            return Err(PathError::Cycle { tree, node: leaf });
        }

        let parent = arena.get(parent_id).ok_or(PathError::UnresolvedParent {
            tree,
            node: node.id,
            parent: parent_id,
        })?;
        let split = parent.as_split().ok_or(PathError::ParentNotSplit {
            tree,
            node: node.id,
            parent: parent_id,
        })?;
        let side = split.side_of(node.id).ok_or(PathError::NotAChild {
            tree,
            node: node.id,
            parent: parent_id,
        })?;

        clauses.push(split_clause(split, side));
        node = parent;
    }

    tracing::trace!(tree, leaf, root = node.id, clauses = clauses.len(), "reached root");

    // Collected leaf-first
    clauses.reverse();
    Ok(PathPredicate { clauses })
}

#[cfg(test)]
mod tests {
    use super::*;
    use xgbsql_sql::{render_expr, Postgres};
    use xgbsql_tree::{Node, NodeKind, TreeDump};

    fn render(predicate: PathPredicate) -> String {
        render_expr(&predicate.into_expr(), &Postgres)
    }

    fn split_node(id: NodeId, parent: Option<NodeId>, less_than: NodeId, greater_equal: NodeId) -> Node {
        Node {
            id,
            parent,
            kind: NodeKind::Split(Split {
                column: "age".to_string(),
                threshold: Some(30.0),
                less_than,
                greater_equal,
                missing: None,
            }),
        }
    }

    fn leaf_node(id: NodeId, parent: NodeId) -> Node {
        Node {
            id,
            parent: Some(parent),
            kind: NodeKind::Leaf(0.5),
        }
    }

    fn deep_tree() -> TreeDump {
        TreeDump::split(
            0,
            "age",
            Some(30.0),
            None,
            TreeDump::split(
                1,
                "income",
                Some(5000.0),
                Some(4),
                TreeDump::leaf(3, -1.0),
                TreeDump::split(4, "is_member", None, None, TreeDump::leaf(5, 0.1), TreeDump::leaf(6, 0.2)),
            ),
            TreeDump::leaf(2, 1.0),
        )
    }

    #[test]
    fn test_root_first_order() {
        let arena = TreeArena::index(0, &deep_tree()).unwrap();

        assert_eq!(
            render(reconstruct(&arena, 6).unwrap()),
            "(age < 30) AND ((income >= 5000) OR (income IS NULL)) AND (is_member >= 1)"
        );
        assert_eq!(
            render(reconstruct(&arena, 5).unwrap()),
            "(age < 30) AND ((income >= 5000) OR (income IS NULL)) AND (is_member < 1)"
        );
    }

    #[test]
    fn test_null_disjunct_only_on_missing_side() {
        let arena = TreeArena::index(0, &deep_tree()).unwrap();

        assert_eq!(render(reconstruct(&arena, 3).unwrap()), "(age < 30) AND (income < 5000)");
        assert_eq!(render(reconstruct(&arena, 2).unwrap()), "(age >= 30)");
    }

    #[test]
    fn test_clause_count_matches_depth() {
        let arena = TreeArena::index(0, &deep_tree()).unwrap();

        assert_eq!(reconstruct(&arena, 2).unwrap().len(), 1);
        assert_eq!(reconstruct(&arena, 3).unwrap().len(), 2);
        assert_eq!(reconstruct(&arena, 6).unwrap().len(), 3);
    }

    #[test]
    fn test_root_leaf_has_empty_predicate() {
        let arena = TreeArena::index(0, &TreeDump::leaf(0, 0.3)).unwrap();
        assert!(reconstruct(&arena, 0).unwrap().is_empty());
    }

    #[test]
    fn test_default_threshold_pair() {
        let dump = TreeDump::split(0, "flag", None, None, TreeDump::leaf(1, 0.0), TreeDump::leaf(2, 1.0));
        let arena = TreeArena::index(0, &dump).unwrap();

        assert_eq!(render(reconstruct(&arena, 1).unwrap()), "(flag < 1)");
        assert_eq!(render(reconstruct(&arena, 2).unwrap()), "(flag >= 1)");
    }

    #[test]
    fn test_null_branch_without_threshold() {
        let dump = TreeDump::split(0, "flag", None, Some(1), TreeDump::leaf(1, 0.0), TreeDump::leaf(2, 1.0));
        let arena = TreeArena::index(0, &dump).unwrap();

        assert_eq!(render(reconstruct(&arena, 1).unwrap()), "((flag < 1) OR (flag IS NULL))");
    }

    #[test]
    fn test_unknown_leaf() {
        let arena = TreeArena::index(4, &deep_tree()).unwrap();
        assert_eq!(reconstruct(&arena, 42).unwrap_err(), PathError::UnknownNode { tree: 4, node: 42 });
    }

    #[test]
    fn test_unresolved_parent() {
        let arena = TreeArena::from_nodes(1, vec![split_node(0, None, 1, 2), leaf_node(1, 0), leaf_node(2, 9)]).unwrap();

        assert_eq!(
            reconstruct(&arena, 2).unwrap_err(),
            PathError::UnresolvedParent { tree: 1, node: 2, parent: 9 }
        );
        assert_eq!(reconstruct(&arena, 1).unwrap().len(), 1);
    }

    #[test]
    fn test_parent_not_split() {
        let arena = TreeArena::from_nodes(0, vec![split_node(0, None, 1, 2), leaf_node(1, 0), leaf_node(2, 1)]).unwrap();

        assert_eq!(
            reconstruct(&arena, 2).unwrap_err(),
            PathError::ParentNotSplit { tree: 0, node: 2, parent: 1 }
        );
    }

    #[test]
    fn test_parent_does_not_own_node() {
        let arena = TreeArena::from_nodes(
            0,
            vec![split_node(0, None, 1, 2), leaf_node(1, 0), leaf_node(2, 0), leaf_node(3, 0)],
        )
        .unwrap();

        assert_eq!(
            reconstruct(&arena, 3).unwrap_err(),
            PathError::NotAChild { tree: 0, node: 3, parent: 0 }
        );
    }

    #[test]
    fn test_parent_cycle() {
        // 0 and 1 name each other as parent and child
        let arena = TreeArena::from_nodes(
            3,
            vec![split_node(0, Some(1), 2, 1), split_node(1, Some(0), 0, 3), leaf_node(2, 0), leaf_node(3, 1)],
        )
        .unwrap();

        assert_eq!(reconstruct(&arena, 2).unwrap_err(), PathError::Cycle { tree: 3, node: 2 });
    }
}
