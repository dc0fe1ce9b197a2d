//! Column expression builder - one SQL scalar per tree

use xgbsql_sql::{Expr, WhenThen};
use xgbsql_tree::TreeArena;

use crate::path::reconstruct;
use crate::PathError;

/// Alias of the column holding tree `tree`'s contribution
pub fn column_alias(tree: usize) -> String {
    format!("column_{}", tree)
}

/// A tree's contribution to the ensemble sum, as a SQL expression
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledColumn {
    pub alias: String,
    pub expr: Expr,
}

impl CompiledColumn {
    pub fn is_constant(&self) -> bool {
        matches!(self.expr, Expr::Literal { .. })
    }
}

/// Build the `CASE` expression for one indexed tree.
///
/// A tree that is a single leaf compiles to its value. Otherwise each leaf
/// contributes one `WHEN`, in depth-first order; the predicates partition
/// the input space so branch order does not change the result.
pub fn build_column(arena: &TreeArena) -> Result<CompiledColumn, PathError> {
    let alias = column_alias(arena.tree());

    let leaves: Vec<_> = arena.leaves().collect();
    if let [(_, value)] = leaves.as_slice() {
        return Ok(CompiledColumn {
            alias,
            expr: Expr::number(*value),
        });
    }

    let branches = leaves
        .into_iter()
        .map(|(leaf, value)| {
            Ok::<_, PathError>(WhenThen {
                when: reconstruct(arena, leaf)?.into_expr(),
                then: Expr::number(value),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CompiledColumn {
        alias,
        expr: Expr::Case {
            branches,
            otherwise: None,
        },
    })
}
