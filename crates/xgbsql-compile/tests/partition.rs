//! Leaf predicates of one tree partition the input space
//!
//! Compiled predicates are evaluated with SQL three-valued logic and compared
//! against walking the tree directly.

use std::collections::HashMap;

use xgbsql_compile::{build_column, reconstruct};
use xgbsql_sql::{ArithOp, CompareOp, Expr, Literal};
use xgbsql_tree::{NodeId, NodeKind, TreeArena, TreeDump};

type Row = HashMap<String, Option<f64>>;

fn eval_num(expr: &Expr, row: &Row) -> Option<f64> {
    match expr {
        Expr::Column { name } => row.get(name).copied().flatten(),
        Expr::Literal { value: Literal::Number(n) } => Some(*n),
        Expr::Nested { expr } => eval_num(expr, row),
        Expr::Neg { expr } => eval_num(expr, row).map(|v| -v),
        Expr::Binary { op, left, right } => {
            let (l, r) = (eval_num(left, row)?, eval_num(right, row)?);
            Some(match op {
                ArithOp::Add => l + r,
                ArithOp::Sub => l - r,
                ArithOp::Mul => l * r,
                ArithOp::Div => l / r,
            })
        }
        Expr::Sum { terms } => terms.iter().map(|term| eval_num(term, row)).sum(),
        Expr::Case { branches, otherwise } => {
            for branch in branches {
                if eval_bool(&branch.when, row) == Some(true) {
                    return eval_num(&branch.then, row);
                }
            }
            otherwise.as_ref().and_then(|e| eval_num(e, row))
        }
        other => panic!("not a numeric expression: {:?}", other),
    }
}

/// SQL three-valued logic: `None` is UNKNOWN
fn eval_bool(expr: &Expr, row: &Row) -> Option<bool> {
    match expr {
        Expr::Compare { op, left, right } => {
            let (l, r) = (eval_num(left, row)?, eval_num(right, row)?);
            Some(match op {
                CompareOp::Lt => l < r,
                CompareOp::Ge => l >= r,
                CompareOp::Eq => l == r,
            })
        }
        Expr::IsNull { expr } => Some(eval_num(expr, row).is_none()),
        Expr::And { terms } => terms.iter().fold(Some(true), |acc, term| match (acc, eval_bool(term, row)) {
            (Some(false), _) | (_, Some(false)) => Some(false),
            (Some(true), Some(true)) => Some(true),
            _ => None,
        }),
        Expr::Or { terms } => terms.iter().fold(Some(false), |acc, term| match (acc, eval_bool(term, row)) {
            (Some(true), _) | (_, Some(true)) => Some(true),
            (Some(false), Some(false)) => Some(false),
            _ => None,
        }),
        Expr::Nested { expr } => eval_bool(expr, row),
        other => panic!("not a boolean expression: {:?}", other),
    }
}

/// Leaf reached by routing `row` through the tree, if it can be routed at all
fn route(arena: &TreeArena, row: &Row) -> Option<NodeId> {
    let mut node = arena.root();
    loop {
        match &node.kind {
            NodeKind::Leaf(_) => return Some(node.id),
            NodeKind::Split(split) => {
                let next = match row.get(&split.column).copied().flatten() {
                    Some(v) if v < split.threshold_or_default() => split.less_than,
                    Some(_) => split.greater_equal,
                    None => split.missing?,
                };
                node = arena.get(next)?;
            }
        }
    }
}

/// Small deterministic generator so the trees vary without a rand dependency
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        self.0 >> 33
    }

    fn pick(&mut self, n: u64) -> u64 {
        self.next() % n
    }
}

const FEATURES: [&str; 3] = ["age", "income", "flag"];
const CUTS: [f64; 3] = [-1.0, 0.5, 2.0];

fn grow(rng: &mut Lcg, next_id: &mut NodeId, depth: usize, with_missing: bool) -> TreeDump {
    let id = *next_id;
    *next_id += 1;

    if depth == 0 || (depth < 3 && rng.pick(4) == 0) {
        return TreeDump::leaf(id, id as f64 / 10.0);
    }

    let column = FEATURES[rng.pick(3) as usize];
    let threshold = if column == "flag" { None } else { Some(CUTS[rng.pick(3) as usize]) };
    let yes = grow(rng, next_id, depth - 1, with_missing);
    let no = grow(rng, next_id, depth - 1, with_missing);
    let missing = match (with_missing, rng.pick(2)) {
        (false, _) => None,
        (true, 0) => yes.nodeid,
        (true, _) => no.nodeid,
    };

    TreeDump::split(id, column, threshold, missing, yes, no)
}

fn rows(values: &[Option<f64>]) -> Vec<Row> {
    let mut rows = vec![Row::new()];
    for feature in FEATURES {
        rows = rows
            .into_iter()
            .flat_map(|row| {
                values.iter().map(move |value| {
                    let mut row = row.clone();
                    row.insert(feature.to_string(), *value);
                    row
                })
            })
            .collect();
    }
    rows
}

fn check_partition(dump: &TreeDump, rows: &[Row]) {
    let arena = TreeArena::index(0, dump).unwrap();
    let predicates: Vec<_> = arena
        .leaves()
        .map(|(leaf, _)| (leaf, reconstruct(&arena, leaf).unwrap().into_expr()))
        .collect();
    let column = build_column(&arena).unwrap();

    for row in rows {
        let matching: Vec<NodeId> = predicates
            .iter()
            .filter(|(_, predicate)| arena.leaf_count() == 1 || eval_bool(predicate, row) == Some(true))
            .map(|(leaf, _)| *leaf)
            .collect();

        let expected = route(&arena, row).expect("row is routable");
        assert_eq!(matching, vec![expected], "row {:?}", row);

        let value = arena.get(expected).and_then(|node| node.leaf_value());
        assert_eq!(eval_num(&column.expr, row), value, "row {:?}", row);
    }
}

#[test]
fn test_partition_with_null_branches() {
    let values = [None, Some(-2.0), Some(-1.0), Some(0.0), Some(0.5), Some(1.0), Some(2.0), Some(3.0)];
    let rows = rows(&values);
    let mut rng = Lcg(7);

    for _ in 0..25 {
        let dump = grow(&mut rng, &mut 0, 4, true);
        check_partition(&dump, &rows);
    }
}

#[test]
fn test_partition_without_null_branches() {
    let values = [Some(-2.0), Some(-1.0), Some(0.0), Some(0.5), Some(1.0), Some(2.0), Some(3.0)];
    let rows = rows(&values);
    let mut rng = Lcg(42);

    for _ in 0..25 {
        let dump = grow(&mut rng, &mut 0, 4, false);
        check_partition(&dump, &rows);
    }
}

#[test]
fn test_null_follows_missing_side() {
    let dump = TreeDump::split(0, "age", Some(30.0), Some(2), TreeDump::leaf(1, -0.5), TreeDump::leaf(2, 0.5));
    let arena = TreeArena::index(0, &dump).unwrap();
    let column = build_column(&arena).unwrap();

    let null_row: Row = HashMap::from([("age".to_string(), None)]);
    assert_eq!(eval_num(&column.expr, &null_row), Some(0.5));

    let young: Row = HashMap::from([("age".to_string(), Some(29.0))]);
    assert_eq!(eval_num(&column.expr, &young), Some(-0.5));
}
