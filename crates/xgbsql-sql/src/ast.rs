//! SQL expression and query tree

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    Number(f64),
    String(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    Lt,
    Ge,
    Eq,
}

impl CompareOp {
    pub fn symbol(self) -> &'static str {
        match self {
            CompareOp::Lt => "<",
            CompareOp::Ge => ">=",
            CompareOp::Eq => "=",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl ArithOp {
    pub fn symbol(self) -> &'static str {
        match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::Div => "/",
        }
    }

    /// Binding strength; higher binds tighter
    pub fn precedence(self) -> u8 {
        match self {
            ArithOp::Add | ArithOp::Sub => 1,
            ArithOp::Mul | ArithOp::Div => 2,
        }
    }

    /// `a - (b - c)` differs from `(a - b) - c`
    pub fn is_associative(self) -> bool {
        matches!(self, ArithOp::Add | ArithOp::Mul)
    }
}

/// Logical types a dialect spells in its own way
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SqlType {
    Float,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhenThen {
    pub when: Expr,
    pub then: Expr,
}

/// SQL scalar expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Expr {
    Column { name: String },
    Literal { value: Literal },
    Compare { op: CompareOp, left: Box<Expr>, right: Box<Expr> },
    IsNull { expr: Box<Expr> },
    And { terms: Vec<Expr> },
    Or { terms: Vec<Expr> },
    Binary { op: ArithOp, left: Box<Expr>, right: Box<Expr> },
    /// `a + b + ...` kept flat so long sums stay shallow
    Sum { terms: Vec<Expr> },
    Neg { expr: Box<Expr> },
    /// Explicit parentheses
    Nested { expr: Box<Expr> },
    Func { name: String, args: Vec<Expr> },
    Cast { expr: Box<Expr>, to: SqlType },
    Case { branches: Vec<WhenThen>, otherwise: Option<Box<Expr>> },
    NotIn { expr: Box<Expr>, list: Vec<Expr> },
}

impl Expr {
    pub fn column(name: impl Into<String>) -> Self {
        Expr::Column { name: name.into() }
    }

    pub fn number(value: f64) -> Self {
        Expr::Literal { value: Literal::Number(value) }
    }

    pub fn string(value: impl Into<String>) -> Self {
        Expr::Literal { value: Literal::String(value.into()) }
    }

    pub fn compare(self, op: CompareOp, right: Expr) -> Self {
        Expr::Compare {
            op,
            left: Box::new(self),
            right: Box::new(right),
        }
    }

    pub fn lt(self, right: Expr) -> Self {
        self.compare(CompareOp::Lt, right)
    }

    pub fn ge(self, right: Expr) -> Self {
        self.compare(CompareOp::Ge, right)
    }

    pub fn eq(self, right: Expr) -> Self {
        self.compare(CompareOp::Eq, right)
    }

    pub fn is_null(self) -> Self {
        Expr::IsNull { expr: Box::new(self) }
    }

    pub fn or(self, other: Expr) -> Self {
        match self {
            Expr::Or { mut terms } => {
                terms.push(other);
                Expr::Or { terms }
            }
            first => Expr::Or { terms: vec![first, other] },
        }
    }

    pub fn and(terms: Vec<Expr>) -> Self {
        Expr::And { terms }
    }

    pub fn arith(self, op: ArithOp, right: Expr) -> Self {
        Expr::Binary {
            op,
            left: Box::new(self),
            right: Box::new(right),
        }
    }

    /// `a + b + c` as one flat node; `None` when there is nothing to add
    pub fn sum(terms: impl IntoIterator<Item = Expr>) -> Option<Self> {
        let mut terms: Vec<Expr> = terms.into_iter().collect();
        match terms.len() {
            0 => None,
            1 => terms.pop(),
            _ => Some(Expr::Sum { terms }),
        }
    }

    pub fn neg(self) -> Self {
        Expr::Neg { expr: Box::new(self) }
    }

    pub fn nested(self) -> Self {
        Expr::Nested { expr: Box::new(self) }
    }

    pub fn func(name: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::Func { name: name.into(), args }
    }

    pub fn cast(self, to: SqlType) -> Self {
        Expr::Cast { expr: Box::new(self), to }
    }

    pub fn not_in(self, list: Vec<Expr>) -> Self {
        Expr::NotIn {
            expr: Box::new(self),
            list,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    pub expr: Expr,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

impl Projection {
    pub fn new(expr: Expr) -> Self {
        Self { expr, alias: None }
    }

    pub fn aliased(expr: Expr, alias: impl Into<String>) -> Self {
        Self {
            expr,
            alias: Some(alias.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TableRef {
    Named { name: String },
    Unnest { expr: Expr, alias: String },
}

impl TableRef {
    pub fn named(name: impl Into<String>) -> Self {
        TableRef::Named { name: name.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Select {
    pub projections: Vec<Projection>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub from: Vec<TableRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<Expr>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub group_by: Vec<Expr>,
}

/// Named subquery in a `WITH` clause
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cte {
    pub name: String,
    pub select: Select,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ctes: Vec<Cte>,
    pub body: Select,
}
