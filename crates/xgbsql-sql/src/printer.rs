//! Dialect-aware SQL renderer

use crate::ast::*;

const INDENT: &str = "    ";

/// Spelling rules of one target SQL engine
pub trait Dialect {
    fn name(&self) -> &'static str;

    /// Quote a string literal, escaping embedded quotes
    fn quote_string(&self, value: &str) -> String {
        format!("'{}'", value.replace('\'', "''"))
    }

    fn type_name(&self, ty: SqlType) -> &'static str;
}

/// PostgreSQL-compatible output
#[derive(Debug, Clone, Copy, Default)]
pub struct Postgres;

impl Dialect for Postgres {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn type_name(&self, ty: SqlType) -> &'static str {
        match ty {
            SqlType::Float => "DOUBLE PRECISION",
        }
    }
}

/// Google BigQuery standard SQL
#[derive(Debug, Clone, Copy, Default)]
pub struct BigQuery;

impl Dialect for BigQuery {
    fn name(&self) -> &'static str {
        "bigquery"
    }

    fn quote_string(&self, value: &str) -> String {
        format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
    }

    fn type_name(&self, ty: SqlType) -> &'static str {
        match ty {
            SqlType::Float => "FLOAT64",
        }
    }
}

pub fn render_query(query: &Query, dialect: &dyn Dialect) -> String {
    let mut writer = SqlWriter::new(dialect);
    writer.query(query);
    writer.out
}

pub fn render_expr(expr: &Expr, dialect: &dyn Dialect) -> String {
    let mut writer = SqlWriter::new(dialect);
    writer.expr(expr, 0);
    writer.out
}

struct SqlWriter<'d> {
    dialect: &'d dyn Dialect,
    out: String,
}

impl<'d> SqlWriter<'d> {
    fn new(dialect: &'d dyn Dialect) -> Self {
        Self {
            dialect,
            out: String::new(),
        }
    }

    fn indent(&mut self, level: usize) {
        for _ in 0..level {
            self.out.push_str(INDENT);
        }
    }

    fn query(&mut self, query: &Query) {
        if !query.ctes.is_empty() {
            self.out.push_str("WITH ");
            for (i, cte) in query.ctes.iter().enumerate() {
                if i > 0 {
                    self.out.push_str(",\n\n");
                }
                self.out.push_str(&cte.name);
                self.out.push_str(" AS (\n");
                self.select(&cte.select, 1);
                self.out.push_str("\n)");
            }
            self.out.push_str("\n\n");
        }
        self.select(&query.body, 0);
    }

    fn select(&mut self, select: &Select, level: usize) {
        self.indent(level);
        self.out.push_str("SELECT\n");
        for (i, projection) in select.projections.iter().enumerate() {
            if i > 0 {
                self.out.push_str(",\n");
            }
            self.indent(level + 1);
            self.expr(&projection.expr, level + 1);
            if let Some(alias) = &projection.alias {
                self.out.push_str(" AS ");
                self.out.push_str(alias);
            }
        }

        if !select.from.is_empty() {
            self.out.push('\n');
            self.indent(level);
            self.out.push_str("FROM ");
            for (i, table) in select.from.iter().enumerate() {
                if i > 0 {
                    self.out.push_str(", ");
                }
                match table {
                    TableRef::Named { name } => self.out.push_str(name),
                    TableRef::Unnest { expr, alias } => {
                        self.out.push_str("UNNEST(");
                        self.expr(expr, level);
                        self.out.push_str(") ");
                        self.out.push_str(alias);
                    }
                }
            }
        }

        if let Some(filter) = &select.filter {
            self.out.push('\n');
            self.indent(level);
            self.out.push_str("WHERE ");
            self.expr(filter, level);
        }

        if !select.group_by.is_empty() {
            self.out.push('\n');
            self.indent(level);
            self.out.push_str("GROUP BY ");
            self.list(&select.group_by, level);
        }
    }

    fn list(&mut self, exprs: &[Expr], level: usize) {
        for (i, expr) in exprs.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            self.expr(expr, level);
        }
    }

    fn literal(&mut self, literal: &Literal) {
        match literal {
            Literal::Number(value) if value.is_finite() => {
                // f64 Display never uses exponent notation
                self.out.push_str(&value.to_string());
            }
            Literal::Number(value) => {
                let quoted = self.dialect.quote_string(&value.to_string());
                let ty = self.dialect.type_name(SqlType::Float);
                self.out.push_str(&format!("CAST({} AS {})", quoted, ty));
            }
            Literal::String(value) => {
                let quoted = self.dialect.quote_string(value);
                self.out.push_str(&quoted);
            }
        }
    }

    /// Arithmetic operand, parenthesised when it would otherwise regroup
    fn operand(&mut self, expr: &Expr, parent: ArithOp, right: bool, level: usize) {
        let precedence = match expr {
            Expr::Binary { op, .. } => Some(op.precedence()),
            Expr::Sum { .. } => Some(ArithOp::Add.precedence()),
            _ => None,
        };
        let wrap = precedence.is_some_and(|p| {
            p < parent.precedence() || (right && p == parent.precedence() && !parent.is_associative())
        });

        if wrap {
            self.out.push('(');
            self.expr(expr, level);
            self.out.push(')');
        } else {
            self.expr(expr, level);
        }
    }

    /// `level` is the indentation of the line the expression starts on; only
    /// multi-line constructs (CASE) use it.
    fn expr(&mut self, expr: &Expr, level: usize) {
        match expr {
            Expr::Column { name } => self.out.push_str(name),
            Expr::Literal { value } => self.literal(value),
            Expr::Compare { op, left, right } => {
                self.out.push('(');
                self.expr(left, level);
                self.out.push(' ');
                self.out.push_str(op.symbol());
                self.out.push(' ');
                self.expr(right, level);
                self.out.push(')');
            }
            Expr::IsNull { expr } => {
                self.out.push('(');
                self.expr(expr, level);
                self.out.push_str(" IS NULL)");
            }
            Expr::And { terms } => {
                for (i, term) in terms.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(" AND ");
                    }
                    self.expr(term, level);
                }
            }
            Expr::Or { terms } => {
                self.out.push('(');
                for (i, term) in terms.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(" OR ");
                    }
                    if matches!(term, Expr::And { terms } if terms.len() > 1) {
                        self.out.push('(');
                        self.expr(term, level);
                        self.out.push(')');
                    } else {
                        self.expr(term, level);
                    }
                }
                self.out.push(')');
            }
            Expr::Binary { op, left, right } => {
                self.operand(left, *op, false, level);
                self.out.push(' ');
                self.out.push_str(op.symbol());
                self.out.push(' ');
                self.operand(right, *op, true, level);
            }
            Expr::Sum { terms } => {
                for (i, term) in terms.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(" + ");
                    }
                    self.operand(term, ArithOp::Add, i > 0, level);
                }
            }
            Expr::Neg { expr } => {
                self.out.push('-');
                // `--` would open a line comment
                if matches!(**expr, Expr::Nested { .. }) {
                    self.expr(expr, level);
                } else {
                    self.out.push('(');
                    self.expr(expr, level);
                    self.out.push(')');
                }
            }
            Expr::Nested { expr } => {
                self.out.push('(');
                self.expr(expr, level);
                self.out.push(')');
            }
            Expr::Func { name, args } => {
                self.out.push_str(name);
                self.out.push('(');
                self.list(args, level);
                self.out.push(')');
            }
            Expr::Cast { expr, to } => {
                self.out.push_str("CAST(");
                self.expr(expr, level);
                self.out.push_str(" AS ");
                self.out.push_str(self.dialect.type_name(*to));
                self.out.push(')');
            }
            Expr::Case { branches, otherwise } => {
                self.out.push_str("CASE");
                for branch in branches {
                    self.out.push('\n');
                    self.indent(level + 1);
                    self.out.push_str("WHEN ");
                    self.expr(&branch.when, level + 1);
                    self.out.push_str(" THEN ");
                    self.expr(&branch.then, level + 1);
                }
                if let Some(otherwise) = otherwise {
                    self.out.push('\n');
                    self.indent(level + 1);
                    self.out.push_str("ELSE ");
                    self.expr(otherwise, level + 1);
                }
                self.out.push('\n');
                self.indent(level);
                self.out.push_str("END");
            }
            Expr::NotIn { expr, list } => {
                self.expr(expr, level);
                self.out.push_str(" NOT IN (");
                self.list(list, level);
                self.out.push(')');
            }
        }
    }
}
