//! xgbsql SQL layer
//!
//! A small SQL expression tree plus a renderer parameterised by a [`Dialect`].
//! Compilers build [`Query`] values and never concatenate SQL text themselves.

mod ast;
mod printer;

pub use ast::*;
pub use printer::{render_expr, render_query, BigQuery, Dialect, Postgres};
