//! xgbsql compiler
//!
//! Compiles a gradient-boosted tree ensemble dump into one SQL query that
//! scores every row of a table: each tree becomes a `CASE` column, the
//! columns are summed and passed through the logistic function.
//!
//! ```no_run
//! use xgbsql_compile::{CompileOptions, Compiler, SqlDialect};
//!
//! let fragments = vec![r#"{"nodeid": 0, "leaf": 0.5}"#];
//! let options = CompileOptions::new("customers")
//!     .with_index_columns(["customer_id"])
//!     .with_dialect(SqlDialect::Postgres);
//! let query = Compiler::new(options).compile_fragments(&fragments)?;
//! println!("{}", query);
//! # Ok::<(), xgbsql_compile::CompileError>(())
//! ```

mod column;
mod compiler;
mod dialect;
mod error;
mod path;

pub use column::{build_column, column_alias, CompiledColumn};
pub use compiler::{CompileOptions, CompiledQuery, Compiler};
pub use dialect::{
    logistic, BigQueryScore, PostgresScore, ScorePlan, ScoreStage, ScoreStages, SqlDialect, BOOSTER_OUTPUT,
    SCORE_ALIAS,
};
pub use error::{CompileError, PathError};
pub use path::{reconstruct, split_clause, PathPredicate};
