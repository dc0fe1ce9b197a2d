//! Orchestrator - dump in, scoring query out

use sha2::{Digest, Sha256};
use std::fmt;
use xgbsql_sql::{render_query, Cte, Expr, Projection, Query, Select, TableRef};
use xgbsql_tree::{read_document, read_fragments, TreeArena, TreeDump};

use crate::column::{build_column, CompiledColumn};
use crate::dialect::{ScorePlan, SqlDialect, BOOSTER_OUTPUT};
use crate::CompileError;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompileOptions {
    /// Relation holding the model's input features
    pub table_name: String,
    /// Columns passed through to the output unchanged
    pub index_columns: Vec<String>,
    pub dialect: SqlDialect,
}

impl CompileOptions {
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            index_columns: Vec::new(),
            dialect: SqlDialect::default(),
        }
    }

    /// Set the passthrough columns; each entry is converted to its string form.
    pub fn with_index_columns<I, T>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: ToString,
    {
        self.index_columns = columns.into_iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn with_dialect(mut self, dialect: impl Into<SqlDialect>) -> Self {
        self.dialect = dialect.into();
        self
    }
}

/// Final SQL text plus what produced it
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub sql: String,
    pub dialect: SqlDialect,
    pub tree_count: usize,
}

impl CompiledQuery {
    /// SHA-256 of the SQL text, for caching and provenance
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.sql.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

impl fmt::Display for CompiledQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}

pub struct Compiler {
    options: CompileOptions,
}

impl Compiler {
    pub fn new(options: CompileOptions) -> Self {
        Self { options }
    }

    /// Compile per-tree JSON fragments, one per tree, in ensemble order
    pub fn compile_fragments<S: AsRef<str>>(&self, fragments: &[S]) -> Result<CompiledQuery, CompileError> {
        let trees = read_fragments(fragments)?;
        self.compile(&trees)
    }

    /// Compile a JSON array of trees
    pub fn compile_document(&self, document: &str) -> Result<CompiledQuery, CompileError> {
        let trees = read_document(document)?;
        self.compile(&trees)
    }

    /// Compile decoded trees. All-or-nothing: any malformed tree fails the
    /// whole query.
    pub fn compile(&self, trees: &[TreeDump]) -> Result<CompiledQuery, CompileError> {
        let options = &self.options;
        if options.table_name.trim().is_empty() {
            return Err(CompileError::InvalidOption("table_name must not be empty".to_string()));
        }
        if trees.is_empty() {
            return Err(CompileError::EmptyEnsemble);
        }

        let columns = trees
            .iter()
            .enumerate()
            .map(|(i, tree)| {
                let arena = TreeArena::index(i, tree)?;
                let column = build_column(&arena)?;
                tracing::debug!(tree = i, leaves = arena.leaf_count(), constant = column.is_constant(), "compiled tree");
                Ok::<_, CompileError>(column)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let query = self.assemble(&columns);
        let sql = render_query(&query, options.dialect.printer());

        tracing::info!(
            trees = columns.len(),
            dialect = %options.dialect,
            table = %options.table_name,
            bytes = sql.len(),
            "compiled ensemble to SQL"
        );

        Ok(CompiledQuery {
            sql,
            dialect: options.dialect,
            tree_count: columns.len(),
        })
    }

    fn assemble(&self, columns: &[CompiledColumn]) -> Query {
        let options = &self.options;

        let projections = options
            .index_columns
            .iter()
            .map(|name| Projection::new(Expr::column(name.as_str())))
            .chain(
                columns
                    .iter()
                    .map(|column| Projection::aliased(column.expr.clone(), column.alias.as_str())),
            )
            .collect();

        let booster_output = Cte {
            name: BOOSTER_OUTPUT.to_string(),
            select: Select {
                projections,
                from: vec![TableRef::named(options.table_name.as_str())],
                ..Default::default()
            },
        };

        let stages = options.dialect.score_stage().stages(&ScorePlan {
            index_columns: &options.index_columns,
            columns,
        });

        let mut ctes = vec![booster_output];
        ctes.extend(stages.ctes);
        Query { ctes, body: stages.body }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_default_to_empty_index() {
        let first = CompileOptions::new("t");
        let mut second = CompileOptions::new("t");
        second.index_columns.push("id".to_string());

        assert!(first.index_columns.is_empty());
        assert_eq!(second.index_columns.len(), 1);
        assert_eq!(first.dialect, SqlDialect::Postgres);
    }

    #[test]
    fn test_index_columns_coerced_to_strings() {
        let options = CompileOptions::new("t").with_index_columns([1, 20]);
        assert_eq!(options.index_columns, vec!["1".to_string(), "20".to_string()]);
    }

    #[test]
    fn test_with_dialect_from_str() {
        let options = CompileOptions::new("t").with_dialect("bigquery");
        assert_eq!(options.dialect, SqlDialect::BigQuery);

        let options = CompileOptions::new("t").with_dialect("sqlite");
        assert_eq!(options.dialect, SqlDialect::Postgres);
    }

    #[test]
    fn test_empty_ensemble() {
        let err = Compiler::new(CompileOptions::new("t")).compile(&[]).unwrap_err();
        assert!(matches!(err, CompileError::EmptyEnsemble));
    }

    #[test]
    fn test_empty_table_name() {
        let err = Compiler::new(CompileOptions::new("  "))
            .compile(&[TreeDump::leaf(0, 1.0)])
            .unwrap_err();
        assert!(matches!(err, CompileError::InvalidOption(_)));
    }

    #[test]
    fn test_fingerprint_deterministic() {
        let compiler = Compiler::new(CompileOptions::new("t"));
        let first = compiler.compile(&[TreeDump::leaf(0, 1.0)]).unwrap();
        let second = compiler.compile(&[TreeDump::leaf(0, 1.0)]).unwrap();
        let other = compiler.compile(&[TreeDump::leaf(0, 2.0)]).unwrap();

        assert_eq!(first.fingerprint(), second.fingerprint());
        assert_ne!(first.fingerprint(), other.fingerprint());
        assert_eq!(first.fingerprint().len(), 64);
    }
}
