//! Dialect aggregators - sum tree columns and apply the logistic link

use serde::{Deserialize, Serialize};
use std::fmt;
use xgbsql_sql::{ArithOp, BigQuery, Cte, Dialect, Expr, Postgres, Projection, Select, SqlType, TableRef, WhenThen};

use crate::column::CompiledColumn;

/// Name of the CTE holding one column per tree
pub const BOOSTER_OUTPUT: &str = "booster_output";

/// Alias of the final probability column
pub const SCORE_ALIAS: &str = "score";

/// Target SQL engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SqlDialect {
    #[default]
    Postgres,
    BigQuery,
}

impl SqlDialect {
    /// Parse a dialect name; unknown names fall back to Postgres.
    pub fn parse(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "bigquery" => SqlDialect::BigQuery,
            "postgres" | "postgresql" | "" => SqlDialect::Postgres,
            other => {
                tracing::warn!(dialect = other, "unknown SQL dialect, using postgres");
                SqlDialect::Postgres
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        self.printer().name()
    }

    pub fn printer(&self) -> &'static dyn Dialect {
        match self {
            SqlDialect::Postgres => &Postgres,
            SqlDialect::BigQuery => &BigQuery,
        }
    }

    pub fn score_stage(&self) -> &'static dyn ScoreStage {
        match self {
            SqlDialect::Postgres => &PostgresScore,
            SqlDialect::BigQuery => &BigQueryScore,
        }
    }
}

impl From<&str> for SqlDialect {
    fn from(name: &str) -> Self {
        SqlDialect::parse(name)
    }
}

impl From<String> for SqlDialect {
    fn from(name: String) -> Self {
        SqlDialect::parse(&name)
    }
}

impl From<SqlDialect> for String {
    fn from(dialect: SqlDialect) -> Self {
        dialect.as_str().to_string()
    }
}

impl fmt::Display for SqlDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What an aggregation stage reads
#[derive(Debug, Clone, Copy)]
pub struct ScorePlan<'a> {
    pub index_columns: &'a [String],
    pub columns: &'a [CompiledColumn],
}

/// CTEs appended after `booster_output`, and the final SELECT
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreStages {
    pub ctes: Vec<Cte>,
    pub body: Select,
}

/// Turns the per-tree columns of `booster_output` into one score per row
pub trait ScoreStage {
    fn stages(&self, plan: &ScorePlan<'_>) -> ScoreStages;
}

/// `1 / (1 + EXP(-(sum)))`
pub fn logistic(sum: Expr) -> Expr {
    let exp = Expr::func("EXP", vec![sum.nested().neg()]);
    let denominator = Expr::number(1.0).arith(ArithOp::Add, exp).nested();
    Expr::number(1.0).arith(ArithOp::Div, denominator)
}

fn index_projections(index_columns: &[String]) -> Vec<Projection> {
    index_columns
        .iter()
        .map(|name| Projection::new(Expr::column(name.as_str())))
        .collect()
}

/// Direct arithmetic over the tree columns
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresScore;

impl ScoreStage for PostgresScore {
    fn stages(&self, plan: &ScorePlan<'_>) -> ScoreStages {
        let sum = Expr::sum(plan.columns.iter().map(|c| Expr::column(c.alias.as_str())))
            .unwrap_or_else(|| Expr::number(0.0));

        let mut projections = index_projections(plan.index_columns);
        projections.push(Projection::aliased(logistic(sum), SCORE_ALIAS));

        ScoreStages {
            ctes: vec![],
            body: Select {
                projections,
                from: vec![TableRef::named(BOOSTER_OUTPUT)],
                ..Default::default()
            },
        }
    }
}

/// Unpivots `booster_output` through its JSON text form and sums the values.
///
/// Each row becomes `{"name":value,...}`; the pairs are split apart, quotes
/// stripped, index columns filtered out, and the rest summed per index key.
#[derive(Debug, Clone, Copy, Default)]
pub struct BigQueryScore;

impl BigQueryScore {
    const JSON_COLLAPSED: &'static str = "json_collapsed";
    const UNNESTED: &'static str = "unnested";
    const JSON_NULL: &'static str = "null";

    fn strip_quotes(expr: Expr) -> Expr {
        Expr::func("REGEXP_REPLACE", vec![expr, Expr::string("^\"|\"$"), Expr::string("")])
    }

    fn colon_position() -> Expr {
        Expr::func("STRPOS", vec![Expr::column("pairs"), Expr::string(":")])
    }

    /// A NULL tree column serializes as `null`. It must not reach the cast,
    /// and like the direct sum it makes the whole score NULL.
    fn score() -> Expr {
        let value = Expr::func("NULLIF", vec![Expr::column("value"), Expr::string(Self::JSON_NULL)]);
        let sum = Expr::func("SUM", vec![value.cast(SqlType::Float)]);

        let null_trees = Expr::func("COUNTIF", vec![Expr::column("value").eq(Expr::string(Self::JSON_NULL))]);
        Expr::Case {
            branches: vec![WhenThen {
                when: null_trees.eq(Expr::number(0.0)),
                then: logistic(sum),
            }],
            otherwise: None,
        }
    }
}

impl ScoreStage for BigQueryScore {
    fn stages(&self, plan: &ScorePlan<'_>) -> ScoreStages {
        let index = plan.index_columns;

        let mut collapsed = index_projections(index);
        collapsed.push(Projection::aliased(
            Expr::func("TO_JSON_STRING", vec![Expr::column(BOOSTER_OUTPUT)]),
            "json_text",
        ));

        let name = Expr::func(
            "SUBSTR",
            vec![
                Expr::column("pairs"),
                Expr::number(1.0),
                Self::colon_position().arith(ArithOp::Sub, Expr::number(1.0)),
            ],
        );
        let value = Expr::func(
            "SUBSTR",
            vec![
                Expr::column("pairs"),
                Self::colon_position().arith(ArithOp::Add, Expr::number(1.0)),
                Expr::func("LENGTH", vec![Expr::column("pairs")]),
            ],
        );
        let pairs = Expr::func(
            "SPLIT",
            vec![
                Expr::func(
                    "REGEXP_REPLACE",
                    vec![Expr::column("json_text"), Expr::string("^{|}$"), Expr::string("")],
                ),
                Expr::string(",\""),
            ],
        );

        let mut unnested = index_projections(index);
        unnested.push(Projection::aliased(Self::strip_quotes(name), "variable_name"));
        unnested.push(Projection::aliased(Self::strip_quotes(value), "value"));

        let mut scored = index_projections(index);
        scored.push(Projection::aliased(Self::score(), SCORE_ALIAS));

        let (filter, group_by) = if index.is_empty() {
            (None, vec![])
        } else {
            let names = index.iter().map(|name| Expr::string(name.as_str())).collect();
            (
                Some(Expr::column("variable_name").not_in(names)),
                index.iter().map(|name| Expr::column(name.as_str())).collect(),
            )
        };

        ScoreStages {
            ctes: vec![
                Cte {
                    name: Self::JSON_COLLAPSED.to_string(),
                    select: Select {
                        projections: collapsed,
                        from: vec![TableRef::named(BOOSTER_OUTPUT)],
                        ..Default::default()
                    },
                },
                Cte {
                    name: Self::UNNESTED.to_string(),
                    select: Select {
                        projections: unnested,
                        from: vec![
                            TableRef::named(Self::JSON_COLLAPSED),
                            TableRef::Unnest {
                                expr: pairs,
                                alias: "pairs".to_string(),
                            },
                        ],
                        ..Default::default()
                    },
                },
            ],
            body: Select {
                projections: scored,
                from: vec![TableRef::named(Self::UNNESTED)],
                filter,
                group_by,
            },
        }
    }
}
