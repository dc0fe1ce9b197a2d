//! Configuration for the xgbsql command
//!
//! Loads configuration from:
//! 1. xgbsql.yaml - compile options, input and output locations, logging
//! 2. .env file - loaded into the environment before overrides are read
//!
//! Environment variables always override xgbsql.yaml values.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use xgbsql_compile::{CompileOptions, SqlDialect};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Missing required setting: {0}")]
    MissingSetting(String),
}

/// A passthrough column name as written in YAML; numbers are accepted and
/// turned into their text form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnName {
    Text(String),
    Int(i64),
    Float(f64),
}

impl fmt::Display for ColumnName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnName::Text(s) => f.write_str(s),
            ColumnName::Int(i) => write!(f, "{}", i),
            ColumnName::Float(x) => write!(f, "{}", x),
        }
    }
}

/// What to compile the ensemble against
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompileConfig {
    #[serde(default)]
    pub table_name: String,

    #[serde(default)]
    pub index_list: Vec<ColumnName>,

    /// "postgres" (default) or "bigquery"
    #[serde(default)]
    pub dialect: SqlDialect,
}

/// Shape of the dump file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DumpFormat {
    /// One JSON array holding every tree
    #[default]
    Document,
    /// One JSON tree per line
    Fragments,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InputConfig {
    #[serde(default)]
    pub dump_path: Option<PathBuf>,

    #[serde(default)]
    pub format: DumpFormat,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Write SQL here instead of stdout
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error) or module-specific
    pub level: String,

    /// Output format: pretty, json, compact
    pub format: String,

    /// Output destination: stderr, file, both
    pub output: String,

    /// Directory for log files
    pub directory: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "compact".to_string(),
            output: "stderr".to_string(),
            directory: "./logs".to_string(),
        }
    }
}

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub compile: CompileConfig,
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from YAML file with environment variable overrides
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = serde_yaml::from_str(&contents)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Configuration from environment variables alone, for runs without a file
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(table) = std::env::var("XGBSQL_TABLE_NAME") {
            self.compile.table_name = table;
        }
        if let Ok(dialect) = std::env::var("XGBSQL_DIALECT") {
            self.compile.dialect = SqlDialect::parse(&dialect);
        }
        if let Ok(columns) = std::env::var("XGBSQL_INDEX_COLUMNS") {
            self.compile.index_list = columns
                .split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(|c| ColumnName::Text(c.to_string()))
                .collect();
        }

        if let Ok(path) = std::env::var("XGBSQL_DUMP_PATH") {
            self.input.dump_path = Some(PathBuf::from(path));
        }
        if let Ok(path) = std::env::var("XGBSQL_OUTPUT_PATH") {
            self.output.path = Some(PathBuf::from(path));
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("LOG_FORMAT") {
            self.logging.format = format;
        }
        if let Ok(output) = std::env::var("LOG_OUTPUT") {
            self.logging.output = output;
        }
        if let Ok(dir) = std::env::var("LOG_DIR") {
            self.logging.directory = dir;
        }
    }

    pub fn compile_options(&self) -> Result<CompileOptions, ConfigError> {
        if self.compile.table_name.trim().is_empty() {
            return Err(ConfigError::MissingSetting("compile.table_name".to_string()));
        }

        Ok(CompileOptions::new(self.compile.table_name.as_str())
            .with_index_columns(&self.compile.index_list)
            .with_dialect(self.compile.dialect))
    }

    pub fn dump_path(&self) -> Result<&Path, ConfigError> {
        self.input
            .dump_path
            .as_deref()
            .ok_or_else(|| ConfigError::MissingSetting("input.dump_path".to_string()))
    }
}
