//! xgbsql - compile a boosted tree ensemble dump into a scoring SQL query
//!
//! Usage: `xgbsql [config.yaml]`. Without an argument the config path comes
//! from `XGBSQL_CONFIG`, then `./xgbsql.yaml` if present, and otherwise the
//! settings are read from the environment alone.

use anyhow::Context;
use std::path::PathBuf;
use tracing::info;
use xgbsql_compile::{CompiledQuery, Compiler};
use xgbsql_tree::read_document_from_path;

mod config;
mod logging;

use config::{Config, DumpFormat};

const DEFAULT_CONFIG: &str = "xgbsql.yaml";

fn config_path() -> Option<PathBuf> {
    std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("XGBSQL_CONFIG").map(PathBuf::from))
        .or_else(|| {
            let default = PathBuf::from(DEFAULT_CONFIG);
            default.exists().then_some(default)
        })
}

fn compile(config: &Config) -> anyhow::Result<CompiledQuery> {
    let compiler = Compiler::new(config.compile_options()?);
    let path = config.dump_path()?;

    let query = match config.input.format {
        DumpFormat::Document => {
            let trees = read_document_from_path(path)
                .with_context(|| format!("reading tree dump {}", path.display()))?;
            compiler.compile(&trees)?
        }
        DumpFormat::Fragments => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading tree dump {}", path.display()))?;
            let fragments: Vec<&str> = text.lines().filter(|line| !line.trim().is_empty()).collect();
            compiler.compile_fragments(&fragments)?
        }
    };

    Ok(query)
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = match config_path() {
        Some(path) => {
            Config::load(&path).with_context(|| format!("loading config {}", path.display()))?
        }
        None => Config::from_env(),
    };

    logging::init(&config.logging);

    let query = compile(&config)?;
    info!(
        trees = query.tree_count,
        dialect = %query.dialect,
        fingerprint = %query.fingerprint(),
        "query ready"
    );

    match &config.output.path {
        Some(path) => {
            std::fs::write(path, format!("{}\n", query))
                .with_context(|| format!("writing SQL to {}", path.display()))?;
            info!(path = %path.display(), "wrote SQL");
        }
        None => println!("{}", query),
    }

    Ok(())
}
