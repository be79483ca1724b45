//! Leadscope filter CLI
//!
//! Validates, routes and compiles filter DSL requests against a filter
//! registry file, printing JSON to stdout.
//!
//! ```bash
//! leadscope validate --registry filters.json request.json --strict
//! leadscope compile --registry filters.json request.json
//! leadscope detect --registry filters.json request.json
//! leadscope filters --registry filters.json --entity company
//! leadscope values --registry filters.json seniority --search vice
//! ```

mod config;
mod logging;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use leadscope_filters::{EntityKind, FilterManager, JsonFileSource, LruValueStore, SystemClock};
use leadscope_query::{QueryBuilder, SearchBackend, SearchResponse};
use serde_json::{json, Value as JsonValue};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::CliConfig;

#[derive(Parser, Debug)]
#[command(name = "leadscope")]
#[command(about = "Validate and compile contact/company filter requests")]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to ./leadscope.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Filter registry JSON file (or set LEADSCOPE__REGISTRY_PATH)
    #[arg(long, global = true)]
    registry: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate a request and print the normalized result
    Validate {
        /// Request file, `-` for stdin
        dsl: PathBuf,

        /// Exit non-zero when the request has errors
        #[arg(long)]
        strict: bool,
    },
    /// Validate, route and compile a request into a query document
    Compile {
        /// Request file, `-` for stdin
        dsl: PathBuf,
    },
    /// Print the index a request should target
    Detect {
        /// Request file, `-` for stdin
        dsl: PathBuf,
    },
    /// List available filters grouped for a picker
    Filters {
        /// Only filters applicable to this entity (contact or company)
        #[arg(long)]
        entity: Option<EntityKind>,
    },
    /// List selectable values of one filter
    Values {
        filter: String,

        #[arg(long)]
        search: Option<String>,

        #[arg(long, default_value_t = 1)]
        page: usize,

        #[arg(long, default_value_t = 50)]
        per_page: usize,
    },
}

/// The CLI has no search cluster; index-backed value listings report this.
struct OfflineBackend;

#[async_trait]
impl SearchBackend for OfflineBackend {
    async fn search(
        &self,
        index: &str,
        _body: &JsonValue,
    ) -> leadscope_query::Result<SearchResponse> {
        Err(leadscope_query::Error::Backend(format!(
            "no search backend configured (index '{}')",
            index
        )))
    }

    fn backend_name(&self) -> &'static str {
        "offline"
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = CliConfig::load(cli.config.as_deref())?;
    if cli.json_logs {
        config.logging.json = true;
    }
    logging::init_logging(&config.logging)?;

    let registry_path = cli
        .registry
        .clone()
        .or_else(|| config.registry_path.clone())
        .ok_or_else(|| anyhow!("no filter registry given (use --registry)"))?;

    let clock = Arc::new(SystemClock);
    let manager = FilterManager::load(
        Arc::new(JsonFileSource::new(&registry_path)),
        Arc::new(OfflineBackend),
        Arc::new(LruValueStore::new(
            config.filters.value_cache_capacity,
            clock.clone(),
        )),
        config.filters.clone(),
        clock,
    )
    .await
    .with_context(|| format!("Failed to load filter registry {}", registry_path.display()))?;

    match cli.command {
        Command::Validate { dsl, strict } => {
            let result = manager.validator().validate(&read_request(&dsl)?);
            print_json(&serde_json::to_value(&result)?)?;
            if strict && !result.valid {
                bail!("request has {} error(s)", result.errors.len());
            }
        }
        Command::Compile { dsl } => {
            let validator = manager.validator();
            let result = validator.validate(&read_request(&dsl)?);
            let target = validator.detect_entity(&result.normalized);

            let mut query = QueryBuilder::new(manager.settings().index_for(target.entity()));
            manager.apply_dsl(&mut query, &result.normalized);

            print_json(&json!({
                "target": target,
                "index": query.index(),
                "query": query.to_document(),
                "errors": result.errors,
            }))?;
        }
        Command::Detect { dsl } => {
            let validator = manager.validator();
            let result = validator.validate(&read_request(&dsl)?);
            println!("{}", validator.detect_entity(&result.normalized).as_str());
        }
        Command::Filters { entity } => {
            let registry = manager.registry();
            let listing: serde_json::Map<String, JsonValue> = EntityKind::ALL
                .into_iter()
                .filter(|e| entity.map_or(true, |wanted| wanted == *e))
                .map(|e| -> Result<(String, JsonValue)> {
                    Ok((e.as_str().to_string(), serde_json::to_value(registry.grouped(e))?))
                })
                .collect::<Result<_>>()?;
            print_json(&JsonValue::Object(listing))?;
        }
        Command::Values {
            filter,
            search,
            page,
            per_page,
        } => {
            let values = manager
                .get_filter_values(&filter, search.as_deref(), page, per_page)
                .await?;
            print_json(&serde_json::to_value(&values)?)?;
        }
    }

    Ok(())
}

fn read_request(path: &Path) -> Result<JsonValue> {
    let raw = if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read request from stdin")?;
        buf
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read request {}", path.display()))?
    };
    serde_json::from_str(&raw).context("Request is not valid JSON")
}

fn print_json(value: &JsonValue) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
