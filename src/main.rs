//! Tessera
//!
//! Diagnostic binary: loads a schema document, binds it to in-memory
//! adapters and prints the classified relations and merged handlers.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tessera_core::StorageAdapter;
use tessera_hooks::{Engine, EngineConfig};
use tessera_ir::load_schema;
use tessera_store::MemoryAdapter;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Classify a schema document and print its relations
    Check {
        /// Schema document (.json or .toml)
        schema: PathBuf,

        /// Engine configuration file (.toml)
        #[arg(short, long, env = "TESSERA_CONFIG")]
        config: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
}

/// Output format for the relation report
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum OutputFormat {
    /// Human-readable listing
    #[default]
    Table,
    /// JSON array of relations
    Json,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let args = Args::parse();
    match args.command {
        Command::Check {
            schema,
            config,
            format,
        } => check(&schema, config.as_deref(), format),
    }
}

fn check(schema_path: &Path, config_path: Option<&Path>, format: OutputFormat) -> Result<()> {
    let config = match config_path {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => EngineConfig::default(),
    };

    let schema = load_schema(schema_path)?
        .into_builder()?
        .default_adapter(|entity| {
            let adapter: Arc<dyn StorageAdapter> = Arc::new(MemoryAdapter::new(&entity.name));
            adapter
        })
        .build()
        .with_context(|| format!("Invalid schema {}", schema_path.display()))?;

    let engine = Engine::bind(schema, config).context("Failed to bind schema")?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(engine.relations())?);
        }
        OutputFormat::Table => print_table(&engine)?,
    }
    Ok(())
}

fn print_table(engine: &Engine) -> Result<()> {
    println!("Relations ({})", engine.relations().len());
    for relation in engine.relations() {
        println!("  {}", relation);
    }

    println!();
    println!("Handlers");
    for entity in engine.schema().entities() {
        let handlers = engine.handlers(&entity.name)?;
        if handlers.is_empty() {
            println!("  {}: -", entity.name);
            continue;
        }
        println!(
            "  {}: cascades [{}], resolvers [{}]",
            entity.name,
            handlers.cascade_fields().collect::<Vec<_>>().join(", "),
            handlers.resolver_fields().collect::<Vec<_>>().join(", ")
        );
    }
    Ok(())
}
