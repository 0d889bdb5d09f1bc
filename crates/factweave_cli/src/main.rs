//! factweave CLI
//!
//! Parses, walks, compiles and assesses specifications written in the
//! descriptive text syntax.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod config;

use clap::{Parser, Subcommand};
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use config::CliConfig;
use factweave_core::{FactReference, TypeCatalog};
use factweave_distribution::{walk_from_specification, DistributionEngine};
use factweave_query::sql_from_specification;
use factweave_spec::{infer_catalog, parse_specification, Specification};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "factweave")]
#[command(about = "factweave - specification compiler and distribution checker", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(long, global = true, env = "FACTWEAVE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a specification and print it back
    Parse {
        /// Specification file
        file: PathBuf,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Print the walk of a specification
    Walk {
        /// Specification file
        file: PathBuf,
    },
    /// Compile a specification to SQL
    Sql {
        /// Specification file
        file: PathBuf,
        /// Start facts as Type@hash, one per given
        #[arg(long, num_args = 1..)]
        start: Vec<FactReference>,
        /// Page size
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Check a specification against the configured distribution rules
    Assess {
        /// Specification file
        file: PathBuf,
        /// Start facts as Type@hash
        #[arg(long, num_args = 1..)]
        start: Vec<FactReference>,
        /// Requesting user as Type@hash
        #[arg(long)]
        user: Option<FactReference>,
    },
}

fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("factweave=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = CliConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Parse { file, json } => {
            let spec = read_specification(&file)?;
            if json {
                print_json(&spec)
            } else {
                println!("{}", spec);
                Ok(())
            }
        }
        Commands::Walk { file } => {
            let spec = read_specification(&file)?;
            print_json(&walk_from_specification(&spec)?)
        }
        Commands::Sql { file, start, limit } => {
            let spec = read_specification(&file)?;
            let catalog = match config.to_catalog()? {
                Some(catalog) => catalog,
                None => inferred_catalog(&spec)?,
            };
            let limit = limit.unwrap_or(config.limit);
            let queries = sql_from_specification(&start, &[], limit, &spec, &catalog)?;
            info!(queries = queries.len(), "specification compiled");
            print_json(&queries)
        }
        Commands::Assess { file, start, user } => {
            let spec = read_specification(&file)?;
            let rules = config.to_rules()?;
            info!(rules = rules.len(), "distribution rules loaded");
            let engine = DistributionEngine::new(rules);
            print_json(&engine.assess(&spec, &start, user.as_ref())?)
        }
    }
}

fn read_specification(path: &Path) -> Result<Specification> {
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("Cannot read {}", path.display()))?;
    parse_specification(&text).wrap_err_with(|| format!("Invalid specification {}", path.display()))
}

fn inferred_catalog(spec: &Specification) -> Result<TypeCatalog> {
    let catalog = infer_catalog(spec)?;
    info!(
        fact_types = catalog.fact_type_count(),
        roles = catalog.role_count(),
        "no catalog configured, inferred from specification"
    );
    Ok(catalog)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
