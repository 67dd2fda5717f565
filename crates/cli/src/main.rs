use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::env;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use triz_engine::{resolve_contradiction, EmbeddingIndex, RawContradiction};
use triz_taxonomy::Catalog;

const PARAMETER_LIMIT: usize = 39;
const PRINCIPLE_LIMIT: usize = 40;

#[derive(Parser)]
#[command(name = "triz")]
#[command(about = "TRIZ contradiction matrix and semantic taxonomy search", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors (stdout is reserved for JSON)
    #[arg(long, global = true)]
    quiet: bool,

    /// Override embedding backend in this process
    #[arg(long, global = true, value_enum)]
    embed_mode: Option<EmbedMode>,

    /// Model directory (overrides TRIZ_MODEL_DIR)
    #[arg(long, global = true)]
    model_dir: Option<PathBuf>,
}

#[derive(Copy, Clone, ValueEnum)]
enum EmbedMode {
    Fast,
    Stub,
}

impl EmbedMode {
    const fn as_str(self) -> &'static str {
        match self {
            EmbedMode::Fast => "fast",
            EmbedMode::Stub => "stub",
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// TRIZ engineering parameters (the 39-entry taxonomy)
    Parameters {
        #[command(subcommand)]
        command: ParameterCommands,
    },
    /// TRIZ inventive principles (the 40-entry taxonomy)
    Principles {
        #[command(subcommand)]
        command: PrincipleCommands,
    },
    /// Look up inventive principles in the contradiction matrix
    Matrix(MatrixArgs),
    /// Resolve a raw contradiction end to end
    Resolve(ResolveArgs),
}

#[derive(Subcommand)]
enum ParameterCommands {
    /// List all parameters
    List,
    /// Get a parameter by ID
    Get { id: u32 },
    /// Get a parameter by name (case-insensitive exact match)
    GetByName { name: String },
    /// Semantic search over parameter names
    Search {
        query: String,
        /// Number of results (1-39)
        #[arg(short, long, default_value_t = 5)]
        limit: usize,
    },
}

#[derive(Subcommand)]
enum PrincipleCommands {
    /// List all principles
    List,
    /// Get a principle by ID
    Get { id: u32 },
    /// Get a principle by name (case-insensitive exact match)
    GetByName { name: String },
    /// Semantic search over principle names
    Search {
        query: String,
        /// Number of results (1-40)
        #[arg(short, long, default_value_t = 5)]
        limit: usize,
    },
    /// A random sample of principles, for brainstorming
    Random {
        /// Number of principles (1-40)
        #[arg(short, long, default_value_t = 5)]
        count: usize,
    },
}

#[derive(Args)]
struct MatrixArgs {
    /// Parameter IDs to improve (comma-separated)
    #[arg(long, value_delimiter = ',', required = true)]
    improving: Vec<i64>,

    /// Parameter IDs to preserve (comma-separated)
    #[arg(long, value_delimiter = ',', required = true)]
    preserving: Vec<i64>,
}

#[derive(Args)]
struct ResolveArgs {
    /// Concise description of the action
    #[arg(long)]
    action: String,

    /// The improvement caused by the action
    #[arg(long)]
    positive: String,

    /// The deterioration caused by the action
    #[arg(long)]
    negative: String,

    /// Parameter candidates per effect (1-39)
    #[arg(long, default_value_t = 2)]
    max_parameters: usize,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.quiet);

    // Backend overrides go into the environment while the process is still
    // single-threaded; ORT and the tokenizer read these from native code
    // once worker threads are running.
    apply_backend_overrides(cli.embed_mode, cli.model_dir.as_deref());

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run(cli))
}

async fn run(cli: Cli) -> Result<()> {
    let catalog = Catalog::load()?;

    match cli.command {
        Commands::Parameters { command } => run_parameters(catalog, command).await,
        Commands::Principles { command } => run_principles(catalog, command).await,
        Commands::Matrix(args) => run_matrix(catalog, &args),
        Commands::Resolve(args) => run_resolve(catalog, args).await,
    }
}

fn apply_backend_overrides(mode: Option<EmbedMode>, model_dir: Option<&Path>) {
    if let Some(mode) = mode {
        env::set_var("TRIZ_EMBEDDING_MODE", mode.as_str());
    }
    if let Some(dir) = model_dir {
        env::set_var("TRIZ_MODEL_DIR", dir);
    }
}

fn init_logging(verbose: bool, quiet: bool) {
    let level = if quiet {
        log::LevelFilter::Warn
    } else if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();
}

async fn run_parameters(catalog: &'static Catalog, command: ParameterCommands) -> Result<()> {
    match command {
        ParameterCommands::List => print_json(&catalog.parameters()),
        ParameterCommands::Get { id } => print_json(&catalog.parameter_by_id(id)?),
        ParameterCommands::GetByName { name } => print_json(&catalog.parameter_by_name(&name)?),
        ParameterCommands::Search { query, limit } => {
            check_limit(limit, PARAMETER_LIMIT)?;
            let index = EmbeddingIndex::shared().await?;
            let results = index.search_parameters(&query, limit).await?;
            print_json(&results)
        }
    }
}

async fn run_principles(catalog: &'static Catalog, command: PrincipleCommands) -> Result<()> {
    match command {
        PrincipleCommands::List => print_json(&catalog.principles()),
        PrincipleCommands::Get { id } => print_json(&catalog.principle_by_id(id)?),
        PrincipleCommands::GetByName { name } => print_json(&catalog.principle_by_name(&name)?),
        PrincipleCommands::Search { query, limit } => {
            check_limit(limit, PRINCIPLE_LIMIT)?;
            let index = EmbeddingIndex::shared().await?;
            let results = index.search_principles(&query, limit).await?;
            print_json(&results)
        }
        PrincipleCommands::Random { count } => {
            check_limit(count, PRINCIPLE_LIMIT)?;
            print_json(&catalog.random_principles(count))
        }
    }
}

fn run_matrix(catalog: &Catalog, args: &MatrixArgs) -> Result<()> {
    if args.improving.is_empty() || args.preserving.is_empty() {
        bail!("both --improving and --preserving need at least one parameter id");
    }
    let principles = triz_engine::resolver::resolve(catalog, &args.improving, &args.preserving)?;
    print_json(&principles)
}

async fn run_resolve(catalog: &'static Catalog, args: ResolveArgs) -> Result<()> {
    check_limit(args.max_parameters, PARAMETER_LIMIT)?;
    let index = EmbeddingIndex::shared().await?;
    let raw = RawContradiction {
        action: args.action,
        positive_effect: args.positive,
        negative_effect: args.negative,
    };
    let resolved = resolve_contradiction(index, catalog, raw, args.max_parameters).await?;
    print_json(&resolved)
}

fn check_limit(value: usize, max: usize) -> Result<()> {
    if value < 1 || value > max {
        bail!("limit must be between 1 and {max}, got {value}");
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value)?;
    print_stdout(&text)
}

fn print_stdout(text: &str) -> Result<()> {
    let mut stdout = io::stdout().lock();
    if let Err(err) = stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.write_all(b"\n"))
        .and_then(|_| stdout.flush())
    {
        if err.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(err.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // Overrides are applied in main before the tokio runtime is built, so
    // no worker thread can observe a partially-updated environment. This
    // pins the mapping from flags to the variables the engine reads.
    #[test]
    fn backend_overrides_land_in_the_environment() {
        apply_backend_overrides(Some(EmbedMode::Stub), Some(Path::new("/tmp/triz-models")));
        assert_eq!(env::var("TRIZ_EMBEDDING_MODE").as_deref(), Ok("stub"));
        assert_eq!(env::var("TRIZ_MODEL_DIR").as_deref(), Ok("/tmp/triz-models"));

        apply_backend_overrides(None, None);
        assert_eq!(env::var("TRIZ_EMBEDDING_MODE").as_deref(), Ok("stub"));
    }
}
