use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use munidx::index::{self, build_all, BuildOptions, DirectoryStore};
use munidx::query::{PartitionCache, QueryEngine};
use munidx::utils::Settings;
use munidx::{ingest, output, shell};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "munidx")]
#[command(about = "Partitioned municipality index with PBKDF2 fingerprints")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Settings file (defaults to config.json in the app data directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build one index file per UF from a CSV dataset
    Build {
        /// `;`-separated dataset: TOM;IBGE;name TOM;name IBGE;UF
        csv: PathBuf,

        /// Output directory
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// PBKDF2 iteration count
        #[arg(long)]
        iterations: Option<u32>,

        /// Fingerprint length in bytes
        #[arg(long)]
        hash_bytes: Option<usize>,

        /// Fingerprint workers (0 = CPU count)
        #[arg(short, long)]
        threads: Option<usize>,

        /// Hide progress bars
        #[arg(short, long)]
        quiet: bool,
    },
    /// Run one query
    Search {
        /// UF, TOM/IBGE code, or part of a name
        #[arg(required = true, trailing_var_arg = true)]
        query: Vec<String>,

        /// Index directory
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Maximum rows for UF and name searches
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Interactive query loop
    Shell {
        /// Index directory
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },
    /// Show index statistics
    Stats {
        /// Index directory
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn open_engine(dir: PathBuf, display_limit: usize) -> QueryEngine<DirectoryStore> {
    tracing::debug!(dir = %dir.display(), "opening index directory");
    let cache = Arc::new(PartitionCache::new(DirectoryStore::new(dir)));
    QueryEngine::new(cache).with_display_limit(display_limit)
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;
    let color = !cli.no_color && std::io::stdout().is_terminal();

    match cli.command {
        Commands::Build {
            csv,
            out,
            iterations,
            hash_bytes,
            threads,
            quiet,
        } => {
            let mut params = settings.fingerprint_params();
            if let Some(n) = iterations {
                params.iterations = n;
            }
            if let Some(n) = hash_bytes {
                params.output_len = n;
            }

            let mut options = BuildOptions::new(out.unwrap_or_else(|| settings.index_dir.clone()));
            options.params = params;
            options.worker_threads = threads.unwrap_or(settings.worker_threads);
            options.excluded_partitions = settings.excluded_partitions.clone();
            options.silent = quiet;

            let records = ingest::load_csv(&csv)
                .with_context(|| format!("Failed to load dataset {}", csv.display()))?;
            println!(
                "Loaded {} municipalities from {}",
                records.len(),
                csv.display()
            );

            let summary = build_all(records, &options).context("Index build failed")?;
            output::print_build_summary(&summary);
        }
        Commands::Search { query, dir, limit } => {
            let engine = open_engine(
                dir.unwrap_or(settings.index_dir),
                limit.unwrap_or(settings.display_limit),
            );
            let query = query.join(" ");
            let outcome = engine
                .search(&query)
                .with_context(|| format!("Search for '{}' failed", query))?;
            output::print_outcome(&outcome, color)?;
        }
        Commands::Shell { dir } => {
            let engine = open_engine(dir.unwrap_or(settings.index_dir), settings.display_limit);
            shell::run(&engine, color)?;
        }
        Commands::Stats { dir } => {
            index::stats::show_stats(&dir.unwrap_or(settings.index_dir))?;
        }
    }

    Ok(())
}
