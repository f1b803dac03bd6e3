use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};

use hrtf_match::config::DegenerateRange;
use hrtf_match::data::loader;
use hrtf_match::{MatchConfig, report, run_match};

/// Find the closest, median and farthest ARI subjects for a listener
#[derive(Parser, Debug)]
#[command(name = "hrtf-match")]
#[command(version, about, long_about = None)]
struct Args {
    /// Reference population (.parquet, .json or .csv)
    #[arg(short, long, default_value = "./data.parquet")]
    reference: PathBuf,

    /// Listener measurements CSV (header row, value in third column)
    #[arg(short, long)]
    measurements: PathBuf,

    /// JSON match configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Reference positions to leave out of the ranking (replaces the configured list)
    #[arg(long, value_delimiter = ',')]
    exclude: Option<Vec<usize>>,

    /// Expected number of reference subjects
    #[arg(long)]
    population_size: Option<usize>,

    /// Policy for features whose reference values are all equal
    #[arg(long, value_enum)]
    degenerate_range: Option<DegenerateRange>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Log debug output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let mut config = match &args.config {
        Some(path) => MatchConfig::from_file(path)?,
        None => MatchConfig::default(),
    };
    if let Some(excluded) = args.exclude {
        config.excluded = excluded.into_iter().collect();
    }
    if let Some(n) = args.population_size {
        config.population_size = n;
    }
    if let Some(policy) = args.degenerate_range {
        config.degenerate_range = policy;
    }
    log::debug!("{config:?}");

    let population = loader::load_file(&args.reference)?;
    let measurements = loader::read_measurements(&args.measurements)?;

    let outcome = run_match(&population, &measurements, &config).context("matching failed")?;

    match args.format {
        Format::Text => print!("{}", report::render_text(&outcome)),
        Format::Json => println!("{}", report::render_json(&outcome)?),
    }
    Ok(())
}
