//! YieldLab CLI: run the forward-return pipeline and inspect its output.
//!
//! Commands:
//! - `run`: compute forward returns for every tier and year and append them
//! - `inspect`: report rows, part files, hashes and stamps per stored partition
//! - `config`: print the default pipeline configuration as TOML

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

use yieldlab_core::data::{CsvSource, MarketDataSource, ParquetSource};
use yieldlab_core::store::{
    distinct_hashes, duplicate_keys, latest_by_key, ParquetPartitionStore, PartitionKey,
};
use yieldlab_runner::{run_pipeline, PipelineConfig, SyntheticSource, UnitStatus};

#[derive(Parser)]
#[command(
    name = "yieldlab",
    about = "YieldLab CLI: forward returns under price-limit halts"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute forward returns and append them to the partitioned output.
    Run {
        /// Path to a TOML config file. Defaults to the built-in tiers.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Year-partitioned Parquet market data (`{dir}/year=YYYY/*.parquet`).
        #[arg(long)]
        source_dir: Option<PathBuf>,

        /// Single CSV file with `date,code,open,high,low,close` columns.
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Use deterministic synthetic market data.
        #[arg(long, default_value_t = false)]
        synthetic: bool,

        /// Number of instruments generated in synthetic mode.
        #[arg(long, default_value_t = 50)]
        synthetic_codes: usize,

        /// First target year (overrides the config).
        #[arg(long)]
        start_year: Option<i32>,

        /// Last target year (overrides the config).
        #[arg(long)]
        end_year: Option<i32>,

        /// Output partition root. Defaults to ./output.
        #[arg(long, default_value = "output")]
        output_dir: PathBuf,

        /// Run units one at a time instead of on the thread pool.
        #[arg(long, default_value_t = false)]
        sequential: bool,
    },
    /// Report on stored partitions.
    Inspect {
        /// Output partition root. Defaults to ./output.
        #[arg(long, default_value = "output")]
        output_dir: PathBuf,

        /// Only this tier.
        #[arg(long)]
        tier: Option<String>,

        /// Only this year.
        #[arg(long)]
        year: Option<i32>,
    },
    /// Print the default configuration as TOML.
    Config,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            source_dir,
            csv,
            synthetic,
            synthetic_codes,
            start_year,
            end_year,
            output_dir,
            sequential,
        } => {
            let source = build_source(source_dir, csv, synthetic, synthetic_codes)?;
            run_cmd(
                config.as_deref(),
                source.as_ref(),
                start_year,
                end_year,
                &output_dir,
                sequential,
            )
        }
        Commands::Inspect {
            output_dir,
            tier,
            year,
        } => run_inspect(&output_dir, tier.as_deref(), year),
        Commands::Config => {
            print!("{}", PipelineConfig::default().to_toml()?);
            Ok(())
        }
    }
}

fn build_source(
    source_dir: Option<PathBuf>,
    csv: Option<PathBuf>,
    synthetic: bool,
    synthetic_codes: usize,
) -> Result<Box<dyn MarketDataSource>> {
    // Validate mutually exclusive options
    let chosen =
        usize::from(source_dir.is_some()) + usize::from(csv.is_some()) + usize::from(synthetic);
    if chosen != 1 {
        bail!("exactly one of --source-dir, --csv or --synthetic is required");
    }

    let source: Box<dyn MarketDataSource> = match (source_dir, csv) {
        (Some(dir), _) => Box::new(ParquetSource::new(dir)),
        (_, Some(path)) => Box::new(CsvSource::new(path)),
        _ => {
            if synthetic_codes == 0 {
                bail!("--synthetic-codes must be at least 1");
            }
            Box::new(SyntheticSource::with_count(synthetic_codes))
        }
    };
    Ok(source)
}

fn run_cmd(
    config_path: Option<&Path>,
    source: &dyn MarketDataSource,
    start_year: Option<i32>,
    end_year: Option<i32>,
    output_dir: &Path,
    sequential: bool,
) -> Result<()> {
    let mut config = match config_path {
        Some(path) => PipelineConfig::from_file(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(start) = start_year {
        config.years.start = start;
    }
    if let Some(end) = end_year {
        config.years.end = end;
    }
    if sequential {
        config.run.parallel = false;
    }
    config.validate()?;

    info!(
        source = source.name(),
        output = %output_dir.display(),
        years = %format!("{}..={}", config.years.start, config.years.end),
        tiers = config.tiers.len(),
        "starting run"
    );
    let store = ParquetPartitionStore::new(output_dir);
    let summary = run_pipeline(&config, source, &store)?;

    print!("{summary}");
    for unit in &summary.units {
        if let UnitStatus::Written { rows, location } = &unit.status {
            println!("  tier={} year={} rows={rows} -> {location}", unit.tier, unit.year);
        }
    }

    if !summary.is_success() {
        bail!("{} of {} units failed", summary.failed(), summary.units.len());
    }
    Ok(())
}

fn run_inspect(output_dir: &Path, tier: Option<&str>, year: Option<i32>) -> Result<()> {
    if !output_dir.exists() {
        println!("Output directory does not exist: {}", output_dir.display());
        return Ok(());
    }

    let store = ParquetPartitionStore::new(output_dir);
    let keys: Vec<PartitionKey> = store
        .partitions()?
        .into_iter()
        .filter(|k| tier.map_or(true, |t| k.tier == t))
        .filter(|k| year.map_or(true, |y| k.year == y))
        .collect();

    if keys.is_empty() {
        println!("No partitions found in {}", output_dir.display());
        return Ok(());
    }

    println!(
        "{:<24} {:>6} {:>9} {:>9} {:>9} {:>8}  stamps",
        "partition", "parts", "rows", "current", "hashes", "dup keys"
    );
    for key in keys {
        let parts = store.part_files(&key)?.len();
        let records = store.read_partition(&key)?;
        let rows = records.len();
        let hashes = distinct_hashes(&records).len();
        let duplicates = duplicate_keys(&records);
        let stamps: BTreeSet<String> = records.iter().map(|r| r.ingested_at.label()).collect();
        let current = latest_by_key(records).len();

        println!(
            "{:<24} {:>6} {:>9} {:>9} {:>9} {:>8}  {}",
            key.to_string(),
            parts,
            rows,
            current,
            hashes,
            duplicates,
            stamps.into_iter().collect::<Vec<_>>().join(", ")
        );
    }

    Ok(())
}
