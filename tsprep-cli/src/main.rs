//! tsprep CLI: dataset preparation commands.
//!
//! Commands:
//! - `prepare`: run every strategy over a price table and export labeled
//!   per-asset datasets
//! - `build`: split prepared datasets into scaled train/test sets
//! - `catalog list`: print the indicator catalog
//! - `catalog validate`: check a catalog (and optionally a strategy file)

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tsprep_core::applicator::IndicatorApplicator;
use tsprep_core::catalog::IndicatorCatalog;
use tsprep_core::export::{JsonArtifactSink, ParquetSink};
use tsprep_core::indicators::{BuiltinLibrary, IndicatorLibrary};
use tsprep_core::strategy::StrategyCatalog;
use tsprep_runner::{
    init_logging, open_provider, prepare_universe, ParquetDirSource, PrepConfig, PrepareOptions,
    TrainTestBuilder, UniverseFilter,
};

#[derive(Parser)]
#[command(name = "tsprep", about = "tsprep: labeled time-series dataset preparation")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply strategies to a price table and export labeled windows per asset.
    Prepare {
        /// Run config (TOML). Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Long price table: .csv or .parquet.
        #[arg(long)]
        prices: PathBuf,

        /// Strategy document; overrides `[paths] strategies`.
        #[arg(long)]
        strategies: Option<PathBuf>,

        /// Indicator catalog; overrides `[paths] catalog`.
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Also export each strategy's augmented table.
        #[arg(long, default_value_t = false)]
        keep_augmented: bool,

        /// Skip the `[universe]` liquidity and history rules.
        #[arg(long, default_value_t = false)]
        all_assets: bool,
    },
    /// Build strategy-level train/test sets from prepared datasets.
    Build {
        #[arg(long)]
        config: Option<PathBuf>,

        #[arg(long)]
        strategies: Option<PathBuf>,
    },
    /// Indicator catalog commands.
    Catalog {
        #[command(subcommand)]
        action: CatalogAction,
    },
}

#[derive(Subcommand)]
enum CatalogAction {
    /// Print every indicator with its inputs and output columns.
    List {
        #[arg(long)]
        catalog: Option<PathBuf>,
    },
    /// Validate a catalog against the indicator library.
    Validate {
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Also validate this strategy document against the catalog.
        #[arg(long)]
        strategies: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Prepare {
            config,
            prices,
            strategies,
            catalog,
            keep_augmented,
            all_assets,
        } => run_prepare(
            config.as_deref(),
            &prices,
            strategies,
            catalog,
            keep_augmented,
            all_assets,
        ),
        Commands::Build { config, strategies } => run_build(config.as_deref(), strategies),
        Commands::Catalog { action } => match action {
            CatalogAction::List { catalog } => run_catalog_list(catalog.as_deref()),
            CatalogAction::Validate { catalog, strategies } => {
                run_catalog_validate(catalog.as_deref(), strategies.as_deref())
            }
        },
    }
}

fn load_config(path: Option<&Path>) -> Result<PrepConfig> {
    let config = PrepConfig::load(path).context("failed to load run config")?;
    info!(config_hash = %config.fingerprint()?, "configuration loaded");
    Ok(config)
}

fn load_strategies(path: &Path) -> Result<StrategyCatalog> {
    let strategies = StrategyCatalog::from_path(path)
        .with_context(|| format!("failed to load strategies from {}", path.display()))?;
    if strategies.is_empty() {
        bail!("no strategies defined in {}", path.display());
    }
    Ok(strategies)
}

fn run_prepare(
    config_path: Option<&Path>,
    prices: &Path,
    strategies_path: Option<PathBuf>,
    catalog_path: Option<PathBuf>,
    keep_augmented: bool,
    all_assets: bool,
) -> Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(path) = strategies_path {
        config.paths.strategies = path;
    }
    if catalog_path.is_some() {
        config.paths.catalog = catalog_path;
    }

    let library = BuiltinLibrary::new();
    let catalog = IndicatorCatalog::load(config.paths.catalog.as_deref(), &library)
        .context("indicator catalog failed validation")?;
    let strategies = load_strategies(&config.paths.strategies)?;
    strategies
        .validate(&catalog, &library)
        .context("strategy document failed validation")?;

    let mut universe = open_provider(prices)?
        .load()
        .with_context(|| format!("failed to load prices from {}", prices.display()))?;
    if !all_assets {
        universe = UniverseFilter::new(config.universe.clone()).apply(universe);
    }
    if universe.is_empty() {
        bail!("no asset passed the universe rules");
    }

    let applicator = IndicatorApplicator::new(&catalog, &library);
    let opts = PrepareOptions {
        format: config.format_options(),
        raw_dir: config.paths.raw_dataset.clone(),
        keep_augmented,
    };
    let reports = prepare_universe(&universe, &strategies, &applicator, &opts, &ParquetSink)?;

    println!();
    println!("{:<16} {:<10} {:>10} {:>8}", "Strategy", "Ticker", "Windows", "Rows");
    println!("{}", "-".repeat(47));
    for r in &reports {
        println!("{:<16} {:<10} {:>10} {:>8}", r.strategy, r.ticker, r.candidates, r.rows);
    }
    println!();
    println!("Prepared datasets written to: {}", config.paths.raw_dataset.display());
    Ok(())
}

fn run_build(config_path: Option<&Path>, strategies_path: Option<PathBuf>) -> Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(path) = strategies_path {
        config.paths.strategies = path;
    }
    let strategies = load_strategies(&config.paths.strategies)?;

    let source = ParquetDirSource::new(&config.paths.raw_dataset);
    let builder = TrainTestBuilder::new(&config);
    let outputs = builder.build(&strategies, &source, &ParquetSink, &JsonArtifactSink)?;
    if outputs.is_empty() {
        bail!(
            "no prepared datasets under {}; run `tsprep prepare` first",
            config.paths.raw_dataset.display()
        );
    }

    println!();
    for out in &outputs {
        let m = &out.manifest;
        println!("=== {} ===", m.strategy);
        println!("Assets:    {}", m.assets.len());
        println!("Features:  {}", m.feature_columns.len());
        println!("Train:     {} rows -> {}", m.train_rows, out.train_path.display());
        println!("Test:      {} rows -> {}", m.test_rows, out.test_path.display());
        println!("Scalers:   {}", out.scaler_paths.len());
        println!();
    }
    Ok(())
}

fn run_catalog_list(catalog_path: Option<&Path>) -> Result<()> {
    let library = BuiltinLibrary::new();
    let catalog = IndicatorCatalog::load(catalog_path, &library)?;

    println!("{:<14} {:<12} {:<40} Outputs", "Indicator", "Category", "Inputs");
    println!("{}", "-".repeat(90));
    for spec in catalog.specs() {
        let outputs: Vec<String> = spec.output_templates.iter().map(ToString::to_string).collect();
        println!(
            "{:<14} {:<12} {:<40} {}",
            spec.name,
            spec.category,
            spec.input_params.join(", "),
            outputs.join(", ")
        );
    }
    println!();
    println!("{} indicators, library: {}", catalog.len(), library.name());
    Ok(())
}

fn run_catalog_validate(catalog_path: Option<&Path>, strategies_path: Option<&Path>) -> Result<()> {
    let library = BuiltinLibrary::new();
    let catalog = IndicatorCatalog::load(catalog_path, &library).context("catalog is invalid")?;
    println!("Catalog OK: {} indicators", catalog.len());

    if let Some(path) = strategies_path {
        let strategies = load_strategies(path)?;
        strategies
            .validate(&catalog, &library)
            .with_context(|| format!("{} is invalid", path.display()))?;
        println!("Strategies OK: {}", strategies.names().collect::<Vec<_>>().join(", "));
    }
    Ok(())
}
