use anyhow::Context;
use clap::Parser;
use momentum_paper::backtest::{export_trades, BacktestRunner, MarketScenario, SyntheticDataGenerator};
use momentum_paper::execution::HistoricalFeed;
use momentum_paper::settings::{Settings, StrategyKind};
use momentum_paper::strategy;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Replay a price series through the momentum strategy
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Candle CSV with `time` and `close` columns
    #[arg(short, long, conflicts_with = "synthetic", required_unless_present = "synthetic")]
    data: Option<PathBuf>,

    /// Generate a synthetic series instead of reading a CSV
    #[arg(long, value_enum)]
    synthetic: Option<MarketScenario>,

    /// Samples to generate in synthetic mode
    #[arg(long, default_value_t = 500)]
    samples: usize,

    /// Seed for the synthetic generator
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Where to write executed trades
    #[arg(short, long, default_value = "momentum_trades.csv")]
    export: PathBuf,

    /// Config file (TOML/JSON/YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the strategy from configuration
    #[arg(short, long, value_enum)]
    strategy: Option<StrategyKind>,
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("momentum_paper=info")),
        )
        .init();

    let cli = Cli::parse();

    let mut settings =
        Settings::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(kind) = cli.strategy {
        settings.strategy.kind = kind;
    }
    settings.validate()?;

    let (samples, name) = match (&cli.data, cli.synthetic) {
        (Some(path), _) => {
            let feed = HistoricalFeed::from_csv(path)
                .with_context(|| format!("Failed to load {}", path.display()))?;
            if feed.is_empty() {
                anyhow::bail!("{} has no price rows", path.display());
            }
            (feed.samples().to_vec(), path.display().to_string())
        }
        (None, Some(scenario)) => {
            let mut generator = SyntheticDataGenerator::new(cli.seed);
            (
                generator.generate(scenario, cli.samples, 5),
                format!("synthetic {:?} (seed {})", scenario, cli.seed),
            )
        }
        (None, None) => anyhow::bail!("either --data or --synthetic is required"),
    };

    let runner = BacktestRunner::from_settings(&settings);
    let report = runner.run_and_report(strategy::from_settings(&settings.strategy), samples, &name)?;

    export_trades(&cli.export, &report.trades)?;
    println!("💾 Trades exported to {}", cli.export.display());

    Ok(())
}
