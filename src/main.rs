use anyhow::Context;
use clap::Parser;
use momentum_paper::engine::ControlLoop;
use momentum_paper::execution::LiveFeed;
use momentum_paper::settings::{Settings, StrategyKind};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Paper-trade one asset against a live ticker using a momentum signal
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (TOML/JSON/YAML); defaults to ./momentum-paper.toml if present
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the strategy from configuration
    #[arg(short, long, value_enum)]
    strategy: Option<StrategyKind>,

    /// Override the wallet snapshot path
    #[arg(long)]
    state: Option<PathBuf>,

    /// Override the trade ledger path
    #[arg(long)]
    ledger: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    setup_logging();

    let cli = Cli::parse();
    let settings = load_settings(&cli)?;

    tracing::info!("🚀 momentum-paper starting");
    tracing::info!(
        "  Symbol: {} | Strategy: {:?} | Poll: {}s",
        settings.feed.symbol,
        settings.strategy.kind,
        settings.poll_interval_secs
    );
    tracing::info!(
        "  Fee: {:.4}% | Slippage: {:.4}% | Wallet: {} | Ledger: {}",
        settings.fee_rate * 100.0,
        settings.slippage_rate * 100.0,
        settings.storage.state_path.display(),
        settings.storage.ledger_path.display()
    );

    let feed = LiveFeed::new(&settings.feed).context("Failed to build price feed")?;
    let mut control = ControlLoop::new(feed, settings);

    tracing::info!("Press Ctrl+C to stop...");
    let summary = control
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await
        .context("Paper trading stopped with an error")?;

    tracing::info!(
        "Run finished: {} ticks, {} skipped, {} trades",
        summary.ticks,
        summary.skipped_ticks,
        summary.trades
    );

    Ok(())
}

fn load_settings(cli: &Cli) -> anyhow::Result<Settings> {
    let mut settings =
        Settings::load(cli.config.as_deref()).context("Failed to load configuration")?;

    if let Some(kind) = cli.strategy {
        settings.strategy.kind = kind;
    }
    if let Some(state) = &cli.state {
        settings.storage.state_path = state.clone();
    }
    if let Some(ledger) = &cli.ledger {
        settings.storage.ledger_path = ledger.clone();
    }
    settings.validate()?;

    Ok(settings)
}

fn setup_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("momentum_paper=info"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
