use std::path::Path;

use serde::Serialize;

use crate::backtest::metrics::BacktestReport;
use crate::engine::{TickReport, TradingSession};
use crate::error::BotError;
use crate::execution::HistoricalFeed;
use crate::models::{PortfolioState, PriceSample, TradeRecord};
use crate::settings::Settings;
use crate::strategy::Strategy;
use crate::Result;

/// Replays a historical series through the same session the live loop uses
pub struct BacktestRunner {
    start_balance: f64,
    fee_rate: f64,
    slippage_rate: f64,
}

impl BacktestRunner {
    pub fn new(start_balance: f64, fee_rate: f64, slippage_rate: f64) -> Self {
        Self {
            start_balance,
            fee_rate,
            slippage_rate,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.start_balance,
            settings.fee_rate,
            settings.slippage_rate,
        )
    }

    /// Run a backtest with given strategy and samples
    ///
    /// The wallet is valued at the last close at the end; an open position
    /// is not sold.
    pub fn run(
        &self,
        strategy: Box<dyn Strategy>,
        samples: Vec<PriceSample>,
    ) -> Result<BacktestReport> {
        let needed = strategy.window_size();
        if samples.len() < needed {
            return Err(BotError::HistoricalData(format!(
                "Not enough samples for backtest. Need {}, got {}",
                needed,
                samples.len()
            )));
        }

        let mut feed = HistoricalFeed::new(samples);
        let start_time = match feed.samples().first() {
            Some(first) => first.timestamp(),
            None => return Err(BotError::HistoricalData("empty price series".into())),
        };

        tracing::info!(
            "Starting backtest: {} samples, {} needs {}",
            feed.len(),
            strategy.name(),
            needed
        );

        let name = strategy.name().to_string();
        let mut session = TradingSession::new(
            PortfolioState::fresh(self.start_balance, start_time),
            strategy,
            self.fee_rate,
            self.slippage_rate,
        );

        let mut trades = Vec::new();
        let mut equity_curve = Vec::with_capacity(feed.len());
        let mut last_price = 0.0;

        while let Some(sample) = feed.next_sample() {
            let report = session.on_sample(sample);
            tracing::debug!("{}", progress_line(&report));
            if let Some(trade) = report.trade {
                tracing::info!(
                    "{} {} {:.6} @ ${:.2}",
                    trade.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    trade.side,
                    trade.quantity,
                    trade.price
                );
                trades.push(trade);
            }
            equity_curve.push(session.state().total_value(sample.price()));
            last_price = sample.price();
        }

        let report = BacktestReport::new(
            &name,
            feed.len(),
            trades,
            session.state().clone(),
            last_price,
            &equity_curve,
        );

        tracing::info!(
            "Backtest complete: {} trades, PnL: ${:.2} ({:.2}%)",
            report.total_trades(),
            report.pnl,
            report.pnl_pct
        );

        Ok(report)
    }

    /// Run backtest and print report
    pub fn run_and_report(
        &self,
        strategy: Box<dyn Strategy>,
        samples: Vec<PriceSample>,
        scenario_name: &str,
    ) -> Result<BacktestReport> {
        println!("\n🔬 Running backtest: {}", scenario_name);
        println!("   Strategy: {}", strategy.name());
        println!("   Samples: {}", samples.len());
        println!("   Initial Balance: ${:.2}", self.start_balance);

        let report = self.run(strategy, samples)?;
        report.print_report();

        Ok(report)
    }
}

/// `⏳ time | Price | Momentum` line for one replayed sample
fn progress_line(report: &TickReport) -> String {
    let momentum = report
        .momentum
        .map(|m| format!("{:+.5}", m))
        .unwrap_or_else(|| "warming up".to_string());

    format!(
        "⏳ {} | Price: ${:.2} | Momentum: {}",
        report.sample.timestamp().format("%Y-%m-%d %H:%M:%S"),
        report.sample.price(),
        momentum
    )
}

#[derive(Serialize)]
struct ExportRow<'a> {
    time: String,
    action: &'a str,
    price: f64,
    amount: f64,
}

/// Write trades as `time,action,price,amount` rows
///
/// `amount` is the asset received for a BUY and the base currency received
/// for a SELL.
pub fn export_trades(path: &Path, trades: &[TradeRecord]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| BotError::persistence(path, e))?;

    for trade in trades {
        writer
            .serialize(ExportRow {
                time: trade.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
                action: trade.side.as_str(),
                price: trade.price,
                amount: trade.amount_received(),
            })
            .map_err(|e| BotError::persistence(path, e))?;
    }

    writer.flush().map_err(|e| BotError::persistence(path, e))?;

    tracing::info!("Exported {} trades to {}", trades.len(), path.display());
    Ok(())
}
