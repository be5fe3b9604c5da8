use crate::models::{PortfolioState, TradeRecord, TradeSide};

/// One buy followed by the sell that closed it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoundTrip {
    /// Base currency spent on the buy, costs included
    pub cost: f64,
    /// Base currency received from the sell, net of costs
    pub proceeds: f64,
}

impl RoundTrip {
    pub fn pnl(&self) -> f64 {
        self.proceeds - self.cost
    }

    pub fn is_win(&self) -> bool {
        self.pnl() > 0.0
    }
}

/// Backtest performance summary, valued at the last close
#[derive(Debug, Clone)]
pub struct BacktestReport {
    pub strategy: String,
    pub samples: usize,

    // P&L
    pub start_balance: f64,
    pub final_price: f64,
    pub final_value: f64,
    pub pnl: f64,
    pub pnl_pct: f64,

    // Costs
    pub total_fees: f64,
    pub total_slippage: f64,

    // Trades
    pub trades: Vec<TradeRecord>,
    pub round_trips: Vec<RoundTrip>,
    pub win_rate: f64,

    // Risk (marked-to-market equity curve)
    pub max_drawdown: f64,
    pub max_drawdown_pct: f64,

    /// Wallet at the end of the run; an open position stays open
    pub final_state: PortfolioState,
}

impl BacktestReport {
    pub fn new(
        strategy: &str,
        samples: usize,
        trades: Vec<TradeRecord>,
        final_state: PortfolioState,
        final_price: f64,
        equity_curve: &[f64],
    ) -> Self {
        let round_trips = Self::pair_round_trips(&trades);
        let wins = round_trips.iter().filter(|rt| rt.is_win()).count();
        let win_rate = if round_trips.is_empty() {
            0.0
        } else {
            (wins as f64 / round_trips.len() as f64) * 100.0
        };

        let (max_drawdown, max_drawdown_pct) = Self::calculate_drawdown(equity_curve);

        Self {
            strategy: strategy.to_string(),
            samples,
            start_balance: final_state.start_balance,
            final_price,
            final_value: final_state.total_value(final_price),
            pnl: final_state.pnl(final_price),
            pnl_pct: final_state.pnl_pct(final_price),
            total_fees: final_state.total_fees,
            total_slippage: final_state.total_slippage,
            trades,
            round_trips,
            win_rate,
            max_drawdown,
            max_drawdown_pct,
            final_state,
        }
    }

    pub fn total_trades(&self) -> usize {
        self.trades.len()
    }

    pub fn winning_round_trips(&self) -> usize {
        self.round_trips.iter().filter(|rt| rt.is_win()).count()
    }

    /// Pair each sell with the buy before it; a trailing buy stays open
    fn pair_round_trips(trades: &[TradeRecord]) -> Vec<RoundTrip> {
        let mut round_trips = Vec::new();
        let mut open_cost: Option<f64> = None;

        for trade in trades {
            match trade.side {
                TradeSide::Buy => {
                    open_cost = Some(trade.quantity * trade.price + trade.fee + trade.slippage);
                }
                TradeSide::Sell => {
                    if let Some(cost) = open_cost.take() {
                        round_trips.push(RoundTrip {
                            cost,
                            proceeds: trade.amount_received(),
                        });
                    }
                }
            }
        }

        round_trips
    }

    /// Largest peak-to-trough drop of the equity curve, absolute and in percent
    fn calculate_drawdown(equity_curve: &[f64]) -> (f64, f64) {
        let mut peak = f64::MIN;
        let mut max_dd = 0.0;
        let mut max_dd_pct = 0.0;

        for &value in equity_curve {
            if value > peak {
                peak = value;
            }

            let drawdown = peak - value;
            if drawdown > max_dd {
                max_dd = drawdown;
                max_dd_pct = if peak > 0.0 { (drawdown / peak) * 100.0 } else { 0.0 };
            }
        }

        (max_dd, max_dd_pct)
    }

    /// Print a formatted report to stdout
    pub fn print_report(&self) {
        println!("\n╔═══════════════════════════════════════════════════════╗");
        println!("║              BACKTEST PERFORMANCE REPORT              ║");
        println!("╚═══════════════════════════════════════════════════════╝\n");

        println!("📊 P&L SUMMARY");
        println!("  Strategy:              {}", self.strategy);
        println!("  Samples:               {}", self.samples);
        println!("  Initial Balance:       ${:.2}", self.start_balance);
        println!(
            "  Final Value:           ${:.2} (last close ${:.2})",
            self.final_value, self.final_price
        );
        println!(
            "  PnL:                   ${:+.2} ({:+.2}%)",
            self.pnl, self.pnl_pct
        );
        println!("  Fees:                  ${:.4}", self.total_fees);
        println!("  Slippage:              ${:.4}", self.total_slippage);

        println!("\n📈 TRADE STATISTICS");
        println!("  Total Trades:          {}", self.total_trades());
        println!("  Round Trips:           {}", self.round_trips.len());
        println!(
            "  Winning Round Trips:   {} ({:.1}%)",
            self.winning_round_trips(),
            self.win_rate
        );
        if self.final_state.asset_balance > 0.0 {
            println!(
                "  Open Position:         {:.6} units",
                self.final_state.asset_balance
            );
        }

        println!("\n⚠️  RISK METRICS");
        println!(
            "  Max Drawdown:          ${:.2} ({:.2}%)",
            self.max_drawdown, self.max_drawdown_pct
        );

        println!("\n═════════════════════════════════════════════════════════\n");
    }
}
