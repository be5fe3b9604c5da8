use crate::engine::session::TickReport;
use crate::models::PortfolioState;

/// One-line live status after a tick
pub fn status_line(report: &TickReport, state: &PortfolioState, asset: &str) -> String {
    let price = report.sample.price();
    let momentum = report
        .momentum
        .map(|m| format!("{:+.5}", m))
        .unwrap_or_else(|| "warming up".to_string());

    format!(
        "⏳ {} | Price: ${:.2} | Momentum: {} | USD: ${:.2} | {}: {:.6} | Value: ${:.2} | PnL: ${:+.2} ({:+.2}%)",
        report.sample.timestamp().format("%Y-%m-%d %H:%M:%S"),
        price,
        momentum,
        state.usd_balance,
        asset,
        state.asset_balance,
        state.total_value(price),
        state.pnl(price),
        state.pnl_pct(price)
    )
}

/// End-of-run summary block, valued at `price` when one is known
pub fn summary(title: &str, state: &PortfolioState, trades: usize, price: Option<f64>) -> String {
    let mut out = String::new();
    out.push_str(&format!("\n========= 📊 {} =========\n", title));
    out.push_str(&format!("Trades: {}\n", trades));

    match price {
        Some(price) => out.push_str(&format!(
            "Final balance: ${:.2} (PnL: ${:+.2}, {:+.2}%)\n",
            state.total_value(price),
            state.pnl(price),
            state.pnl_pct(price)
        )),
        None => out.push_str("Final balance: unknown (no final price)\n"),
    }

    out.push_str(&format!(
        "Fees: ${:.4} | Slippage: ${:.4}\n",
        state.total_fees, state.total_slippage
    ));
    out.push_str(&format!(
        "Running since: {}\n",
        state.start_time.format("%Y-%m-%d %H:%M:%S")
    ));
    out
}
