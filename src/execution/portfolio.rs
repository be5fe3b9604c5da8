use chrono::{DateTime, Duration, Utc};

use crate::models::{Holding, PortfolioState, TradeRecord, TradeSide};

/// Time of the last executed trade, used to gate new trades
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CooldownTimer {
    last_trade: Option<DateTime<Utc>>,
}

impl CooldownTimer {
    pub fn new(last_trade: Option<DateTime<Utc>>) -> Self {
        Self { last_trade }
    }

    pub fn last_trade(&self) -> Option<DateTime<Utc>> {
        self.last_trade
    }

    /// True when at least `cooldown` has passed since the last trade (or no trade yet)
    pub fn is_elapsed(&self, now: DateTime<Utc>, cooldown: Duration) -> bool {
        match self.last_trade {
            Some(last) => now - last >= cooldown,
            None => true,
        }
    }
}

/// Simulated wallet: executes full-allocation buys and sells with fees and slippage
///
/// Every execution works on a copy of the state and commits it in a single
/// assignment, so callers never observe a half-applied trade. A rejected
/// execution (nothing to convert) returns `None` and changes nothing.
#[derive(Debug, Clone)]
pub struct PortfolioSimulator {
    state: PortfolioState,
    fee_rate: f64,
    slippage_rate: f64,
}

impl PortfolioSimulator {
    pub fn new(state: PortfolioState, fee_rate: f64, slippage_rate: f64) -> Self {
        Self {
            state,
            fee_rate,
            slippage_rate,
        }
    }

    pub fn state(&self) -> &PortfolioState {
        &self.state
    }

    pub fn holding(&self) -> Holding {
        self.state.holding()
    }

    pub fn cooldown(&self) -> CooldownTimer {
        CooldownTimer::new(self.state.last_trade_time)
    }

    /// Convert the whole base-currency balance into the asset
    pub fn execute_buy(&mut self, price: f64, at: DateTime<Utc>) -> Option<TradeRecord> {
        if self.state.usd_balance <= 0.0 || !is_tradable_price(price) {
            return None;
        }

        let mut next = self.state.clone();
        let spend = next.usd_balance;
        let fee = spend * self.fee_rate;
        let slippage = spend * self.slippage_rate;
        let bought = (spend - fee - slippage) / price;

        next.usd_balance = 0.0;
        next.asset_balance += bought;
        next.total_fees += fee;
        next.total_slippage += slippage;
        next.last_trade_time = Some(at);
        self.state = next;

        tracing::info!(
            price = %format!("{:.2}", price),
            quantity = %format!("{:.6}", bought),
            fee = %format!("{:.4}", fee),
            "📈 BUY executed"
        );

        Some(TradeRecord {
            timestamp: at,
            side: TradeSide::Buy,
            quantity: bought,
            price,
            fee,
            slippage,
        })
    }

    /// Convert the whole asset balance back into base currency
    pub fn execute_sell(&mut self, price: f64, at: DateTime<Utc>) -> Option<TradeRecord> {
        if self.state.asset_balance <= 0.0 || !is_tradable_price(price) {
            return None;
        }

        let mut next = self.state.clone();
        let sold = next.asset_balance;
        let gross = sold * price;
        let fee = gross * self.fee_rate;
        let slippage = gross * self.slippage_rate;

        next.asset_balance = 0.0;
        next.usd_balance += gross - fee - slippage;
        next.total_fees += fee;
        next.total_slippage += slippage;
        next.last_trade_time = Some(at);
        self.state = next;

        tracing::info!(
            price = %format!("{:.2}", price),
            quantity = %format!("{:.6}", sold),
            fee = %format!("{:.4}", fee),
            "📉 SELL executed"
        );

        Some(TradeRecord {
            timestamp: at,
            side: TradeSide::Sell,
            quantity: sold,
            price,
            fee,
            slippage,
        })
    }

    /// Sell everything regardless of strategy or cooldown (shutdown path)
    pub fn force_liquidate(&mut self, price: f64, at: DateTime<Utc>) -> Option<TradeRecord> {
        if self.state.asset_balance <= 0.0 {
            return None;
        }
        tracing::info!("Liquidating {:.6} units at ${:.2}", self.state.asset_balance, price);
        self.execute_sell(price, at)
    }

    pub fn total_value(&self, price: f64) -> f64 {
        self.state.total_value(price)
    }

    pub fn pnl(&self, price: f64) -> f64 {
        self.state.pnl(price)
    }

    pub fn pnl_pct(&self, price: f64) -> f64 {
        self.state.pnl_pct(price)
    }
}

fn is_tradable_price(price: f64) -> bool {
    price.is_finite() && price > 0.0
}
