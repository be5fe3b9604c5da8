use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::BotError;

/// A single observed price at a point in time
///
/// Price is always positive and finite; the only way to build one is
/// through [`PriceSample::new`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceSample {
    timestamp: DateTime<Utc>,
    price: f64,
}

impl PriceSample {
    pub fn new(timestamp: DateTime<Utc>, price: f64) -> Result<Self, BotError> {
        if !price.is_finite() || price <= 0.0 {
            return Err(BotError::InvalidPrice(price));
        }
        Ok(Self { timestamp, price })
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn price(&self) -> f64 {
        self.price
    }
}

/// Decision emitted by a strategy for one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    Buy,
    Sell,
    None,
}

/// Side of an executed trade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeSide {
    Buy,
    Sell,
}

impl TradeSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeSide::Buy => "BUY",
            TradeSide::Sell => "SELL",
        }
    }
}

impl fmt::Display for TradeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable record of one executed trade
///
/// `fee` and `slippage` are in base currency, `quantity` in asset units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub timestamp: DateTime<Utc>,
    pub side: TradeSide,
    pub quantity: f64,
    pub price: f64,
    pub fee: f64,
    pub slippage: f64,
}

impl TradeRecord {
    /// What the trade delivered: asset units for a buy, base currency for a sell
    pub fn amount_received(&self) -> f64 {
        match self.side {
            TradeSide::Buy => self.quantity,
            TradeSide::Sell => self.quantity * self.price - self.fee - self.slippage,
        }
    }
}

/// Which leg of the wallet currently holds the funds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Holding {
    Base,
    Asset,
    /// Both legs empty (wallet wiped out)
    Empty,
}

/// Wallet snapshot owned by the portfolio simulator
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioState {
    pub usd_balance: f64,
    pub asset_balance: f64,
    pub start_time: DateTime<Utc>,
    pub start_balance: f64,
    pub total_fees: f64,
    pub total_slippage: f64,
    pub last_trade_time: Option<DateTime<Utc>>,
}

impl PortfolioState {
    /// Fresh wallet fully allocated to the base currency
    pub fn fresh(start_balance: f64, now: DateTime<Utc>) -> Self {
        Self {
            usd_balance: start_balance,
            asset_balance: 0.0,
            start_time: now,
            start_balance,
            total_fees: 0.0,
            total_slippage: 0.0,
            last_trade_time: None,
        }
    }

    pub fn holding(&self) -> Holding {
        if self.asset_balance > 0.0 {
            Holding::Asset
        } else if self.usd_balance > 0.0 {
            Holding::Base
        } else {
            Holding::Empty
        }
    }

    /// Mark-to-market value in base currency
    pub fn total_value(&self, price: f64) -> f64 {
        self.usd_balance + self.asset_balance * price
    }

    pub fn pnl(&self, price: f64) -> f64 {
        self.total_value(price) - self.start_balance
    }

    pub fn pnl_pct(&self, price: f64) -> f64 {
        if self.start_balance > 0.0 {
            self.pnl(price) / self.start_balance * 100.0
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_sample_rejects_bad_prices() {
        let now = Utc::now();
        assert!(PriceSample::new(now, 0.0).is_err());
        assert!(PriceSample::new(now, -1.0).is_err());
        assert!(PriceSample::new(now, f64::NAN).is_err());
        assert!(PriceSample::new(now, f64::INFINITY).is_err());

        let sample = PriceSample::new(now, 101.5).unwrap();
        assert_eq!(sample.price(), 101.5);
        assert_eq!(sample.timestamp(), now);
    }

    #[test]
    fn test_fresh_portfolio_holds_base() {
        let state = PortfolioState::fresh(1000.0, Utc::now());

        assert_eq!(state.holding(), Holding::Base);
        assert_eq!(state.total_value(50_000.0), 1000.0);
        assert_eq!(state.pnl(50_000.0), 0.0);
        assert!(state.last_trade_time.is_none());
    }

    #[test]
    fn test_valuation_when_holding_asset() {
        let mut state = PortfolioState::fresh(1000.0, Utc::now());
        state.usd_balance = 0.0;
        state.asset_balance = 10.0;

        assert_eq!(state.holding(), Holding::Asset);
        assert_eq!(state.total_value(110.0), 1100.0);
        assert_eq!(state.pnl(110.0), 100.0);
        assert_eq!(state.pnl_pct(110.0), 10.0);
    }

    #[test]
    fn test_sell_record_amount_is_net_proceeds() {
        let record = TradeRecord {
            timestamp: Utc::now(),
            side: TradeSide::Sell,
            quantity: 2.0,
            price: 100.0,
            fee: 0.2,
            slippage: 0.12,
        };

        assert!((record.amount_received() - 199.68).abs() < 1e-9);
        assert_eq!(record.side.to_string(), "SELL");
    }
}
