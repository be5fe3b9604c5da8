use crate::execution::{PortfolioSimulator, RollingWindow};
use crate::models::{Action, PortfolioState, PriceSample, TradeRecord};
use crate::settings::Settings;
use crate::strategy::{self, Strategy};

/// Outcome of feeding one sample through the session
#[derive(Debug, Clone)]
pub struct TickReport {
    pub sample: PriceSample,
    /// `None` until the window is full
    pub momentum: Option<f64>,
    pub action: Action,
    /// Present only when the decision actually executed
    pub trade: Option<TradeRecord>,
}

/// All mutable trading state for one run: wallet, window and strategy
///
/// Owned by whoever drives the ticks (control loop or backtest runner);
/// nothing else holds a reference to it between ticks.
pub struct TradingSession {
    portfolio: PortfolioSimulator,
    window: RollingWindow,
    strategy: Box<dyn Strategy>,
}

impl TradingSession {
    pub fn new(
        state: PortfolioState,
        strategy: Box<dyn Strategy>,
        fee_rate: f64,
        slippage_rate: f64,
    ) -> Self {
        Self {
            portfolio: PortfolioSimulator::new(state, fee_rate, slippage_rate),
            window: RollingWindow::new(strategy.window_size()),
            strategy,
        }
    }

    pub fn from_settings(settings: &Settings, state: PortfolioState) -> Self {
        Self::new(
            state,
            strategy::from_settings(&settings.strategy),
            settings.fee_rate,
            settings.slippage_rate,
        )
    }

    /// Record a sample without evaluating (startup baseline)
    pub fn observe(&mut self, sample: PriceSample) {
        self.window.push(sample);
    }

    /// Push a sample, evaluate once the window is full, execute the decision
    pub fn on_sample(&mut self, sample: PriceSample) -> TickReport {
        self.window.push(sample);

        if !self.window.is_full() {
            return TickReport {
                sample,
                momentum: None,
                action: Action::None,
                trade: None,
            };
        }

        let action = self.strategy.evaluate(
            &self.window,
            self.portfolio.state(),
            sample.timestamp(),
            &self.portfolio.cooldown(),
        );

        let trade = match action {
            Action::Buy => self.portfolio.execute_buy(sample.price(), sample.timestamp()),
            Action::Sell => self.portfolio.execute_sell(sample.price(), sample.timestamp()),
            Action::None => None,
        };

        TickReport {
            sample,
            momentum: self.window.momentum(),
            action,
            trade,
        }
    }

    /// Sell any held asset at `sample`, ignoring strategy and cooldown
    pub fn liquidate(&mut self, sample: PriceSample) -> Option<TradeRecord> {
        self.portfolio
            .force_liquidate(sample.price(), sample.timestamp())
    }

    pub fn portfolio(&self) -> &PortfolioSimulator {
        &self.portfolio
    }

    pub fn state(&self) -> &PortfolioState {
        self.portfolio.state()
    }

    pub fn window(&self) -> &RollingWindow {
        &self.window
    }

    pub fn strategy(&self) -> &dyn Strategy {
        self.strategy.as_ref()
    }
}
