// Trading strategy module
pub mod momentum;
pub mod simple;

pub use momentum::ThresholdMomentum;
pub use simple::SimpleComparison;

use chrono::{DateTime, Utc};

use crate::execution::{CooldownTimer, RollingWindow};
use crate::models::{Action, PortfolioState};
use crate::settings::{StrategyKind, StrategySettings};

/// Base trait for all trading strategies
///
/// One call per tick, at most one decision. Strategies never mutate the
/// portfolio; they only read it to know which side is held.
pub trait Strategy: Send + Sync {
    /// Decide what to do with the current window
    fn evaluate(
        &self,
        window: &RollingWindow,
        portfolio: &PortfolioState,
        now: DateTime<Utc>,
        cooldown: &CooldownTimer,
    ) -> Action;

    /// Get strategy name
    fn name(&self) -> &str;

    /// Number of samples the window must hold before evaluating
    fn window_size(&self) -> usize;
}

/// Build the strategy selected in configuration
pub fn from_settings(settings: &StrategySettings) -> Box<dyn Strategy> {
    match settings.kind {
        StrategyKind::Simple => Box::new(SimpleComparison::new(settings.window_size())),
        StrategyKind::Threshold => Box::new(ThresholdMomentum::new(
            settings.window_size(),
            settings.threshold,
            settings.cooldown(),
        )),
    }
}
