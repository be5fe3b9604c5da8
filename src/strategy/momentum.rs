use chrono::{DateTime, Duration, Utc};

use super::Strategy;
use crate::execution::{CooldownTimer, RollingWindow};
use crate::models::{Action, Holding, PortfolioState};

/// Threshold momentum over the full window
///
/// momentum = (p_now - p_oldest) / p_oldest
///
/// - BUY when holding base currency and momentum > +threshold
/// - SELL when holding the asset and momentum < -threshold
///
/// Both require the cooldown since the last trade to have elapsed. A momentum
/// exactly at the threshold does nothing.
#[derive(Debug, Clone)]
pub struct ThresholdMomentum {
    window_size: usize,
    threshold: f64,
    cooldown: Duration,
}

impl ThresholdMomentum {
    pub fn new(window_size: usize, threshold: f64, cooldown: Duration) -> Self {
        Self {
            window_size: window_size.max(2),
            threshold,
            cooldown,
        }
    }
}

impl Default for ThresholdMomentum {
    fn default() -> Self {
        Self::new(30, 0.015, Duration::minutes(5))
    }
}

impl Strategy for ThresholdMomentum {
    fn evaluate(
        &self,
        window: &RollingWindow,
        portfolio: &PortfolioState,
        now: DateTime<Utc>,
        cooldown: &CooldownTimer,
    ) -> Action {
        if !window.is_full() {
            return Action::None;
        }
        let Some(momentum) = window.momentum() else {
            return Action::None;
        };

        let action = match portfolio.holding() {
            Holding::Base if momentum > self.threshold => Action::Buy,
            Holding::Asset if momentum < -self.threshold => Action::Sell,
            _ => return Action::None,
        };

        if !cooldown.is_elapsed(now, self.cooldown) {
            tracing::debug!(
                momentum = %format!("{:+.5}", momentum),
                "Signal {:?} suppressed by cooldown",
                action
            );
            return Action::None;
        }

        action
    }

    fn name(&self) -> &str {
        "ThresholdMomentum"
    }

    fn window_size(&self) -> usize {
        self.window_size
    }
}
