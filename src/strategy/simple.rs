use chrono::{DateTime, Utc};

use super::Strategy;
use crate::execution::{CooldownTimer, RollingWindow};
use crate::models::{Action, Holding, PortfolioState};

const RUN_LENGTH: usize = 3;

/// Buy after three strictly rising samples, sell after three strictly falling ones
///
/// No threshold and no cooldown: the strict ordering is the whole signal.
#[derive(Debug, Clone)]
pub struct SimpleComparison {
    window_size: usize,
}

impl SimpleComparison {
    pub fn new(window_size: usize) -> Self {
        Self {
            window_size: window_size.max(RUN_LENGTH),
        }
    }
}

impl Default for SimpleComparison {
    fn default() -> Self {
        Self::new(RUN_LENGTH)
    }
}

impl Strategy for SimpleComparison {
    fn evaluate(
        &self,
        window: &RollingWindow,
        portfolio: &PortfolioState,
        _now: DateTime<Utc>,
        _cooldown: &CooldownTimer,
    ) -> Action {
        if !window.is_full() || window.len() < RUN_LENGTH {
            return Action::None;
        }

        let p = window.recent_prices(RUN_LENGTH);
        let rising = p[2] > p[1] && p[1] > p[0];
        let falling = p[2] < p[1] && p[1] < p[0];

        match portfolio.holding() {
            Holding::Base if rising => Action::Buy,
            Holding::Asset if falling => Action::Sell,
            _ => Action::None,
        }
    }

    fn name(&self) -> &str {
        "SimpleComparison"
    }

    fn window_size(&self) -> usize {
        self.window_size
    }
}
