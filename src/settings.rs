use ::config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::api::KUCOIN_API_BASE;
use crate::error::BotError;
use crate::Result;

const DEFAULT_CONFIG_FILE: &str = "momentum-paper";
const ENV_PREFIX: &str = "MOMENTUM_PAPER";

pub const SIMPLE_WINDOW: usize = 3;
pub const THRESHOLD_WINDOW: usize = 30;

/// Upper bounds keeping every duration representable
pub const MAX_POLL_INTERVAL_SECS: u64 = 86_400;
pub const MAX_TIMEOUT_SECS: u64 = 3_600;
pub const MAX_COOLDOWN_SECS: u64 = 30 * 86_400;

/// Which decision rule drives the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    /// Three strictly rising/falling samples
    Simple,
    /// Relative change over the full window against a threshold, with cooldown
    Threshold,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedSettings {
    pub base_url: String,
    /// Exchange pair, e.g. `BTC-USDT`
    pub symbol: String,
    pub timeout_secs: u64,
}

impl FeedSettings {
    /// Asset leg of the pair (`BTC` for `BTC-USDT`)
    pub fn asset(&self) -> &str {
        self.symbol.split('-').next().unwrap_or(&self.symbol)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.min(MAX_TIMEOUT_SECS))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategySettings {
    pub kind: StrategyKind,
    /// Defaults to 3 for `simple` and 30 for `threshold`
    #[serde(default)]
    pub window_size: Option<usize>,
    pub threshold: f64,
    pub cooldown_secs: u64,
}

impl StrategySettings {
    pub fn window_size(&self) -> usize {
        self.window_size.unwrap_or(match self.kind {
            StrategyKind::Simple => SIMPLE_WINDOW,
            StrategyKind::Threshold => THRESHOLD_WINDOW,
        })
    }

    pub fn cooldown(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.cooldown_secs.min(MAX_COOLDOWN_SECS) as i64)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    pub state_path: PathBuf,
    pub ledger_path: PathBuf,
}

/// Run configuration. Fixed for the lifetime of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub fee_rate: f64,
    pub slippage_rate: f64,
    pub start_balance: f64,
    pub poll_interval_secs: u64,
    pub feed: FeedSettings,
    pub strategy: StrategySettings,
    pub storage: StorageSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            fee_rate: 0.001,       // 0.1%
            slippage_rate: 0.0006, // 0.06%
            start_balance: 1000.0,
            poll_interval_secs: 10,
            feed: FeedSettings {
                base_url: KUCOIN_API_BASE.to_string(),
                symbol: "BTC-USDT".to_string(),
                timeout_secs: 10,
            },
            strategy: StrategySettings {
                kind: StrategyKind::Threshold,
                window_size: None,
                threshold: 0.015,
                cooldown_secs: 300,
            },
            storage: StorageSettings {
                state_path: PathBuf::from("wallet.json"),
                ledger_path: PathBuf::from("trades.log"),
            },
        }
    }
}

impl Settings {
    /// Load settings: defaults, then the config file, then `MOMENTUM_PAPER__*` env vars
    ///
    /// An explicit `path` must exist; without one, `momentum-paper.{toml,json,yaml}`
    /// in the working directory is used when present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(p) => File::from(p).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let settings: Settings = Config::builder()
            .add_source(Config::try_from(&Settings::default())?)
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.min(MAX_POLL_INTERVAL_SECS))
    }

    /// Reject values the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        for (name, rate) in [("fee_rate", self.fee_rate), ("slippage_rate", self.slippage_rate)] {
            if !(0.0..1.0).contains(&rate) {
                return Err(BotError::Config(format!(
                    "{} must be in [0, 1), got {}",
                    name, rate
                )));
            }
        }
        if self.fee_rate + self.slippage_rate >= 1.0 {
            return Err(BotError::Config(
                "fee_rate + slippage_rate must stay below 1".to_string(),
            ));
        }
        if !(self.start_balance.is_finite() && self.start_balance > 0.0) {
            return Err(BotError::Config(format!(
                "start_balance must be positive, got {}",
                self.start_balance
            )));
        }
        for (name, value, max) in [
            ("poll_interval_secs", self.poll_interval_secs, MAX_POLL_INTERVAL_SECS),
            ("feed.timeout_secs", self.feed.timeout_secs, MAX_TIMEOUT_SECS),
        ] {
            if !(1..=max).contains(&value) {
                return Err(BotError::Config(format!(
                    "{} must be between 1 and {}, got {}",
                    name, max, value
                )));
            }
        }
        if self.strategy.cooldown_secs > MAX_COOLDOWN_SECS {
            return Err(BotError::Config(format!(
                "strategy.cooldown_secs must be at most {}, got {}",
                MAX_COOLDOWN_SECS, self.strategy.cooldown_secs
            )));
        }

        let window = self.strategy.window_size();
        let min_window = match self.strategy.kind {
            StrategyKind::Simple => SIMPLE_WINDOW,
            StrategyKind::Threshold => 2,
        };
        if window < min_window {
            return Err(BotError::Config(format!(
                "strategy.window_size must be at least {} for {:?}, got {}",
                min_window, self.strategy.kind, window
            )));
        }
        if !(self.strategy.threshold.is_finite() && self.strategy.threshold >= 0.0) {
            return Err(BotError::Config(format!(
                "strategy.threshold must be non-negative, got {}",
                self.strategy.threshold
            )));
        }

        Ok(())
    }
}
