pub mod metrics;
pub mod runner;
pub mod synthetic;

pub use metrics::{BacktestReport, RoundTrip};
pub use runner::{export_trades, BacktestRunner};
pub use synthetic::{MarketScenario, SyntheticDataGenerator};
