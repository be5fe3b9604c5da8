// Price collection and simulated order execution
pub mod portfolio;
pub mod price_feed;
pub mod rolling_window;

pub use portfolio::{CooldownTimer, PortfolioSimulator};
pub use price_feed::{HistoricalFeed, LiveFeed, PriceFeed};
pub use rolling_window::RollingWindow;
