// Core modules
pub mod api;
pub mod backtest;
pub mod engine;
pub mod error;
pub mod execution;
pub mod models;
pub mod persistence;
pub mod settings;
pub mod strategy;

// Re-export commonly used types
pub use error::BotError;
pub use models::*;
pub use strategy::Strategy;

// Error handling
pub type Result<T> = std::result::Result<T, BotError>;
