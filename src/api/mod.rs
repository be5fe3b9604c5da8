pub mod kucoin;

pub use kucoin::{KucoinClient, Ticker, KUCOIN_API_BASE};
