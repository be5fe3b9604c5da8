use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::BotError;
use crate::models::TradeRecord;
use crate::Result;

/// Append-only text log of executed trades, one line per trade
///
/// Kept apart from the wallet snapshot: a crash between the two writes can
/// leave the ledger one trade ahead of the snapshot.
#[derive(Debug, Clone)]
pub struct TradeLedger {
    path: PathBuf,
    asset: String,
}

impl TradeLedger {
    pub fn new(path: impl Into<PathBuf>, asset: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            asset: asset.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one trade and flush it to disk
    pub fn append(&self, record: &TradeRecord) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| BotError::persistence(&self.path, e))?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| BotError::persistence(&self.path, e))?;

        writeln!(file, "{}", format_line(record, &self.asset))
            .and_then(|_| file.sync_data())
            .map_err(|e| BotError::persistence(&self.path, e))?;

        Ok(())
    }
}

/// `2024-01-01 12:00:00 | BUY 0.023100 BTC @ $43210.55 | Fee: $1.0000 | Slippage: $0.6000`
pub fn format_line(record: &TradeRecord, asset: &str) -> String {
    format!(
        "{} | {} {:.6} {} @ ${:.2} | Fee: ${:.4} | Slippage: ${:.4}",
        record.timestamp.format("%Y-%m-%d %H:%M:%S"),
        record.side,
        record.quantity,
        asset,
        record.price,
        record.fee,
        record.slippage
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TradeSide;
    use chrono::{TimeZone, Utc};

    fn record(side: TradeSide, minute: u32) -> TradeRecord {
        TradeRecord {
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 12, minute, 0).unwrap(),
            side,
            quantity: 0.0231,
            price: 43210.554,
            fee: 1.0,
            slippage: 0.6,
        }
    }

    #[test]
    fn test_line_format() {
        let line = format_line(&record(TradeSide::Buy, 0), "BTC");
        assert_eq!(
            line,
            "2024-01-01 12:00:00 | BUY 0.023100 BTC @ $43210.55 | Fee: $1.0000 | Slippage: $0.6000"
        );
    }

    #[test]
    fn test_append_keeps_order_and_history() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = TradeLedger::new(dir.path().join("trades.log"), "BTC");

        ledger.append(&record(TradeSide::Buy, 0)).unwrap();
        ledger.append(&record(TradeSide::Sell, 5)).unwrap();

        // A fresh handle on the same file appends after existing lines
        let reopened = TradeLedger::new(ledger.path(), "BTC");
        reopened.append(&record(TradeSide::Buy, 10)).unwrap();

        let contents = fs::read_to_string(ledger.path()).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("2024-01-01 12:00:00 | BUY"));
        assert!(lines[1].starts_with("2024-01-01 12:05:00 | SELL"));
        assert!(lines[2].starts_with("2024-01-01 12:10:00 | BUY"));
    }

    #[test]
    fn test_append_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        // The ledger path is a directory, so opening it for append fails
        let ledger = TradeLedger::new(dir.path(), "BTC");

        let result = ledger.append(&record(TradeSide::Buy, 0));
        assert!(matches!(result, Err(BotError::Persistence { .. })));
    }
}
