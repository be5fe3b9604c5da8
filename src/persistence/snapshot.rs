use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::BotError;
use crate::models::PortfolioState;
use crate::Result;

/// On-disk shape of the wallet snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredSnapshot {
    usd_balance: f64,
    asset_balance: f64,
    start_time: DateTime<Utc>,
    #[serde(default)]
    start_balance: Option<f64>,
    total_fees: f64,
    total_slippage: f64,
    #[serde(default)]
    last_trade_time: Option<DateTime<Utc>>,
}

impl From<&PortfolioState> for StoredSnapshot {
    fn from(state: &PortfolioState) -> Self {
        Self {
            usd_balance: state.usd_balance,
            asset_balance: state.asset_balance,
            start_time: state.start_time,
            start_balance: Some(state.start_balance),
            total_fees: state.total_fees,
            total_slippage: state.total_slippage,
            last_trade_time: state.last_trade_time,
        }
    }
}

/// JSON file holding the latest portfolio snapshot
///
/// Saves replace the whole file (temp file + rename), so a crash mid-write
/// leaves the previous snapshot intact.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load the stored snapshot, or start a fresh wallet when none exists
    ///
    /// A file that exists but cannot be read or parsed is an error: resetting
    /// a wallet silently would hide lost state.
    pub fn load(&self, start_balance: f64, now: DateTime<Utc>) -> Result<PortfolioState> {
        if !self.path.exists() {
            tracing::info!(
                path = %self.path.display(),
                "💾 No snapshot found, starting fresh with ${:.2}",
                start_balance
            );
            return Ok(PortfolioState::fresh(start_balance, now));
        }

        let json = fs::read_to_string(&self.path)
            .map_err(|e| BotError::persistence(&self.path, e))?;
        let stored: StoredSnapshot = serde_json::from_str(&json)
            .map_err(|e| BotError::persistence(&self.path, format!("corrupt snapshot: {}", e)))?;

        let balances = [
            stored.usd_balance,
            stored.asset_balance,
            stored.total_fees,
            stored.total_slippage,
        ];
        if balances.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(BotError::persistence(
                &self.path,
                "corrupt snapshot: negative or non-finite amount",
            ));
        }

        let state = PortfolioState {
            usd_balance: stored.usd_balance,
            asset_balance: stored.asset_balance,
            start_time: stored.start_time,
            start_balance: stored.start_balance.unwrap_or(start_balance),
            total_fees: stored.total_fees,
            total_slippage: stored.total_slippage,
            last_trade_time: stored.last_trade_time,
        };

        tracing::info!(
            path = %self.path.display(),
            usd = %format!("{:.2}", state.usd_balance),
            asset = %format!("{:.6}", state.asset_balance),
            since = %state.start_time,
            "💾 Snapshot loaded"
        );

        Ok(state)
    }

    /// Overwrite the snapshot with `state`
    pub fn save(&self, state: &PortfolioState) -> Result<()> {
        let json = serde_json::to_string_pretty(&StoredSnapshot::from(state))
            .map_err(|e| BotError::persistence(&self.path, e))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| BotError::persistence(&self.path, e))?;
        }

        let tmp = self.tmp_path();
        fs::write(&tmp, json).map_err(|e| BotError::persistence(&tmp, e))?;
        fs::rename(&tmp, &self.path).map_err(|e| BotError::persistence(&self.path, e))?;

        tracing::debug!(path = %self.path.display(), "💾 Snapshot saved");
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_missing_file_gives_fresh_state() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("wallet.json"));

        let state = store.load(1000.0, t0()).unwrap();

        assert_eq!(state, PortfolioState::fresh(1000.0, t0()));
        assert!(!store.exists());
    }

    #[test]
    fn test_save_then_load_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("wallet.json"));

        let state = PortfolioState {
            usd_balance: 0.0,
            asset_balance: 0.0231,
            start_time: t0(),
            start_balance: 1000.0,
            total_fees: 1.25,
            total_slippage: 0.75,
            last_trade_time: Some(t0() + chrono::Duration::minutes(3)),
        };
        store.save(&state).unwrap();

        // A different start balance must not override the stored one
        let loaded = store.load(5000.0, Utc::now()).unwrap();
        assert_eq!(loaded, state);
    }

    #[test]
    fn test_save_overwrites_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("wallet.json"));

        let mut state = PortfolioState::fresh(1000.0, t0());
        store.save(&state).unwrap();
        state.usd_balance = 1010.0;
        store.save(&state).unwrap();

        assert_eq!(store.load(1000.0, t0()).unwrap().usd_balance, 1010.0);
        assert!(!dir.path().join("wallet.json.tmp").exists());
    }

    #[test]
    fn test_loads_minimal_legacy_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wallet.json");
        fs::write(
            &path,
            r#"{"usd_balance": 0.0, "asset_balance": 0.5, "start_time": "2024-01-01T12:00:00Z",
                "total_fees": 1.0, "total_slippage": 0.6}"#,
        )
        .unwrap();

        let state = SnapshotStore::new(&path).load(1000.0, Utc::now()).unwrap();

        assert_eq!(state.asset_balance, 0.5);
        assert_eq!(state.start_balance, 1000.0);
        assert_eq!(state.start_time, t0());
        assert!(state.last_trade_time.is_none());
    }

    #[test]
    fn test_corrupt_snapshot_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wallet.json");
        fs::write(&path, "{ not json").unwrap();

        let result = SnapshotStore::new(&path).load(1000.0, t0());
        assert!(matches!(result, Err(BotError::Persistence { .. })));
    }

    #[test]
    fn test_negative_balance_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wallet.json");
        fs::write(
            &path,
            r#"{"usd_balance": -5.0, "asset_balance": 0.0, "start_time": "2024-01-01T12:00:00Z",
                "total_fees": 0.0, "total_slippage": 0.0}"#,
        )
        .unwrap();

        let err = SnapshotStore::new(&path).load(1000.0, t0()).unwrap_err();
        assert!(err.to_string().contains("corrupt snapshot"));
    }

    #[test]
    fn test_save_to_unwritable_location_fails_loudly() {
        let dir = tempfile::tempdir().unwrap();
        // A regular file where a directory is expected
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "x").unwrap();
        let store = SnapshotStore::new(blocker.join("wallet.json"));

        let result = store.save(&PortfolioState::fresh(1000.0, t0()));
        assert!(matches!(result, Err(BotError::Persistence { .. })));
    }
}
