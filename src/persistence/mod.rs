// Durable wallet state and trade history
pub mod ledger;
pub mod snapshot;

pub use ledger::TradeLedger;
pub use snapshot::SnapshotStore;
