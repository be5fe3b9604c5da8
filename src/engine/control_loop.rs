use chrono::Utc;
use std::future::Future;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use super::display;
use super::session::TradingSession;
use crate::error::{BotError, FeedError};
use crate::execution::PriceFeed;
use crate::models::PortfolioState;
use crate::persistence::{SnapshotStore, TradeLedger};
use crate::settings::Settings;
use crate::Result;

/// Lifecycle of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Starting,
    Running,
    ShuttingDown,
    Terminated,
}

/// Counters and final wallet of a completed run
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Ticks that produced a price
    pub ticks: u64,
    /// Ticks skipped because the feed was unavailable
    pub skipped_ticks: u64,
    /// Trades executed, including a shutdown liquidation
    pub trades: usize,
    pub liquidated: bool,
    /// Price used for the shutdown valuation, if one could be fetched
    pub final_price: Option<f64>,
    pub final_state: PortfolioState,
}

enum TickFlow {
    Continue,
    Exhausted,
}

#[derive(Debug, Default)]
struct LoopStats {
    ticks: u64,
    skipped_ticks: u64,
    trades: usize,
}

/// Drives one tick per poll interval: fetch, decide, execute, persist, display
///
/// The interrupt future passed to [`ControlLoop::run`] is only observed
/// between ticks; a tick in progress always completes.
pub struct ControlLoop<F: PriceFeed> {
    feed: F,
    settings: Settings,
    snapshots: SnapshotStore,
    ledger: TradeLedger,
    state: LoopState,
    stats: LoopStats,
}

impl<F: PriceFeed> ControlLoop<F> {
    pub fn new(feed: F, settings: Settings) -> Self {
        let snapshots = SnapshotStore::new(&settings.storage.state_path);
        let ledger = TradeLedger::new(&settings.storage.ledger_path, settings.feed.asset());

        Self {
            feed,
            settings,
            snapshots,
            ledger,
            state: LoopState::Starting,
            stats: LoopStats::default(),
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Run until `shutdown` resolves or the feed is exhausted, then liquidate
    pub async fn run<S>(&mut self, shutdown: S) -> Result<RunSummary>
    where
        S: Future<Output = ()>,
    {
        let mut session = match self.start().await {
            Ok(session) => session,
            Err(e) => {
                tracing::error!("Startup failed: {}", e);
                self.transition(LoopState::Terminated);
                return Err(e);
            }
        };
        self.transition(LoopState::Running);

        let poll = self.settings.poll_interval();
        let mut ticker = interval_at(Instant::now() + poll, poll);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    tracing::info!("⚠️  Interrupt received, shutting down...");
                    break;
                }
                _ = ticker.tick() => {}
            }

            match self.tick(&mut session).await {
                Ok(TickFlow::Continue) => {}
                Ok(TickFlow::Exhausted) => {
                    tracing::info!("Price feed exhausted, ending run");
                    break;
                }
                Err(e) => {
                    tracing::error!("🚨 Stopping: {}", e);
                    self.transition(LoopState::Terminated);
                    return Err(e);
                }
            }
        }

        self.transition(LoopState::ShuttingDown);
        let result = self.shut_down(&mut session).await;
        if let Err(e) = &result {
            tracing::error!("🚨 Shutdown failed: {}", e);
        }
        self.transition(LoopState::Terminated);
        result
    }

    async fn start(&mut self) -> Result<TradingSession> {
        let state = self
            .snapshots
            .load(self.settings.start_balance, Utc::now())?;

        let first = self.feed.fetch().await.map_err(BotError::StartupFetch)?;

        let mut session = TradingSession::from_settings(&self.settings, state);
        session.observe(first);

        tracing::info!(
            feed = %self.feed.name(),
            strategy = %session.strategy().name(),
            window = session.window().capacity(),
            price = %format!("{:.2}", first.price()),
            value = %format!("{:.2}", session.state().total_value(first.price())),
            "🚀 Paper trading started"
        );

        Ok(session)
    }

    async fn tick(&mut self, session: &mut TradingSession) -> Result<TickFlow> {
        let sample = match self.feed.fetch().await {
            Ok(sample) => sample,
            Err(FeedError::Exhausted) => return Ok(TickFlow::Exhausted),
            Err(FeedError::Unavailable(reason)) => {
                self.stats.skipped_ticks += 1;
                tracing::warn!(
                    skipped = self.stats.skipped_ticks,
                    "Price unavailable, skipping tick: {}",
                    reason
                );
                return Ok(TickFlow::Continue);
            }
        };
        self.stats.ticks += 1;

        let report = session.on_sample(sample);
        tracing::debug!(
            price = sample.price(),
            momentum = ?report.momentum,
            action = ?report.action,
            "Tick evaluated"
        );

        if let Some(trade) = &report.trade {
            self.stats.trades += 1;
            self.ledger.append(trade)?;
            self.snapshots.save(session.state())?;
        }

        println!(
            "{}",
            display::status_line(&report, session.state(), self.settings.feed.asset())
        );

        Ok(TickFlow::Continue)
    }

    async fn shut_down(&mut self, session: &mut TradingSession) -> Result<RunSummary> {
        let mut liquidated = false;

        let final_price = match self.feed.fetch().await {
            Ok(sample) => {
                if let Some(trade) = session.liquidate(sample) {
                    self.stats.trades += 1;
                    liquidated = true;
                    self.ledger.append(&trade)?;
                }
                self.snapshots.save(session.state())?;
                Some(sample.price())
            }
            Err(e) => {
                tracing::warn!("No final price ({}); skipping liquidation, snapshot left as is", e);
                None
            }
        };

        println!(
            "{}",
            display::summary(
                "SESSION SUMMARY",
                session.state(),
                self.stats.trades,
                final_price
            )
        );
        tracing::info!(
            ticks = self.stats.ticks,
            skipped = self.stats.skipped_ticks,
            trades = self.stats.trades,
            "👋 Paper trading stopped"
        );

        Ok(RunSummary {
            ticks: self.stats.ticks,
            skipped_ticks: self.stats.skipped_ticks,
            trades: self.stats.trades,
            liquidated,
            final_price,
            final_state: session.state().clone(),
        })
    }

    fn transition(&mut self, next: LoopState) {
        tracing::debug!("Control loop {:?} -> {:?}", self.state, next);
        self.state = next;
    }
}
