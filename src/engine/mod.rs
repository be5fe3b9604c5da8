// Session state and the tick loop that drives it
pub mod control_loop;
pub mod display;
pub mod session;

pub use control_loop::{ControlLoop, LoopState, RunSummary};
pub use session::{TickReport, TradingSession};
