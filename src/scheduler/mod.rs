/// the refresh scheduler.
///
/// Two supervised loops share the runtime with everything else:
/// * full-refresh: runs the bootstrapper at start (cold) and then on a fixed interval
/// * membership: polls the external authority until it answers, reconciles once, then
///   settles into an hourly reconciliation; that hand-off happens once per process
///
/// Each loop is driven over a command channel (status, run-now, shutdown) the same way
/// a worker is.
///
pub mod membership;
pub mod refresh;
pub mod supervisor;
pub mod worker;

use async_channel::Sender;
use serde::{Deserialize, Serialize};

use crate::worker::JsonString;

pub use membership::MembershipLoop;
pub use refresh::refresh_handler;
pub use supervisor::RefreshScheduler;
pub use worker::LoopWorker;

pub const FULL_REFRESH: &str = "full-refresh";
pub const MEMBERSHIP: &str = "membership";

#[derive(Debug, Clone)]
pub enum Command {
    Status(Sender<JsonString>), // request the loop's status
    RunNow,
    Shutdown,
}

/// membership loop states; the only transition is Awaiting -> Steady
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MembershipPhase {
    AwaitingExternalReadiness,
    SteadyHourly,
}
