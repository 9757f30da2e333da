/// the membership loop.
///
/// While awaiting the external authority it polls at the readiness backoff; the first
/// successful reconciliation opens the membership segment's gate and moves the loop to
/// hourly reconciliation for the rest of the process.
use anyhow::Result;
use async_channel::Receiver;
use log::*;
use service_uptime::Uptime;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use super::worker::{send_response, wait_for, LoopStats, Wake};
use super::{Command, MembershipPhase, MEMBERSHIP};
use crate::bootstrap::SharedState;
use crate::config::Timings;
use crate::membership::MembershipReconciler;
use crate::worker::WorkerState;

pub struct MembershipLoop {
    pub reconciler: Arc<MembershipReconciler>,
    pub state: SharedState,
    pub external_ready: Arc<AtomicBool>,
    pub timings: Timings,
}

impl MembershipLoop {
    pub async fn run(self, id: String, rx: Receiver<Command>) -> Result<()> {
        let uptime = Uptime::new();
        let mut stats = LoopStats::default();
        let mut phase = MembershipPhase::AwaitingExternalReadiness;
        let mut provisional = false;
        let mut next_run = Some(Instant::now());

        loop {
            match wait_for(&rx, next_run).await {
                Wake::Tick | Wake::Command(Command::RunNow) => {
                    stats.state = WorkerState::Busy;
                    next_run = match phase {
                        MembershipPhase::AwaitingExternalReadiness => {
                            if self.poll_external(&mut stats, &mut provisional).await {
                                phase = MembershipPhase::SteadyHourly;
                                self.external_ready.store(true, Ordering::Release);
                                info!(
                                    "external authority is ready, reconciling every {:?}",
                                    self.timings.reconcile
                                );
                                self.next_steady()
                            } else {
                                Some(Instant::now() + self.timings.readiness_poll)
                            }
                        }
                        MembershipPhase::SteadyHourly => {
                            self.steady(&mut stats).await;
                            self.next_steady()
                        }
                    };
                    stats.state = WorkerState::Idle;
                }
                Wake::Command(Command::Status(tx)) => {
                    let msg = stats
                        .status(&id, MEMBERSHIP, &uptime)
                        .with_phase(Some(format!("{:?}", phase)))
                        .to_json();
                    let errs = send_response(msg, tx).await;
                    stats.error_count = stats.error_count.saturating_add(errs);
                }
                Wake::Command(Command::Shutdown) | Wake::Closed => {
                    stats.state = WorkerState::Shutdown;
                    info!("membership loop {} shutting down", id);
                    break;
                }
            }
        }

        rx.close();
        Ok(())
    }

    fn next_steady(&self) -> Option<Instant> {
        if self.timings.repeat {
            Some(Instant::now() + self.timings.reconcile)
        } else {
            None
        }
    }

    /// one readiness poll; true once a reconciliation has completed
    async fn poll_external(&self, stats: &mut LoopStats, provisional: &mut bool) -> bool {
        if !self.state.is_loaded() {
            debug!("waiting for the first bootstrap before reconciling membership");
            return false;
        }

        if !*provisional {
            match self.reconciler.apply_provisional().await {
                Ok(count) => {
                    info!("{} members elevated from the persisted cache", count);
                    *provisional = true;
                }
                Err(e) => debug!("provisional elevation deferred: {}", e),
            }
        }

        match self.reconciler.reconcile().await {
            Ok(_) => {
                stats.passes += 1;
                true
            }
            Err(e) => {
                debug!(
                    "external authority not ready, polling again in {:?}: {}",
                    self.timings.readiness_poll, e
                );
                false
            }
        }
    }

    async fn steady(&self, stats: &mut LoopStats) {
        match self.reconciler.reconcile().await {
            Ok(_) => stats.passes += 1,
            Err(e) if e.is_transient() => debug!("membership pass skipped: {}", e),
            Err(e) => {
                stats.failed();
                warn!("membership reconciliation failed, next attempt on schedule: {}", e);
            }
        }
    }
}
