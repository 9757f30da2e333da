/// the full-refresh loop: a cold bootstrap at start, then a warm pass every interval
use anyhow::Result;
use async_channel::Receiver;
use log::*;
use service_uptime::Uptime;
use std::sync::Arc;
use std::time::Instant;

use super::worker::{send_response, wait_for, LoopStats, Wake};
use super::{Command, FULL_REFRESH};
use crate::bootstrap::Bootstrapper;
use crate::config::Timings;
use crate::worker::WorkerState;

pub async fn refresh_handler(
    id: String,
    bootstrapper: Arc<Bootstrapper>,
    timings: Timings,
    rx: Receiver<Command>,
) -> Result<()> {
    let uptime = Uptime::new();
    let mut stats = LoopStats::default();
    let mut cold_start = true;
    let mut next_run = Some(Instant::now());

    loop {
        match wait_for(&rx, next_run).await {
            Wake::Tick | Wake::Command(Command::RunNow) => {
                stats.state = WorkerState::Busy;
                next_run = match bootstrapper.run_all(cold_start).await {
                    Ok(report) => {
                        stats.passes += 1;
                        for _ in 0..report.failed() {
                            stats.failed();
                        }
                        cold_start = false;
                        next_pass(&timings)
                    }
                    Err(e) => {
                        // a refused pass (the cold one included) is retried soon
                        warn!("full refresh skipped, retrying in {:?}: {}", timings.readiness_poll, e);
                        Some(Instant::now() + timings.readiness_poll)
                    }
                };
                stats.state = WorkerState::Idle;
            }
            Wake::Command(Command::Status(tx)) => {
                let msg = stats.status(&id, FULL_REFRESH, &uptime).to_json();
                let errs = send_response(msg, tx).await;
                stats.error_count = stats.error_count.saturating_add(errs);
            }
            Wake::Command(Command::Shutdown) | Wake::Closed => {
                stats.state = WorkerState::Shutdown;
                info!("full refresh loop {} shutting down", id);
                break;
            }
        }
    }

    rx.close();
    Ok(())
}

fn next_pass(timings: &Timings) -> Option<Instant> {
    if timings.repeat {
        Some(Instant::now() + timings.full_refresh)
    } else {
        None
    }
}
