use anyhow::anyhow;
use async_std::task;
use futures::FutureExt;
use log::*;
use serde::Serialize;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::loader::SegmentLoader;
use super::registry::{Gate, Segment, SegmentRegistry, WhenUnready};
use super::state::{SharedState, REBUILD_REASON};
use crate::cache::UserRecordStore;
use crate::error::{EngineError, Result, SegmentError};
use crate::guard::RunGuard;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SegmentStatus {
    Loaded { rows: usize, elapsed: Duration },
    Skipped { reason: String },
    /// handed to a background task waiting on the segment's gate
    Deferred,
    Failed { error: String, elapsed: Duration },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SegmentOutcome {
    pub name: String,
    pub order: usize,
    pub status: SegmentStatus,
}

/// every segment of one pass, in registration order
#[derive(Debug, Default, Clone, Serialize)]
pub struct RunReport {
    pub cold_start: bool,
    pub outcomes: Vec<SegmentOutcome>,
    pub elapsed: Duration,
}

impl RunReport {
    pub fn names(&self) -> Vec<&str> {
        self.outcomes.iter().map(|o| o.name.as_str()).collect()
    }

    pub fn outcome(&self, name: &str) -> Option<&SegmentOutcome> {
        self.outcomes.iter().find(|o| o.name == name)
    }

    pub fn loaded(&self) -> usize {
        self.count(|s| matches!(s, SegmentStatus::Loaded { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, SegmentStatus::Skipped { .. } | SegmentStatus::Deferred))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, SegmentStatus::Failed { .. }))
    }

    fn count<F: Fn(&SegmentStatus) -> bool>(&self, f: F) -> usize {
        self.outcomes.iter().filter(|o| f(&o.status)).count()
    }
}

/// runs every registered segment, in order, one pass at a time
pub struct Bootstrapper {
    registry: SegmentRegistry,
    state: SharedState,
    users: UserRecordStore,
    defer_poll: Duration,
    // shared with deferred loads so they never overlap a pass
    running: Arc<AtomicBool>,
}

impl Bootstrapper {
    pub fn new(
        registry: SegmentRegistry,
        state: SharedState,
        users: UserRecordStore,
        defer_poll: Duration,
    ) -> Bootstrapper {
        Bootstrapper {
            registry,
            state,
            users,
            defer_poll,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn registry(&self) -> &SegmentRegistry {
        &self.registry
    }

    pub fn state(&self) -> &SharedState {
        &self.state
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// one full pass.  A cold start resets the user records and holds maintenance
    /// mode until the last segment is done; other passes never touch the flag.
    pub async fn run_all(&self, cold_start: bool) -> Result<RunReport> {
        let _guard =
            RunGuard::try_acquire(&self.running).ok_or(EngineError::AlreadyRunning("bootstrap"))?;
        let started = Instant::now();

        if cold_start {
            self.state.enter_maintenance(REBUILD_REASON).await;
            self.users.reset().await;
        }

        let mut outcomes = Vec::with_capacity(self.registry.len());
        for segment in self.registry.iter() {
            let status = match segment.gate() {
                _ if segment.deferred.load(Ordering::Acquire) => {
                    debug!("segment {} is still waiting in the background", segment.name());
                    SegmentStatus::Deferred
                }
                Some(gate) if !gate.is_ready() => match gate.when_unready() {
                    WhenUnready::Skip => {
                        debug!("segment {} not ready, skipping this pass", segment.name());
                        SegmentStatus::Skipped {
                            reason: "readiness check not satisfied".to_string(),
                        }
                    }
                    WhenUnready::Defer => {
                        self.defer(segment, gate.clone());
                        SegmentStatus::Deferred
                    }
                },
                _ => load_segment(segment.name(), segment.loader(), &self.state).await,
            };

            outcomes.push(SegmentOutcome {
                name: segment.name().to_string(),
                order: segment.order(),
                status,
            });
        }

        if cold_start {
            self.state.leave_maintenance().await;
        }
        self.state.finish_run().await;

        let report = RunReport {
            cold_start,
            outcomes,
            elapsed: started.elapsed(),
        };

        info!(
            "cache completely created in {:?}: {} loaded, {} skipped, {} failed",
            report.elapsed,
            report.loaded(),
            report.skipped(),
            report.failed()
        );

        Ok(report)
    }

    fn defer(&self, segment: &Segment, gate: Gate) {
        if segment
            .deferred
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("segment {} is already waiting in the background", segment.name());
            return;
        }

        let name = segment.name().to_string();
        let loader = segment.loader();
        let state = self.state.clone();
        let flag = segment.deferred.clone();
        let running = self.running.clone();
        let poll = self.defer_poll;

        info!("deferring segment {} until it is ready", name);
        task::spawn(async move {
            while !gate.is_ready() {
                task::sleep(poll).await;
            }

            // wait out any pass in flight, then hold the guard for the load
            loop {
                if let Some(_guard) = RunGuard::try_acquire(&running) {
                    load_segment(&name, loader.clone(), &state).await;
                    flag.store(false, Ordering::Release);
                    break;
                }
                task::sleep(poll).await;
            }
        });
    }
}

async fn load_segment(
    name: &str,
    loader: Arc<dyn SegmentLoader>,
    state: &SharedState,
) -> SegmentStatus {
    let started = Instant::now();
    let result = match AssertUnwindSafe(loader.load()).catch_unwind().await {
        Ok(result) => result,
        Err(panic) => Err(SegmentError::Failed(anyhow!(
            "loader panicked: {}",
            panic_message(panic.as_ref())
        ))),
    };
    let elapsed = started.elapsed();
    state.record_duration(name, elapsed).await;

    match result {
        Ok(rows) => {
            info!("cache for {} created in {:?} ({} rows)", name, elapsed, rows);
            SegmentStatus::Loaded { rows, elapsed }
        }
        Err(SegmentError::NotReady(reason)) => {
            debug!("segment {} not ready: {}", name, reason);
            SegmentStatus::Skipped { reason }
        }
        Err(SegmentError::Failed(source)) => {
            let err = EngineError::SegmentLoad {
                segment: name.to_string(),
                elapsed,
                source,
            };
            error!("{}", err);
            SegmentStatus::Failed {
                error: err.to_string(),
                elapsed,
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
