use anyhow::Result;
use log::*;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use super::membership::MembershipLoop;
use super::refresh::refresh_handler;
use super::worker::LoopWorker;
use super::{FULL_REFRESH, MEMBERSHIP};
use crate::bootstrap::{Bootstrapper, SharedState};
use crate::config::Timings;
use crate::membership::MembershipReconciler;
use crate::worker::WorkerStatus;

/// owns the full-refresh and membership loops
#[derive(Debug, Clone)]
pub struct RefreshScheduler {
    pub workers: Vec<LoopWorker>,
}

impl RefreshScheduler {
    /// spawn both loops; the full refresh starts immediately with a cold pass
    pub fn start(
        bootstrapper: Arc<Bootstrapper>,
        reconciler: Arc<MembershipReconciler>,
        external_ready: Arc<AtomicBool>,
        timings: Timings,
    ) -> RefreshScheduler {
        let state = bootstrapper.state().clone();

        let refresh = LoopWorker::spawn(FULL_REFRESH, move |id, rx| {
            refresh_handler(id, bootstrapper, timings, rx)
        });

        let membership = MembershipLoop {
            reconciler,
            state,
            external_ready,
            timings,
        };
        let membership = LoopWorker::spawn(MEMBERSHIP, move |id, rx| membership.run(id, rx));

        RefreshScheduler {
            workers: vec![refresh, membership],
        }
    }

    pub fn worker(&self, role: &str) -> Option<&LoopWorker> {
        self.workers.iter().find(|w| w.role() == role)
    }

    /// status of every live loop; loops that stopped answering are left out
    pub async fn status(&self) -> Vec<WorkerStatus> {
        let mut list = Vec::with_capacity(self.workers.len());
        for worker in self.workers.iter() {
            match worker.status().await {
                Ok(status) => list.push(status),
                Err(e) => warn!("no status from {} worker {}: {}", worker.role(), worker.id(), e),
            }
        }

        list
    }

    /// the membership loop's phase, as reported by the loop
    pub async fn phase(&self) -> Option<String> {
        match self.worker(MEMBERSHIP) {
            Some(worker) => worker.status().await.ok().and_then(|s| s.phase),
            None => None,
        }
    }

    pub async fn run_now(&self, role: &str) -> Result<()> {
        match self.worker(role) {
            Some(worker) => worker.run_now().await,
            None => Err(anyhow::anyhow!("no {} worker", role)),
        }
    }

    pub async fn shutdown(&self) -> Result<()> {
        for worker in self.workers.iter() {
            if !worker.is_closed() {
                worker.shutdown().await?;
            }
        }

        Ok(())
    }
}
