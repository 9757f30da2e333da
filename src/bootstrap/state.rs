use async_std::sync::RwLock;
use hashbrown::HashMap;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::error::{EngineError, Result};

/// reason surfaced to callers while a cold rebuild is in progress
pub const REBUILD_REASON: &str = "cache is being rebuilt";

/// process-wide bootstrap status; only the bootstrapper writes it
#[derive(Debug, Default, Clone, Serialize)]
pub struct BootstrapState {
    pub maintenance_mode: bool,
    pub reason: Option<String>,
    /// wall-clock time of each segment's most recent load
    pub last_durations: HashMap<String, Duration>,
    /// true once the first full pass has completed
    pub loaded: bool,
    pub runs: u64,
}

#[derive(Debug, Default, Clone)]
pub struct SharedState {
    inner: Arc<RwLock<BootstrapState>>,
    // mirrored here so synchronous readiness checks can read it
    loaded: Arc<AtomicBool>,
}

impl SharedState {
    pub fn new() -> SharedState {
        SharedState::default()
    }

    pub async fn snapshot(&self) -> BootstrapState {
        self.inner.read().await.clone()
    }

    pub async fn is_maintenance(&self) -> bool {
        self.inner.read().await.maintenance_mode
    }

    pub async fn reason(&self) -> Option<String> {
        self.inner.read().await.reason.clone()
    }

    /// consumers call this before any action that needs a complete cache
    pub async fn ensure_available(&self) -> Result<()> {
        let state = self.inner.read().await;
        if state.maintenance_mode {
            let reason = state
                .reason
                .clone()
                .unwrap_or_else(|| REBUILD_REASON.to_string());
            return Err(EngineError::Maintenance(reason));
        }
        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::Acquire)
    }

    pub async fn last_duration(&self, segment: &str) -> Option<Duration> {
        self.inner.read().await.last_durations.get(segment).copied()
    }

    pub(crate) async fn enter_maintenance(&self, reason: &str) {
        let mut state = self.inner.write().await;
        state.maintenance_mode = true;
        state.reason = Some(reason.to_string());
    }

    pub(crate) async fn leave_maintenance(&self) {
        let mut state = self.inner.write().await;
        state.maintenance_mode = false;
        state.reason = None;
    }

    pub(crate) async fn record_duration(&self, segment: &str, elapsed: Duration) {
        self.inner
            .write()
            .await
            .last_durations
            .insert(segment.to_string(), elapsed);
    }

    pub(crate) async fn finish_run(&self) {
        let mut state = self.inner.write().await;
        state.runs += 1;
        state.loaded = true;
        self.loaded.store(true, Ordering::Release);
    }
}
