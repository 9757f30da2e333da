/// the cache engine: wires the store, the external provider, the segment registry
/// and the scheduler together behind one handle.
///
use log::*;
use std::future::Future;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::bootstrap::{Bootstrapper, FnLoader, Gate, RunReport, SegmentLoader, SegmentRegistry, SharedState};
use crate::cache::{CacheSegments, Tier, UserHandle, UserId, UserRecordStore};
use crate::config::{EngineConfig, Timings};
use crate::error::{Result, SegmentError};
use crate::membership::{MembershipProvider, MembershipReconciler, OverrideSet, ReconcileReport};
use crate::pool::BlockingPool;
use crate::scheduler::RefreshScheduler;
use crate::segments::{register_defaults, Readiness, SegmentContext};
use crate::stats::CacheStats;
use crate::store::PersistenceStore;

type Registration = (String, Arc<dyn SegmentLoader>, Option<Gate>);

pub struct EngineBuilder {
    config: EngineConfig,
    store: Arc<dyn PersistenceStore>,
    provider: Arc<dyn MembershipProvider>,
    extra: Vec<Registration>,
    defaults: bool,
}

impl EngineBuilder {
    /// add a segment after the defaults
    pub fn register<L>(mut self, name: impl Into<String>, loader: L, gate: Option<Gate>) -> Self
    where
        L: SegmentLoader + 'static,
    {
        self.extra.push((name.into(), Arc::new(loader), gate));
        self
    }

    pub fn register_fn<F, Fut>(self, name: impl Into<String>, f: F, gate: Option<Gate>) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<usize, SegmentError>> + Send + 'static,
    {
        self.register(name, FnLoader::new(f), gate)
    }

    /// leave the default segments out of the registry
    pub fn without_default_segments(mut self) -> Self {
        self.defaults = false;
        self
    }

    pub fn build(self) -> Result<CacheEngine> {
        self.config.validate()?;

        let users = UserRecordStore::new();
        let segments = CacheSegments::new();
        let state = SharedState::new();
        let overrides = OverrideSet::new(self.config.overrides.clone());
        let readiness = Readiness::default();
        let pool = BlockingPool::new(self.config.blocking_pool_size);

        let reconciler = Arc::new(MembershipReconciler::new(
            self.store.clone(),
            self.provider.clone(),
            users.clone(),
            overrides.clone(),
            self.config.rows_per_yield,
        ));

        let mut registry = SegmentRegistry::new();
        if self.defaults {
            let ctx = SegmentContext {
                store: self.store,
                users: users.clone(),
                segments: segments.clone(),
                pool: pool.clone(),
                rows_per_yield: self.config.rows_per_yield,
                language_dir: self.config.language_dir.clone(),
                languages: self.config.languages.clone(),
            };
            register_defaults(
                &mut registry,
                &ctx,
                reconciler.clone(),
                self.provider,
                &readiness,
            );
        }
        for (name, loader, gate) in self.extra {
            registry.register_arc(name, loader, gate);
        }

        info!("cache engine built with {} segments", registry.len());

        let timings = self.config.timings();
        let bootstrapper = Arc::new(Bootstrapper::new(
            registry,
            state.clone(),
            users.clone(),
            timings.readiness_poll,
        ));

        Ok(CacheEngine {
            config: self.config,
            users,
            segments,
            state,
            overrides,
            readiness,
            pool,
            bootstrapper,
            reconciler,
        })
    }
}

pub struct CacheEngine {
    config: EngineConfig,
    users: UserRecordStore,
    segments: CacheSegments,
    state: SharedState,
    overrides: OverrideSet,
    readiness: Readiness,
    pool: BlockingPool,
    bootstrapper: Arc<Bootstrapper>,
    reconciler: Arc<MembershipReconciler>,
}

impl CacheEngine {
    pub fn builder(
        config: EngineConfig,
        store: Arc<dyn PersistenceStore>,
        provider: Arc<dyn MembershipProvider>,
    ) -> EngineBuilder {
        EngineBuilder {
            config,
            store,
            provider,
            extra: vec![],
            defaults: true,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn users(&self) -> &UserRecordStore {
        &self.users
    }

    pub fn segments(&self) -> &CacheSegments {
        &self.segments
    }

    pub fn state(&self) -> &SharedState {
        &self.state
    }

    pub fn overrides(&self) -> &OverrideSet {
        &self.overrides
    }

    pub fn pool(&self) -> &BlockingPool {
        &self.pool
    }

    pub fn bootstrapper(&self) -> Arc<Bootstrapper> {
        self.bootstrapper.clone()
    }

    pub fn reconciler(&self) -> Arc<MembershipReconciler> {
        self.reconciler.clone()
    }

    /// true once the external authority has answered a reconciliation
    pub fn external_ready(&self) -> bool {
        self.readiness.external.load(Ordering::Acquire)
    }

    /// the feed connection is up; its deferred segment loads in the background
    pub fn mark_feed_ready(&self) {
        self.readiness.feed.store(true, Ordering::Release);
    }

    pub fn feed_ready(&self) -> bool {
        self.readiness.feed.load(Ordering::Acquire)
    }

    /// the live record for an id, created on first access
    pub async fn user(&self, id: UserId) -> UserHandle {
        self.users.get_or_create(id).await
    }

    pub async fn ensure_available(&self) -> Result<()> {
        self.state.ensure_available().await
    }

    pub async fn run_all(&self, cold_start: bool) -> Result<RunReport> {
        self.bootstrapper.run_all(cold_start).await
    }

    pub async fn reconcile(&self) -> Result<ReconcileReport> {
        self.reconciler.reconcile().await
    }

    /// force a tier for an id.  The live record changes now; the persisted cache
    /// follows on the next reconciliation.
    pub async fn grant_override(&self, id: UserId, tier: Tier) -> Option<Tier> {
        let previous = self.overrides.grant(id, tier).await;
        self.users.get_or_create(id).await.write().await.set_tier(tier);
        info!("override granted: {} is now {:?}", id, tier);

        previous
    }

    /// drop an override; the id falls back to the authority's answer on the next pass
    pub async fn revoke_override(&self, id: UserId) -> Option<Tier> {
        let previous = self.overrides.revoke(id).await;
        if previous.is_some() {
            info!("override revoked for {}", id);
        }

        previous
    }

    pub async fn stats(&self) -> CacheStats {
        CacheStats::collect(&self.users, &self.segments, &self.state).await
    }

    /// start the refresh loops with the configured timings
    pub fn start_scheduler(&self) -> RefreshScheduler {
        self.start_scheduler_with(self.config.timings())
    }

    pub fn start_scheduler_with(&self, timings: Timings) -> RefreshScheduler {
        RefreshScheduler::start(
            self.bootstrapper.clone(),
            self.reconciler.clone(),
            self.readiness.external.clone(),
            timings,
        )
    }
}
