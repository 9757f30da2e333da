use hashbrown::HashMap;
use log::*;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::diff::{collapse, desired_tiers, MembershipSnapshot, ReconciliationDiff, Source};
use super::overrides::OverrideSet;
use super::provider::MembershipProvider;
use crate::cache::{Tier, UserId, UserRecordStore};
use crate::error::{EngineError, Result};
use crate::fairness::Fairness;
use crate::guard::RunGuard;
use crate::store::PersistenceStore;

/// the outcome of one completed reconciliation pass
#[derive(Debug, Default, Clone, Serialize)]
pub struct ReconcileReport {
    pub diff: ReconciliationDiff,
    /// rows written to the persisted cache
    pub writes: usize,
    /// live records whose tier changed
    pub live_updates: usize,
    pub elapsed: Duration,
}

pub struct MembershipReconciler {
    store: Arc<dyn PersistenceStore>,
    provider: Arc<dyn MembershipProvider>,
    users: UserRecordStore,
    overrides: OverrideSet,
    rows_per_yield: usize,
    running: AtomicBool,
    passes: AtomicU64,
}

impl MembershipReconciler {
    pub fn new(
        store: Arc<dyn PersistenceStore>,
        provider: Arc<dyn MembershipProvider>,
        users: UserRecordStore,
        overrides: OverrideSet,
        rows_per_yield: usize,
    ) -> MembershipReconciler {
        MembershipReconciler {
            store,
            provider,
            users,
            overrides,
            rows_per_yield,
            running: AtomicBool::new(false),
            passes: AtomicU64::new(0),
        }
    }

    /// completed passes since start
    pub fn passes(&self) -> u64 {
        self.passes.load(Ordering::Acquire)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn overrides(&self) -> &OverrideSet {
        &self.overrides
    }

    /// one full three-way pass.  Any error aborts the pass; writes already made stay,
    /// and the next pass recomputes from fresh reads.
    pub async fn reconcile(&self) -> Result<ReconcileReport> {
        let _guard = RunGuard::try_acquire(&self.running)
            .ok_or(EngineError::AlreadyRunning("reconciliation"))?;
        let started = Instant::now();

        let mut snapshots = self.read_external().await?;
        snapshots.extend(self.read_persisted().await?);
        snapshots.extend(self.read_overrides().await);

        let persisted = collapse(&snapshots, Source::Persisted);
        let desired = desired_tiers(&snapshots);
        let diff = ReconciliationDiff::compute(&persisted, &desired);

        let mut writes = 0;
        for mutation in diff.mutations(&desired) {
            self.store.mutate(mutation).await.map_err(|e| {
                EngineError::Reconciliation(
                    e.context(format!("{:?} failed after {} writes", mutation, writes)),
                )
            })?;
            writes += 1;
        }

        let live_updates = self.apply_live(&desired).await;
        self.passes.fetch_add(1, Ordering::AcqRel);

        let report = ReconcileReport {
            diff,
            writes,
            live_updates,
            elapsed: started.elapsed(),
        };

        info!(
            "membership reconciled in {:?}: +{} -{} ^{} v{}, {} live updates",
            report.elapsed,
            report.diff.added.len(),
            report.diff.removed.len(),
            report.diff.upgraded.len(),
            report.diff.downgraded.len(),
            report.live_updates,
        );

        Ok(report)
    }

    /// copy persisted tiers (and overrides) onto live records without touching the
    /// store, so members keep their benefits while the authority warms up.
    pub async fn apply_provisional(&self) -> Result<usize> {
        let _guard = RunGuard::try_acquire(&self.running)
            .ok_or(EngineError::AlreadyRunning("reconciliation"))?;

        let persisted = self.read_persisted().await?;
        let mut provisional = collapse(&persisted, Source::Persisted);
        provisional.retain(|_, tier| tier.is_member());
        for snap in self.read_overrides().await {
            provisional.insert(snap.id, snap.tier);
        }

        let mut fair = Fairness::new(self.rows_per_yield);
        let mut changed = 0;
        for (id, tier) in provisional.iter() {
            let user = self.users.get_or_create(*id).await;
            if user.write().await.set_tier(*tier) {
                debug!("made {} a temporary {:?} member", id, tier);
                changed += 1;
            }
            fair.tick().await;
        }

        info!("temporary membership applied to {} users", changed);
        Ok(changed)
    }

    async fn read_external(&self) -> Result<Vec<MembershipSnapshot>> {
        let mut snapshots = vec![];
        for tier in [Tier::Normal, Tier::Elevated] {
            let ids = self.provider.list_members(tier).await?;
            snapshots.extend(
                ids.into_iter()
                    .map(|id| MembershipSnapshot::new(Source::External, tier, id)),
            );
        }

        // an authority that hasn't loaded yet answers with nothing
        if snapshots.is_empty() {
            return Err(EngineError::NotReady(
                "external authority returned no members".to_string(),
            ));
        }

        Ok(snapshots)
    }

    async fn read_persisted(&self) -> Result<Vec<MembershipSnapshot>> {
        let rows = self
            .store
            .fetch_cached_members()
            .await
            .map_err(EngineError::Reconciliation)?;

        Ok(rows
            .into_iter()
            .map(|(id, tier)| MembershipSnapshot::new(Source::Persisted, tier, id))
            .collect())
    }

    // overrides to Tier::None are kept; they strip the id downstream
    async fn read_overrides(&self) -> Vec<MembershipSnapshot> {
        self.overrides
            .snapshot()
            .await
            .into_iter()
            .map(|(id, tier)| MembershipSnapshot::new(Source::Override, tier, id))
            .collect()
    }

    async fn apply_live(&self, desired: &HashMap<UserId, Tier>) -> usize {
        let mut fair = Fairness::new(self.rows_per_yield);
        let mut changed = 0;

        for (id, tier) in desired.iter() {
            let user = self.users.get_or_create(*id).await;
            if user.write().await.set_tier(*tier) {
                changed += 1;
            }
            fair.tick().await;
        }

        // whatever is left holding a tier without a claim to one loses it
        for handle in self.users.handles().await {
            {
                let mut user = handle.write().await;
                if user.tier().is_member() && !desired.contains_key(&user.id()) {
                    user.set_tier(Tier::None);
                    changed += 1;
                }
            }
            fair.tick().await;
        }

        changed
    }
}
