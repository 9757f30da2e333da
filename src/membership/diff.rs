use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::cache::{Tier, UserId};
use crate::store::Mutation;

/// where a membership observation came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Source {
    External,
    Persisted,
    Override,
}

/// one observation of one id's tier, valid for a single pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipSnapshot {
    pub source: Source,
    pub tier: Tier,
    pub id: UserId,
}

impl MembershipSnapshot {
    pub fn new(source: Source, tier: Tier, id: UserId) -> MembershipSnapshot {
        MembershipSnapshot { source, tier, id }
    }
}

/// collapse one source's snapshots into id -> tier; an id seen under several tiers
/// keeps the highest
pub fn collapse(snapshots: &[MembershipSnapshot], source: Source) -> HashMap<UserId, Tier> {
    let mut tiers: HashMap<UserId, Tier> = HashMap::new();
    for snap in snapshots.iter().filter(|s| s.source == source) {
        let tier = tiers.entry(snap.id).or_insert(snap.tier);
        if snap.tier > *tier {
            *tier = snap.tier;
        }
    }
    tiers
}

/// the tiers the persisted cache should hold after this pass: the external view with
/// overrides laid on top.  An override to `Tier::None` strips the id entirely, and
/// persisted snapshots carry no claim of their own.
pub fn desired_tiers(snapshots: &[MembershipSnapshot]) -> HashMap<UserId, Tier> {
    let mut desired = collapse(snapshots, Source::External);
    desired.retain(|_, tier| tier.is_member());

    for snap in snapshots.iter().filter(|s| s.source == Source::Override) {
        if snap.tier.is_member() {
            desired.insert(snap.id, snap.tier);
        } else {
            desired.remove(&snap.id);
        }
    }
    desired
}

/// what has to change in the persisted cache
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationDiff {
    pub added: BTreeSet<UserId>,
    pub removed: BTreeSet<UserId>,
    pub upgraded: BTreeSet<UserId>,
    pub downgraded: BTreeSet<UserId>,
}

impl ReconciliationDiff {
    pub fn compute(
        persisted: &HashMap<UserId, Tier>,
        desired: &HashMap<UserId, Tier>,
    ) -> ReconciliationDiff {
        let mut diff = ReconciliationDiff::default();

        for (id, want) in desired.iter() {
            match persisted.get(id) {
                None => {
                    diff.added.insert(*id);
                }
                Some(have) if want > have => {
                    diff.upgraded.insert(*id);
                }
                Some(have) if want < have => {
                    diff.downgraded.insert(*id);
                }
                Some(_) => (),
            }
        }

        for id in persisted.keys() {
            if !desired.contains_key(id) {
                diff.removed.insert(*id);
            }
        }

        diff
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// number of persisted writes this diff needs
    pub fn len(&self) -> usize {
        self.added.len() + self.removed.len() + self.upgraded.len() + self.downgraded.len()
    }

    /// the single-row writes, in a stable order: removals, downgrades, upgrades, inserts
    pub fn mutations(&self, desired: &HashMap<UserId, Tier>) -> Vec<Mutation> {
        let tier_of = |id: &UserId| desired.get(id).copied().unwrap_or_default();

        let mut list = Vec::with_capacity(self.len());
        list.extend(self.removed.iter().map(|id| Mutation::DeleteMember { id: *id }));
        list.extend(
            self.downgraded
                .iter()
                .chain(self.upgraded.iter())
                .map(|id| Mutation::UpdateMemberTier {
                    id: *id,
                    tier: tier_of(id),
                }),
        );
        list.extend(self.added.iter().map(|id| Mutation::InsertMember {
            id: *id,
            tier: tier_of(id),
        }));
        list
    }
}
