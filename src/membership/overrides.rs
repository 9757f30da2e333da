use async_std::sync::RwLock;
use hashbrown::HashMap;
use std::sync::Arc;

use crate::cache::{Tier, UserId};

/// administered allowlist of ids whose tier is forced on every reconciliation pass
#[derive(Debug, Default, Clone)]
pub struct OverrideSet {
    entries: Arc<RwLock<HashMap<UserId, Tier>>>,
}

impl OverrideSet {
    pub fn new(entries: HashMap<UserId, Tier>) -> OverrideSet {
        OverrideSet {
            entries: Arc::new(RwLock::new(entries)),
        }
    }

    /// returns the previous forced tier, if any
    pub async fn grant(&self, id: UserId, tier: Tier) -> Option<Tier> {
        self.entries.write().await.insert(id, tier)
    }

    pub async fn revoke(&self, id: UserId) -> Option<Tier> {
        self.entries.write().await.remove(&id)
    }

    pub async fn get(&self, id: UserId) -> Option<Tier> {
        self.entries.read().await.get(&id).copied()
    }

    pub async fn snapshot(&self) -> HashMap<UserId, Tier> {
        self.entries.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
