use async_std::sync::RwLock;
use async_trait::async_trait;
use hashbrown::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::cache::{Tier, UserId};
use crate::error::ProviderError;
use crate::store::GuildRow;

/// the external membership authority.  It may be called before it is ready; it then
/// either returns an empty set or a `ProviderError::NotReady`.
#[async_trait]
pub trait MembershipProvider: Send + Sync {
    async fn list_members(&self, tier: Tier) -> Result<HashSet<UserId>, ProviderError>;

    /// the guilds the authority can see, for the published guild directory
    async fn list_guilds(&self) -> Result<Vec<GuildRow>, ProviderError> {
        Ok(vec![])
    }
}

/// a provider backed by in-memory sets, with a ready switch and failure injection
#[derive(Debug, Default)]
pub struct StaticProvider {
    members: RwLock<HashMap<Tier, HashSet<UserId>>>,
    guilds: RwLock<Vec<GuildRow>>,
    ready: AtomicBool,
    fail_calls: AtomicUsize,
    calls: AtomicUsize,
}

impl StaticProvider {
    pub fn new() -> StaticProvider {
        StaticProvider::default()
    }

    /// a provider that is ready from the start
    pub fn ready() -> StaticProvider {
        let provider = StaticProvider::default();
        provider.set_ready(true);
        provider
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::Release);
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    pub async fn set_members<I>(&self, tier: Tier, ids: I)
    where
        I: IntoIterator<Item = UserId>,
    {
        self.members
            .write()
            .await
            .insert(tier, ids.into_iter().collect());
    }

    pub async fn set_guilds(&self, guilds: Vec<GuildRow>) {
        *self.guilds.write().await = guilds;
    }

    /// fail the next `count` calls with a hard error
    pub fn fail_next(&self, count: usize) {
        self.fail_calls.store(count, Ordering::Release);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Acquire)
    }
}

#[async_trait]
impl MembershipProvider for StaticProvider {
    async fn list_members(&self, tier: Tier) -> Result<HashSet<UserId>, ProviderError> {
        self.calls.fetch_add(1, Ordering::AcqRel);

        let failing = self
            .fail_calls
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(ProviderError::Failed(anyhow::anyhow!(
                "membership lookup for {:?} failed",
                tier
            )));
        }

        if !self.is_ready() {
            return Err(ProviderError::NotReady("member list not loaded".to_string()));
        }

        Ok(self
            .members
            .read()
            .await
            .get(&tier)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_guilds(&self) -> Result<Vec<GuildRow>, ProviderError> {
        if !self.is_ready() {
            return Err(ProviderError::NotReady("guild list not loaded".to_string()));
        }

        Ok(self.guilds.read().await.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_ready_until_switched() {
        async_std::task::block_on(async move {
            let provider = StaticProvider::new();
            provider.set_members(Tier::Normal, vec![1, 2]).await;

            assert!(matches!(
                provider.list_members(Tier::Normal).await,
                Err(ProviderError::NotReady(_))
            ));

            provider.set_ready(true);
            let members = provider.list_members(Tier::Normal).await.expect("ready");
            assert_eq!(members.len(), 2);
            assert!(provider
                .list_members(Tier::Elevated)
                .await
                .expect("ready")
                .is_empty());
            assert_eq!(provider.calls(), 3);
        });
    }

    #[test]
    fn injected_failures_run_out() {
        async_std::task::block_on(async move {
            let provider = StaticProvider::ready();
            provider.fail_next(2);
            assert!(provider.list_members(Tier::Normal).await.is_err());
            assert!(provider.list_members(Tier::Normal).await.is_err());
            assert!(provider.list_members(Tier::Normal).await.is_ok());
        });
    }
}
