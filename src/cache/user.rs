use async_std::sync::RwLock;
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{ChannelId, GroupId, GuildId, UserId};

/// membership level assigned to a user
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    #[default]
    None,
    Normal,
    Elevated,
}

impl Tier {
    pub fn is_member(&self) -> bool {
        *self != Tier::None
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub guild_id: GuildId,
    pub phrase: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    pub id: u64,
    pub reason: String,
    /// unix seconds
    pub due: i64,
}

/// the live, mutable state kept for one user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    id: UserId,
    tier: Tier,
    pub balance: u64,
    pub rob_level: u32,
    pub daily_level: u32,
    pub beg_level: u32,
    pub profile_level: u32,
    pub language: String,
    pub timezone: Option<String>,
    pub bot_banned: bool,
    /// times the user tripped the filtered word counter
    pub n_word: u64,
    pub mod_mail_channel: Option<ChannelId>,
    pub notifications: Vec<Notification>,
    pub reminders: Vec<Reminder>,
    pub game_filter: bool,
    pub filtered_groups: Vec<GroupId>,
}

impl UserRecord {
    pub fn new(id: UserId) -> UserRecord {
        UserRecord {
            id,
            tier: Tier::None,
            balance: 0,
            rob_level: 1,
            daily_level: 1,
            beg_level: 1,
            profile_level: 1,
            language: "en_us".to_string(),
            timezone: None,
            bot_banned: false,
            n_word: 0,
            mod_mail_channel: None,
            notifications: vec![],
            reminders: vec![],
            game_filter: false,
            filtered_groups: vec![],
        }
    }

    pub fn id(&self) -> UserId {
        self.id
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }

    // tiers only move through the reconciler and override administration
    pub(crate) fn set_tier(&mut self, tier: Tier) -> bool {
        let changed = self.tier != tier;
        self.tier = tier;
        changed
    }
}

/// shared reference to one live record; every lookup of an id yields the same handle
pub type UserHandle = Arc<RwLock<UserRecord>>;

/// keyed map of live user records
#[derive(Debug, Default, Clone)]
pub struct UserRecordStore {
    users: Arc<RwLock<HashMap<UserId, UserHandle>>>,
}

impl UserRecordStore {
    pub fn new() -> UserRecordStore {
        UserRecordStore::default()
    }

    /// return the record for this id, inserting a default one on first reference
    pub async fn get_or_create(&self, id: UserId) -> UserHandle {
        if let Some(handle) = self.users.read().await.get(&id) {
            return handle.clone();
        }

        let mut users = self.users.write().await;
        users
            .entry(id)
            .or_insert_with(|| Arc::new(RwLock::new(UserRecord::new(id))))
            .clone()
    }

    pub async fn get(&self, id: UserId) -> Option<UserHandle> {
        self.users.read().await.get(&id).cloned()
    }

    /// drop every record; only a cold rebuild calls this
    pub async fn reset(&self) {
        self.users.write().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }

    /// snapshot of the current handles so callers can iterate without holding the map
    pub async fn handles(&self) -> Vec<UserHandle> {
        self.users.read().await.values().cloned().collect()
    }

    /// ids of every live record holding a tier
    pub async fn tiered(&self) -> HashMap<UserId, Tier> {
        let mut tiers = HashMap::new();
        for handle in self.handles().await {
            let user = handle.read().await;
            if user.tier().is_member() {
                tiers.insert(user.id(), user.tier());
            }
        }
        tiers
    }
}
