use async_std::sync::RwLock;
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use super::entity::{
    AssignableRoles, DeadLink, FeedChannel, Group, Idol, LoggedServer, PlayingCard,
    RestrictedChannel,
};
use super::{ChannelId, GroupId, GuildId, IdolId, MessageId, RoleId, UserId};

/// a typed, named map for one cache segment.  Loaders swap in the full contents at
/// once, so a rerun overwrites rather than accumulates.
pub struct SegmentMap<K, V> {
    name: &'static str,
    inner: Arc<RwLock<HashMap<K, V>>>,
}

impl<K, V> Clone for SegmentMap<K, V> {
    fn clone(&self) -> Self {
        SegmentMap {
            name: self.name,
            inner: self.inner.clone(),
        }
    }
}

impl<K, V> fmt::Debug for SegmentMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SegmentMap").field("name", &self.name).finish()
    }
}

impl<K, V> SegmentMap<K, V>
where
    K: Eq + Hash,
{
    pub fn new(name: &'static str) -> SegmentMap<K, V> {
        SegmentMap {
            name,
            inner: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// replace the whole segment
    pub async fn replace(&self, contents: HashMap<K, V>) {
        *self.inner.write().await = contents;
    }

    pub async fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone,
    {
        self.inner.read().await.get(key).cloned()
    }

    pub async fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.read().await.contains_key(key)
    }

    pub async fn insert(&self, key: K, value: V) -> Option<V> {
        self.inner.write().await.insert(key, value)
    }

    pub async fn remove<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.write().await.remove(key)
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    pub async fn snapshot(&self) -> HashMap<K, V>
    where
        K: Clone,
        V: Clone,
    {
        self.inner.read().await.clone()
    }

    /// fold over the values without cloning the map
    pub async fn fold<T, F>(&self, init: T, f: F) -> T
    where
        F: FnMut(T, &V) -> T,
    {
        self.inner.read().await.values().fold(init, f)
    }
}

/// an ordered, named list segment
pub struct SegmentList<T> {
    name: &'static str,
    inner: Arc<RwLock<Vec<T>>>,
}

impl<T> Clone for SegmentList<T> {
    fn clone(&self) -> Self {
        SegmentList {
            name: self.name,
            inner: self.inner.clone(),
        }
    }
}

impl<T> fmt::Debug for SegmentList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SegmentList").field("name", &self.name).finish()
    }
}

impl<T> SegmentList<T> {
    pub fn new(name: &'static str) -> SegmentList<T> {
        SegmentList {
            name,
            inner: Arc::new(RwLock::new(vec![])),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub async fn replace(&self, items: Vec<T>) {
        *self.inner.write().await = items;
    }

    pub async fn contains(&self, item: &T) -> bool
    where
        T: PartialEq,
    {
        self.inner.read().await.contains(item)
    }

    pub async fn all(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.inner.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WelcomeMessage {
    pub channel_id: ChannelId,
    pub message: String,
    pub enabled: bool,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameScores {
    pub easy: u32,
    pub medium: u32,
    pub hard: u32,
}

/// module name -> message name -> text
pub type LanguagePack = HashMap<String, HashMap<String, String>>;

/// every non-user segment the engine maintains
#[derive(Debug, Clone)]
pub struct CacheSegments {
    pub languages: SegmentMap<String, LanguagePack>,
    pub idol_photos: SegmentMap<IdolId, u64>,
    pub group_photos: SegmentMap<GroupId, u64>,
    pub mod_mail: SegmentMap<UserId, ChannelId>,
    pub logged_servers: SegmentMap<GuildId, LoggedServer>,
    /// every logged channel across all servers
    pub logged_channels: SegmentList<ChannelId>,
    pub server_prefixes: SegmentMap<GuildId, String>,
    pub welcome_messages: SegmentMap<GuildId, WelcomeMessage>,
    /// channel -> seconds before a message is removed
    pub temp_channels: SegmentMap<ChannelId, u64>,
    /// command name -> uses this session
    pub command_counter: SegmentMap<String, u64>,
    pub idols: SegmentMap<IdolId, Idol>,
    pub groups: SegmentMap<GroupId, Group>,
    pub restricted_channels: SegmentMap<ChannelId, RestrictedChannel>,
    /// keyed by the report message
    pub dead_links: SegmentMap<MessageId, DeadLink>,
    pub custom_commands: SegmentMap<GuildId, HashMap<String, String>>,
    pub bot_statuses: SegmentList<String>,
    /// community name -> channels following it
    pub feed_channels: SegmentMap<String, Vec<FeedChannel>>,
    pub assignable_roles: SegmentMap<GuildId, AssignableRoles>,
    /// stream channel name -> guilds following it
    pub stream_follows: SegmentMap<String, Vec<GuildId>>,
    pub game_scores: SegmentMap<UserId, GameScores>,
    /// card id -> every custom variant of it
    pub playing_cards: SegmentMap<u64, Vec<PlayingCard>>,
    /// community id -> name, as seen by the feed
    pub feed_communities: SegmentMap<u64, String>,
    pub welcome_roles: SegmentMap<GuildId, RoleId>,
    pub disabled_game_channels: SegmentList<ChannelId>,
}

impl Default for CacheSegments {
    fn default() -> Self {
        CacheSegments {
            languages: SegmentMap::new("languages"),
            idol_photos: SegmentMap::new("idol_photos"),
            group_photos: SegmentMap::new("group_photos"),
            mod_mail: SegmentMap::new("mod_mail"),
            logged_servers: SegmentMap::new("logged_servers"),
            logged_channels: SegmentList::new("logged_channels"),
            server_prefixes: SegmentMap::new("server_prefixes"),
            welcome_messages: SegmentMap::new("welcome_messages"),
            temp_channels: SegmentMap::new("temp_channels"),
            command_counter: SegmentMap::new("command_counter"),
            idols: SegmentMap::new("idols"),
            groups: SegmentMap::new("groups"),
            restricted_channels: SegmentMap::new("restricted_channels"),
            dead_links: SegmentMap::new("dead_links"),
            custom_commands: SegmentMap::new("custom_commands"),
            bot_statuses: SegmentList::new("bot_statuses"),
            feed_channels: SegmentMap::new("feed_channels"),
            assignable_roles: SegmentMap::new("assignable_roles"),
            stream_follows: SegmentMap::new("stream_follows"),
            game_scores: SegmentMap::new("game_scores"),
            playing_cards: SegmentMap::new("playing_cards"),
            feed_communities: SegmentMap::new("feed_communities"),
            welcome_roles: SegmentMap::new("welcome_roles"),
            disabled_game_channels: SegmentList::new("disabled_game_channels"),
        }
    }
}

impl CacheSegments {
    pub fn new() -> CacheSegments {
        CacheSegments::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replace_overwrites() {
        async_std::task::block_on(async move {
            let prefixes: SegmentMap<GuildId, String> = SegmentMap::new("server_prefixes");
            prefixes.insert(1, "!".to_string()).await;
            prefixes.insert(2, "?".to_string()).await;
            assert_eq!(prefixes.len().await, 2);

            let mut fresh = HashMap::new();
            fresh.insert(3, "$".to_string());
            prefixes.replace(fresh).await;

            assert_eq!(prefixes.len().await, 1);
            assert_eq!(prefixes.get(&1).await, None);
            assert_eq!(prefixes.get(&3).await, Some("$".to_string()));
        });
    }

    #[test]
    fn clones_share_contents() {
        async_std::task::block_on(async move {
            let follows: SegmentMap<String, Vec<GuildId>> = SegmentMap::new("stream_follows");
            let reader = follows.clone();
            follows.insert("channel".to_string(), vec![1, 2]).await;

            assert!(reader.contains_key("channel").await);
            let total = reader.fold(0, |acc, guilds| acc + guilds.len()).await;
            assert_eq!(total, 2);
            assert_eq!(reader.name(), "stream_follows");
        });
    }

    #[test]
    fn list_segment() {
        async_std::task::block_on(async move {
            let statuses = SegmentList::new("bot_statuses");
            assert!(statuses.is_empty().await);
            statuses
                .replace(vec!["idle".to_string(), "busy".to_string()])
                .await;
            assert!(statuses.contains(&"busy".to_string()).await);
            assert_eq!(statuses.all().await.len(), 2);
        });
    }
}
