/// in-process persistence store.
///
/// Backs tests and local runs (`database_url = "memory://"`).  Tables can be
/// seeded from json, fetches can be made to fail by table name, and every
/// mutation is logged so callers can count writes.
use anyhow::{anyhow, Result};
use async_std::sync::RwLock;
use async_trait::async_trait;
use hashbrown::HashSet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{
    AssignableRoleRow, CustomCommandRow, DeadLinkRow, FeedChannelRow, FeedCommunityRow,
    GameScoreRow, GroupRow, GuildRow, IdolRow, LevelRow, LoggedServerRow, Mutation,
    NotificationRow, PersistenceStore, PlayingCardRow, ReminderRow, WelcomeMessageRow,
};
use crate::cache::{ChannelId, GroupId, GuildId, IdolId, RoleId, Tier, UserId};

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryTables {
    pub idol_photo_counts: Vec<(IdolId, u64)>,
    pub group_photo_counts: Vec<(GroupId, u64)>,
    pub notifications: Vec<NotificationRow>,
    pub mod_mail: Vec<(UserId, ChannelId)>,
    pub bot_bans: Vec<UserId>,
    pub logged_servers: Vec<LoggedServerRow>,
    /// (logged server row id, channel)
    pub logged_channels: Vec<(u64, ChannelId)>,
    pub server_prefixes: Vec<(GuildId, String)>,
    pub welcome_messages: Vec<WelcomeMessageRow>,
    pub temp_channels: Vec<(ChannelId, i64)>,
    pub word_counts: Vec<(UserId, u64)>,
    pub command_counts: Vec<(String, u64)>,
    pub idols: Vec<IdolRow>,
    pub groups: Vec<GroupRow>,
    pub group_members: Vec<(GroupId, IdolId)>,
    pub restricted_channels: Vec<(ChannelId, GuildId, bool)>,
    pub dead_links: Vec<DeadLinkRow>,
    pub custom_commands: Vec<CustomCommandRow>,
    pub bot_statuses: Vec<String>,
    pub feed_channels: Vec<FeedChannelRow>,
    pub assignable_roles: Vec<AssignableRoleRow>,
    pub assignable_role_channels: Vec<(ChannelId, GuildId)>,
    pub stream_follows: Vec<(String, GuildId)>,
    pub reminders: Vec<ReminderRow>,
    pub timezones: Vec<(UserId, String)>,
    pub game_scores: Vec<GameScoreRow>,
    pub balances: Vec<(UserId, u64)>,
    pub levels: Vec<LevelRow>,
    pub languages: Vec<(UserId, String)>,
    pub playing_cards: Vec<PlayingCardRow>,
    pub feed_communities: Vec<FeedCommunityRow>,
    pub welcome_roles: Vec<(GuildId, RoleId)>,
    pub disabled_game_channels: Vec<ChannelId>,
    pub game_filters: Vec<UserId>,
    pub filtered_groups: Vec<(UserId, GroupId)>,
    /// persisted membership cache, ordered by id
    pub members: BTreeMap<UserId, Tier>,
    /// written by the guild directory segment
    pub guilds: Vec<GuildRow>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<MemoryTables>,
    failing: RwLock<HashSet<String>>,
    mutations: RwLock<Vec<Mutation>>,
    fail_mutations_after: RwLock<Option<usize>>,
    fetches: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    pub fn with_tables(tables: MemoryTables) -> MemoryStore {
        MemoryStore {
            tables: RwLock::new(tables),
            ..MemoryStore::default()
        }
    }

    pub fn from_json(text: &str) -> Result<MemoryStore> {
        let tables: MemoryTables = serde_json::from_str(text)?;
        Ok(MemoryStore::with_tables(tables))
    }

    /// edit the tables in place
    pub async fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut MemoryTables),
    {
        let mut tables = self.tables.write().await;
        f(&mut tables);
    }

    pub async fn members(&self) -> BTreeMap<UserId, Tier> {
        self.tables.read().await.members.clone()
    }

    pub async fn guilds(&self) -> Vec<GuildRow> {
        self.tables.read().await.guilds.clone()
    }

    /// make every fetch of `table` fail until `heal` is called
    pub async fn fail_table(&self, table: &str) {
        self.failing.write().await.insert(table.to_string());
    }

    pub async fn heal(&self, table: &str) {
        self.failing.write().await.remove(table);
    }

    /// let `count` more mutations through, then fail the rest
    pub async fn fail_mutations_after(&self, count: Option<usize>) {
        *self.fail_mutations_after.write().await = count;
    }

    pub async fn mutations(&self) -> Vec<Mutation> {
        self.mutations.read().await.clone()
    }

    pub async fn mutation_count(&self) -> usize {
        self.mutations.read().await.len()
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::Relaxed)
    }

    async fn read<T, F>(&self, table: &str, f: F) -> Result<T>
    where
        F: FnOnce(&MemoryTables) -> T,
    {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        if self.failing.read().await.contains(table) {
            return Err(anyhow!("fetch from {} failed", table));
        }

        let tables = self.tables.read().await;
        Ok(f(&tables))
    }
}

#[async_trait]
impl PersistenceStore for MemoryStore {
    async fn fetch_idol_photo_counts(&self) -> Result<Vec<(IdolId, u64)>> {
        self.read("idol_photo_counts", |t| t.idol_photo_counts.clone()).await
    }

    async fn fetch_group_photo_counts(&self) -> Result<Vec<(GroupId, u64)>> {
        self.read("group_photo_counts", |t| t.group_photo_counts.clone()).await
    }

    async fn fetch_notifications(&self) -> Result<Vec<NotificationRow>> {
        self.read("notifications", |t| t.notifications.clone()).await
    }

    async fn fetch_mod_mail(&self) -> Result<Vec<(UserId, ChannelId)>> {
        self.read("mod_mail", |t| t.mod_mail.clone()).await
    }

    async fn fetch_bot_bans(&self) -> Result<Vec<UserId>> {
        self.read("bot_bans", |t| t.bot_bans.clone()).await
    }

    async fn fetch_logged_servers(&self) -> Result<Vec<LoggedServerRow>> {
        self.read("logged_servers", |t| t.logged_servers.clone()).await
    }

    async fn fetch_logged_channels(&self, server: u64) -> Result<Vec<ChannelId>> {
        self.read("logged_channels", |t| {
            t.logged_channels
                .iter()
                .filter(|(id, _)| *id == server)
                .map(|(_, channel)| *channel)
                .collect()
        })
        .await
    }

    async fn fetch_server_prefixes(&self) -> Result<Vec<(GuildId, String)>> {
        self.read("server_prefixes", |t| t.server_prefixes.clone()).await
    }

    async fn fetch_welcome_messages(&self) -> Result<Vec<WelcomeMessageRow>> {
        self.read("welcome_messages", |t| t.welcome_messages.clone()).await
    }

    async fn fetch_temp_channels(&self) -> Result<Vec<(ChannelId, i64)>> {
        self.read("temp_channels", |t| t.temp_channels.clone()).await
    }

    async fn fetch_word_counts(&self) -> Result<Vec<(UserId, u64)>> {
        self.read("word_counts", |t| t.word_counts.clone()).await
    }

    async fn fetch_command_counts(&self) -> Result<Vec<(String, u64)>> {
        self.read("command_counts", |t| t.command_counts.clone()).await
    }

    async fn fetch_idols(&self) -> Result<Vec<IdolRow>> {
        self.read("idols", |t| t.idols.clone()).await
    }

    async fn fetch_groups(&self) -> Result<Vec<GroupRow>> {
        self.read("groups", |t| t.groups.clone()).await
    }

    async fn fetch_group_members(&self) -> Result<Vec<(GroupId, IdolId)>> {
        self.read("group_members", |t| t.group_members.clone()).await
    }

    async fn fetch_restricted_channels(&self) -> Result<Vec<(ChannelId, GuildId, bool)>> {
        self.read("restricted_channels", |t| t.restricted_channels.clone())
            .await
    }

    async fn fetch_dead_links(&self) -> Result<Vec<DeadLinkRow>> {
        self.read("dead_links", |t| t.dead_links.clone()).await
    }

    async fn fetch_custom_commands(&self) -> Result<Vec<CustomCommandRow>> {
        self.read("custom_commands", |t| t.custom_commands.clone()).await
    }

    async fn fetch_bot_statuses(&self) -> Result<Vec<String>> {
        self.read("bot_statuses", |t| t.bot_statuses.clone()).await
    }

    async fn fetch_feed_channels(&self) -> Result<Vec<FeedChannelRow>> {
        self.read("feed_channels", |t| t.feed_channels.clone()).await
    }

    async fn fetch_assignable_roles(&self) -> Result<Vec<AssignableRoleRow>> {
        self.read("assignable_roles", |t| t.assignable_roles.clone()).await
    }

    async fn fetch_assignable_role_channels(&self) -> Result<Vec<(ChannelId, GuildId)>> {
        self.read("assignable_role_channels", |t| {
            t.assignable_role_channels.clone()
        })
        .await
    }

    async fn fetch_stream_follows(&self) -> Result<Vec<(String, GuildId)>> {
        self.read("stream_follows", |t| t.stream_follows.clone()).await
    }

    async fn fetch_reminders(&self) -> Result<Vec<ReminderRow>> {
        self.read("reminders", |t| t.reminders.clone()).await
    }

    async fn fetch_timezones(&self) -> Result<Vec<(UserId, String)>> {
        self.read("timezones", |t| t.timezones.clone()).await
    }

    async fn fetch_game_scores(&self) -> Result<Vec<GameScoreRow>> {
        self.read("game_scores", |t| t.game_scores.clone()).await
    }

    async fn fetch_balances(&self) -> Result<Vec<(UserId, u64)>> {
        self.read("balances", |t| t.balances.clone()).await
    }

    async fn fetch_levels(&self) -> Result<Vec<LevelRow>> {
        self.read("levels", |t| t.levels.clone()).await
    }

    async fn fetch_languages(&self) -> Result<Vec<(UserId, String)>> {
        self.read("languages", |t| t.languages.clone()).await
    }

    async fn fetch_playing_cards(&self) -> Result<Vec<PlayingCardRow>> {
        self.read("playing_cards", |t| t.playing_cards.clone()).await
    }

    async fn fetch_feed_communities(&self) -> Result<Vec<FeedCommunityRow>> {
        self.read("feed_communities", |t| t.feed_communities.clone()).await
    }

    async fn fetch_welcome_roles(&self) -> Result<Vec<(GuildId, RoleId)>> {
        self.read("welcome_roles", |t| t.welcome_roles.clone()).await
    }

    async fn fetch_disabled_game_channels(&self) -> Result<Vec<ChannelId>> {
        self.read("disabled_game_channels", |t| t.disabled_game_channels.clone())
            .await
    }

    async fn fetch_game_filters(&self) -> Result<Vec<UserId>> {
        self.read("game_filters", |t| t.game_filters.clone()).await
    }

    async fn fetch_filtered_groups(&self) -> Result<Vec<(UserId, GroupId)>> {
        self.read("filtered_groups", |t| t.filtered_groups.clone()).await
    }

    async fn fetch_cached_members(&self) -> Result<Vec<(UserId, Tier)>> {
        self.read("members", |t| {
            t.members.iter().map(|(id, tier)| (*id, *tier)).collect()
        })
        .await
    }

    async fn mutate(&self, mutation: Mutation) -> Result<()> {
        {
            let mut remaining = self.fail_mutations_after.write().await;
            if let Some(n) = remaining.as_mut() {
                if *n == 0 {
                    return Err(anyhow!("write rejected: {:?}", mutation));
                }
                *n -= 1;
            }
        }

        let mut tables = self.tables.write().await;
        match mutation {
            Mutation::InsertMember { id, tier } => {
                if tables.members.contains_key(&id) {
                    return Err(anyhow!("member {} already cached", id));
                }
                tables.members.insert(id, tier);
            }
            Mutation::UpdateMemberTier { id, tier } => match tables.members.get_mut(&id) {
                Some(current) => *current = tier,
                None => return Err(anyhow!("member {} not cached", id)),
            },
            Mutation::DeleteMember { id } => {
                tables.members.remove(&id);
            }
        }

        self.mutations.write().await.push(mutation);
        Ok(())
    }

    async fn replace_guilds(&self, rows: Vec<GuildRow>) -> Result<()> {
        if self.failing.read().await.contains("guilds") {
            return Err(anyhow!("write to guilds failed"));
        }

        self.tables.write().await.guilds = rows;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_from_json() {
        async_std::task::block_on(async move {
            let store = MemoryStore::from_json(
                r#"{ "server_prefixes": [[1, "!"]], "members": { "5": "elevated" } }"#,
            )
            .expect("should parse tables");

            let prefixes = store.fetch_server_prefixes().await.expect("fetch");
            assert_eq!(prefixes, vec![(1, "!".to_string())]);

            let members = store.fetch_cached_members().await.expect("fetch");
            assert_eq!(members, vec![(5, Tier::Elevated)]);
            assert_eq!(store.fetch_count(), 2);
        });
    }

    #[test]
    fn logged_channels_by_server() {
        async_std::task::block_on(async move {
            let store = MemoryStore::new();
            store
                .update(|t| t.logged_channels = vec![(1, 10), (2, 20), (1, 11)])
                .await;

            assert_eq!(store.fetch_logged_channels(1).await.expect("fetch"), vec![10, 11]);
            assert!(store.fetch_logged_channels(3).await.expect("fetch").is_empty());
        });
    }

    #[test]
    fn failing_tables() {
        async_std::task::block_on(async move {
            let store = MemoryStore::new();
            store.fail_table("balances").await;
            assert!(store.fetch_balances().await.is_err());
            assert!(store.fetch_levels().await.is_ok());

            store.heal("balances").await;
            assert!(store.fetch_balances().await.is_ok());
        });
    }

    #[test]
    fn member_mutations() {
        async_std::task::block_on(async move {
            let store = MemoryStore::new();
            store
                .mutate(Mutation::InsertMember { id: 1, tier: Tier::Normal })
                .await
                .expect("insert");
            assert!(store
                .mutate(Mutation::InsertMember { id: 1, tier: Tier::Normal })
                .await
                .is_err());
            store
                .mutate(Mutation::UpdateMemberTier { id: 1, tier: Tier::Elevated })
                .await
                .expect("update");
            assert!(store
                .mutate(Mutation::UpdateMemberTier { id: 2, tier: Tier::Normal })
                .await
                .is_err());

            assert_eq!(store.members().await.get(&1), Some(&Tier::Elevated));

            store
                .mutate(Mutation::DeleteMember { id: 1 })
                .await
                .expect("delete");
            assert!(store.members().await.is_empty());
            assert_eq!(store.mutation_count().await, 3);
        });
    }

    #[test]
    fn rejects_writes_past_limit() {
        async_std::task::block_on(async move {
            let store = MemoryStore::new();
            store.fail_mutations_after(Some(1)).await;
            assert!(store
                .mutate(Mutation::InsertMember { id: 1, tier: Tier::Normal })
                .await
                .is_ok());
            assert!(store
                .mutate(Mutation::InsertMember { id: 2, tier: Tier::Normal })
                .await
                .is_err());
            assert_eq!(store.mutation_count().await, 1);
        });
    }
}
