/// the persistence store boundary.
///
/// Every fetch must return rows in a deterministic order so that repeated bootstraps
/// produce the same cache.  Reconciliation writes go through `mutate`, one row per
/// call; each call must be atomic on its own.
///
pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::cache::{ChannelId, Difficulty, Gender, GroupId, GuildId, IdolId, MessageId, RoleId, Tier, UserId};

pub use memory::MemoryStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WelcomeMessageRow {
    pub channel_id: ChannelId,
    pub guild_id: GuildId,
    pub message: String,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomCommandRow {
    pub guild_id: GuildId,
    pub name: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameScoreRow {
    pub user_id: UserId,
    pub easy: u32,
    pub medium: u32,
    pub hard: u32,
}

/// zero columns mean "not set" and leave the record's value alone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelRow {
    pub user_id: UserId,
    pub rob: u32,
    pub daily: u32,
    pub beg: u32,
    pub profile: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRow {
    pub guild_id: GuildId,
    pub user_id: UserId,
    pub phrase: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderRow {
    pub id: u64,
    pub user_id: UserId,
    pub reason: String,
    pub due: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggedServerRow {
    /// row key; logged channels hang off it
    pub id: u64,
    pub guild_id: GuildId,
    pub channel_id: ChannelId,
    pub send_all: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdolRow {
    pub id: IdolId,
    pub full_name: String,
    pub stage_name: String,
    #[serde(default)]
    pub gender: Gender,
    #[serde(default)]
    pub difficulty: Difficulty,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRow {
    pub id: GroupId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeadLinkRow {
    pub link: String,
    pub user_id: UserId,
    pub message_id: MessageId,
    pub idol_id: IdolId,
    pub guessing_game: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedChannelRow {
    pub channel_id: ChannelId,
    pub community: String,
    pub role_id: Option<RoleId>,
    pub comments_disabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignableRoleRow {
    pub role_id: RoleId,
    pub name: String,
    pub guild_id: GuildId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayingCardRow {
    pub custom_card_id: u64,
    pub file_name: String,
    pub card_id: u64,
    pub card_name: String,
    pub value: u32,
    pub background_idol: Option<IdolId>,
}

/// a feed community the bot can follow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedCommunityRow {
    pub id: u64,
    pub name: String,
}

/// one guild as the external authority sees it, published for outside readers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildRow {
    pub id: GuildId,
    pub name: String,
    pub member_count: u64,
    pub owner_id: UserId,
}

/// a single-row write against the persisted membership cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mutation {
    InsertMember { id: UserId, tier: Tier },
    UpdateMemberTier { id: UserId, tier: Tier },
    DeleteMember { id: UserId },
}

impl Mutation {
    pub fn id(&self) -> UserId {
        match self {
            Mutation::InsertMember { id, .. } => *id,
            Mutation::UpdateMemberTier { id, .. } => *id,
            Mutation::DeleteMember { id } => *id,
        }
    }
}

#[async_trait]
pub trait PersistenceStore: Send + Sync {
    /// (idol, photos)
    async fn fetch_idol_photo_counts(&self) -> Result<Vec<(IdolId, u64)>>;
    /// (group, photos of all its members)
    async fn fetch_group_photo_counts(&self) -> Result<Vec<(GroupId, u64)>>;
    async fn fetch_notifications(&self) -> Result<Vec<NotificationRow>>;
    async fn fetch_mod_mail(&self) -> Result<Vec<(UserId, ChannelId)>>;
    async fn fetch_bot_bans(&self) -> Result<Vec<UserId>>;
    async fn fetch_logged_servers(&self) -> Result<Vec<LoggedServerRow>>;
    /// channels logged under one `LoggedServerRow::id`
    async fn fetch_logged_channels(&self, server: u64) -> Result<Vec<ChannelId>>;
    async fn fetch_server_prefixes(&self) -> Result<Vec<(GuildId, String)>>;
    async fn fetch_welcome_messages(&self) -> Result<Vec<WelcomeMessageRow>>;
    /// (channel, removal delay in seconds)
    async fn fetch_temp_channels(&self) -> Result<Vec<(ChannelId, i64)>>;
    /// (user, count)
    async fn fetch_word_counts(&self) -> Result<Vec<(UserId, u64)>>;
    /// (command name, uses) for the current session
    async fn fetch_command_counts(&self) -> Result<Vec<(String, u64)>>;
    async fn fetch_idols(&self) -> Result<Vec<IdolRow>>;
    async fn fetch_groups(&self) -> Result<Vec<GroupRow>>;
    /// (group, idol) links; may repeat
    async fn fetch_group_members(&self) -> Result<Vec<(GroupId, IdolId)>>;
    /// (channel, guild, send here)
    async fn fetch_restricted_channels(&self) -> Result<Vec<(ChannelId, GuildId, bool)>>;
    async fn fetch_dead_links(&self) -> Result<Vec<DeadLinkRow>>;
    async fn fetch_custom_commands(&self) -> Result<Vec<CustomCommandRow>>;
    async fn fetch_bot_statuses(&self) -> Result<Vec<String>>;
    async fn fetch_feed_channels(&self) -> Result<Vec<FeedChannelRow>>;
    async fn fetch_assignable_roles(&self) -> Result<Vec<AssignableRoleRow>>;
    /// (channel, guild)
    async fn fetch_assignable_role_channels(&self) -> Result<Vec<(ChannelId, GuildId)>>;
    /// (stream channel name, guild)
    async fn fetch_stream_follows(&self) -> Result<Vec<(String, GuildId)>>;
    async fn fetch_reminders(&self) -> Result<Vec<ReminderRow>>;
    async fn fetch_timezones(&self) -> Result<Vec<(UserId, String)>>;
    async fn fetch_game_scores(&self) -> Result<Vec<GameScoreRow>>;
    async fn fetch_balances(&self) -> Result<Vec<(UserId, u64)>>;
    async fn fetch_levels(&self) -> Result<Vec<LevelRow>>;
    async fn fetch_languages(&self) -> Result<Vec<(UserId, String)>>;
    async fn fetch_playing_cards(&self) -> Result<Vec<PlayingCardRow>>;
    async fn fetch_feed_communities(&self) -> Result<Vec<FeedCommunityRow>>;
    async fn fetch_welcome_roles(&self) -> Result<Vec<(GuildId, RoleId)>>;
    async fn fetch_disabled_game_channels(&self) -> Result<Vec<ChannelId>>;
    async fn fetch_game_filters(&self) -> Result<Vec<UserId>>;
    async fn fetch_filtered_groups(&self) -> Result<Vec<(UserId, GroupId)>>;

    /// the persisted secondary membership cache
    async fn fetch_cached_members(&self) -> Result<Vec<(UserId, Tier)>>;

    async fn mutate(&self, mutation: Mutation) -> Result<()>;

    /// swap the published guild directory for `rows` in one write
    async fn replace_guilds(&self, rows: Vec<GuildRow>) -> Result<()>;
}
