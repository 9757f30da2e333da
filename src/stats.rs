/// a point-in-time count of everything in the cache
use serde::{Deserialize, Serialize};

use crate::bootstrap::SharedState;
use crate::cache::{CacheSegments, Tier, UserRecordStore};
use crate::worker::JsonString;

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub user_objects: usize,
    pub normal_members: usize,
    pub elevated_members: usize,
    pub user_notifications: usize,
    pub active_reminders: usize,
    pub mod_mail: usize,
    pub banned_from_bot: usize,
    pub game_filter_enabled: usize,
    pub language_packs: usize,
    pub server_prefixes: usize,
    pub welcome_messages: usize,
    pub temp_channels: usize,
    pub custom_commands: usize,
    pub bot_statuses: usize,
    pub stream_channels_followed: usize,
    pub guilds_following_streams: usize,
    pub game_score_entries: usize,
    pub disabled_game_channels: usize,
    pub logged_servers: usize,
    pub idols: usize,
    pub groups: usize,
    pub restricted_channels: usize,
    pub dead_links: usize,
    pub feed_channels_following: usize,
    pub guilds_with_assignable_roles: usize,
    pub playing_cards: usize,
    pub welcome_roles: usize,
    pub maintenance_mode: bool,
    pub bootstrap_runs: u64,
}

impl CacheStats {
    pub async fn collect(
        users: &UserRecordStore,
        segments: &CacheSegments,
        state: &SharedState,
    ) -> CacheStats {
        let mut stats = CacheStats::default();

        for handle in users.handles().await {
            let user = handle.read().await;
            stats.user_objects += 1;
            match user.tier() {
                Tier::Normal => stats.normal_members += 1,
                Tier::Elevated => stats.elevated_members += 1,
                Tier::None => (),
            }
            stats.user_notifications += user.notifications.len();
            stats.active_reminders += user.reminders.len();
            if user.bot_banned {
                stats.banned_from_bot += 1;
            }
            if user.game_filter {
                stats.game_filter_enabled += 1;
            }
        }

        stats.mod_mail = segments.mod_mail.len().await;
        stats.language_packs = segments.languages.len().await;
        stats.server_prefixes = segments.server_prefixes.len().await;
        stats.welcome_messages = segments.welcome_messages.len().await;
        stats.temp_channels = segments.temp_channels.len().await;
        stats.custom_commands = segments
            .custom_commands
            .fold(0, |n, commands| n + commands.len())
            .await;
        stats.bot_statuses = segments.bot_statuses.len().await;
        stats.stream_channels_followed = segments.stream_follows.len().await;
        stats.guilds_following_streams = segments
            .stream_follows
            .fold(0, |n, guilds| n + guilds.len())
            .await;
        stats.game_score_entries = segments.game_scores.len().await;
        stats.disabled_game_channels = segments.disabled_game_channels.len().await;
        stats.logged_servers = segments.logged_servers.len().await;
        stats.idols = segments.idols.len().await;
        stats.groups = segments.groups.len().await;
        stats.restricted_channels = segments.restricted_channels.len().await;
        stats.dead_links = segments.dead_links.len().await;
        stats.feed_channels_following = segments
            .feed_channels
            .fold(0, |n, channels| n + channels.len())
            .await;
        stats.guilds_with_assignable_roles = segments.assignable_roles.len().await;
        stats.playing_cards = segments
            .playing_cards
            .fold(0, |n, cards| n + cards.len())
            .await;
        stats.welcome_roles = segments.welcome_roles.len().await;

        let snapshot = state.snapshot().await;
        stats.maintenance_mode = snapshot.maintenance_mode;
        stats.bootstrap_runs = snapshot.runs;

        stats
    }

    pub fn to_json(&self) -> JsonString {
        match serde_json::to_string(self) {
            Ok(js) => js,
            Err(e) => format!(r#"{}"error":"{:?}"{}"#, "{", e, "}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::Notification;

    #[test]
    fn counts_records_and_segments() {
        async_std::task::block_on(async move {
            let users = UserRecordStore::new();
            let segments = CacheSegments::new();
            let state = SharedState::new();

            let one = users.get_or_create(1).await;
            {
                let mut user = one.write().await;
                user.set_tier(Tier::Elevated);
                user.bot_banned = true;
                user.notifications.push(Notification {
                    guild_id: 9,
                    phrase: "ping".to_string(),
                });
            }
            users.get_or_create(2).await;

            segments.stream_follows.insert("alpha".to_string(), vec![1, 2, 3]).await;
            segments.bot_statuses.replace(vec!["online".to_string()]).await;

            let stats = CacheStats::collect(&users, &segments, &state).await;
            assert_eq!(stats.user_objects, 2);
            assert_eq!(stats.elevated_members, 1);
            assert_eq!(stats.normal_members, 0);
            assert_eq!(stats.banned_from_bot, 1);
            assert_eq!(stats.user_notifications, 1);
            assert_eq!(stats.stream_channels_followed, 1);
            assert_eq!(stats.guilds_following_streams, 3);
            assert_eq!(stats.bot_statuses, 1);

            let back: CacheStats = serde_json::from_str(&stats.to_json()).expect("json");
            assert_eq!(back, stats);
        });
    }
}
