/// loaders for the keyed lookup segments; each builds a fresh map and swaps it in
use hashbrown::HashMap;

use super::SegmentContext;
use crate::cache::{GameScores, WelcomeMessage};
use crate::error::SegmentError;

/// temp channel messages never go away sooner than this
pub const MIN_TEMP_DELAY_SECS: u64 = 60;

pub async fn load_server_prefixes(ctx: SegmentContext) -> Result<usize, SegmentError> {
    let rows = ctx.store.fetch_server_prefixes().await?;

    let mut prefixes = HashMap::with_capacity(rows.len());
    let mut fair = ctx.fairness();
    for (guild_id, prefix) in rows {
        prefixes.insert(guild_id, prefix);
        fair.tick().await;
    }

    ctx.segments.server_prefixes.replace(prefixes).await;
    Ok(fair.rows())
}

pub async fn load_welcome_messages(ctx: SegmentContext) -> Result<usize, SegmentError> {
    let rows = ctx.store.fetch_welcome_messages().await?;

    let mut messages = HashMap::with_capacity(rows.len());
    let mut fair = ctx.fairness();
    for row in rows {
        messages.insert(
            row.guild_id,
            WelcomeMessage {
                channel_id: row.channel_id,
                message: row.message,
                enabled: row.enabled,
            },
        );
        fair.tick().await;
    }

    ctx.segments.welcome_messages.replace(messages).await;
    Ok(fair.rows())
}

pub async fn load_temp_channels(ctx: SegmentContext) -> Result<usize, SegmentError> {
    let rows = ctx.store.fetch_temp_channels().await?;

    let mut channels = HashMap::with_capacity(rows.len());
    let mut fair = ctx.fairness();
    for (channel_id, delay) in rows {
        let delay = u64::try_from(delay).unwrap_or(0).max(MIN_TEMP_DELAY_SECS);
        channels.insert(channel_id, delay);
        fair.tick().await;
    }

    ctx.segments.temp_channels.replace(channels).await;
    Ok(fair.rows())
}

pub async fn load_custom_commands(ctx: SegmentContext) -> Result<usize, SegmentError> {
    let rows = ctx.store.fetch_custom_commands().await?;

    let mut commands: HashMap<_, HashMap<String, String>> = HashMap::new();
    let mut fair = ctx.fairness();
    for row in rows {
        commands
            .entry(row.guild_id)
            .or_default()
            .insert(row.name, row.message);
        fair.tick().await;
    }

    ctx.segments.custom_commands.replace(commands).await;
    Ok(fair.rows())
}

pub async fn load_bot_statuses(ctx: SegmentContext) -> Result<usize, SegmentError> {
    let statuses = ctx.store.fetch_bot_statuses().await?;
    let count = statuses.len();

    ctx.segments.bot_statuses.replace(statuses).await;
    Ok(count)
}

pub async fn load_stream_follows(ctx: SegmentContext) -> Result<usize, SegmentError> {
    let rows = ctx.store.fetch_stream_follows().await?;

    let mut follows: HashMap<String, Vec<_>> = HashMap::new();
    let mut fair = ctx.fairness();
    for (channel, guild_id) in rows {
        follows.entry(channel).or_default().push(guild_id);
        fair.tick().await;
    }

    ctx.segments.stream_follows.replace(follows).await;
    Ok(fair.rows())
}

pub async fn load_game_scores(ctx: SegmentContext) -> Result<usize, SegmentError> {
    let rows = ctx.store.fetch_game_scores().await?;

    let mut scores = HashMap::with_capacity(rows.len());
    let mut fair = ctx.fairness();
    for row in rows {
        scores.insert(
            row.user_id,
            GameScores {
                easy: row.easy,
                medium: row.medium,
                hard: row.hard,
            },
        );
        fair.tick().await;
    }

    ctx.segments.game_scores.replace(scores).await;
    Ok(fair.rows())
}

pub async fn load_disabled_game_channels(ctx: SegmentContext) -> Result<usize, SegmentError> {
    let channels = ctx.store.fetch_disabled_game_channels().await?;
    let count = channels.len();

    ctx.segments.disabled_game_channels.replace(channels).await;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheSegments, UserRecordStore};
    use crate::pool::BlockingPool;
    use crate::store::{CustomCommandRow, MemoryStore};
    use std::path::PathBuf;
    use std::sync::Arc;

    fn context(store: Arc<MemoryStore>) -> SegmentContext {
        SegmentContext {
            store,
            users: UserRecordStore::new(),
            segments: CacheSegments::new(),
            pool: BlockingPool::new(1),
            rows_per_yield: 4,
            language_dir: PathBuf::from("languages"),
            languages: vec![],
        }
    }

    #[test]
    fn temp_channel_delays_are_clamped() {
        async_std::task::block_on(async move {
            let store = Arc::new(MemoryStore::new());
            store
                .update(|t| t.temp_channels = vec![(1, 5), (2, 300), (3, -10)])
                .await;
            let ctx = context(store);

            assert_eq!(load_temp_channels(ctx.clone()).await.expect("load"), 3);
            let temp = &ctx.segments.temp_channels;
            assert_eq!(temp.get(&1).await, Some(MIN_TEMP_DELAY_SECS));
            assert_eq!(temp.get(&2).await, Some(300));
            assert_eq!(temp.get(&3).await, Some(MIN_TEMP_DELAY_SECS));
        });
    }

    #[test]
    fn custom_commands_group_by_guild() {
        async_std::task::block_on(async move {
            let store = Arc::new(MemoryStore::new());
            store
                .update(|t| {
                    t.custom_commands = vec![
                        CustomCommandRow { guild_id: 1, name: "hi".to_string(), message: "hello".to_string() },
                        CustomCommandRow { guild_id: 1, name: "bye".to_string(), message: "later".to_string() },
                        CustomCommandRow { guild_id: 2, name: "hi".to_string(), message: "yo".to_string() },
                    ]
                })
                .await;
            let ctx = context(store);

            load_custom_commands(ctx.clone()).await.expect("load");
            let guild = ctx.segments.custom_commands.get(&1).await.expect("guild 1");
            assert_eq!(guild.len(), 2);
            assert_eq!(guild.get("bye").map(|s| s.as_str()), Some("later"));
            assert_eq!(ctx.segments.custom_commands.len().await, 2);
        });
    }

    #[test]
    fn rerun_replaces_stale_entries() {
        async_std::task::block_on(async move {
            let store = Arc::new(MemoryStore::new());
            store
                .update(|t| t.stream_follows = vec![("alpha".to_string(), 1), ("alpha".to_string(), 2)])
                .await;
            let ctx = context(store.clone());
            load_stream_follows(ctx.clone()).await.expect("load");
            assert_eq!(ctx.segments.stream_follows.get("alpha").await, Some(vec![1, 2]));

            store
                .update(|t| t.stream_follows = vec![("beta".to_string(), 3)])
                .await;
            load_stream_follows(ctx.clone()).await.expect("reload");
            assert!(!ctx.segments.stream_follows.contains_key("alpha").await);
            assert_eq!(ctx.segments.stream_follows.len().await, 1);
        });
    }
}
