/// loaders for per-guild settings, the feed and the published guild directory
use hashbrown::HashMap;
use log::*;
use std::sync::Arc;

use super::SegmentContext;
use crate::cache::{AssignableRoles, FeedChannel, LoggedServer};
use crate::error::{ProviderError, SegmentError};
use crate::membership::MembershipProvider;

/// one fetch for the servers, then one per server for its channels
pub async fn load_logged_channels(ctx: SegmentContext) -> Result<usize, SegmentError> {
    let servers = ctx.store.fetch_logged_servers().await?;

    let mut logged = HashMap::with_capacity(servers.len());
    let mut every_channel = vec![];
    let mut fair = ctx.fairness();
    for server in servers {
        let channels = ctx.store.fetch_logged_channels(server.id).await?;
        every_channel.extend(channels.iter().copied());
        logged.insert(
            server.guild_id,
            LoggedServer {
                send_all: server.send_all,
                logging_channel: server.channel_id,
                channels,
            },
        );
        fair.tick().await;
    }

    ctx.segments.logged_servers.replace(logged).await;
    ctx.segments.logged_channels.replace(every_channel).await;
    Ok(fair.rows())
}

pub async fn load_command_counter(ctx: SegmentContext) -> Result<usize, SegmentError> {
    let rows = ctx.store.fetch_command_counts().await?;

    let mut counter = HashMap::with_capacity(rows.len());
    let mut fair = ctx.fairness();
    for (command, count) in rows {
        counter.insert(command, count);
        fair.tick().await;
    }

    ctx.segments.command_counter.replace(counter).await;
    Ok(fair.rows())
}

pub async fn load_feed_channels(ctx: SegmentContext) -> Result<usize, SegmentError> {
    let rows = ctx.store.fetch_feed_channels().await?;

    let mut following: HashMap<String, Vec<FeedChannel>> = HashMap::new();
    let mut fair = ctx.fairness();
    for row in rows {
        following
            .entry(row.community.to_lowercase())
            .or_default()
            .push(FeedChannel {
                channel_id: row.channel_id,
                role_id: row.role_id,
                comments_disabled: row.comments_disabled,
            });
        fair.tick().await;
    }

    ctx.segments.feed_channels.replace(following).await;
    Ok(fair.rows())
}

/// roles first, then the channel each guild takes requests in; a guild may have a
/// channel and no roles yet
pub async fn load_assignable_roles(ctx: SegmentContext) -> Result<usize, SegmentError> {
    let roles = ctx.store.fetch_assignable_roles().await?;
    let channels = ctx.store.fetch_assignable_role_channels().await?;

    let mut assignable: HashMap<_, AssignableRoles> = HashMap::new();
    let mut fair = ctx.fairness();
    for row in roles {
        assignable
            .entry(row.guild_id)
            .or_default()
            .roles
            .push((row.role_id, row.name));
        fair.tick().await;
    }
    for (channel_id, guild_id) in channels {
        assignable.entry(guild_id).or_default().channel_id = Some(channel_id);
        fair.tick().await;
    }

    ctx.segments.assignable_roles.replace(assignable).await;
    Ok(fair.rows())
}

pub async fn load_welcome_roles(ctx: SegmentContext) -> Result<usize, SegmentError> {
    let rows = ctx.store.fetch_welcome_roles().await?;

    let mut roles = HashMap::with_capacity(rows.len());
    let mut fair = ctx.fairness();
    for (guild_id, role_id) in rows {
        roles.insert(guild_id, role_id);
        fair.tick().await;
    }

    ctx.segments.welcome_roles.replace(roles).await;
    Ok(fair.rows())
}

pub async fn load_feed_communities(ctx: SegmentContext) -> Result<usize, SegmentError> {
    let rows = ctx.store.fetch_feed_communities().await?;

    let mut communities = HashMap::with_capacity(rows.len());
    let mut fair = ctx.fairness();
    for row in rows {
        communities.insert(row.id, row.name);
        fair.tick().await;
    }

    ctx.segments.feed_communities.replace(communities).await;
    Ok(fair.rows())
}

/// publish the authority's guild list to the store, replacing the previous one
pub async fn publish_guilds(
    ctx: SegmentContext,
    provider: Arc<dyn MembershipProvider>,
) -> Result<usize, SegmentError> {
    let guilds = match provider.list_guilds().await {
        Ok(guilds) => guilds,
        Err(ProviderError::NotReady(reason)) => return Err(SegmentError::NotReady(reason)),
        Err(ProviderError::Failed(e)) => return Err(SegmentError::Failed(e)),
    };

    let count = guilds.len();
    ctx.store.replace_guilds(guilds).await?;
    info!("published {} guilds", count);

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheSegments, UserRecordStore};
    use crate::membership::StaticProvider;
    use crate::pool::BlockingPool;
    use crate::store::{AssignableRoleRow, FeedChannelRow, GuildRow, LoggedServerRow, MemoryStore};
    use std::path::PathBuf;

    fn context(store: Arc<MemoryStore>) -> SegmentContext {
        SegmentContext {
            store,
            users: UserRecordStore::new(),
            segments: CacheSegments::new(),
            pool: BlockingPool::new(1),
            rows_per_yield: 2,
            language_dir: PathBuf::from("languages"),
            languages: vec![],
        }
    }

    #[test]
    fn logged_servers_gather_their_channels() {
        async_std::task::block_on(async move {
            let store = Arc::new(MemoryStore::new());
            store
                .update(|t| {
                    t.logged_servers = vec![
                        LoggedServerRow { id: 1, guild_id: 100, channel_id: 7, send_all: true },
                        LoggedServerRow { id: 2, guild_id: 200, channel_id: 8, send_all: false },
                    ];
                    t.logged_channels = vec![(1, 11), (1, 12), (2, 21)];
                })
                .await;
            let ctx = context(store);

            assert_eq!(load_logged_channels(ctx.clone()).await.expect("load"), 2);
            let server = ctx.segments.logged_servers.get(&100).await.expect("server");
            assert_eq!(server.channels, vec![11, 12]);
            assert_eq!(server.logging_channel, 7);
            assert!(server.send_all);
            assert_eq!(ctx.segments.logged_channels.all().await, vec![11, 12, 21]);
        });
    }

    #[test]
    fn failed_channel_fetch_keeps_previous_servers() {
        async_std::task::block_on(async move {
            let store = Arc::new(MemoryStore::new());
            store
                .update(|t| {
                    t.logged_servers =
                        vec![LoggedServerRow { id: 1, guild_id: 100, channel_id: 7, send_all: true }];
                })
                .await;
            let ctx = context(store.clone());
            load_logged_channels(ctx.clone()).await.expect("load");

            store.fail_table("logged_channels").await;
            assert!(load_logged_channels(ctx.clone()).await.is_err());
            assert!(ctx.segments.logged_servers.contains_key(&100).await);
        });
    }

    #[test]
    fn feed_channels_group_by_community() {
        async_std::task::block_on(async move {
            let row = |channel_id: u64, community: &str| FeedChannelRow {
                channel_id,
                community: community.to_string(),
                role_id: None,
                comments_disabled: false,
            };
            let store = Arc::new(MemoryStore::new());
            store
                .update(|t| t.feed_channels = vec![row(1, "TXT"), row(2, "txt"), row(3, "bts")])
                .await;
            let ctx = context(store);

            load_feed_channels(ctx.clone()).await.expect("load");
            let txt = ctx.segments.feed_channels.get("txt").await.expect("txt");
            assert_eq!(txt.iter().map(|c| c.channel_id).collect::<Vec<_>>(), vec![1, 2]);
            assert_eq!(ctx.segments.feed_channels.len().await, 2);
        });
    }

    #[test]
    fn assignable_channel_without_roles() {
        async_std::task::block_on(async move {
            let store = Arc::new(MemoryStore::new());
            store
                .update(|t| {
                    t.assignable_roles = vec![
                        AssignableRoleRow { role_id: 5, name: "blink".to_string(), guild_id: 1 },
                        AssignableRoleRow { role_id: 6, name: "army".to_string(), guild_id: 1 },
                    ];
                    t.assignable_role_channels = vec![(40, 1), (50, 2)];
                })
                .await;
            let ctx = context(store);

            load_assignable_roles(ctx.clone()).await.expect("load");
            let first = ctx.segments.assignable_roles.get(&1).await.expect("guild 1");
            assert_eq!(first.roles.len(), 2);
            assert_eq!(first.channel_id, Some(40));

            let second = ctx.segments.assignable_roles.get(&2).await.expect("guild 2");
            assert!(second.roles.is_empty());
            assert_eq!(second.channel_id, Some(50));
        });
    }

    #[test]
    fn guild_directory_replaced_whole() {
        async_std::task::block_on(async move {
            let guild = |id: u64| GuildRow {
                id,
                name: format!("guild {}", id),
                member_count: 10,
                owner_id: 1,
            };
            let store = Arc::new(MemoryStore::new());
            let provider = Arc::new(StaticProvider::new());
            provider.set_guilds(vec![guild(1), guild(2)]).await;
            let ctx = context(store.clone());

            assert!(matches!(
                publish_guilds(ctx.clone(), provider.clone()).await,
                Err(SegmentError::NotReady(_))
            ));

            provider.set_ready(true);
            assert_eq!(publish_guilds(ctx.clone(), provider.clone()).await.expect("publish"), 2);

            provider.set_guilds(vec![guild(3)]).await;
            publish_guilds(ctx.clone(), provider.clone()).await.expect("publish");
            assert_eq!(store.guilds().await, vec![guild(3)]);
        });
    }
}
