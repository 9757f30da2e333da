/// loaders for the idol and group catalogue and the game tables built on it.
///
/// The object loaders read photo counts from the count segments, which run earlier
/// in the same pass; an id with no count gets zero.
use hashbrown::HashMap;

use super::SegmentContext;
use crate::cache::{DeadLink, Group, GroupId, Idol, IdolId, PlayingCard, RestrictedChannel};
use crate::error::SegmentError;

pub async fn load_idol_photo_counts(ctx: SegmentContext) -> Result<usize, SegmentError> {
    let rows = ctx.store.fetch_idol_photo_counts().await?;

    let mut counts = HashMap::with_capacity(rows.len());
    let mut fair = ctx.fairness();
    for (idol_id, count) in rows {
        counts.insert(idol_id, count);
        fair.tick().await;
    }

    ctx.segments.idol_photos.replace(counts).await;
    Ok(fair.rows())
}

pub async fn load_group_photo_counts(ctx: SegmentContext) -> Result<usize, SegmentError> {
    let rows = ctx.store.fetch_group_photo_counts().await?;

    let mut counts = HashMap::with_capacity(rows.len());
    let mut fair = ctx.fairness();
    for (group_id, count) in rows {
        counts.insert(group_id, count);
        fair.tick().await;
    }

    ctx.segments.group_photos.replace(counts).await;
    Ok(fair.rows())
}

// push unless already present, keeping first-seen order
fn push_unique(list: &mut Vec<u64>, id: u64) {
    if !list.contains(&id) {
        list.push(id);
    }
}

pub async fn load_idols(ctx: SegmentContext) -> Result<usize, SegmentError> {
    let rows = ctx.store.fetch_idols().await?;
    let links = ctx.store.fetch_group_members().await?;
    let photos = ctx.segments.idol_photos.snapshot().await;

    let mut groups_of: HashMap<IdolId, Vec<GroupId>> = HashMap::new();
    for (group_id, idol_id) in links {
        push_unique(groups_of.entry(idol_id).or_default(), group_id);
    }

    let mut idols = HashMap::with_capacity(rows.len());
    let mut fair = ctx.fairness();
    for row in rows {
        let idol = Idol {
            id: row.id,
            full_name: row.full_name,
            stage_name: row.stage_name,
            gender: row.gender,
            difficulty: row.difficulty,
            groups: groups_of.remove(&row.id).unwrap_or_default(),
            photo_count: photos.get(&row.id).copied().unwrap_or(0),
        };
        idols.insert(idol.id, idol);
        fair.tick().await;
    }

    ctx.segments.idols.replace(idols).await;
    Ok(fair.rows())
}

pub async fn load_groups(ctx: SegmentContext) -> Result<usize, SegmentError> {
    let rows = ctx.store.fetch_groups().await?;
    let links = ctx.store.fetch_group_members().await?;
    let photos = ctx.segments.group_photos.snapshot().await;

    let mut members_of: HashMap<GroupId, Vec<IdolId>> = HashMap::new();
    for (group_id, idol_id) in links {
        push_unique(members_of.entry(group_id).or_default(), idol_id);
    }

    let mut groups = HashMap::with_capacity(rows.len());
    let mut fair = ctx.fairness();
    for row in rows {
        let group = Group {
            id: row.id,
            name: row.name,
            members: members_of.remove(&row.id).unwrap_or_default(),
            photo_count: photos.get(&row.id).copied().unwrap_or(0),
        };
        groups.insert(group.id, group);
        fair.tick().await;
    }

    ctx.segments.groups.replace(groups).await;
    Ok(fair.rows())
}

pub async fn load_restricted_channels(ctx: SegmentContext) -> Result<usize, SegmentError> {
    let rows = ctx.store.fetch_restricted_channels().await?;

    let mut channels = HashMap::with_capacity(rows.len());
    let mut fair = ctx.fairness();
    for (channel_id, guild_id, send_here) in rows {
        channels.insert(channel_id, RestrictedChannel { guild_id, send_here });
        fair.tick().await;
    }

    ctx.segments.restricted_channels.replace(channels).await;
    Ok(fair.rows())
}

pub async fn load_dead_links(ctx: SegmentContext) -> Result<usize, SegmentError> {
    let rows = ctx.store.fetch_dead_links().await?;

    let mut links = HashMap::with_capacity(rows.len());
    let mut fair = ctx.fairness();
    for row in rows {
        links.insert(
            row.message_id,
            DeadLink {
                link: row.link,
                user_id: row.user_id,
                idol_id: row.idol_id,
                guessing_game: row.guessing_game,
            },
        );
        fair.tick().await;
    }

    ctx.segments.dead_links.replace(links).await;
    Ok(fair.rows())
}

pub async fn load_playing_cards(ctx: SegmentContext) -> Result<usize, SegmentError> {
    let rows = ctx.store.fetch_playing_cards().await?;

    let mut cards: HashMap<u64, Vec<PlayingCard>> = HashMap::new();
    let mut fair = ctx.fairness();
    for row in rows {
        cards.entry(row.card_id).or_default().push(PlayingCard {
            custom_card_id: row.custom_card_id,
            file_name: row.file_name,
            card_name: row.card_name,
            value: row.value,
            background_idol: row.background_idol,
        });
        fair.tick().await;
    }

    ctx.segments.playing_cards.replace(cards).await;
    Ok(fair.rows())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheSegments, Difficulty, Gender, UserRecordStore};
    use crate::pool::BlockingPool;
    use crate::store::{GroupRow, IdolRow, MemoryStore, PlayingCardRow};
    use std::path::PathBuf;
    use std::sync::Arc;

    fn context(store: Arc<MemoryStore>) -> SegmentContext {
        SegmentContext {
            store,
            users: UserRecordStore::new(),
            segments: CacheSegments::new(),
            pool: BlockingPool::new(1),
            rows_per_yield: 3,
            language_dir: PathBuf::from("languages"),
            languages: vec![],
        }
    }

    fn idol_row(id: IdolId, stage_name: &str, difficulty: Difficulty) -> IdolRow {
        IdolRow {
            id,
            full_name: format!("{} (full)", stage_name),
            stage_name: stage_name.to_string(),
            gender: Gender::Female,
            difficulty,
        }
    }

    #[test]
    fn idols_pick_up_counts_and_unique_groups() {
        async_std::task::block_on(async move {
            let store = Arc::new(MemoryStore::new());
            store
                .update(|t| {
                    t.idol_photo_counts = vec![(1, 40)];
                    t.idols = vec![
                        idol_row(1, "Jisoo", Difficulty::Easy),
                        idol_row(2, "Rose", Difficulty::Medium),
                    ];
                    t.group_members = vec![(10, 1), (11, 1), (10, 1), (10, 2)];
                })
                .await;
            let ctx = context(store);

            load_idol_photo_counts(ctx.clone()).await.expect("counts");
            assert_eq!(load_idols(ctx.clone()).await.expect("idols"), 2);

            let first = ctx.segments.idols.get(&1).await.expect("idol 1");
            assert_eq!(first.groups, vec![10, 11]);
            assert_eq!(first.photo_count, 40);
            assert!(first.playable(Difficulty::Easy));

            let second = ctx.segments.idols.get(&2).await.expect("idol 2");
            assert_eq!(second.photo_count, 0);
            assert!(!second.playable(Difficulty::Hard));
        });
    }

    #[test]
    fn groups_pick_up_counts_and_unique_members() {
        async_std::task::block_on(async move {
            let store = Arc::new(MemoryStore::new());
            store
                .update(|t| {
                    t.group_photo_counts = vec![(10, 90)];
                    t.groups = vec![GroupRow { id: 10, name: "Blackpink".to_string() }];
                    t.group_members = vec![(10, 2), (10, 1), (10, 2)];
                })
                .await;
            let ctx = context(store);

            load_group_photo_counts(ctx.clone()).await.expect("counts");
            load_groups(ctx.clone()).await.expect("groups");

            let group = ctx.segments.groups.get(&10).await.expect("group");
            assert_eq!(group.members, vec![2, 1]);
            assert_eq!(group.photo_count, 90);
        });
    }

    #[test]
    fn cards_collect_under_their_base_card() {
        async_std::task::block_on(async move {
            let card = |custom_card_id: u64, card_id: u64| PlayingCardRow {
                custom_card_id,
                file_name: format!("{}.png", custom_card_id),
                card_id,
                card_name: "Ace of Spades".to_string(),
                value: 11,
                background_idol: None,
            };
            let store = Arc::new(MemoryStore::new());
            store
                .update(|t| t.playing_cards = vec![card(100, 1), card(101, 1), card(200, 2)])
                .await;
            let ctx = context(store);

            assert_eq!(load_playing_cards(ctx.clone()).await.expect("cards"), 3);
            assert_eq!(ctx.segments.playing_cards.get(&1).await.map(|v| v.len()), Some(2));
            assert_eq!(ctx.segments.playing_cards.len().await, 2);
        });
    }

    #[test]
    fn restricted_channels_rerun_replaces() {
        async_std::task::block_on(async move {
            let store = Arc::new(MemoryStore::new());
            store
                .update(|t| t.restricted_channels = vec![(5, 1, true), (6, 1, false)])
                .await;
            let ctx = context(store.clone());
            load_restricted_channels(ctx.clone()).await.expect("load");
            assert_eq!(
                ctx.segments.restricted_channels.get(&5).await,
                Some(RestrictedChannel { guild_id: 1, send_here: true })
            );

            store.update(|t| t.restricted_channels = vec![(6, 1, true)]).await;
            load_restricted_channels(ctx.clone()).await.expect("reload");
            assert_eq!(ctx.segments.restricted_channels.len().await, 1);
            assert!(!ctx.segments.restricted_channels.contains_key(&5).await);
        });
    }
}
