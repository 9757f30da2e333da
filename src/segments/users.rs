/// loaders that write onto the live user records
///
/// Each one fetches first and only then touches the records, so a failed fetch leaves
/// the previous values in place.  Collections and flags are cleared on every live
/// record before being rebuilt.
use hashbrown::HashMap;

use super::SegmentContext;
use crate::cache::{Notification, Reminder, UserRecord, UserRecordStore};
use crate::error::SegmentError;

async fn reset_all<F>(users: &UserRecordStore, f: F)
where
    F: Fn(&mut UserRecord),
{
    for handle in users.handles().await {
        f(&mut *handle.write().await);
    }
}

pub async fn load_notifications(ctx: SegmentContext) -> Result<usize, SegmentError> {
    let rows = ctx.store.fetch_notifications().await?;
    reset_all(&ctx.users, |u| u.notifications.clear()).await;

    let mut fair = ctx.fairness();
    for row in rows {
        let user = ctx.users.get_or_create(row.user_id).await;
        user.write().await.notifications.push(Notification {
            guild_id: row.guild_id,
            phrase: row.phrase,
        });
        fair.tick().await;
    }

    Ok(fair.rows())
}

pub async fn load_mod_mail(ctx: SegmentContext) -> Result<usize, SegmentError> {
    let rows = ctx.store.fetch_mod_mail().await?;
    reset_all(&ctx.users, |u| u.mod_mail_channel = None).await;

    let mut threads = HashMap::with_capacity(rows.len());
    let mut fair = ctx.fairness();
    for (user_id, channel_id) in rows {
        let user = ctx.users.get_or_create(user_id).await;
        user.write().await.mod_mail_channel = Some(channel_id);
        threads.insert(user_id, channel_id);
        fair.tick().await;
    }

    ctx.segments.mod_mail.replace(threads).await;
    Ok(fair.rows())
}

pub async fn load_bot_bans(ctx: SegmentContext) -> Result<usize, SegmentError> {
    let rows = ctx.store.fetch_bot_bans().await?;
    reset_all(&ctx.users, |u| u.bot_banned = false).await;

    let mut fair = ctx.fairness();
    for user_id in rows {
        ctx.users.get_or_create(user_id).await.write().await.bot_banned = true;
        fair.tick().await;
    }

    Ok(fair.rows())
}

pub async fn load_word_counts(ctx: SegmentContext) -> Result<usize, SegmentError> {
    let rows = ctx.store.fetch_word_counts().await?;
    reset_all(&ctx.users, |u| u.n_word = 0).await;

    let mut fair = ctx.fairness();
    for (user_id, count) in rows {
        ctx.users.get_or_create(user_id).await.write().await.n_word = count;
        fair.tick().await;
    }

    Ok(fair.rows())
}

pub async fn load_reminders(ctx: SegmentContext) -> Result<usize, SegmentError> {
    let rows = ctx.store.fetch_reminders().await?;
    reset_all(&ctx.users, |u| u.reminders.clear()).await;

    let mut fair = ctx.fairness();
    for row in rows {
        let user = ctx.users.get_or_create(row.user_id).await;
        user.write().await.reminders.push(Reminder {
            id: row.id,
            reason: row.reason,
            due: row.due,
        });
        fair.tick().await;
    }

    Ok(fair.rows())
}

pub async fn load_timezones(ctx: SegmentContext) -> Result<usize, SegmentError> {
    let rows = ctx.store.fetch_timezones().await?;

    let mut fair = ctx.fairness();
    for (user_id, timezone) in rows {
        ctx.users.get_or_create(user_id).await.write().await.timezone = Some(timezone);
        fair.tick().await;
    }

    Ok(fair.rows())
}

pub async fn load_balances(ctx: SegmentContext) -> Result<usize, SegmentError> {
    let rows = ctx.store.fetch_balances().await?;

    let mut fair = ctx.fairness();
    for (user_id, balance) in rows {
        ctx.users.get_or_create(user_id).await.write().await.balance = balance;
        fair.tick().await;
    }

    Ok(fair.rows())
}

pub async fn load_levels(ctx: SegmentContext) -> Result<usize, SegmentError> {
    let rows = ctx.store.fetch_levels().await?;

    let mut fair = ctx.fairness();
    for row in rows {
        let handle = ctx.users.get_or_create(row.user_id).await;
        let mut user = handle.write().await;
        if row.rob > 0 {
            user.rob_level = row.rob;
        }
        if row.daily > 0 {
            user.daily_level = row.daily;
        }
        if row.beg > 0 {
            user.beg_level = row.beg;
        }
        if row.profile > 0 {
            user.profile_level = row.profile;
        }
        drop(user);
        fair.tick().await;
    }

    Ok(fair.rows())
}

pub async fn load_languages(ctx: SegmentContext) -> Result<usize, SegmentError> {
    let rows = ctx.store.fetch_languages().await?;

    let mut fair = ctx.fairness();
    for (user_id, language) in rows {
        ctx.users.get_or_create(user_id).await.write().await.language = language;
        fair.tick().await;
    }

    Ok(fair.rows())
}

/// sets the filter flag from its table, then rebuilds every record's filtered groups;
/// groups are kept whether or not the filter is on so toggling needs no reload
pub async fn load_game_filter(ctx: SegmentContext) -> Result<usize, SegmentError> {
    let enabled = ctx.store.fetch_game_filters().await?;
    let groups = ctx.store.fetch_filtered_groups().await?;
    reset_all(&ctx.users, |u| {
        u.game_filter = false;
        u.filtered_groups.clear();
    })
    .await;

    let mut fair = ctx.fairness();
    for user_id in enabled {
        ctx.users.get_or_create(user_id).await.write().await.game_filter = true;
        fair.tick().await;
    }
    for (user_id, group_id) in groups {
        let user = ctx.users.get_or_create(user_id).await;
        user.write().await.filtered_groups.push(group_id);
        fair.tick().await;
    }

    Ok(fair.rows())
}
