/// the default cache segments, registered in the order they must run.
///
pub mod entities;
pub mod guilds;
pub mod language;
pub mod lookups;
pub mod membership;
pub mod users;

use std::future::Future;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::bootstrap::{Gate, SegmentRegistry};
use crate::cache::{CacheSegments, UserRecordStore};
use crate::error::SegmentError;
use crate::fairness::Fairness;
use crate::membership::{MembershipProvider, MembershipReconciler};
use crate::pool::BlockingPool;
use crate::store::PersistenceStore;

pub const LANGUAGE_PACKS: &str = "Language Packs";
pub const IDOL_PHOTO_COUNT: &str = "Idol Photo Count";
pub const GROUP_PHOTO_COUNT: &str = "Group Photo Count";
pub const USER_NOTIFICATIONS: &str = "User Notifications";
pub const MEMBERSHIP: &str = "Membership";
pub const MOD_MAIL: &str = "Mod Mail";
pub const BOT_BANS: &str = "Bot Bans";
pub const LOGGED_CHANNELS: &str = "Logged Channels";
pub const SERVER_PREFIXES: &str = "Server Prefixes";
pub const WELCOME_MESSAGES: &str = "Welcome Messages";
pub const TEMP_CHANNELS: &str = "Temp Channels";
pub const NWORD_COUNTER: &str = "NWord Counter";
pub const COMMAND_COUNTER: &str = "Command Counter";
pub const IDOL_OBJECTS: &str = "Idol Objects";
pub const GROUP_OBJECTS: &str = "Group Objects";
pub const RESTRICTED_CHANNELS: &str = "Restricted Idol Channels";
pub const DEAD_LINKS: &str = "Dead Links";
pub const BOT_STATUSES: &str = "Bot Statuses";
pub const CUSTOM_COMMANDS: &str = "Custom Commands";
pub const FEED_CHANNELS: &str = "Weverse Text Channels";
pub const ASSIGNABLE_ROLES: &str = "Self-Assignable Roles";
pub const REMINDERS: &str = "Reminders";
pub const TIMEZONES: &str = "Timezones";
pub const GAME_SCORES: &str = "Game Scores";
pub const STREAM_FOLLOWS: &str = "Stream Follows";
pub const CURRENCY: &str = "Currency";
pub const LEVELS: &str = "Levels";
pub const USER_LANGUAGE: &str = "User Language";
pub const PLAYING_CARDS: &str = "Playing Cards";
pub const GUILD_DIRECTORY: &str = "DB Guild";
pub const FEED: &str = "Weverse";
pub const GAME_FILTER: &str = "Game Filter";
pub const WELCOME_ROLES: &str = "Welcome Roles";
pub const DISABLED_GAMES: &str = "Disabled Games";

/// default segment names in run order
pub const DEFAULT_ORDER: [&str; 34] = [
    LANGUAGE_PACKS,
    IDOL_PHOTO_COUNT,
    GROUP_PHOTO_COUNT,
    USER_NOTIFICATIONS,
    MEMBERSHIP,
    MOD_MAIL,
    BOT_BANS,
    LOGGED_CHANNELS,
    SERVER_PREFIXES,
    WELCOME_MESSAGES,
    TEMP_CHANNELS,
    NWORD_COUNTER,
    COMMAND_COUNTER,
    IDOL_OBJECTS,
    GROUP_OBJECTS,
    RESTRICTED_CHANNELS,
    DEAD_LINKS,
    BOT_STATUSES,
    CUSTOM_COMMANDS,
    FEED_CHANNELS,
    ASSIGNABLE_ROLES,
    REMINDERS,
    TIMEZONES,
    GAME_SCORES,
    STREAM_FOLLOWS,
    CURRENCY,
    LEVELS,
    USER_LANGUAGE,
    PLAYING_CARDS,
    GUILD_DIRECTORY,
    FEED,
    GAME_FILTER,
    WELCOME_ROLES,
    DISABLED_GAMES,
];

/// everything a default loader reads from or writes to
#[derive(Clone)]
pub struct SegmentContext {
    pub store: Arc<dyn PersistenceStore>,
    pub users: UserRecordStore,
    pub segments: CacheSegments,
    pub pool: BlockingPool,
    pub rows_per_yield: usize,
    pub language_dir: PathBuf,
    pub languages: Vec<String>,
}

impl SegmentContext {
    pub fn fairness(&self) -> Fairness {
        Fairness::new(self.rows_per_yield)
    }
}

fn add<F, Fut>(registry: &mut SegmentRegistry, ctx: &SegmentContext, name: &str, f: F)
where
    F: Fn(SegmentContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<usize, SegmentError>> + Send + 'static,
{
    let ctx = ctx.clone();
    registry.register_fn(name, move || f(ctx.clone()), None);
}

/// readiness switches the gated default segments wait on
#[derive(Debug, Clone, Default)]
pub struct Readiness {
    /// the external authority has answered at least once
    pub external: Arc<AtomicBool>,
    /// the feed connection is up
    pub feed: Arc<AtomicBool>,
}

fn flag_gate(flag: &Arc<AtomicBool>, defer: bool) -> Gate {
    let flag = flag.clone();
    let check = move || flag.load(Ordering::Acquire);
    if defer {
        Gate::defer(check)
    } else {
        Gate::skip(check)
    }
}

/// register the default segments.  Membership and the guild directory only run once
/// the external authority is ready; the feed waits for its connection in the
/// background instead of holding up the pass.
pub fn register_defaults(
    registry: &mut SegmentRegistry,
    ctx: &SegmentContext,
    reconciler: Arc<MembershipReconciler>,
    provider: Arc<dyn MembershipProvider>,
    readiness: &Readiness,
) {
    add(registry, ctx, LANGUAGE_PACKS, language::load_language_packs);
    add(registry, ctx, IDOL_PHOTO_COUNT, entities::load_idol_photo_counts);
    add(registry, ctx, GROUP_PHOTO_COUNT, entities::load_group_photo_counts);
    add(registry, ctx, USER_NOTIFICATIONS, users::load_notifications);

    registry.register_fn(
        MEMBERSHIP,
        move || membership::load_membership(reconciler.clone()),
        Some(flag_gate(&readiness.external, false)),
    );

    add(registry, ctx, MOD_MAIL, users::load_mod_mail);
    add(registry, ctx, BOT_BANS, users::load_bot_bans);
    add(registry, ctx, LOGGED_CHANNELS, guilds::load_logged_channels);
    add(registry, ctx, SERVER_PREFIXES, lookups::load_server_prefixes);
    add(registry, ctx, WELCOME_MESSAGES, lookups::load_welcome_messages);
    add(registry, ctx, TEMP_CHANNELS, lookups::load_temp_channels);
    add(registry, ctx, NWORD_COUNTER, users::load_word_counts);
    add(registry, ctx, COMMAND_COUNTER, guilds::load_command_counter);
    add(registry, ctx, IDOL_OBJECTS, entities::load_idols);
    add(registry, ctx, GROUP_OBJECTS, entities::load_groups);
    add(registry, ctx, RESTRICTED_CHANNELS, entities::load_restricted_channels);
    add(registry, ctx, DEAD_LINKS, entities::load_dead_links);
    add(registry, ctx, BOT_STATUSES, lookups::load_bot_statuses);
    add(registry, ctx, CUSTOM_COMMANDS, lookups::load_custom_commands);
    add(registry, ctx, FEED_CHANNELS, guilds::load_feed_channels);
    add(registry, ctx, ASSIGNABLE_ROLES, guilds::load_assignable_roles);
    add(registry, ctx, REMINDERS, users::load_reminders);
    add(registry, ctx, TIMEZONES, users::load_timezones);
    add(registry, ctx, GAME_SCORES, lookups::load_game_scores);
    add(registry, ctx, STREAM_FOLLOWS, lookups::load_stream_follows);
    add(registry, ctx, CURRENCY, users::load_balances);
    add(registry, ctx, LEVELS, users::load_levels);
    add(registry, ctx, USER_LANGUAGE, users::load_languages);
    add(registry, ctx, PLAYING_CARDS, entities::load_playing_cards);

    let guild_ctx = ctx.clone();
    registry.register_fn(
        GUILD_DIRECTORY,
        move || guilds::publish_guilds(guild_ctx.clone(), provider.clone()),
        Some(flag_gate(&readiness.external, false)),
    );

    let feed_ctx = ctx.clone();
    registry.register_fn(
        FEED,
        move || guilds::load_feed_communities(feed_ctx.clone()),
        Some(flag_gate(&readiness.feed, true)),
    );

    add(registry, ctx, GAME_FILTER, users::load_game_filter);
    add(registry, ctx, WELCOME_ROLES, guilds::load_welcome_roles);
    add(registry, ctx, DISABLED_GAMES, lookups::load_disabled_game_channels);
}
