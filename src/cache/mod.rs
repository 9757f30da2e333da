/// the in-memory mirror that consumers read from.
/// contents:
/// * per-user mutable records, created lazily and reset wholesale on a cold rebuild
/// * typed segment maps, one per data source, each overwritten whole by its loader
///
/// Think of it as a level 1 cache sitting in front of the persistence store: segment
/// loaders fill it at startup and on every periodic refresh, consumers only read it
/// (and check maintenance mode before relying on it).
///
pub mod entity;
pub mod segment;
pub mod user;

pub use entity::{
    AssignableRoles, DeadLink, Difficulty, FeedChannel, Gender, Group, Idol, LoggedServer,
    PlayingCard, RestrictedChannel,
};
pub use segment::{
    CacheSegments, GameScores, LanguagePack, SegmentList, SegmentMap, WelcomeMessage,
};
pub use user::{Notification, Reminder, Tier, UserHandle, UserRecord, UserRecordStore};

pub type UserId = u64;
pub type GuildId = u64;
pub type ChannelId = u64;
pub type GroupId = u64;
pub type IdolId = u64;
pub type RoleId = u64;
pub type MessageId = u64;
