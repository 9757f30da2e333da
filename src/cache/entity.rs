/// value types for the idol, guild and game segments
use serde::{Deserialize, Serialize};

use super::{ChannelId, GroupId, GuildId, IdolId, RoleId, UserId};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Female,
    Male,
    #[default]
    Unknown,
}

/// guessing game difficulty; every harder level includes the easier ones
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    #[default]
    Hard,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Idol {
    pub id: IdolId,
    pub full_name: String,
    pub stage_name: String,
    pub gender: Gender,
    pub difficulty: Difficulty,
    /// group ids, first appearance order, no repeats
    pub groups: Vec<GroupId>,
    pub photo_count: u64,
}

impl Idol {
    /// whether the idol can be picked for a game at `level`.  Idols without photos
    /// never can.
    pub fn playable(&self, level: Difficulty) -> bool {
        self.photo_count > 0 && self.difficulty <= level
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    /// idol ids, first appearance order, no repeats
    pub members: Vec<IdolId>,
    pub photo_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggedServer {
    pub send_all: bool,
    pub logging_channel: ChannelId,
    pub channels: Vec<ChannelId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestrictedChannel {
    pub guild_id: GuildId,
    pub send_here: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeadLink {
    pub link: String,
    pub user_id: UserId,
    pub idol_id: IdolId,
    pub guessing_game: bool,
}

/// a text channel following one feed community
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedChannel {
    pub channel_id: ChannelId,
    pub role_id: Option<RoleId>,
    pub comments_disabled: bool,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignableRoles {
    pub roles: Vec<(RoleId, String)>,
    pub channel_id: Option<ChannelId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayingCard {
    pub custom_card_id: u64,
    pub file_name: String,
    pub card_name: String,
    pub value: u32,
    pub background_idol: Option<IdolId>,
}
