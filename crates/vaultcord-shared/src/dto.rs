//! Data Transfer Objects - response payloads of the dashboard API.

use serde::{Deserialize, Serialize};

use vaultcord_core::domain::{Channel, DiscordUser, PartialGuild};
use vaultcord_core::ports::{CacheStatus, QueueStatus};

/// Payload of `GET /api/cache/status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStatusResponse {
    pub cache: CacheStatus,
    pub rate_limit: QueueStatus,
    /// Entries removed by the cleanup run that preceded this snapshot.
    pub evicted: usize,
    pub timestamp: String,
}

/// Bot account summary shown on the dashboard header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotUserResponse {
    pub id: String,
    pub name: String,
    pub avatar_url: Option<String>,
}

impl From<DiscordUser> for BotUserResponse {
    fn from(user: DiscordUser) -> Self {
        Self {
            name: user.display_name().to_string(),
            avatar_url: user.avatar_url(),
            id: user.id,
        }
    }
}

/// Guild entry in the server picker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuildSummary {
    pub id: String,
    pub name: String,
    pub icon: Option<String>,
    pub can_manage: bool,
}

impl From<PartialGuild> for GuildSummary {
    fn from(guild: PartialGuild) -> Self {
        Self {
            can_manage: guild.can_manage(),
            id: guild.id,
            name: guild.name,
            icon: guild.icon,
        }
    }
}

/// Channel entry in the vault folder mapping view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelSummary {
    pub id: String,
    pub name: String,
    pub parent_id: Option<String>,
    pub syncable: bool,
}

impl From<Channel> for ChannelSummary {
    fn from(channel: Channel) -> Self {
        Self {
            syncable: channel.is_syncable(),
            name: channel.name.unwrap_or_default(),
            id: channel.id,
            parent_id: channel.parent_id,
        }
    }
}
