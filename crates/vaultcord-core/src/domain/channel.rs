use serde::{Deserialize, Serialize};

/// Guild channel from `GET /guilds/{guild.id}/channels`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub position: Option<i32>,
    #[serde(default)]
    pub topic: Option<String>,
}

/// Channel types the vault sync cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    Text,
    Voice,
    Category,
    Announcement,
    Forum,
    Other(u8),
}

impl From<u8> for ChannelKind {
    fn from(kind: u8) -> Self {
        match kind {
            0 => ChannelKind::Text,
            2 => ChannelKind::Voice,
            4 => ChannelKind::Category,
            5 => ChannelKind::Announcement,
            15 => ChannelKind::Forum,
            other => ChannelKind::Other(other),
        }
    }
}

impl Channel {
    pub fn channel_kind(&self) -> ChannelKind {
        ChannelKind::from(self.kind)
    }

    /// Whether messages from this channel can be mirrored into vault notes.
    pub fn is_syncable(&self) -> bool {
        matches!(
            self.channel_kind(),
            ChannelKind::Text | ChannelKind::Announcement | ChannelKind::Forum
        )
    }
}
