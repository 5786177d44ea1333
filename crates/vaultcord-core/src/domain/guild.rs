use serde::{Deserialize, Serialize};

/// Guild as listed by `GET /users/@me/guilds`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialGuild {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub owner: bool,
    /// Permission bitset of the current user, serialized by Discord as a string.
    #[serde(default)]
    pub permissions: Option<String>,
}

/// Full guild object from `GET /guilds/{guild.id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guild {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub icon: Option<String>,
    pub owner_id: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub approximate_member_count: Option<u64>,
    #[serde(default)]
    pub roles: Vec<Role>,
}

/// Guild role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub color: u32,
    #[serde(default)]
    pub position: i32,
    #[serde(default)]
    pub managed: bool,
}

impl PartialGuild {
    const ADMINISTRATOR: u64 = 1 << 3;
    const MANAGE_GUILD: u64 = 1 << 5;

    /// Whether the current user may configure the bot for this guild.
    pub fn can_manage(&self) -> bool {
        if self.owner {
            return true;
        }
        let bits = self
            .permissions
            .as_deref()
            .and_then(|p| p.parse::<u64>().ok())
            .unwrap_or(0);
        bits & (Self::ADMINISTRATOR | Self::MANAGE_GUILD) != 0
    }
}
