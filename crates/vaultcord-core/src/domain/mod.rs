//! Domain entities - the Discord objects served to the dashboard.

mod channel;
mod guild;
mod user;

pub use channel::{Channel, ChannelKind};
pub use guild::{Guild, PartialGuild, Role};
pub use user::DiscordUser;
