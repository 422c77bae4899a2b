//! Capabilities shared by every handler family.
//!
//! Families compose these instead of sharing a base type: commands and
//! components are keyed, executable, permission-gated and cooled down; event
//! listeners are only keyed and executable.

use std::{path::Path, time::Duration};

use serenity::all::Permissions;

use crate::trigger::{Reply, Trigger};

/// Exposes the dispatch-table keys an instance is reachable under.
pub trait Keyed {
    fn keys(&self) -> Vec<String>;

    /// Absolute path of the module the instance was constructed from.
    fn module_path(&self) -> Option<&Path>;
}

#[serenity::async_trait]
pub trait Executable: Send + Sync {
    /// Optional pre-hook, run before any gating check.
    async fn before(&self, trigger: &Trigger) -> anyhow::Result<()>;

    async fn execute(&self, trigger: &Trigger) -> anyhow::Result<Option<Reply>>;
}

pub trait WithPermissions {
    fn admin_only(&self) -> bool;
    fn channel_scope(&self) -> ChannelScope;
    fn required_user_permissions(&self) -> Permissions;
    fn required_client_permissions(&self) -> Permissions;
}

pub trait WithCooldown {
    /// Key the cooldown tracker files this handler's windows under.
    fn cooldown_key(&self) -> &str;
    fn cooldown(&self) -> Duration;
}

/// A handler the router can gate and run.
pub trait GatedHandler: Keyed + Executable + WithPermissions + WithCooldown {}
impl<T: Keyed + Executable + WithPermissions + WithCooldown> GatedHandler for T {}

/// Where a handler may be triggered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelScope {
    Guild,
    DirectMessage,
    #[default]
    Any,
}

impl ChannelScope {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "guild" => Some(Self::Guild),
            "dm" | "direct_message" => Some(Self::DirectMessage),
            "any" | "all" => Some(Self::Any),
            _ => None,
        }
    }

    pub fn admits(self, in_guild: bool) -> bool {
        match self {
            Self::Guild => in_guild,
            Self::DirectMessage => !in_guild,
            Self::Any => true,
        }
    }
}

/// Gating fields common to commands and components.
#[derive(Debug, Clone, PartialEq)]
pub struct Gating {
    pub admin_only: bool,
    pub channel_scope: ChannelScope,
    pub user_permissions: Permissions,
    pub client_permissions: Permissions,
    pub cooldown: Duration,
}

impl Default for Gating {
    fn default() -> Self {
        Self {
            admin_only: false,
            channel_scope: ChannelScope::Any,
            user_permissions: Permissions::empty(),
            client_permissions: Permissions::empty(),
            cooldown: Duration::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_admits() {
        assert!(ChannelScope::Guild.admits(true));
        assert!(!ChannelScope::Guild.admits(false));
        assert!(ChannelScope::DirectMessage.admits(false));
        assert!(!ChannelScope::DirectMessage.admits(true));
        assert!(ChannelScope::Any.admits(true) && ChannelScope::Any.admits(false));
    }

    #[test]
    fn scope_parses_aliases() {
        assert_eq!(ChannelScope::parse("DM"), Some(ChannelScope::DirectMessage));
        assert_eq!(ChannelScope::parse("guild"), Some(ChannelScope::Guild));
        assert_eq!(ChannelScope::parse("everywhere"), None);
    }
}
