//! The narrow seam to the remote command API.

use serenity::all::{CommandId, CommandType, GuildId};

use crate::{
    commands::CommandSchema,
    permissions::{GuildRole, PermissionOverride},
};

/// Where a command lives remotely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    Global,
    Guild(GuildId),
}

impl Scope {
    pub fn guild_id(self) -> Option<GuildId> {
        match self {
            Self::Global => None,
            Self::Guild(id) => Some(id),
        }
    }
}

impl From<Option<GuildId>> for Scope {
    fn from(guild: Option<GuildId>) -> Self {
        guild.map_or(Self::Global, Self::Guild)
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Global => write!(f, "global"),
            Self::Guild(id) => write!(f, "guild {id}"),
        }
    }
}

/// A command as the remote platform reports it after registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCommand {
    pub id: CommandId,
    pub name: String,
    pub kind: CommandType,
    pub scope: Scope,
}

/// The allow-list for one remote command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandPermissions {
    pub command_id: CommandId,
    pub overrides: Vec<PermissionOverride>,
}

#[serenity::async_trait]
pub trait CommandApi: Send + Sync {
    /// Replaces every command in `scope` with `commands`.
    async fn set_commands(
        &self,
        scope: Scope,
        commands: &[CommandSchema],
    ) -> anyhow::Result<Vec<RemoteCommand>>;

    async fn create_command(
        &self,
        scope: Scope,
        command: &CommandSchema,
    ) -> anyhow::Result<RemoteCommand>;

    async fn edit_command(
        &self,
        scope: Scope,
        id: CommandId,
        command: &CommandSchema,
    ) -> anyhow::Result<RemoteCommand>;

    async fn delete_command(&self, scope: Scope, id: CommandId) -> anyhow::Result<()>;

    async fn guild_roles(&self, guild: GuildId) -> anyhow::Result<Vec<GuildRole>>;

    /// Replaces the guild's permission table with `permissions`.
    async fn set_guild_permissions(
        &self,
        guild: GuildId,
        permissions: &[CommandPermissions],
    ) -> anyhow::Result<()>;
}
