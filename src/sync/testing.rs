//! An in-memory [`CommandApi`] that records every call.

use std::{
    collections::{HashMap, HashSet},
    sync::atomic::{AtomicU64, Ordering},
};

use parking_lot::Mutex;
use serenity::all::{CommandId, GuildId};

use crate::{commands::CommandSchema, permissions::GuildRole};

use super::api::{CommandApi, CommandPermissions, RemoteCommand, Scope};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    SetCommands { scope: Scope, names: Vec<String> },
    Create { scope: Scope, name: String },
    Edit { scope: Scope, id: CommandId, name: String },
    Delete { scope: Scope, id: CommandId },
    GuildRoles(GuildId),
    SetGuildPermissions { guild: GuildId, permissions: Vec<CommandPermissions> },
}

#[derive(Default)]
pub struct RecordingApi {
    next_id: AtomicU64,
    calls: Mutex<Vec<Call>>,
    /// What the remote side currently holds, per scope
    registered: Mutex<HashMap<Scope, Vec<RemoteCommand>>>,
    roles: Mutex<HashMap<GuildId, Vec<GuildRole>>>,
    failing_guilds: Mutex<HashSet<GuildId>>,
}

impl RecordingApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn registered(&self, scope: Scope) -> Vec<String> {
        self.registered
            .lock()
            .get(&scope)
            .map(|commands| commands.iter().map(|c| c.name.clone()).collect())
            .unwrap_or_default()
    }

    pub fn with_roles(self, guild: GuildId, roles: Vec<GuildRole>) -> Self {
        self.roles.lock().insert(guild, roles);
        self
    }

    /// Makes every call touching `guild` fail.
    pub fn failing(self, guild: GuildId) -> Self {
        self.failing_guilds.lock().insert(guild);
        self
    }

    fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }

    fn check(&self, guild: Option<GuildId>) -> anyhow::Result<()> {
        match guild {
            Some(guild) if self.failing_guilds.lock().contains(&guild) => {
                anyhow::bail!("guild {guild} is unavailable")
            }
            _ => Ok(()),
        }
    }

    fn remote(&self, scope: Scope, command: &CommandSchema) -> RemoteCommand {
        RemoteCommand {
            id: CommandId::new(self.next_id.fetch_add(1, Ordering::Relaxed) + 1),
            name: command.name.clone(),
            kind: command.kind,
            scope,
        }
    }
}

#[serenity::async_trait]
impl CommandApi for RecordingApi {
    async fn set_commands(
        &self,
        scope: Scope,
        commands: &[CommandSchema],
    ) -> anyhow::Result<Vec<RemoteCommand>> {
        self.record(Call::SetCommands {
            scope,
            names: commands.iter().map(|c| c.name.clone()).collect(),
        });
        self.check(scope.guild_id())?;
        let remote: Vec<_> = commands.iter().map(|c| self.remote(scope, c)).collect();
        self.registered.lock().insert(scope, remote.clone());
        Ok(remote)
    }

    async fn create_command(
        &self,
        scope: Scope,
        command: &CommandSchema,
    ) -> anyhow::Result<RemoteCommand> {
        self.record(Call::Create {
            scope,
            name: command.name.clone(),
        });
        self.check(scope.guild_id())?;
        let remote = self.remote(scope, command);
        self.registered
            .lock()
            .entry(scope)
            .or_default()
            .push(remote.clone());
        Ok(remote)
    }

    async fn edit_command(
        &self,
        scope: Scope,
        id: CommandId,
        command: &CommandSchema,
    ) -> anyhow::Result<RemoteCommand> {
        self.record(Call::Edit {
            scope,
            id,
            name: command.name.clone(),
        });
        self.check(scope.guild_id())?;
        let mut registered = self.registered.lock();
        let existing = registered
            .get_mut(&scope)
            .and_then(|commands| commands.iter_mut().find(|c| c.id == id))
            .ok_or_else(|| anyhow::anyhow!("unknown command {id}"))?;
        existing.name = command.name.clone();
        existing.kind = command.kind;
        Ok(existing.clone())
    }

    async fn delete_command(&self, scope: Scope, id: CommandId) -> anyhow::Result<()> {
        self.record(Call::Delete { scope, id });
        self.check(scope.guild_id())?;
        if let Some(commands) = self.registered.lock().get_mut(&scope) {
            commands.retain(|c| c.id != id);
        }
        Ok(())
    }

    async fn guild_roles(&self, guild: GuildId) -> anyhow::Result<Vec<GuildRole>> {
        self.record(Call::GuildRoles(guild));
        self.check(Some(guild))?;
        Ok(self.roles.lock().get(&guild).cloned().unwrap_or_default())
    }

    async fn set_guild_permissions(
        &self,
        guild: GuildId,
        permissions: &[CommandPermissions],
    ) -> anyhow::Result<()> {
        self.record(Call::SetGuildPermissions {
            guild,
            permissions: permissions.to_vec(),
        });
        self.check(Some(guild))
    }
}
