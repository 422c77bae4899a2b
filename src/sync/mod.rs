//! Reconciles the local command registry with the remote platform.
//!
//! Registration is always a full replace of one scope; there is no diffing.
//! Permission overrides are pushed per guild, in one call per guild.

use std::sync::Arc;

use parking_lot::RwLock;
use serenity::{
    all::{GuildId, UserId},
    futures::future::join_all,
};
use tracing::{debug, info, warn};

use crate::{
    commands::{CommandCollection, CommandRegistry, CommandSchema},
    error::{RegistryError, Result},
    permissions::resolve_overrides,
};

mod api;
mod readiness;
mod serenity_api;
#[cfg(test)]
pub mod testing;

pub use api::{CommandApi, CommandPermissions, RemoteCommand, Scope};
pub use readiness::Readiness;
pub use serenity_api::SerenityApi;

/// Guilds to push permission overrides to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuildTargets {
    /// A single guild; its failure is the call's failure
    One(GuildId),
    /// Independent guilds, synced concurrently with isolated failures
    Many(Vec<GuildId>),
}

#[derive(Debug, Default)]
pub struct PermissionSyncReport {
    pub synced: Vec<GuildId>,
    pub failed: Vec<(GuildId, RegistryError)>,
}

impl PermissionSyncReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct Synchronizer {
    api: Arc<dyn CommandApi>,
    readiness: Readiness,
    application_permissions: bool,
    permission_guilds: Vec<GuildId>,
    admins: Vec<UserId>,
}

impl Synchronizer {
    pub fn new(
        api: Arc<dyn CommandApi>,
        readiness: Readiness,
        application_permissions: bool,
        permission_guilds: Vec<GuildId>,
        admins: Vec<UserId>,
    ) -> Self {
        Self {
            api,
            readiness,
            application_permissions,
            permission_guilds,
            admins,
        }
    }

    /// Replaces every remote command in one scope with the registry's projection.
    ///
    /// `guild` picks the scope, falling back to the registry's target guild,
    /// then to global. The projection is taken once the client is ready;
    /// nothing is sent when it is empty.
    pub async fn register_all(
        &self,
        registry: &RwLock<CommandRegistry>,
        guild: Option<GuildId>,
    ) -> Result<Option<Vec<RemoteCommand>>> {
        if registry.read().commands().is_none() {
            return Err(RegistryError::NotFound("command collection"));
        }
        self.readiness.wait().await;

        let (schemas, local, scope) = {
            let registry = registry.read();
            let schemas = registry.get_data(registry.commands())?;
            let scope = Scope::from(guild.or(registry.guild_id()));
            (schemas, registry.commands().cloned(), scope)
        };

        if schemas.is_empty() {
            debug!(%scope, "no remotely registrable commands, skipping sync");
            return Ok(None);
        }

        let remote = self
            .api
            .set_commands(scope, &schemas)
            .await
            .map_err(|e| RegistryError::remote("set_commands", e))?;
        info!(%scope, count = remote.len(), "replaced remote commands");

        if self.application_permissions {
            let targets = if !self.permission_guilds.is_empty() {
                Some(GuildTargets::Many(self.permission_guilds.clone()))
            } else {
                scope.guild_id().map(GuildTargets::One)
            };
            let report = self
                .register_permissions(Some(&remote), local.as_ref(), targets)
                .await?;
            if !report.is_complete() {
                for (guild, err) in &report.failed {
                    warn!(guild = %guild, error = %err, "permission sync failed");
                }
            }
        }

        Ok(Some(remote))
    }

    pub async fn register_permissions(
        &self,
        remote: Option<&[RemoteCommand]>,
        local: Option<&CommandCollection>,
        guilds: Option<GuildTargets>,
    ) -> Result<PermissionSyncReport> {
        let remote = remote.ok_or(RegistryError::MissingReference("remote commands"))?;
        let local = local.ok_or(RegistryError::MissingReference("local commands"))?;
        let guilds = guilds.ok_or(RegistryError::MissingReference("guild ids"))?;

        let mut report = PermissionSyncReport::default();
        match guilds {
            GuildTargets::One(guild) => {
                self.register_guild_permissions(remote, local, guild).await?;
                report.synced.push(guild);
            }
            GuildTargets::Many(guilds) => {
                let results = join_all(guilds.into_iter().map(|guild| async move {
                    (
                        guild,
                        self.register_guild_permissions(remote, local, guild).await,
                    )
                }))
                .await;
                for (guild, result) in results {
                    match result {
                        Ok(()) => report.synced.push(guild),
                        Err(err) => report.failed.push((guild, err)),
                    }
                }
            }
        }
        Ok(report)
    }

    async fn register_guild_permissions(
        &self,
        remote: &[RemoteCommand],
        local: &CommandCollection,
        guild: GuildId,
    ) -> Result<()> {
        self.readiness.wait().await;
        let roles = self
            .api
            .guild_roles(guild)
            .await
            .map_err(|e| RegistryError::remote("guild_roles", e))?;

        let permissions: Vec<_> = remote
            .iter()
            .filter_map(|command| {
                let Some(def) = local.get(&command.name) else {
                    debug!(command = %command.name, "remote command has no local definition");
                    return None;
                };
                Some(CommandPermissions {
                    command_id: command.id,
                    overrides: resolve_overrides(def.gating.user_permissions, &roles, &self.admins),
                })
            })
            .collect();

        self.api
            .set_guild_permissions(guild, &permissions)
            .await
            .map_err(|e| RegistryError::remote("set_guild_permissions", e))?;
        info!(guild = %guild, commands = permissions.len(), "replaced command permissions");
        Ok(())
    }

    pub async fn create_command(
        &self,
        command: Option<&CommandSchema>,
        guild: Option<GuildId>,
    ) -> Result<RemoteCommand> {
        let command = command.ok_or(RegistryError::NotFound("command definition"))?;
        let scope = Scope::from(guild);
        self.readiness.wait().await;
        let created = self
            .api
            .create_command(scope, command)
            .await
            .map_err(|e| RegistryError::remote("create_command", e))?;
        info!(%scope, command = %created.name, "created remote command");
        Ok(created)
    }

    pub async fn edit_command(
        &self,
        old: Option<&RemoteCommand>,
        new: Option<&CommandSchema>,
        guild: Option<GuildId>,
    ) -> Result<RemoteCommand> {
        let old = old.ok_or(RegistryError::NotFound("remote command"))?;
        let new = new.ok_or(RegistryError::NotFound("command definition"))?;
        let scope = Scope::from(guild);
        self.readiness.wait().await;
        let edited = self
            .api
            .edit_command(scope, old.id, new)
            .await
            .map_err(|e| RegistryError::remote("edit_command", e))?;
        info!(%scope, command = %edited.name, "edited remote command");
        Ok(edited)
    }

    pub async fn delete_command(
        &self,
        command: Option<&RemoteCommand>,
        guild: Option<GuildId>,
    ) -> Result<()> {
        let command = command.ok_or(RegistryError::NotFound("remote command"))?;
        let scope = Scope::from(guild);
        self.readiness.wait().await;
        self.api
            .delete_command(scope, command.id)
            .await
            .map_err(|e| RegistryError::remote("delete_command", e))?;
        info!(%scope, command = %command.name, "deleted remote command");
        Ok(())
    }

    /// Removes every command in the scope by replacing it with nothing.
    pub async fn delete_all_commands(&self, guild: Option<GuildId>) -> Result<()> {
        let scope = Scope::from(guild);
        self.readiness.wait().await;
        self.api
            .set_commands(scope, &[])
            .await
            .map_err(|e| RegistryError::remote("set_commands", e))?;
        info!(%scope, "deleted all remote commands");
        Ok(())
    }
}
