use std::sync::Arc;

use serenity::all::{
    Command, CommandId, CreateCommandPermission, EditCommandPermissions, GuildId, Http,
};

use crate::{
    commands::CommandSchema,
    permissions::{GuildRole, OverrideTarget},
};

use super::api::{CommandApi, CommandPermissions, RemoteCommand, Scope};

/// [`CommandApi`] over serenity's HTTP client.
#[derive(Clone)]
pub struct SerenityApi {
    http: Arc<Http>,
}

impl SerenityApi {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

fn remote(command: Command, scope: Scope) -> RemoteCommand {
    RemoteCommand {
        id: command.id,
        name: command.name,
        kind: command.kind,
        scope,
    }
}

#[serenity::async_trait]
impl CommandApi for SerenityApi {
    async fn set_commands(
        &self,
        scope: Scope,
        commands: &[CommandSchema],
    ) -> anyhow::Result<Vec<RemoteCommand>> {
        let builders = commands.iter().map(CommandSchema::to_discord_command).collect();
        let registered = match scope {
            Scope::Global => Command::set_global_commands(&*self.http, builders).await?,
            Scope::Guild(guild) => guild.set_commands(&*self.http, builders).await?,
        };
        Ok(registered.into_iter().map(|c| remote(c, scope)).collect())
    }

    async fn create_command(
        &self,
        scope: Scope,
        command: &CommandSchema,
    ) -> anyhow::Result<RemoteCommand> {
        let builder = command.to_discord_command();
        let created = match scope {
            Scope::Global => Command::create_global_command(&*self.http, builder).await?,
            Scope::Guild(guild) => guild.create_command(&*self.http, builder).await?,
        };
        Ok(remote(created, scope))
    }

    async fn edit_command(
        &self,
        scope: Scope,
        id: CommandId,
        command: &CommandSchema,
    ) -> anyhow::Result<RemoteCommand> {
        let builder = command.to_discord_command();
        let edited = match scope {
            Scope::Global => Command::edit_global_command(&*self.http, id, builder).await?,
            Scope::Guild(guild) => guild.edit_command(&*self.http, id, builder).await?,
        };
        Ok(remote(edited, scope))
    }

    async fn delete_command(&self, scope: Scope, id: CommandId) -> anyhow::Result<()> {
        match scope {
            Scope::Global => Command::delete_global_command(&*self.http, id).await?,
            Scope::Guild(guild) => guild.delete_command(&*self.http, id).await?,
        }
        Ok(())
    }

    async fn guild_roles(&self, guild: GuildId) -> anyhow::Result<Vec<GuildRole>> {
        let roles = guild.roles(&*self.http).await?;
        Ok(roles
            .into_values()
            .map(|role| GuildRole {
                id: role.id,
                permissions: role.permissions,
            })
            .collect())
    }

    // Discord only exposes per-command permission edits to bots, so the
    // table is replaced one command at a time.
    async fn set_guild_permissions(
        &self,
        guild: GuildId,
        permissions: &[CommandPermissions],
    ) -> anyhow::Result<()> {
        for command in permissions {
            let entries = command
                .overrides
                .iter()
                .map(|o| match o.target {
                    OverrideTarget::Role(id) => CreateCommandPermission::role(id, o.allow),
                    OverrideTarget::User(id) => CreateCommandPermission::user(id, o.allow),
                })
                .collect();
            guild
                .edit_command_permissions(
                    &*self.http,
                    command.command_id,
                    EditCommandPermissions::new(entries),
                )
                .await?;
        }
        Ok(())
    }
}
