use std::{path::Path, sync::Arc};

use serenity::all::GuildId;
use tracing::{debug, info};

use crate::{
    error::{RegistryError, Result},
    loader::{Collection, Loader},
    lua::LuaHost,
};

use super::{definition::CommandDefinition, schema::CommandSchema};

pub type CommandCollection = Collection<CommandDefinition>;

/// The local source of truth for command definitions.
pub struct CommandRegistry {
    loader: Loader<CommandDefinition>,
    commands: Option<CommandCollection>,
    application_permissions: bool,
    guild_id: Option<GuildId>,
}

impl CommandRegistry {
    pub fn new(host: LuaHost, application_permissions: bool, guild_id: Option<GuildId>) -> Self {
        Self {
            loader: Loader::new(host),
            commands: None,
            application_permissions,
            guild_id,
        }
    }

    /// Replaces the collection with a fresh scan of `dir`.
    pub fn load_all(&mut self, dir: &Path) -> Result<&CommandCollection> {
        let commands = self.loader.load_all(dir)?;
        Ok(self.commands.insert(commands))
    }

    pub fn commands(&self) -> Option<&CommandCollection> {
        self.commands.as_ref()
    }

    pub fn get(&self, name: &str) -> Option<Arc<CommandDefinition>> {
        self.commands.as_ref()?.get(name).cloned()
    }

    /// Finds a message command by name or alias.
    pub fn find_message_command(&self, token: &str) -> Option<Arc<CommandDefinition>> {
        self.commands
            .as_ref()?
            .values()
            .find(|def| def.answers_to(token))
            .cloned()
    }

    pub fn guild_id(&self) -> Option<GuildId> {
        self.guild_id
    }

    /// The `default_permission` a definition is registered with.
    ///
    /// Forced off when permission overrides will be pushed to a target guild
    /// and the command requires user permissions; declared value otherwise.
    pub fn default_permission_for(&self, def: &CommandDefinition) -> bool {
        if self.application_permissions
            && self.guild_id.is_some()
            && !def.gating.user_permissions.is_empty()
        {
            false
        } else {
            def.default_permission
        }
    }

    /// Projects one definition; `None` for message commands.
    pub fn project(&self, def: &CommandDefinition) -> Option<CommandSchema> {
        CommandSchema::project(def, self.default_permission_for(def))
    }

    /// Projects every remotely registrable definition in `collection`.
    pub fn get_data(&self, collection: Option<&CommandCollection>) -> Result<Vec<CommandSchema>> {
        let collection = collection.ok_or(RegistryError::NotFound("command collection"))?;
        Ok(collection
            .values()
            .filter_map(|def| self.project(def))
            .collect())
    }

    /// Removes `def` and evicts its module source; always succeeds.
    pub fn unregister(&mut self, def: &CommandDefinition) -> bool {
        if let Some(commands) = &mut self.commands {
            commands.remove(&def.name);
        }
        if let Some(path) = &def.module_path {
            self.loader.invalidate(path);
        }
        debug!(command = %def.name, "unregistered command");
        true
    }

    /// Re-imports `def`'s module; `None` if it was never loaded from a file.
    pub fn reload(&mut self, def: &CommandDefinition) -> Result<Option<&CommandCollection>> {
        if def.module_path.is_none() {
            return Ok(None);
        }
        self.unregister(def);
        self.register(def).map(Some)
    }

    /// Constructs a fresh instance from `def`'s module and inserts it by name.
    pub fn register(&mut self, def: &CommandDefinition) -> Result<&CommandCollection> {
        let path = def
            .module_path
            .as_deref()
            .ok_or(RegistryError::NotFound("command module path"))?;
        let loaded = self.loader.load(path)?;
        info!(
            command = %loaded.name,
            generation = loaded.generation,
            "registered command"
        );

        let commands = self.commands.get_or_insert_with(CommandCollection::new);
        commands.insert(loaded.name.clone(), loaded);
        Ok(commands)
    }
}

#[cfg(test)]
mod tests {
    use serenity::all::CommandType;

    use super::*;
    use crate::loader::tests::write;

    const PING: &str = r#"return { name = "ping", description = "Pong!", execute = function() return "pong" end }"#;
    const KICK: &str = r#"return { name = "kick", description = "Kick", user_permissions = { "KickMembers" }, execute = function() end }"#;
    const PURGE: &str = r#"return { name = "purge", type = "message", execute = function() end }"#;
    const INSPECT: &str = r#"return { name = "Inspect", type = "user", default_permission = false, execute = function() end }"#;

    fn registry(application_permissions: bool, guild: Option<u64>) -> CommandRegistry {
        CommandRegistry::new(
            LuaHost::default(),
            application_permissions,
            guild.map(GuildId::new),
        )
    }

    fn loaded(registry: &mut CommandRegistry, files: &[(&str, &str)]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for (name, source) in files {
            write(dir.path(), name, source);
        }
        registry.load_all(dir.path()).unwrap();
        dir
    }

    #[test]
    fn get_data_requires_a_collection() {
        let registry = registry(false, None);
        assert!(matches!(
            registry.get_data(registry.commands()),
            Err(RegistryError::NotFound(_))
        ));
    }

    #[test]
    fn message_commands_are_never_projected() {
        let mut registry = registry(true, Some(1));
        let _dir = loaded(
            &mut registry,
            &[("ping.lua", PING), ("purge.lua", PURGE), ("inspect.lua", INSPECT)],
        );

        let data = registry.get_data(registry.commands()).unwrap();
        let names: Vec<_> = data.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Inspect", "ping"]);
        assert_eq!(data[0].kind, CommandType::User);
        assert_eq!(data[1].kind, CommandType::ChatInput);

        let purge = registry.get("purge").unwrap();
        assert!(registry.project(&purge).is_none());
    }

    #[test]
    fn default_permission_forced_off_only_when_all_conditions_hold() {
        let files = [("kick.lua", KICK), ("ping.lua", PING), ("inspect.lua", INSPECT)];

        let mut synced = registry(true, Some(1));
        let _a = loaded(&mut synced, &files);
        let kick = synced.get("kick").unwrap();
        assert!(kick.default_permission);
        assert!(!synced.project(&kick).unwrap().default_permission);
        assert!(synced.project(&synced.get("ping").unwrap()).unwrap().default_permission);
        // declared false passes through unchanged
        assert!(!synced.project(&synced.get("Inspect").unwrap()).unwrap().default_permission);

        let mut no_guild = registry(true, None);
        let _b = loaded(&mut no_guild, &files);
        assert!(no_guild.project(&no_guild.get("kick").unwrap()).unwrap().default_permission);

        let mut no_sync = registry(false, Some(1));
        let _c = loaded(&mut no_sync, &files);
        assert!(no_sync.project(&no_sync.get("kick").unwrap()).unwrap().default_permission);
    }

    #[test]
    fn unregister_then_reload_recreates_the_command() {
        let mut registry = registry(false, None);
        let _dir = loaded(&mut registry, &[("ping.lua", PING)]);

        let ping = registry.get("ping").unwrap();
        assert!(registry.unregister(&ping));
        assert!(registry.get("ping").is_none());
        // absent definitions unregister fine too
        assert!(registry.unregister(&ping));

        let commands = registry.reload(&ping).unwrap().unwrap();
        let again = &commands["ping"];
        assert_eq!(again.name, ping.name);
        assert_eq!(again.module_path, ping.module_path);
        assert!(again.generation > ping.generation);
    }

    #[test]
    fn reload_picks_up_edits() {
        let mut registry = registry(false, None);
        let dir = loaded(&mut registry, &[("ping.lua", PING)]);
        write(
            dir.path(),
            "ping.lua",
            r#"return { name = "ping", description = "Edited", execute = function() end }"#,
        );

        let ping = registry.get("ping").unwrap();
        registry.reload(&ping).unwrap();
        assert_eq!(registry.get("ping").unwrap().description, "Edited");
    }

    #[test]
    fn register_creates_the_collection() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "ping.lua", PING);

        let mut source = registry(false, None);
        source.load_all(dir.path()).unwrap();
        let ping = source.get("ping").unwrap();

        let mut fresh = registry(false, None);
        assert!(fresh.commands().is_none());
        assert_eq!(fresh.register(&ping).unwrap().len(), 1);
    }

    #[test]
    fn aliases_resolve_message_commands_only() {
        let mut registry = registry(false, None);
        let _dir = loaded(
            &mut registry,
            &[
                ("ping.lua", PING),
                (
                    "purge.lua",
                    r#"return { name = "purge", type = "message", aliases = { "clear" }, execute = function() end }"#,
                ),
            ],
        );
        assert_eq!(registry.find_message_command("clear").unwrap().name, "purge");
        assert!(registry.find_message_command("ping").is_none());
    }
}
