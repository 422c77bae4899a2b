use std::path::PathBuf;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use serenity::all::{GuildId, UserId};

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Configuration {
    pub authentication: Authentication,
    pub discord: Discord,
    pub handlers: Handlers,
    pub logging: Logging,
}
impl Configuration {
    const FILENAME: &str = "config.toml";

    pub fn load() -> anyhow::Result<Self> {
        let config = if let Ok(file) = std::fs::read_to_string(Self::FILENAME) {
            Self::parse(&file)?
        } else {
            Self::default()
        };
        config.save()?;

        Ok(config)
    }

    pub fn parse(text: &str) -> anyhow::Result<Self> {
        toml::from_str(text).context("failed to load config")
    }

    fn save(&self) -> anyhow::Result<()> {
        Ok(std::fs::write(
            Self::FILENAME,
            toml::to_string_pretty(self)?,
        )?)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Authentication {
    pub discord_token: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Discord {
    /// Name handed to handler modules as `client.name`
    pub bot_name: String,
    /// Prefix for message commands
    pub prefix: String,
    /// Register commands to this guild instead of globally
    pub guild_id: Option<u64>,
    /// Push per-guild permission overrides after registering commands
    pub application_permissions: bool,
    /// Guilds to push permission overrides to; falls back to `guild_id`
    pub permission_guild_ids: Vec<u64>,
    /// Users that pass admin-only checks and always receive overrides
    pub admin_ids: Vec<u64>,
}

impl Default for Discord {
    fn default() -> Self {
        Self {
            bot_name: "switchcord".to_string(),
            prefix: "!".to_string(),
            guild_id: None,
            application_permissions: false,
            permission_guild_ids: vec![],
            admin_ids: vec![],
        }
    }
}

impl Discord {
    pub fn guild(&self) -> Option<GuildId> {
        self.guild_id.map(GuildId::new)
    }

    pub fn permission_guilds(&self) -> Vec<GuildId> {
        self.permission_guild_ids
            .iter()
            .copied()
            .map(GuildId::new)
            .collect()
    }

    pub fn admins(&self) -> Vec<UserId> {
        self.admin_ids.iter().copied().map(UserId::new).collect()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Handlers {
    pub commands_dir: PathBuf,
    pub events_dir: PathBuf,
    pub buttons_dir: PathBuf,
    pub select_menus_dir: PathBuf,
}

impl Default for Handlers {
    fn default() -> Self {
        Self {
            commands_dir: PathBuf::from("scripts/commands"),
            events_dir: PathBuf::from("scripts/events"),
            buttons_dir: PathBuf::from("scripts/buttons"),
            select_menus_dir: PathBuf::from("scripts/select_menus"),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Logging {
    /// `tracing_subscriber::EnvFilter` directive; `RUST_LOG` takes precedence
    pub filter: String,
}

impl Default for Logging {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config = Configuration::parse("").unwrap();
        assert_eq!(config.discord.prefix, "!");
        assert!(!config.discord.application_permissions);
        assert_eq!(config.handlers.commands_dir, PathBuf::from("scripts/commands"));
        assert_eq!(config.logging.filter, "info");
        assert!(config.authentication.discord_token.is_none());
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let config = Configuration::parse(
            r#"
[discord]
guild_id = 42
application_permissions = true
admin_ids = [7, 8]
"#,
        )
        .unwrap();
        assert_eq!(config.discord.guild(), Some(GuildId::new(42)));
        assert_eq!(config.discord.admins(), vec![UserId::new(7), UserId::new(8)]);
        assert!(config.discord.permission_guilds().is_empty());
        assert_eq!(config.discord.prefix, "!");
    }

    #[test]
    fn pretty_output_parses_back() {
        let mut config = Configuration::default();
        config.discord.permission_guild_ids = vec![1, 2];
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed = Configuration::parse(&text).unwrap();
        assert_eq!(parsed.discord.permission_guild_ids, vec![1, 2]);
    }
}
